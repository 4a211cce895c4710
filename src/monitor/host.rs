// SPDX-License-Identifier: GPL-3.0-only
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};

pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Capacity of the filesystem a path lives on
#[derive(Debug, Clone, PartialEq)]
pub struct DiskSpace {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl DiskSpace {
    pub fn available_gb(&self) -> f64 {
        self.available_bytes as f64 / BYTES_PER_GIB
    }

    pub fn usage_percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        (used as f64 / self.total_bytes as f64 * 100.0) as f32
    }
}

/// Total physical memory in GiB
pub fn total_memory_gb() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory() as f64 / BYTES_PER_GIB
}

/// Disk holding `path`. Paths that do not exist yet resolve through their
/// closest existing ancestor.
pub fn disk_space_for(path: &Path) -> Option<DiskSpace> {
    let resolved = existing_ancestor(path);
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<&Path> = disks.iter().map(|d| d.mount_point()).collect();

    let index = select_mount(&mounts, &resolved)?;
    let disk = &disks.list()[index];

    Some(DiskSpace {
        mount_point: disk.mount_point().to_path_buf(),
        total_bytes: disk.total_space(),
        available_bytes: disk.available_space(),
    })
}

fn existing_ancestor(path: &Path) -> PathBuf {
    for candidate in path.ancestors() {
        if let Ok(canonical) = candidate.canonicalize() {
            return canonical;
        }
    }
    PathBuf::from("/")
}

/// Index of the mount point that is the longest prefix of `path`
pub(crate) fn select_mount(mounts: &[&Path], path: &Path) -> Option<usize> {
    mounts
        .iter()
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}
