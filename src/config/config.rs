// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::supervisor::RestartPolicy;

/// Environment variable naming the TOML configuration file
pub const CONFIG_PATH_VAR: &str = "STEAM_DOWNLOADER_CONFIG";

/// Read when no path is given; unlike an explicit path it may be absent
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub const APP_NAME: &str = "Steam Games Downloader";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for downloaded content
    pub download_dir: PathBuf,

    /// SteamCMD installation directory
    pub steamcmd_dir: PathBuf,

    /// Directory the service writes its log file to
    pub log_dir: PathBuf,

    /// Scratch cache directory
    pub cache_dir: PathBuf,

    /// HTTP bind host: an IP address or a resolvable name
    pub host: String,

    /// HTTP bind port
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error), case-insensitive
    pub log_level: String,

    /// Files removed before the pre-flight check runs
    pub stale_files: Vec<PathBuf>,

    /// Program run as the pre-flight check; empty runs `<self> check`
    pub check_command: Vec<String>,

    /// Program the entrypoint execs into; empty runs `<self> serve`
    pub server_command: Vec<String>,

    pub preflight: PreflightConfig,

    pub health: HealthConfig,

    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Minimum total memory in GiB
    pub min_memory_gb: f64,

    /// Minimum free space in GiB on the filesystem holding the download directory
    pub min_disk_gb: f64,

    /// Run the connectivity check at all
    pub connectivity_enabled: bool,

    /// URLs that must answer with a success status
    pub connectivity_urls: Vec<String>,

    /// Per-request timeout for connectivity checks
    pub connectivity_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// CPU, memory or disk usage above this percentage reports unhealthy
    pub resource_limit_percent: f32,

    /// How often the resource sampler refreshes
    pub sample_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub retries: u32,
    pub start_period_secs: u64,
    pub restart: RestartPolicy,

    /// Grace period between SIGTERM and SIGKILL when stopping the child
    pub stop_grace_secs: u64,

    /// Supervised program; empty runs `<self> entrypoint`
    pub command: Vec<String>,
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading variables through `lookup`
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let mut config = match lookup(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if default_path.exists() => Self::from_file(default_path)?,
            None => Config::default(),
        };

        config.apply_env(&lookup)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("STEAM_DOWNLOAD_PATH") {
            self.download_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("STEAMCMD_DIR") {
            self.steamcmd_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LOG_DIR") {
            self.log_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("CACHE_DIR") {
            self.cache_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("HOST") {
            self.host = val;
        }
        if let Some(val) = lookup("PORT") {
            self.port = val
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", val))?;
        }
        if let Some(val) = lookup("LOG_LEVEL") {
            self.log_level = val;
        }

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("host must not be empty");
        }
        if self.supervisor.retries == 0 {
            anyhow::bail!("supervisor.retries must be at least 1");
        }
        if self.supervisor.interval_secs == 0 || self.supervisor.timeout_secs == 0 {
            anyhow::bail!("supervisor interval and timeout must be non-zero");
        }
        if self.health.sample_interval_secs == 0 {
            anyhow::bail!("health.sample_interval_secs must be non-zero");
        }
        for raw in &self.preflight.connectivity_urls {
            let parsed = url::Url::parse(raw)
                .with_context(|| format!("Invalid connectivity URL: {}", raw))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Connectivity URL must be http or https: {}", raw);
            }
        }
        Ok(())
    }

    /// Address the HTTP service binds to, resolving `host` if it is a name
    pub async fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.host.trim();
        tokio::net::lookup_host((host, self.port))
            .await
            .with_context(|| format!("Failed to resolve HOST {}", host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("HOST {} did not resolve to any address", host))
    }

    /// URL a local probe should hit; wildcard binds are probed on loopback
    pub fn health_url(&self) -> String {
        let host = self.host.trim();
        let host = match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) if ip.is_unspecified() => "127.0.0.1".to_string(),
            Ok(IpAddr::V6(ip)) if ip.is_unspecified() => "[::1]".to_string(),
            Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
            Ok(IpAddr::V4(ip)) => ip.to_string(),
            Err(_) => host.to_string(),
        };
        format!("http://{}:{}/api/health", host, self.port)
    }

    /// Directories that must exist and be writable before the server starts
    pub fn required_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.download_dir.clone(),
            self.steamcmd_dir.clone(),
            self.log_dir.clone(),
            self.cache_dir.clone(),
        ]
    }

    /// `LOG_LEVEL` in a form `EnvFilter` accepts
    pub fn log_filter(&self) -> String {
        self.log_level.trim().to_lowercase()
    }
}

impl SupervisorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn start_period(&self) -> Duration {
        Duration::from_secs(self.start_period_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("/data/downloads"),
            steamcmd_dir: PathBuf::from("/app/steamcmd"),
            log_dir: PathBuf::from("/app/logs"),
            cache_dir: PathBuf::from("/app/cache"),
            host: String::from("0.0.0.0"),
            port: 7860,
            log_level: String::from("INFO"),
            stale_files: vec![PathBuf::from("/app/logging.py")],
            check_command: Vec::new(),
            server_command: Vec::new(),
            preflight: PreflightConfig::default(),
            health: HealthConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            min_memory_gb: 2.0,
            min_disk_gb: 10.0,
            connectivity_enabled: true,
            connectivity_urls: vec![
                String::from("https://store.steampowered.com"),
                String::from("https://steamcdn-a.akamaihd.net"),
            ],
            connectivity_timeout_secs: 5,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            resource_limit_percent: 95.0,
            sample_interval_secs: 5,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 10,
            retries: 3,
            start_period_secs: 40,
            restart: RestartPolicy::UnlessStopped,
            stop_grace_secs: 10,
            command: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::NamedTempFile;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    /// Environment without an explicit config path
    fn env_lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        lookup_from(vars)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.download_dir, PathBuf::from("/data/downloads"));
        assert_eq!(config.steamcmd_dir, PathBuf::from("/app/steamcmd"));
        assert_eq!(config.log_dir, PathBuf::from("/app/logs"));
        assert_eq!(config.cache_dir, PathBuf::from("/app/cache"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7860);
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.stale_files, vec![PathBuf::from("/app/logging.py")]);
        assert_eq!(config.supervisor.interval_secs, 30);
        assert_eq!(config.supervisor.timeout_secs, 10);
        assert_eq!(config.supervisor.retries, 3);
        assert_eq!(config.supervisor.start_period_secs, 40);
        assert_eq!(config.supervisor.restart, RestartPolicy::UnlessStopped);
    }

    #[test]
    fn test_required_dirs_order() {
        let config = Config::default();
        assert_eq!(
            config.required_dirs(),
            vec![
                PathBuf::from("/data/downloads"),
                PathBuf::from("/app/steamcmd"),
                PathBuf::from("/app/logs"),
                PathBuf::from("/app/cache"),
            ]
        );
    }

    #[test]
    fn test_load_missing_config_file() {
        let config = Config::load_with(env_lookup(&[])).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/data/downloads"));
        assert_eq!(config.port, 7860);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
download_dir = "/srv/games"
port = 9000
host = "127.0.0.1"
log_level = "debug"
stale_files = []
check_command = ["/bin/true"]

[preflight]
min_disk_gb = 50.0
connectivity_enabled = false

[supervisor]
retries = 5
restart = "on-failure"
"#;
        fs::write(temp_file.path(), config_content).unwrap();

        let config = Config::load_with(lookup_from(&[(
            CONFIG_PATH_VAR,
            temp_file.path().to_str().unwrap(),
        )]))
        .unwrap();

        assert_eq!(config.download_dir, PathBuf::from("/srv/games"));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_level, "debug");
        assert!(config.stale_files.is_empty());
        assert_eq!(config.check_command, vec!["/bin/true".to_string()]);
        assert_eq!(config.preflight.min_disk_gb, 50.0);
        assert_eq!(config.preflight.min_memory_gb, 2.0);
        assert!(!config.preflight.connectivity_enabled);
        assert_eq!(config.supervisor.retries, 5);
        assert_eq!(config.supervisor.restart, RestartPolicy::OnFailure);
        // Untouched keys keep their defaults
        assert_eq!(config.steamcmd_dir, PathBuf::from("/app/steamcmd"));
        assert_eq!(config.supervisor.interval_secs, 30);
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "port = 9000\n").unwrap();

        let config = Config::load_with(lookup_from(&[
            (CONFIG_PATH_VAR, temp_file.path().to_str().unwrap()),
            ("PORT", "7000"),
        ]))
        .unwrap();

        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_env_var_overrides() {
        let config = Config::load_with(env_lookup(&[
            ("STEAM_DOWNLOAD_PATH", "/mnt/steam"),
            ("STEAMCMD_DIR", "/opt/steamcmd"),
            ("LOG_DIR", "/var/log/steam"),
            ("CACHE_DIR", "/var/cache/steam"),
            ("HOST", "::1"),
            ("PORT", "8080"),
            ("LOG_LEVEL", "WARN"),
        ]))
        .unwrap();

        assert_eq!(config.download_dir, PathBuf::from("/mnt/steam"));
        assert_eq!(config.steamcmd_dir, PathBuf::from("/opt/steamcmd"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/steam"));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/steam"));
        assert_eq!(config.host, "::1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "WARN");
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = Config::load_with(env_lookup(&[("PORT", "seventy")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid PORT"));
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let result = Config::load_with(env_lookup(&[("HOST", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_missing_config_file_is_an_error() {
        let result = Config::load_with(lookup_from(&[(
            CONFIG_PATH_VAR,
            "/nonexistent/steam-downloader.toml",
        )]));

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/steam-downloader.toml"));
    }

    #[test]
    fn test_empty_config_path_uses_defaults() {
        let config = Config::load_with(lookup_from(&[(CONFIG_PATH_VAR, "")])).unwrap();
        assert_eq!(config.port, 7860);
    }

    #[tokio::test]
    async fn test_bind_addr_for_ip_literals() {
        let config = Config::default();
        assert_eq!(
            config.bind_addr().await.unwrap(),
            "0.0.0.0:7860".parse::<SocketAddr>().unwrap()
        );

        let config = Config::load_with(env_lookup(&[("HOST", "::1"), ("PORT", "8080")])).unwrap();
        assert_eq!(
            config.bind_addr().await.unwrap(),
            "[::1]:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_bind_addr_resolves_host_name() {
        let config = Config::load_with(env_lookup(&[("HOST", "localhost"), ("PORT", "9100")])).unwrap();

        let addr = config.bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback(), "localhost resolved to {}", addr);
        assert_eq!(addr.port(), 9100);
        assert_eq!(config.health_url(), "http://localhost:9100/api/health");
    }

    #[tokio::test]
    async fn test_bind_addr_unresolvable_host_fails() {
        let mut config = Config::default();
        config.host = "no-such-host.invalid".to_string();
        assert!(config.bind_addr().await.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = Config::default();
        config.supervisor.retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = Config::default();
        config.preflight.connectivity_urls = vec!["ftp://example.com".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_url_uses_loopback_for_wildcard() {
        let mut config = Config::default();
        assert_eq!(config.health_url(), "http://127.0.0.1:7860/api/health");

        config.host = "::".to_string();
        assert_eq!(config.health_url(), "http://[::1]:7860/api/health");

        config.host = "10.0.0.5".to_string();
        config.port = 9000;
        assert_eq!(config.health_url(), "http://10.0.0.5:9000/api/health");
    }
}
