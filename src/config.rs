//! Configuration management for slurm-rest-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use slurm_rest_exporter::schema::ApiVersion;
use slurm_rest_exporter::scrape::ScrapeOptions;
use slurm_rest_exporter::transport::ClientSettings;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9092;
pub const DEFAULT_API_URL: &str = "http://localhost:6820";
pub const DEFAULT_CACHE_TTL: u64 = 5;
pub const DEFAULT_SCRAPE_TIMEOUT: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    /// `host:port`, takes precedence over `bind`/`port`.
    #[serde(alias = "listen-address")]
    pub listen_address: Option<String>,

    // slurmrestd connection
    #[serde(alias = "api-url")]
    pub api_url: Option<String>,
    #[serde(alias = "api-user")]
    pub api_user: Option<String>,
    #[serde(alias = "api-token", skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(alias = "api-version")]
    pub api_version: Option<ApiVersion>,
    #[serde(alias = "request-timeout")]
    pub request_timeout: Option<u64>,

    // Scraping
    #[serde(alias = "cache-ttl")]
    pub cache_ttl: Option<u64>,
    #[serde(alias = "scrape-timeout")]
    pub scrape_timeout: Option<u64>,
    #[serde(alias = "enable-gpus", alias = "gpu_accounting")]
    pub enable_gpus: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            listen_address: None,
            api_url: Some(DEFAULT_API_URL.to_string()),
            api_user: None,
            api_token: None,
            api_version: Some(ApiVersion::default()),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            scrape_timeout: Some(DEFAULT_SCRAPE_TIMEOUT),
            enable_gpus: Some(false),
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let addr = match &self.listen_address {
            Some(addr) => addr.clone(),
            None => format!(
                "{}:{}",
                self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR),
                self.port.unwrap_or(DEFAULT_PORT)
            ),
        };
        addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address '{}': {}", addr, e).into())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_url: self
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_user: self.api_user.clone(),
            api_token: self.api_token.clone(),
            api_version: self.api_version.unwrap_or_default(),
            request_timeout: Duration::from_secs(
                self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            ),
        }
    }

    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            api_version: self.api_version.unwrap_or_default(),
            cache_ttl: Duration::from_secs(self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL)),
            scrape_timeout: Duration::from_secs(
                self.scrape_timeout.unwrap_or(DEFAULT_SCRAPE_TIMEOUT),
            ),
            enable_gpus: self.enable_gpus.unwrap_or(false),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.listen_addr()?;

    let url = cfg.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
    let is_http = url.starts_with("http://") || url.starts_with("https://");
    if url.starts_with("unix://") {
        if url.trim_start_matches("unix://").is_empty() {
            return Err("api_url uses unix:// but names no socket path".into());
        }
    } else if !is_http {
        return Err(format!(
            "Invalid api_url '{}', expected http://, https:// or unix://",
            url
        )
        .into());
    }

    // slurmrestd rejects unauthenticated requests over TCP
    if is_http {
        let has_user = cfg.api_user.as_deref().is_some_and(|u| !u.is_empty());
        let has_token = cfg.api_token.as_deref().is_some_and(|t| !t.is_empty());
        if !has_user {
            return Err("api_user is required for http(s) connections".into());
        }
        if !has_token {
            return Err("api_token is required for http(s) connections".into());
        }
    }

    if cfg.cache_ttl == Some(0) {
        return Err("cache_ttl must be at least 1 second".into());
    }
    if cfg.scrape_timeout == Some(0) {
        return Err("scrape_timeout must be at least 1 second".into());
    }
    if cfg.request_timeout == Some(0) {
        return Err("request_timeout must be at least 1 second".into());
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(addr) = &args.listen_address {
        config.listen_address = Some(addr.clone());
    }
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
        config.listen_address = None;
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
        config.listen_address = None;
    }

    if let Some(url) = &args.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(user) = &args.api_user {
        config.api_user = Some(user.clone());
    }
    if let Some(token) = &args.api_token {
        config.api_token = Some(token.clone());
    }
    if args.api_version.is_some() {
        config.api_version = args.api_version;
    }

    if let Some(cache_ttl) = args.cache_ttl {
        config.cache_ttl = Some(cache_ttl);
    }
    if let Some(timeout) = args.scrape_timeout {
        config.scrape_timeout = Some(timeout);
    }
    if let Some(enable_gpus) = args.enable_gpus {
        config.enable_gpus = Some(enable_gpus);
    }

    Ok(config)
}

/// Loads the config file, falling back to defaults when none exists.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/slurm-rest-exporter/config.yaml",
                "/etc/slurm-rest-exporter/config.yml",
                "/etc/slurm-rest-exporter/config.json",
                "./slurm-rest-exporter.yaml",
                "./slurm-rest-exporter.yml",
                "./slurm-rest-exporter.json",
            ];
            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format. The API token is never
/// included.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let redacted = Config {
        api_token: None,
        ..config.clone()
    };
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&redacted)?,
        ConfigFormat::Toml => toml::to_string_pretty(&redacted)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&redacted)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
