//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("slurm-rest-exporter.yaml"));

    let mut content = render_config(&config, format.clone())?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Slurm REST Exporter Configuration
# ==================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9092                   # HTTP port
# listen_address: null         # host:port, overrides bind/port
#
# slurmrestd Connection
# ---------------------
# api_url: "http://localhost:6820"  # http://, https:// or unix:///path/to/socket
# api_user: null               # Sent as X-SLURM-USER-NAME (required for http/https)
# api_token: null              # Sent as X-SLURM-USER-TOKEN (required for http/https);
#                              # prefer SLURM_EXPORTER_API_TOKEN over the file
# api_version: "v0.0.42"       # v0.0.40 (23.11), v0.0.41 (24.05), v0.0.42 (24.11)
# request_timeout: 10          # Per-request timeout in seconds
#
# Scraping
# --------
# cache_ttl: 5                 # Seconds a fetched payload stays fresh
# scrape_timeout: 30           # Upper bound for fetching all resources
# enable_gpus: false           # Export slurm_gpus_* from node TRES
"#;

    format!("{comments}\n{yaml}")
}
