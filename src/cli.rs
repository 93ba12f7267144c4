//! CLI arguments and subcommands for slurm-rest-exporter.
//!
//! Every connection setting can also come from the environment, which is
//! how the exporter is usually configured under systemd.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use slurm_rest_exporter::schema::ApiVersion;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "slurm-rest-exporter",
    about = "Prometheus exporter for Slurm clusters via slurmrestd",
    long_about = "Prometheus exporter for Slurm clusters via slurmrestd.\n\n\
                  Polls the slurmrestd REST API for jobs, nodes, partitions, scheduler \
                  diagnostics and fair-share data, and exposes cluster, partition, node, \
                  account and user level metrics.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// slurmrestd base URL (http://, https:// or unix:///path/to/socket)
    #[arg(long, env = "SLURM_EXPORTER_API_URL")]
    pub api_url: Option<String>,

    /// Slurm user name sent as X-SLURM-USER-NAME
    #[arg(long, env = "SLURM_EXPORTER_API_USER")]
    pub api_user: Option<String>,

    /// JWT sent as X-SLURM-USER-TOKEN
    #[arg(long, env = "SLURM_EXPORTER_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// slurmrestd API version (v0.0.40, v0.0.41, v0.0.42 or a Slurm release like 24.05)
    #[arg(long, env = "SLURM_EXPORTER_API_VERSION")]
    pub api_version: Option<ApiVersion>,

    /// Listen address as host:port
    #[arg(long, env = "SLURM_EXPORTER_LISTEN_ADDRESS", conflicts_with_all = ["port", "bind"])]
    pub listen_address: Option<String>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Seconds a fetched payload stays fresh
    #[arg(long, env = "SLURM_EXPORTER_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Upper bound in seconds for fetching all resources of one scrape
    #[arg(long)]
    pub scrape_timeout: Option<u64>,

    /// Export GPU metrics from node TRES
    #[arg(long, env = "SLURM_EXPORTER_GPU_ACCOUNTING")]
    pub enable_gpus: Option<bool>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and slurmrestd connectivity
    Check,

    /// Generate a configuration file
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments
        #[arg(long)]
        commented: bool,
    },

    /// Run scrapes against slurmrestd and print the result
    Test {
        /// Number of scrapes
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print the full metrics exposition after the last scrape
        #[arg(long)]
        verbose: bool,
    },
}
