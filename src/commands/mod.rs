//! CLI command implementations for slurm-rest-exporter.
//!
//! - `check`: Configuration and slurmrestd connectivity validation
//! - `config`: Configuration file generation
//! - `test`: One-shot scrapes against slurmrestd

pub mod check;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use test::command_test;
