//! Check command implementation.
//!
//! Validates the configuration, then fetches and parses every resource once.

use anyhow::{bail, Context};

use slurm_rest_exporter::resource::Resource;
use slurm_rest_exporter::schema::ApiVersion;
use slurm_rest_exporter::transport::{Fetcher, SlurmClient};

use crate::config::{validate_effective_config, Config};

/// Number of canonical records a payload parsed into.
fn parse_count(version: ApiVersion, resource: Resource, body: &[u8]) -> anyhow::Result<usize> {
    let count = match resource {
        Resource::Jobs => version.parse_jobs(body)?.jobs.len(),
        Resource::Nodes => version.parse_nodes(body)?.nodes.len(),
        Resource::Partitions => version.parse_partitions(body)?.partitions.len(),
        Resource::Diag => {
            version.parse_diag(body)?;
            1
        }
        Resource::Shares => version.parse_shares(body)?.shares.len(),
    };
    Ok(count)
}

/// Validates configuration and slurmrestd connectivity.
pub async fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 Slurm REST Exporter - Check");
    println!("==============================");

    println!("\n⚙️  Checking configuration...");
    if let Err(e) = validate_effective_config(config) {
        bail!("Configuration invalid: {}", e);
    }
    println!("   ✅ Configuration is valid");

    let settings = config.client_settings();
    let version = settings.api_version;
    let client = SlurmClient::new(&settings).context("Failed to build slurmrestd client")?;

    println!(
        "\n🔌 Querying {} (API {}, Slurm {})...",
        settings.api_url,
        version,
        version.slurm_release()
    );

    let mut all_ok = true;
    for resource in Resource::ALL {
        match client.fetch(resource).await {
            Ok(body) => match parse_count(version, resource, &body) {
                Ok(count) => println!(
                    "   ✅ {:<11} {:>8} bytes, {} records",
                    resource,
                    body.len(),
                    count
                ),
                Err(e) => {
                    println!("   ❌ {:<11} parse failed: {}", resource, e);
                    all_ok = false;
                }
            },
            Err(e) => {
                println!("   ❌ {:<11} {}", resource, e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - exporter is ready");
        Ok(())
    } else {
        bail!("Some checks failed - please review the output above")
    }
}
