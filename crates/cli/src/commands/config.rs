use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use multibeacon_core::config::AppConfig;
use std::path::Path;

use super::utils::{print_error, print_info, print_success};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the effective configuration, including environment overrides
    Show,

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/config.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

const SAMPLE_CONFIG: &str = r#"# Multibeacon configuration

# Beacon nodes, tried in this order
[[upstreams.providers]]
name = "lighthouse"
address = "http://localhost:5052"
timeout_seconds = 10

[[upstreams.providers]]
name = "teku"
address = "http://localhost:5051"
timeout_seconds = 10

[dispatch]
# "sequential" tries one node at a time; "parallel" races up to max_parallel nodes
mode = "sequential"
max_parallel = 3

[http]
concurrent_limit = 256
max_retries = 2

[health_check]
enabled = true
interval_seconds = 30
probe_timeout_ms = 2000

[logging]
level = "info"
format = "pretty"
"#;

pub fn handle_config_command(command: ConfigCommands, file: &str) -> Result<()> {
    match command {
        ConfigCommands::Validate => validate_config(file),
        ConfigCommands::Show => show_config(file),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(file: &str) -> Result<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        bail!("File not found: {file}");
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = AppConfig::from_file(file).context("failed to load configuration")?;

    print_info("Validating configuration...");
    config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Upstreams: {} nodes", config.upstreams.providers.len());
    println!(
        "  Dispatch: {} (max {} in parallel)",
        config.dispatch.mode, config.dispatch.max_parallel
    );
    println!(
        "  Health check: {}",
        if config.health_check.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

fn show_config(file: &str) -> Result<()> {
    let config = AppConfig::from_file(file).context("failed to load configuration")?;

    println!("Configuration from {file}:");

    println!("\n[Upstreams] ({} nodes)", config.upstreams.providers.len());
    for provider in &config.upstreams.providers {
        println!(
            "  {}: {} (timeout {}s)",
            provider.name, provider.address, provider.timeout_seconds
        );
    }

    println!("\n[Dispatch]");
    println!("  Mode: {}", config.dispatch.mode);
    println!("  Max Parallel: {}", config.dispatch.max_parallel);

    println!("\n[HTTP]");
    println!("  Concurrent Limit: {}", config.http.concurrent_limit);
    println!("  Max Retries: {}", config.http.max_retries);

    println!("\n[Health Check]");
    println!("  Enabled: {}", config.health_check.enabled);
    println!("  Interval: {}s", config.health_check.interval_seconds);
    println!("  Probe Timeout: {}ms", config.health_check.probe_timeout_ms);

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

fn generate_config(output: &str, force: bool) -> Result<()> {
    if Path::new(output).exists() && !force {
        bail!("File {output} already exists. Use --force to overwrite.");
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Replace the sample addresses with your beacon nodes");

    Ok(())
}
