// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Netstats CLI
//!
//! Configuration tooling for the collector.
//!
//! # Usage
//!
//! ```bash
//! # Generate an example configuration
//! netstats gen-config --output netstats.toml
//!
//! # Validate a configuration
//! netstats validate --config netstats.toml
//!
//! # Validate and resolve every object against a MIB table
//! netstats validate --config netstats.toml --oids oids.txt
//! ```

use clap::{Parser, Subcommand};
use netstats::{AppConfig, MibTable};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Netstats SNMP collector
#[derive(Parser, Debug)]
#[command(name = "netstats")]
#[command(about = "Netstats - SNMP polling into batched time-series writes")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "netstats.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// MIB name table (`name oid` per line) used to resolve objects
        #[arg(long)]
        oids: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config, oids } => cmd_validate(config, oids),
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = AppConfig::example().to_toml_string()?;

    let content = format!(
        r#"# Netstats Configuration
# Generated by netstats gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(
    config_path: PathBuf,
    oids: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match AppConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };

    println!("Configuration valid!");
    println!();
    println!("Targets: {}", config.targets.len());
    for (name, target) in &config.targets {
        println!(
            "  [{}] {} host(s), frequency {}s",
            name,
            target.hosts.len(),
            target
                .frequency_secs
                .unwrap_or(config.defaults.frequency_secs)
        );
    }
    println!("Queries: {}", config.queries.len());
    println!("Senders: {}", config.senders.len());

    let Some(oids) = oids else {
        return Ok(());
    };

    let mib = MibTable::from_file(&oids)?;
    tracing::info!("Loaded {} MIB objects from {}", mib.len(), oids.display());
    match config.plan(&mib) {
        Ok(plan) => {
            println!();
            println!("Pollers: {}", plan.len());
            for planned in &plan {
                println!(
                    "  {} -> sender '{}' ({} oids)",
                    planned.poller.stats_key(),
                    planned.sender,
                    planned.poller.query.oids.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
