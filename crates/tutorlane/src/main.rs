// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tutorlane - slot booking and payment reconciliation for a tutoring
//! marketplace.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// Tutorlane - slot booking and payment reconciliation.
#[derive(Parser, Debug)]
#[command(name = "tutorlane", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway, event dispatcher and missed-class sweep.
    Serve,
    /// Mark missed classes once and exit.
    Sweep,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Print the effective configuration with credentials redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tutorlane_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tutorlane_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            serve::init_tracing(&config.server.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Sweep) => {
            serve::init_tracing(&config.server.log_level);
            serve::run_sweep(config).await.map(|count| {
                println!("tutorlane sweep: {count} booking(s) marked unattended");
            })
        }
        Some(Commands::Migrate) => {
            serve::init_tracing(&config.server.log_level);
            serve::run_migrate(config).await
        }
        Some(Commands::Config) => match tutorlane_config::render_redacted(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => {
                tutorlane_config::render_errors(&[e]);
                std::process::exit(1);
            }
        },
        None => {
            println!("tutorlane: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("tutorlane: {e}");
        std::process::exit(1);
    }
}
