//! Lineage Command-Line Tool
//!
//! Upgrades a document or a bundle of documents to the next schema version.

mod config;
mod error;
mod run;

use clap::Parser;
use config::Args;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lineage_cli=info,lineage_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.into_config();

    tracing::debug!(
        input = %config.input.display(),
        mappings = %config.mappings.display(),
        kind = %config.kind,
        "configuration loaded"
    );

    match run::run(config) {
        Ok(fingerprints) => {
            for line in fingerprints {
                eprintln!("{line}");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
