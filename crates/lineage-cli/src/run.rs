//! Load, translate, write.

use crate::config::{CliConfig, InputKind};
use crate::error::CliError;
use lineage_core::{Bundle, Document, MappingSet, Migrator};
use std::fs;
use std::io::Write;
use tracing::{info, warn};

/// Run one migration as configured.
///
/// Returns the fingerprint lines when fingerprints were requested.
pub fn run(config: CliConfig) -> Result<Vec<String>, CliError> {
    let mappings = MappingSet::from_json(&read(&config.mappings)?)?;
    if mappings.source_version != config.migration.source_version
        || mappings.target_version != config.migration.target_version
    {
        warn!(
            mappings = %format!("{} -> {}", mappings.source_version, mappings.target_version),
            requested = %format!("{} -> {}", config.migration.source_version, config.migration.target_version),
            "mapping file is for a different version pair"
        );
    }
    let migrator = Migrator::new(config.migration.clone(), mappings.into());

    let input = read(&config.input)?;
    let (json, fingerprints) = match config.kind.document_kind() {
        None => {
            let bundle = migrator.translate_bundle(&Bundle::from_json(&input)?, None)?;
            let fingerprints = if config.fingerprint {
                bundle_fingerprints(&bundle)?
            } else {
                Vec::new()
            };
            (bundle.to_json_pretty()?, fingerprints)
        }
        Some(kind) => {
            let source = Document::from_json(&input)?;
            source.expect_kind(kind)?;
            let translated = migrator.translate(&source, None)?;
            let fingerprints = if config.fingerprint {
                vec![format!("{kind} {}", translated.fingerprint()?)]
            } else {
                Vec::new()
            };
            (serde_json::to_string_pretty(&translated)?, fingerprints)
        }
    };

    match &config.output {
        Some(path) => {
            fs::write(path, json.as_bytes()).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            info!(output = %path.display(), kind = %config.kind, "migration written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(fingerprints)
}

fn read(path: &std::path::Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn bundle_fingerprints(bundle: &Bundle) -> Result<Vec<String>, CliError> {
    let mut lines = Vec::new();
    for doc in bundle.documents() {
        lines.push(format!("{} {}", doc.kind, doc.fingerprint()?));
    }
    Ok(lines)
}
