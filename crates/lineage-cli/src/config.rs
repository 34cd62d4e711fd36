//! Command-line configuration.

use clap::{Parser, ValueEnum};
use lineage_core::{DocumentKind, MigrationConfig};
use std::fmt;
use std::path::PathBuf;

/// Default source schema version.
pub const DEFAULT_SOURCE_VERSION: &str = "1.0.5";

/// Default target schema version.
pub const DEFAULT_TARGET_VERSION: &str = "2.0.0";

/// What the input file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    /// A bundle of related documents
    Bundle,
    /// A history document
    History,
    /// A standalone pipeline
    Pipeline,
    /// An execution log
    Log,
    /// A type registry
    Registry,
    /// A parameter mashup
    Mashup,
    /// A startup configuration
    Startup,
}

impl InputKind {
    /// Document kind of a single-document input; `None` for bundles.
    pub fn document_kind(&self) -> Option<DocumentKind> {
        match self {
            InputKind::Bundle => None,
            InputKind::History => Some(DocumentKind::History),
            InputKind::Pipeline => Some(DocumentKind::Pipeline),
            InputKind::Log => Some(DocumentKind::Log),
            InputKind::Registry => Some(DocumentKind::Registry),
            InputKind::Mashup => Some(DocumentKind::Mashup),
            InputKind::Startup => Some(DocumentKind::Startup),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document_kind() {
            Some(kind) => write!(f, "{kind}"),
            None => write!(f, "bundle"),
        }
    }
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Version mapping file (JSON).
    pub mappings: PathBuf,
    /// Input file (JSON).
    pub input: PathBuf,
    /// Output file; stdout when `None`.
    pub output: Option<PathBuf>,
    /// What the input holds.
    pub kind: InputKind,
    /// Print a content fingerprint of every translated document.
    pub fingerprint: bool,
    /// Engine configuration.
    pub migration: MigrationConfig,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(version, about = "Upgrade documents to the next schema version", long_about = None)]
pub struct Args {
    /// Version mapping file (JSON).
    #[arg(short, long)]
    pub mappings: PathBuf,

    /// Input document or bundle (JSON).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file; defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source schema version.
    #[arg(long, default_value = DEFAULT_SOURCE_VERSION)]
    pub from: String,

    /// Target schema version.
    #[arg(long, default_value = DEFAULT_TARGET_VERSION)]
    pub to: String,

    /// What the input holds.
    #[arg(short, long, default_value = "bundle", value_enum)]
    pub kind: InputKind,

    /// Print a content fingerprint of every translated document.
    #[arg(long)]
    pub fingerprint: bool,

    /// Kinds whose ids never cross document boundaries (repeatable).
    #[arg(long = "private-kind")]
    pub private_kinds: Vec<String>,
}

impl Args {
    /// Convert command-line arguments to CLI configuration.
    pub fn into_config(self) -> CliConfig {
        let mut migration = MigrationConfig::for_pair(self.from, self.to);
        if !self.private_kinds.is_empty() {
            migration = migration.with_private_kinds(self.private_kinds);
        }

        CliConfig {
            mappings: self.mappings,
            input: self.input,
            output: self.output,
            kind: self.kind,
            fingerprint: self.fingerprint,
            migration,
        }
    }
}
