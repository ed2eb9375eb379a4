//! Error types for the Drift CLI.

use std::{io, ops::Range, path::PathBuf};

use thiserror::Error;

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// A graph file that could not be turned into a node/link snapshot.
///
/// Carries the file contents so the offending span can be shown.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GraphFileError {
    pub message: String,
    pub span: Option<Range<usize>>,
    pub help: Option<String>,
    pub src: String,
}

impl GraphFileError {
    pub fn new(message: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            help: None,
            src: src.into(),
        }
    }

    pub fn with_span(mut self, span: Option<Range<usize>>) -> Self {
        self.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// The main error type of the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Graph(#[from] GraphFileError),

    #[error("Layout error: {0}")]
    Layout(#[from] drift::Error),

    #[error("Export error: {0}")]
    Export(String),
}
