//! CLI error types rendered through miette.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error types with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Errors from resolution, materialization and compilation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] toolhome_core::Error),

    #[error("Invalid settings file {}: {message}", path.display())]
    #[diagnostic(code(toolhome::cli::config_parse_error))]
    ConfigParse {
        path: PathBuf,
        #[source_code]
        src: NamedSource<String>,
        #[label("error occurred here")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("Unable to read settings file {}", path.display())]
    #[diagnostic(
        code(toolhome::cli::config_read_error),
        help("Pass an existing file to --config or omit it to use ./toolhome.toml")
    )]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing setting: {setting}")]
    #[diagnostic(code(toolhome::cli::missing_setting))]
    MissingSetting {
        setting: String,
        #[help]
        help: String,
    },

    #[error("Failed to write command output")]
    #[diagnostic(code(toolhome::cli::output_error))]
    Output {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CliError {
    pub fn config_parse(path: impl Into<PathBuf>, src: String, error: &toml::de::Error) -> Self {
        let path = path.into();
        Self::ConfigParse {
            span: error.span().map(SourceSpan::from),
            src: NamedSource::new(path.display().to_string(), src),
            message: error.message().to_string(),
            path,
        }
    }

    pub fn missing_setting(setting: impl Into<String>, help: impl Into<String>) -> Self {
        Self::MissingSetting {
            setting: setting.into(),
            help: help.into(),
        }
    }

    pub fn output(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Output {
            source: source.into(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
