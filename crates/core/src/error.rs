//! Error types for toolchain materialization.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for toolhome operations.
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving, materializing or compiling.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The artifact could not be resolved to a local file.
    #[error("Failed to resolve artifact {coordinate}: {message}")]
    #[diagnostic(
        code(toolhome::resolution_failed),
        help("Check the repository list, network access and that the version exists")
    )]
    Resolution {
        /// The coordinate that was requested.
        coordinate: String,
        /// What went wrong.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxedSource>,
    },

    /// The artifact could not be unpacked into its target directory.
    #[error("Failed to extract into {}: {message}", path.display())]
    #[diagnostic(
        code(toolhome::extraction_failed),
        help("Check permissions and free space of the target directory, or pass a different --dist-dir")
    )]
    Extraction {
        /// The directory or archive involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A coordinate string or component is malformed.
    #[error("Invalid artifact coordinate '{input}': {reason}")]
    #[diagnostic(
        code(toolhome::invalid_coordinate),
        help("Coordinates are written as group:name:packaging:version")
    )]
    InvalidCoordinate {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Settings or compiler configuration are incomplete or malformed.
    #[error("Configuration error: {0}")]
    #[diagnostic(code(toolhome::configuration))]
    Configuration(String),

    /// The external compiler failed.
    #[error("Compilation failed: {message}")]
    #[diagnostic(code(toolhome::compile_failed))]
    Compile {
        /// What went wrong.
        message: String,
        /// Captured standard error of the compiler, if it ran.
        stderr: Option<String>,
    },

    /// I/O error outside of extraction.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(toolhome::io_error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },
}

impl Error {
    /// Create a resolution error without an underlying cause.
    #[must_use]
    pub fn resolution(coordinate: impl ToString, message: impl Into<String>) -> Self {
        Self::Resolution {
            coordinate: coordinate.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a resolution error carrying its cause.
    #[must_use]
    pub fn resolution_with_source(
        coordinate: impl ToString,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Resolution {
            coordinate: coordinate.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an extraction error without an underlying cause.
    #[must_use]
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an extraction error carrying its cause.
    #[must_use]
    pub fn extraction_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an invalid coordinate error.
    #[must_use]
    pub fn invalid_coordinate(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(source: std::io::Error, path: &Path, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.to_path_buf()),
            operation: operation.into(),
        }
    }

    /// Whether this error came from the resolution step.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }

    /// Whether this error came from the extraction step.
    #[must_use]
    pub const fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }
}
