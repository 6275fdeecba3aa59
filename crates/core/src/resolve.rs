//! Artifact resolution collaborator.
//!
//! A resolver turns an [`ArtifactCoordinate`] into a file on local disk,
//! fetching it from one of the candidate remote repositories if needed. The
//! resolver owns retry, timeout and caching policy; the materializer only
//! consumes the resulting path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::Result;
use crate::coordinate::{ArtifactCoordinate, RemoteRepository};

/// Provenance value for artifacts that were already in the local repository.
pub const LOCAL_PROVENANCE: &str = "local";

/// An artifact that has been resolved to a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    /// The coordinate that was requested.
    pub coordinate: ArtifactCoordinate,
    /// Local file holding the artifact.
    pub path: PathBuf,
    /// Where the file came from: [`LOCAL_PROVENANCE`] or a remote repository id.
    pub repository: String,
}

impl ResolvedArtifact {
    /// Create a resolved artifact.
    #[must_use]
    pub fn new(
        coordinate: ArtifactCoordinate,
        path: impl Into<PathBuf>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            coordinate,
            path: path.into(),
            repository: repository.into(),
        }
    }

    /// Whether the artifact was found locally without touching the network.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.repository == LOCAL_PROVENANCE
    }
}

/// Resolves artifact coordinates to local files.
///
/// # Example
///
/// ```ignore
/// pub struct MavenResolver { /* ... */ }
///
/// #[async_trait]
/// impl ArtifactResolver for MavenResolver {
///     fn name(&self) -> &'static str { "maven" }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Resolver name for logs (e.g. "maven").
    fn name(&self) -> &'static str;

    /// Resolve `coordinate` to a local file, consulting `repositories` in order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Resolution`] if the artifact cannot be found or
    /// downloaded.
    async fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ResolvedArtifact>;
}
