//! Maven-layout repository resolver for toolhome.
//!
//! Artifacts are looked up in a local repository (by default
//! `~/.m2/repository`) and, when missing, downloaded from the configured
//! remote repositories in order. Downloads are verified against a `.sha256`
//! sidecar when the repository publishes one and are written atomically, so
//! the local repository never holds a partial archive.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolhome_core::{
    ArtifactCoordinate, ArtifactResolver, Error, LOCAL_PROVENANCE, RemoteRepository,
    ResolvedArtifact, Result,
};
use tracing::{debug, info, warn};

/// Local repository used when none is configured, relative to the home directory.
pub const DEFAULT_LOCAL_REPOSITORY: &str = ".m2/repository";

/// `~/.m2/repository`, if the home directory is known.
#[must_use]
pub fn default_local_repository() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_LOCAL_REPOSITORY))
}

/// Why one remote repository could not supply an artifact.
#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("not found")]
    NotFound,
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("unable to store download: {0}")]
    Store(#[from] std::io::Error),
}

/// Resolves coordinates against a Maven-layout local repository and remotes.
#[derive(Debug, Clone)]
pub struct MavenResolver {
    local_repository: PathBuf,
    client: Client,
    offline: bool,
}

impl MavenResolver {
    /// Create a resolver backed by `local_repository`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(local_repository: impl Into<PathBuf>) -> Result<Self> {
        Self::with_timeout(local_repository, Duration::from_secs(300))
    }

    /// Create a resolver whose downloads give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn with_timeout(local_repository: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("toolhome/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            local_repository: local_repository.into(),
            client,
            offline: false,
        })
    }

    /// Only consult the local repository.
    #[must_use]
    pub const fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Root of the local repository.
    #[must_use]
    pub fn local_repository(&self) -> &Path {
        &self.local_repository
    }

    /// Where `coordinate` lives in the local repository.
    #[must_use]
    pub fn local_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.local_repository.join(coordinate.repository_path())
    }

    async fn fetch(
        &self,
        repository: &RemoteRepository,
        coordinate: &ArtifactCoordinate,
        dest: &Path,
    ) -> std::result::Result<(), FetchError> {
        let url = repository.artifact_url(coordinate);
        debug!(%url, repository = %repository.id, "Downloading artifact");

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            status if !status.is_success() => return Err(FetchError::Status(status)),
            _ => {}
        }
        let data = response.bytes().await?;

        let actual = format!("{:x}", Sha256::digest(&data));
        match self.expected_checksum(&url).await? {
            Some(expected) if expected != actual => {
                return Err(FetchError::ChecksumMismatch { expected, actual });
            }
            Some(_) => debug!(%url, sha256 = %actual, "Checksum verified"),
            None => debug!(%url, "No checksum published, skipping verification"),
        }

        store(&data, dest)?;
        info!(
            %coordinate,
            repository = %repository.id,
            bytes = data.len(),
            path = ?dest,
            "Downloaded artifact"
        );
        Ok(())
    }

    /// SHA-256 published next to `url`, if any.
    async fn expected_checksum(&self, url: &str) -> std::result::Result<Option<String>, FetchError> {
        let response = self.client.get(format!("{url}.sha256")).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let body = response.text().await?;
        Ok(body
            .split_whitespace()
            .next()
            .map(str::to_ascii_lowercase))
    }
}

/// Write `data` to `dest` through a sibling temp file.
fn store(data: &[u8], dest: &Path) -> std::io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| std::io::Error::other("destination has no parent directory"))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ArtifactResolver for MavenResolver {
    fn name(&self) -> &'static str {
        "maven"
    }

    async fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ResolvedArtifact> {
        let local = self.local_path(coordinate);
        if local.is_file() {
            debug!(%coordinate, path = ?local, "Found artifact in local repository");
            return Ok(ResolvedArtifact::new(
                coordinate.clone(),
                local,
                LOCAL_PROVENANCE,
            ));
        }

        if self.offline {
            return Err(Error::resolution(
                coordinate,
                format!(
                    "not in local repository ({}) and offline mode is enabled",
                    local.display()
                ),
            ));
        }
        if repositories.is_empty() {
            return Err(Error::resolution(
                coordinate,
                format!(
                    "not in local repository ({}) and no remote repositories are configured",
                    local.display()
                ),
            ));
        }

        let mut attempts = Vec::with_capacity(repositories.len());
        for repository in repositories {
            match self.fetch(repository, coordinate, &local).await {
                Ok(()) => {
                    return Ok(ResolvedArtifact::new(
                        coordinate.clone(),
                        local,
                        repository.id.clone(),
                    ));
                }
                Err(FetchError::NotFound) => {
                    debug!(%coordinate, repository = %repository.id, "Artifact not in repository");
                    attempts.push(format!("{}: not found", repository));
                }
                Err(e) => {
                    warn!(%coordinate, repository = %repository.id, error = %e, "Download failed");
                    attempts.push(format!("{}: {e}", repository));
                }
            }
        }

        Err(Error::resolution(
            coordinate,
            format!("tried {}", attempts.join("; ")),
        ))
    }
}
