//! Idempotent materialization of versioned artifacts.
//!
//! An artifact is resolved to a local archive and unpacked into
//! `<base>/<subdir>`, where `<base>` is either an explicit override or the
//! `unpacked` directory next to the archive, and `<subdir>` is derived from
//! the coordinate.
//!
//! Layout after a successful run:
//! ```text
//! <base>/
//! ├── .org.example.dist-tar.gz-1.2.3.lock   # advisory lock, left in place
//! └── org.example.dist-tar.gz-1.2.3/
//!     ├── .toolhome-complete                # completion marker (JSON)
//!     └── ...                               # archive contents
//! ```
//!
//! Extraction happens in a temporary sibling directory which is renamed into
//! place only after the marker has been written, so a directory with a marker
//! is always complete. A target directory without a marker is treated as the
//! leftover of an interrupted run and replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::coordinate::{ArtifactCoordinate, RemoteRepository};
use crate::extract::{Unarchiver, UnarchiverRegistry};
use crate::lock::DirectoryLock;
use crate::resolve::{ArtifactResolver, ResolvedArtifact};
use crate::{Error, Result};

/// File written into a target directory once it is fully populated.
pub const COMPLETION_MARKER: &str = ".toolhome-complete";

/// Directory created next to a resolved archive when no override is given.
pub const DEFAULT_UNPACK_DIR: &str = "unpacked";

/// How the versioned subdirectory name is derived from a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubdirNaming {
    /// `{group}.{name}-{packaging}-{version}`, unique per coordinate.
    #[default]
    Qualified,
    /// `{prefix}-{version}`. Artifacts sharing a version share a directory,
    /// so this is only safe when a base directory holds one artifact family.
    Versioned {
        /// Fixed prefix, typically the product name.
        prefix: String,
    },
}

impl SubdirNaming {
    /// Version-only naming with the given prefix.
    #[must_use]
    pub fn versioned(prefix: impl Into<String>) -> Self {
        Self::Versioned {
            prefix: prefix.into(),
        }
    }

    /// Subdirectory name for `coordinate`.
    #[must_use]
    pub fn subdir_name(&self, coordinate: &ArtifactCoordinate) -> String {
        match self {
            Self::Qualified => format!(
                "{}.{}-{}-{}",
                coordinate.group(),
                coordinate.name(),
                coordinate.packaging(),
                coordinate.version()
            ),
            Self::Versioned { prefix } => format!("{}-{}", prefix, coordinate.version()),
        }
    }
}

/// Where an artifact gets unpacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializationTarget {
    /// Directory holding one subdirectory per materialized artifact.
    pub base_dir: PathBuf,
    /// Name of this artifact's subdirectory.
    pub subdir: String,
}

impl MaterializationTarget {
    /// Compute the target for a resolved artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] if no override is given and the
    /// artifact path has no parent directory.
    pub fn compute(
        artifact: &ResolvedArtifact,
        dist_dir: Option<&Path>,
        naming: &SubdirNaming,
    ) -> Result<Self> {
        let base_dir = match dist_dir {
            Some(dir) => dir.to_path_buf(),
            None => artifact
                .path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.join(DEFAULT_UNPACK_DIR))
                .ok_or_else(|| {
                    Error::extraction(
                        &artifact.path,
                        "resolved artifact has no parent directory to unpack next to",
                    )
                })?,
        };
        Ok(Self {
            base_dir,
            subdir: naming.subdir_name(&artifact.coordinate),
        })
    }

    /// Final directory: `base_dir/subdir`.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.subdir)
    }

    /// Lock file serialising materializations of this target.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(format!(".{}.lock", self.subdir))
    }

    /// Whether the target holds a completed materialization.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.path().join(COMPLETION_MARKER).is_file()
    }
}

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    /// Coordinate that was unpacked.
    pub coordinate: ArtifactCoordinate,
    /// Provenance of the archive.
    pub repository: String,
    /// When extraction finished.
    pub materialized_at: DateTime<Utc>,
}

impl CompletionMarker {
    fn for_artifact(artifact: &ResolvedArtifact) -> Self {
        Self {
            coordinate: artifact.coordinate.clone(),
            repository: artifact.repository.clone(),
            materialized_at: Utc::now(),
        }
    }

    /// Read the marker of a materialized directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the marker is missing or unreadable and
    /// [`Error::Configuration`] if it is not valid JSON.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(COMPLETION_MARKER);
        let content = fs::read(&path).map_err(|e| Error::io(e, &path, "read marker"))?;
        serde_json::from_slice(&content).map_err(|e| {
            Error::configuration(format!("Malformed marker {}: {e}", path.display()))
        })
    }

    fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(COMPLETION_MARKER);
        let content = serde_json::to_vec_pretty(self).map_err(|e| {
            Error::extraction_with_source(&path, "unable to serialize completion marker", e)
        })?;
        fs::write(&path, content)
            .map_err(|e| Error::extraction_with_source(&path, "unable to write completion marker", e))
    }
}

/// Options for a single materialization.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Base directory override.
    pub dist_dir: Option<PathBuf>,
    /// Re-extract even if a completed materialization exists.
    pub force: bool,
}

impl MaterializeOptions {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base directory override.
    #[must_use]
    pub fn with_dist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = Some(dir.into());
        self
    }

    /// Set force re-extraction.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Result of a materialization.
#[derive(Debug, Clone, Serialize)]
pub struct Materialization {
    /// Directory holding the unpacked artifact.
    pub path: PathBuf,
    /// The archive it was unpacked from.
    pub artifact: ResolvedArtifact,
    /// True if an earlier materialization was reused.
    pub reused: bool,
}

/// Resolves artifacts and unpacks each version at most once per target.
pub struct ArtifactMaterializer {
    resolver: Arc<dyn ArtifactResolver>,
    unarchivers: UnarchiverRegistry,
    repositories: Vec<RemoteRepository>,
    naming: SubdirNaming,
}

impl ArtifactMaterializer {
    /// Create a materializer with no remote repositories and qualified naming.
    #[must_use]
    pub fn new(resolver: Arc<dyn ArtifactResolver>, unarchivers: UnarchiverRegistry) -> Self {
        Self {
            resolver,
            unarchivers,
            repositories: Vec::new(),
            naming: SubdirNaming::default(),
        }
    }

    /// Set the remote repositories handed to the resolver.
    #[must_use]
    pub fn with_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.repositories = repositories;
        self
    }

    /// Set the subdirectory naming scheme.
    #[must_use]
    pub fn with_naming(mut self, naming: SubdirNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Remote repositories handed to the resolver.
    #[must_use]
    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    /// Resolve `coordinate` and make sure it is unpacked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if the resolver fails, in which case the
    /// filesystem is left untouched, and [`Error::Extraction`] if the target
    /// cannot be created, no unarchiver accepts the archive or unpacking
    /// fails.
    pub async fn materialize(
        &self,
        coordinate: &ArtifactCoordinate,
        options: &MaterializeOptions,
    ) -> Result<Materialization> {
        debug!(
            %coordinate,
            resolver = self.resolver.name(),
            repositories = ?self.repositories.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            "Resolving artifact"
        );
        let artifact = self.resolver.resolve(coordinate, &self.repositories).await?;
        debug!(
            %coordinate,
            path = ?artifact.path,
            repository = %artifact.repository,
            "Resolved artifact"
        );

        let target =
            MaterializationTarget::compute(&artifact, options.dist_dir.as_deref(), &self.naming)?;
        let dir = target.path();

        if !options.force && target.is_complete() {
            info!(%coordinate, path = ?dir, "Using existing materialized artifact");
            return Ok(Materialization {
                path: dir,
                artifact,
                reused: true,
            });
        }

        let unarchiver = self
            .unarchivers
            .find_for(&artifact.path)
            .cloned()
            .ok_or_else(|| {
                Error::extraction(
                    &artifact.path,
                    format!(
                        "no unarchiver for this archive format (known: {})",
                        self.unarchivers.names().join(", ")
                    ),
                )
            })?;

        info!(
            %coordinate,
            base = ?target.base_dir,
            unarchiver = unarchiver.name(),
            "Extracting artifact"
        );

        let job = ExtractJob {
            target: target.clone(),
            archive: artifact.path.clone(),
            marker: CompletionMarker::for_artifact(&artifact),
            force: options.force,
        };
        let reused = tokio::task::spawn_blocking(move || job.run(unarchiver.as_ref()))
            .await
            .map_err(|e| Error::extraction_with_source(&dir, "extraction task failed", e))??;

        debug!(%coordinate, path = ?dir, reused, "Artifact materialized");
        Ok(Materialization {
            path: dir,
            artifact,
            reused,
        })
    }
}

impl std::fmt::Debug for ArtifactMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactMaterializer")
            .field("resolver", &self.resolver.name())
            .field("unarchivers", &self.unarchivers)
            .field("repositories", &self.repositories)
            .field("naming", &self.naming)
            .finish()
    }
}

/// Blocking half of a materialization, run under the target lock.
struct ExtractJob {
    target: MaterializationTarget,
    archive: PathBuf,
    marker: CompletionMarker,
    force: bool,
}

impl ExtractJob {
    /// Returns true if a concurrent run completed the target first.
    fn run(self, unarchiver: &dyn Unarchiver) -> Result<bool> {
        let base = &self.target.base_dir;
        fs::create_dir_all(base).map_err(|e| {
            Error::extraction_with_source(base, "unable to create base directory", e)
        })?;

        let _lock = DirectoryLock::acquire(&self.target.lock_path())?;

        let dir = self.target.path();
        if !self.force && self.target.is_complete() {
            debug!(path = ?dir, "Target completed while waiting for lock");
            return Ok(true);
        }
        if dir.exists() {
            if self.force {
                debug!(path = ?dir, "Removing previous materialization");
            } else {
                warn!(path = ?dir, "Removing incomplete materialization");
            }
            fs::remove_dir_all(&dir).map_err(|e| {
                Error::extraction_with_source(&dir, "unable to remove stale directory", e)
            })?;
        }

        // Same parent as the target so the final rename stays on one filesystem
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.target.subdir))
            .suffix(".tmp")
            .tempdir_in(base)
            .map_err(|e| {
                Error::extraction_with_source(base, "unable to create staging directory", e)
            })?;

        unarchiver.extract(&self.archive, staging.path())?;

        let wrappers = wrapper_names(&self.marker.coordinate, &self.target.subdir);
        let root = bundle_root(staging.path(), &wrappers)?;
        self.marker.write(&root)?;
        fs::rename(&root, &dir).map_err(|e| {
            Error::extraction_with_source(&dir, "unable to move extracted files into place", e)
        })?;

        Ok(false)
    }
}

/// Top-level directory names treated as a wrapper around the bundle.
///
/// `{name}-{version}` is the usual release layout; the target's own name
/// covers archives wrapped in their `Versioned` directory (`{prefix}-{version}`).
fn wrapper_names(coordinate: &ArtifactCoordinate, subdir: &str) -> Vec<String> {
    let mut names = vec![format!("{}-{}", coordinate.name(), coordinate.version())];
    if !names.iter().any(|n| n == subdir) {
        names.push(subdir.to_string());
    }
    names
}

/// The directory that becomes the target.
///
/// An archive whose only entry is a wrapper directory (`dist-1.2.3/...`) has
/// that directory used as the root. Anything else, including a single
/// directory with another name such as `bin/`, is taken as is.
fn bundle_root(staging: &Path, wrappers: &[String]) -> Result<PathBuf> {
    let entries = fs::read_dir(staging)
        .and_then(|rd| rd.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| {
            Error::extraction_with_source(staging, "unable to list extracted files", e)
        })?;

    if let [only] = entries.as_slice()
        && only.file_type().is_ok_and(|t| t.is_dir())
        && wrappers.iter().any(|w| only.file_name() == w.as_str())
    {
        return Ok(only.path());
    }
    Ok(staging.to_path_buf())
}
