//! Artifact coordinates and repository descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// Identifier of a releasable unit: `group:name:packaging:version`.
///
/// Every component ends up in a filesystem path (repository layout and
/// unpack directory), so components are validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct ArtifactCoordinate {
    group: String,
    name: String,
    packaging: String,
    version: String,
}

impl ArtifactCoordinate {
    /// Create a coordinate from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinate`] if any part is empty or contains
    /// a path separator, `:` or `..`.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        packaging: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let coordinate = Self {
            group: group.into(),
            name: name.into(),
            packaging: packaging.into(),
            version: version.into(),
        };
        for (label, value) in [
            ("group", &coordinate.group),
            ("name", &coordinate.name),
            ("packaging", &coordinate.packaging),
            ("version", &coordinate.version),
        ] {
            validate_component(label, value).map_err(|reason| {
                Error::invalid_coordinate(coordinate.to_string(), reason)
            })?;
        }
        Ok(coordinate)
    }

    /// Parse from `group:name:packaging:version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinate`] if the string does not have four
    /// valid parts.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [group, name, packaging, version] = parts.as_slice() else {
            return Err(Error::invalid_coordinate(
                s,
                format!("expected 4 ':'-separated parts, found {}", parts.len()),
            ));
        };
        Self::new(*group, *name, *packaging, *version)
    }

    /// Group identifier (e.g. `org.example`).
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Artifact name (e.g. `dist`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packaging / file extension (e.g. `tar.gz`).
    #[must_use]
    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    /// Release version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Same artifact, different version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinate`] if the version is not valid.
    pub fn with_version(&self, version: impl Into<String>) -> Result<Self> {
        Self::new(
            self.group.clone(),
            self.name.clone(),
            self.packaging.clone(),
            version,
        )
    }

    /// File name of the artifact in a Maven-layout repository.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.name, self.version, self.packaging)
    }

    /// Relative path of the artifact in a Maven-layout repository.
    ///
    /// `org.example:dist:tar.gz:1.2.3` maps to
    /// `org/example/dist/1.2.3/dist-1.2.3.tar.gz`.
    #[must_use]
    pub fn repository_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.name);
        path.push(&self.version);
        path.push(self.file_name());
        path
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group, self.name, self.packaging, self.version
        )
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    group: String,
    name: String,
    packaging: String,
    version: String,
}

impl TryFrom<RawCoordinate> for ArtifactCoordinate {
    type Error = Error;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Self::new(raw.group, raw.name, raw.packaging, raw.version)
    }
}

fn validate_component(label: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} must not be empty"));
    }
    if value.contains([':', '/', '\\']) {
        return Err(format!("{label} must not contain ':', '/' or '\\'"));
    }
    if value.contains("..") {
        return Err(format!("{label} must not contain '..'"));
    }
    Ok(())
}

/// A remote repository an artifact may be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Short identifier used in logs and provenance (e.g. `central`).
    pub id: String,
    /// Base URL of a Maven-layout repository.
    pub url: String,
}

impl RemoteRepository {
    /// Create a repository descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Maven Central.
    #[must_use]
    pub fn central() -> Self {
        Self::new("central", "https://repo.maven.apache.org/maven2")
    }

    /// Full URL of a coordinate in this repository.
    #[must_use]
    pub fn artifact_url(&self, coordinate: &ArtifactCoordinate) -> String {
        let relative: Vec<String> = coordinate
            .repository_path()
            .iter()
            .map(|c| c.to_string_lossy().into_owned())
            .collect();
        format!("{}/{}", self.url.trim_end_matches('/'), relative.join("/"))
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}
