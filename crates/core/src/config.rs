//! Settings loaded from `toolhome.toml`.
//!
//! Every section is optional; command-line flags are layered on top by the
//! CLI after loading. [`Settings::locate`] picks the file, the CLI parses it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::compile::{TargetArch, TargetOs};
use crate::coordinate::{ArtifactCoordinate, RemoteRepository};
use crate::materialize::SubdirNaming;
use crate::{Error, Result};

/// Default settings file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "toolhome.toml";

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Which toolchain bundle to materialize and where.
    #[serde(default)]
    pub dist: DistSettings,
    /// Where to find it.
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// What to compile with it.
    #[serde(default)]
    pub build: BuildSettings,
}

/// The toolchain bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DistSettings {
    /// Group identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Artifact name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Packaging, defaults to `tar.gz`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    /// Release to fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Base directory override for unpacking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Subdirectory naming scheme.
    #[serde(default)]
    pub naming: SubdirNaming,
}

/// Default packaging of toolchain bundles.
pub const DEFAULT_PACKAGING: &str = "tar.gz";

impl DistSettings {
    /// Build the coordinate described by these settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first missing field, or
    /// [`Error::InvalidCoordinate`] if a field is malformed.
    pub fn coordinate(&self) -> Result<ArtifactCoordinate> {
        let require = |field: &Option<String>, key: &str| {
            field
                .clone()
                .ok_or_else(|| Error::configuration(format!("dist.{key} is not set")))
        };
        ArtifactCoordinate::new(
            require(&self.group, "group")?,
            require(&self.name, "name")?,
            self.packaging
                .clone()
                .unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            require(&self.version, "version")?,
        )
    }

    /// Replace every field with the parts of `coordinate`.
    pub fn set_coordinate(&mut self, coordinate: &ArtifactCoordinate) {
        self.group = Some(coordinate.group().to_string());
        self.name = Some(coordinate.name().to_string());
        self.packaging = Some(coordinate.packaging().to_string());
        self.version = Some(coordinate.version().to_string());
    }
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverSettings {
    /// Local repository root; `~/` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<PathBuf>,
    /// Never touch the network.
    #[serde(default)]
    pub offline: bool,
    /// Remote repositories, tried in order.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<RemoteRepository>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            local_repository: None,
            offline: false,
            repositories: default_repositories(),
        }
    }
}

fn default_repositories() -> Vec<RemoteRepository> {
    vec![RemoteRepository::central()]
}

impl ResolverSettings {
    /// Local repository with `~/` expanded, if configured.
    #[must_use]
    pub fn local_repository(&self) -> Option<PathBuf> {
        self.local_repository.as_deref().map(expand_home)
    }
}

/// Compiler invocation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildSettings {
    /// Class whose `main` starts the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    /// Target operating system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<TargetOs>,
    /// Target architecture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<TargetArch>,
    /// Runtime classpath, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classpath: Vec<PathBuf>,
    /// Compiler launcher, relative to the toolchain home unless absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher: Option<PathBuf>,
}

impl Settings {
    /// The settings file to read: `explicit` if given, else
    /// `dir/toolhome.toml` when it exists.
    ///
    /// `None` means defaults apply. Parsing is left to the caller so parse
    /// errors can point into the source text.
    #[must_use]
    pub fn locate(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Some(path)
        } else {
            debug!(?path, "No settings file, using defaults");
            None
        }
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("Unable to render settings: {e}")))
    }
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Settings {
        toml::from_str(content).unwrap()
    }

    const FULL: &str = r#"
[dist]
group = "org.example"
name = "dist"
version = "1.2.3"
dir = "/opt/toolchains"
naming = { versioned = { prefix = "example" } }

[resolver]
local-repository = "/var/m2"
offline = true

[[resolver.repositories]]
id = "internal"
url = "https://repo.example.com/maven2"

[build]
main-class = "com.example.Main"
os = "ios"
arch = "thumbv7"
classpath = ["target/classes", "lib/a.jar"]
"#;

    #[test]
    fn test_full_settings() {
        let settings = parse(FULL);

        let coordinate = settings.dist.coordinate().unwrap();
        assert_eq!(coordinate.to_string(), "org.example:dist:tar.gz:1.2.3");
        assert_eq!(settings.dist.dir, Some(PathBuf::from("/opt/toolchains")));
        assert_eq!(settings.dist.naming, SubdirNaming::versioned("example"));

        assert!(settings.resolver.offline);
        assert_eq!(
            settings.resolver.local_repository(),
            Some(PathBuf::from("/var/m2"))
        );
        assert_eq!(settings.resolver.repositories.len(), 1);
        assert_eq!(settings.resolver.repositories[0].id, "internal");

        assert_eq!(settings.build.main_class.as_deref(), Some("com.example.Main"));
        assert_eq!(settings.build.os, Some(TargetOs::Ios));
        assert_eq!(settings.build.arch, Some(TargetArch::Thumbv7));
        assert_eq!(settings.build.classpath.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let settings = parse("");
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.resolver.repositories,
            vec![RemoteRepository::central()]
        );
        assert_eq!(settings.dist.naming, SubdirNaming::Qualified);
        assert!(!settings.resolver.offline);
    }

    #[test]
    fn test_missing_version_is_reported() {
        let settings = parse(
            r#"
[dist]
group = "org.example"
name = "dist"
"#,
        );
        let err = settings.dist.coordinate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: dist.version is not set");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = toml::from_str::<Settings>("[dist]\nversoin = \"1\"\n").unwrap_err();
        assert!(err.to_string().contains("versoin"));
    }

    #[test]
    fn test_set_coordinate() {
        let mut dist = DistSettings::default();
        dist.set_coordinate(&ArtifactCoordinate::parse("g:n:zip:9").unwrap());
        assert_eq!(dist.coordinate().unwrap().to_string(), "g:n:zip:9");
    }

    #[test]
    fn test_locate_without_file() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Settings::locate(None, temp.path()), None);
    }

    #[test]
    fn test_locate_finds_file_in_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), FULL).unwrap();
        assert_eq!(
            Settings::locate(None, temp.path()),
            Some(temp.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), FULL).unwrap();
        let explicit = Path::new("/nonexistent/other.toml");
        assert_eq!(
            Settings::locate(Some(explicit), temp.path()),
            Some(explicit.to_path_buf())
        );
    }

    #[test]
    fn test_toml_rendering_roundtrips() {
        let settings = parse(FULL);
        let rendered = settings.to_toml_string().unwrap();
        assert_eq!(parse(&rendered), settings);
    }

    #[test]
    fn test_expand_home() {
        temp_env::with_var("HOME", Some("/home/builder"), || {
            assert_eq!(
                expand_home(Path::new("~/.m2/repository")),
                PathBuf::from("/home/builder/.m2/repository")
            );
        });
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }
}
