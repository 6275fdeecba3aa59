pub mod build;
pub mod config;
pub mod materialize;

use crate::cli::{Cli, Commands};
use crate::errors::{CliError, CliResult};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use toolhome_core::config::expand_home;
use toolhome_core::{ArtifactMaterializer, MaterializeOptions, Settings};
use toolhome_maven::{MavenResolver, default_local_repository};
use tracing::debug;

/// Run the parsed command line.
pub async fn execute(cli: Cli) -> CliResult<()> {
    let mut settings = load_settings(cli.config.as_deref(), Path::new("."))?;
    match cli.command {
        Commands::Materialize(args) => {
            args.dist.apply(&mut settings);
            materialize::execute(&settings, args.force, cli.json).await
        }
        Commands::Build(args) => {
            args.apply(&mut settings);
            build::execute(&settings, args.force, cli.json).await
        }
        Commands::Config(args) => {
            args.apply(&mut settings);
            config::execute(&settings)
        }
    }
}

/// Read `explicit`, else `dir/toolhome.toml` if present, else defaults.
pub fn load_settings(explicit: Option<&Path>, dir: &Path) -> CliResult<Settings> {
    let Some(path) = Settings::locate(explicit, dir) else {
        return Ok(Settings::default());
    };

    debug!(?path, "Loading settings");
    let src = std::fs::read_to_string(&path).map_err(|source| CliError::ConfigRead {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&src).map_err(|e| CliError::config_parse(&path, src.clone(), &e))
}

/// Materializer wired to the Maven resolver and the built-in unarchivers.
pub fn materializer(settings: &Settings) -> CliResult<ArtifactMaterializer> {
    let local = settings
        .resolver
        .local_repository()
        .or_else(default_local_repository)
        .ok_or_else(|| {
            CliError::missing_setting(
                "resolver.local-repository",
                "The home directory is unknown; pass --local-repository",
            )
        })?;
    let resolver = MavenResolver::new(local)?.offline(settings.resolver.offline);
    Ok(
        ArtifactMaterializer::new(Arc::new(resolver), toolhome_archive::default_registry())
            .with_repositories(settings.resolver.repositories.clone())
            .with_naming(settings.dist.naming.clone()),
    )
}

pub fn materialize_options(settings: &Settings, force: bool) -> MaterializeOptions {
    let options = MaterializeOptions::new().with_force(force);
    match &settings.dist.dir {
        Some(dir) => options.with_dist_dir(expand_home(dir)),
        None => options,
    }
}

/// Print a line, or `value` as JSON when `json` is set.
pub fn emit<T: Serialize>(line: &str, value: &T, json: bool) -> CliResult<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, value).map_err(CliError::output)?;
        writeln!(stdout).map_err(CliError::output)
    } else {
        writeln!(stdout, "{line}").map_err(CliError::output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use toolhome_core::config::CONFIG_FILE_NAME;

    #[test]
    fn test_load_settings_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings(None, temp.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_discovers_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[dist]\nversion = \"1.2.3\"\n",
        )
        .unwrap();
        let settings = load_settings(None, temp.path()).unwrap();
        assert_eq!(settings.dist.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let err = load_settings(Some(&missing), temp.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigRead { .. }));
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[dist]\nversoin = \"1\"\n").unwrap();
        let err = load_settings(Some(&path), temp.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
        assert!(err.to_string().contains("versoin"));
    }

    #[test]
    fn test_materialize_options_expand_dir() {
        let mut settings = Settings::default();
        assert!(materialize_options(&settings, false).dist_dir.is_none());

        settings.dist.dir = Some(PathBuf::from("/opt/toolchains"));
        let options = materialize_options(&settings, true);
        assert_eq!(options.dist_dir, Some(PathBuf::from("/opt/toolchains")));
        assert!(options.force);
    }

    #[test]
    fn test_materializer_uses_configured_repositories() {
        let temp = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.resolver.local_repository = Some(temp.path().to_path_buf());
        let materializer = materializer(&settings).unwrap();
        assert_eq!(materializer.repositories(), settings.resolver.repositories);
    }
}
