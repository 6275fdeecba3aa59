use super::{emit, materialize_options, materializer};
use crate::errors::{CliError, CliResult};
use std::path::Path;
use toolhome_core::compile::{DEFAULT_LAUNCHER, resolve_classpath};
use toolhome_core::{CompilerConfig, Error, ProcessCompiler, Settings, materialize_and_compile};
use tracing::{Instrument, info};

pub async fn execute(settings: &Settings, force: bool, json: bool) -> CliResult<()> {
    let coordinate = settings.dist.coordinate()?;
    let main_class = settings.build.main_class.clone().ok_or_else(|| {
        CliError::missing_setting(
            "build.main-class",
            "Set build.main-class in toolhome.toml or pass --main-class",
        )
    })?;

    let cwd = std::env::current_dir()
        .map_err(|e| Error::io(e, Path::new("."), "read working directory"))?;
    let classpath = resolve_classpath(&cwd, &settings.build.classpath)?;
    let config = CompilerConfig::builder()
        .main_class(main_class)
        .os(settings.build.os)
        .arch(settings.build.arch)
        .classpath(classpath);
    let compiler = ProcessCompiler::new(
        settings
            .build
            .launcher
            .clone()
            .unwrap_or_else(|| DEFAULT_LAUNCHER.into()),
    );

    let span = crate::command_span!("build");
    let config = async {
        let materializer = materializer(settings)?;
        let options = materialize_options(settings, force);
        Ok::<_, CliError>(
            materialize_and_compile(&materializer, &coordinate, &options, config, &compiler)
                .await?,
        )
    }
    .instrument(span)
    .await?;

    info!(%coordinate, main_class = %config.main_class, "Build finished");
    emit(&config.home.display().to_string(), &config, json)
}
