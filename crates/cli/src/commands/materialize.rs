use super::{emit, materialize_options, materializer};
use crate::errors::CliResult;
use toolhome_core::Settings;
use tracing::{Instrument, info};

pub async fn execute(settings: &Settings, force: bool, json: bool) -> CliResult<()> {
    let coordinate = settings.dist.coordinate()?;
    let span = crate::command_span!("materialize");
    let materialization = async {
        let materializer = materializer(settings)?;
        let options = materialize_options(settings, force);
        Ok::<_, crate::errors::CliError>(materializer.materialize(&coordinate, &options).await?)
    }
    .instrument(span)
    .await?;

    info!(
        %coordinate,
        path = ?materialization.path,
        reused = materialization.reused,
        repository = %materialization.artifact.repository,
        "Toolchain ready"
    );
    emit(
        &materialization.path.display().to_string(),
        &materialization,
        json,
    )
}
