use super::emit;
use crate::errors::CliResult;
use toolhome_core::Settings;

/// Print the settings after files and flags have been merged.
pub fn execute(settings: &Settings) -> CliResult<()> {
    let rendered = settings.to_toml_string()?;
    emit(rendered.trim_end(), settings, false)
}
