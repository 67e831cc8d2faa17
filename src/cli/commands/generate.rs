use crate::logging::LogSettings;

use super::super::{Cli, CliError, Command};
use super::common::parse_generate_flags;

pub(super) fn parse(args: Vec<String>) -> Result<Cli, CliError> {
    let parsed = parse_generate_flags(args)?;
    if parsed.help {
        return Ok(Cli::help(Some("generate".into())));
    }
    Ok(Cli {
        command: Command::Generate(parsed.args),
        log_options: LogSettings::merged_with_env(parsed.log_settings),
        error_format: parsed.error_format,
    })
}
