use crate::logging::LogSettings;

use super::super::{Cli, CliError, Command};
use super::common::parse_generate_flags;

pub(super) fn parse(args: Vec<String>) -> Result<Cli, CliError> {
    let parsed = parse_generate_flags(args)?;
    if parsed.help {
        return Ok(Cli::help(Some("check".into())));
    }
    if parsed.args.output.is_some() {
        return Err(CliError::with_usage(
            "check never writes output; drop -o/--output or use `natbind generate`",
        ));
    }
    Ok(Cli {
        command: Command::Check(parsed.args),
        log_options: LogSettings::merged_with_env(parsed.log_settings),
        error_format: parsed.error_format,
    })
}
