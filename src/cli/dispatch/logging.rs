use std::time::Duration;

use crate::cli::Command;
use crate::logging::{LogFormat, LogOptions};

/// Install the global subscriber once; later calls keep the first configuration.
pub(super) fn init_logging(options: &LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{EnvFilter, fmt};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false);
        // A host application may already own the global subscriber.
        let _ = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Text | LogFormat::Auto => {
                tracing::subscriber::set_global_default(builder.compact().finish())
            }
        };
    });
}

fn input_count(command: &Command) -> Option<usize> {
    match command {
        Command::Generate(args) | Command::Check(args) => Some(args.inputs.len()),
        Command::Help { .. } | Command::Version => None,
    }
}

pub(super) fn log_run_start(command: &Command, options: &LogOptions) {
    tracing::info!(
        target: "pipeline",
        stage = "cli.run.start",
        command = command.name(),
        log_level = %options.level,
        log_format = %options.format,
        input_count = input_count(command)
    );
}

pub(super) fn log_run_complete(
    command: &Command,
    elapsed: Duration,
    result: &crate::error::Result<()>,
) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match result {
        Ok(()) => tracing::info!(
            target: "pipeline",
            stage = "cli.run.footer",
            command = command.name(),
            status = "ok",
            elapsed_ms
        ),
        Err(err) => tracing::error!(
            target: "pipeline",
            stage = "cli.run.footer",
            command = command.name(),
            status = "error",
            elapsed_ms,
            error = %err
        ),
    }
}
