#![deny(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::process::ExitCode;

use natbind::cli::dispatch::{self, PipelineDriver};
use natbind::cli::Cli;
use natbind::error::Result;

fn main() -> ExitCode {
    run_with_args(std::env::args().skip(1))
}

fn run_with_args<I, S>(args: I) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match try_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            dispatch::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn try_main<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let cli = Cli::parse_from(args.into_iter())?;
    dispatch::run(&PipelineDriver, cli)
}
