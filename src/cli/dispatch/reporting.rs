use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::diagnostics::{ErrorFormat, FormatOptions, GenerationError, format_errors};
use crate::driver::RunReport;
use crate::error::{Error, Result};

pub(super) fn report_error(err: &Error) {
    let mut out = io::stderr();
    if let Err(io_err) = report_error_to(err, &mut out) {
        let _ = writeln!(io::stderr(), "failed to report error: {io_err}");
    }
}

pub(super) fn report_error_to(err: &Error, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "error: {err}")?;
    if cfg!(debug_assertions) {
        if let Some(backtrace) = err.backtrace() {
            writeln!(out, "stack trace:")?;
            writeln!(out, "{backtrace}")?;
        }
    }
    Ok(())
}

pub(super) fn print_generation(report: &RunReport, options: FormatOptions) {
    let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
    if let Err(err) = print_generation_to(report, options, &mut stdout, &mut stderr) {
        let _ = writeln!(io::stderr(), "failed to write the run summary: {err}");
    }
}

/// Errors go to stderr and the summary to stdout, except with JSON errors, which are
/// machine output and take stdout for themselves.
pub(super) fn print_generation_to(
    report: &RunReport,
    options: FormatOptions,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> io::Result<()> {
    let errors: Vec<GenerationError> = report.errors().cloned().collect();
    let json = options.format == ErrorFormat::Json;
    if !errors.is_empty() {
        let rendered = format_errors(&errors, options);
        if json {
            writeln!(stdout, "{rendered}")?;
        } else {
            writeln!(stderr, "{rendered}")?;
        }
    }
    if json {
        writeln!(stderr, "{}", report.summary())
    } else {
        writeln!(stdout, "{}", report.summary())
    }
}

pub(super) fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|err| Error::internal(format!("cannot serialize the run report: {err}")))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json + "\n")?;
    Ok(())
}
