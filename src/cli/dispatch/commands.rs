use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::DispatchDriver;
use super::reporting::{print_generation, write_report};
use crate::cli::{Cli, CliError, Command, GenerateArgs};
use crate::diagnostics::FormatOptions;
use crate::driver::{GenerateOptions, Input};
use crate::error::Result;
use crate::manifest::{Manifest, expand_inputs};

pub(super) fn dispatch_command<D: DispatchDriver>(
    driver: &D,
    command: &Command,
    format_options: FormatOptions,
) -> Result<()> {
    match command {
        Command::Generate(args) => run_generate(driver, args, false, format_options),
        Command::Check(args) => run_generate(driver, args, true, format_options),
        Command::Help { topic } => {
            let text = match topic {
                Some(topic) => Cli::help_for(topic)?,
                None => Cli::usage(),
            };
            print!("{text}");
            io::stdout().flush()?;
            Ok(())
        }
        Command::Version => {
            println!("{}", crate::version::formatted());
            Ok(())
        }
    }
}

/// What one `generate`/`check` invocation runs on, after merging flags over the manifest.
#[derive(Debug)]
pub(super) struct GenerateRequest {
    pub inputs: Vec<Input>,
    pub options: GenerateOptions,
}

pub(super) fn resolve_request(
    args: &GenerateArgs,
    check: bool,
    cwd: &Path,
) -> Result<GenerateRequest> {
    let manifest = match &args.manifest {
        Some(path) => Some(Manifest::load(path)?),
        None if args.no_manifest => None,
        None => Manifest::discover(cwd)?,
    };
    if let Some(manifest) = &manifest {
        tracing::info!(
            target: "pipeline",
            stage = "manifest.load",
            path = %manifest.path().display(),
            inputs = manifest.inputs().len()
        );
    }

    let declared: Vec<PathBuf> = if args.inputs.is_empty() {
        manifest
            .as_ref()
            .map(|manifest| manifest.inputs().to_vec())
            .unwrap_or_default()
    } else {
        args.inputs.clone()
    };
    if declared.is_empty() {
        return Err(CliError::with_usage(
            "no descriptor inputs; pass files or directories, or list `inputs` in natbind.yaml",
        )
        .into());
    }
    let files = expand_inputs(&declared)?;
    if files.is_empty() {
        return Err(CliError::new("no descriptor files (.yaml, .yml) found in the given inputs").into());
    }

    let output = if check {
        None
    } else {
        let output = args
            .output
            .clone()
            .or_else(|| manifest.as_ref().and_then(|m| m.output().map(Path::to_path_buf)));
        Some(output.ok_or_else(|| {
            CliError::with_usage(
                "generate needs an output directory; pass -o <dir> or set `output` in natbind.yaml",
            )
        })?)
    };

    let options = GenerateOptions {
        language: args
            .language
            .or_else(|| manifest.as_ref().and_then(Manifest::language))
            .unwrap_or_default(),
        pointer_width: args
            .pointer_width
            .or_else(|| manifest.as_ref().and_then(Manifest::pointer_width))
            .unwrap_or_default(),
        jobs: args
            .jobs
            .or_else(|| manifest.as_ref().and_then(Manifest::jobs))
            .unwrap_or(0),
        default_library: args.library.clone().or_else(|| {
            manifest
                .as_ref()
                .and_then(|m| m.default_library().map(str::to_string))
        }),
        external_types: manifest
            .as_ref()
            .map(|manifest| manifest.types().to_vec())
            .unwrap_or_default(),
        output,
    };
    Ok(GenerateRequest {
        inputs: files.into_iter().map(Input::File).collect(),
        options,
    })
}

pub(super) fn run_generate<D: DispatchDriver>(
    driver: &D,
    args: &GenerateArgs,
    check: bool,
    format_options: FormatOptions,
) -> Result<()> {
    let cwd = env::current_dir()?;
    let request = resolve_request(args, check, &cwd)?;
    let generation = driver.generate(&request.inputs, &request.options)?;
    let report = &generation.report;
    print_generation(report, format_options);
    if let Some(path) = &args.report {
        write_report(report, path)?;
    }
    match report.failure() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
