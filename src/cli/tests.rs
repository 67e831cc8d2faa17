use super::*;
use crate::logging::{LogFormat, LogLevel};

fn parse<const N: usize>(args: [&str; N]) -> Result<Cli, CliError> {
    Cli::parse_from(args.into_iter())
}

fn expect_cli_ok<const N: usize>(args: [&str; N]) -> Cli {
    match parse(args) {
        Ok(cli) => cli,
        Err(err) => panic!("expected CLI parse to succeed, found error: {err}"),
    }
}

fn expect_generate_args(cli: Cli) -> GenerateArgs {
    match cli.command {
        Command::Generate(args) | Command::Check(args) => args,
        other => panic!("expected generate/check, found {other:?}"),
    }
}

#[test]
fn registry_resolves_canonical_and_alias_commands() {
    let registry = registry();
    let generate = registry.resolve("generate").expect("generate is registered");
    assert_eq!(generate.name(), "generate");
    assert_eq!(registry.resolve("gen").map(CommandDescriptor::name), Some("generate"));
    assert!(registry.resolve("build").is_none());
    let names: Vec<_> = registry.iter().map(CommandDescriptor::name).collect();
    assert_eq!(names, vec!["generate", "check"]);
}

#[test]
fn parses_generate_with_every_flag() {
    let cli = expect_cli_ok([
        "generate",
        "descriptors",
        "extra.yaml",
        "-o",
        "out",
        "--lang",
        "c",
        "-j",
        "4",
        "--pointer-width",
        "32",
        "--library=openvr_api",
        "--manifest",
        "bindings/natbind.yaml",
        "--report",
        "run.json",
        "--error-format",
        "json",
        "--log-format",
        "json",
        "--log-level",
        "debug",
    ]);
    assert_eq!(cli.error_format, Some(ErrorFormat::Json));
    assert_eq!(cli.log_options.format, LogFormat::Json);
    assert_eq!(cli.log_options.level, LogLevel::Debug);
    let args = expect_generate_args(cli);
    assert_eq!(
        args,
        GenerateArgs {
            inputs: vec![PathBuf::from("descriptors"), PathBuf::from("extra.yaml")],
            manifest: Some(PathBuf::from("bindings/natbind.yaml")),
            no_manifest: false,
            output: Some(PathBuf::from("out")),
            language: Some(TargetLanguage::C),
            jobs: Some(4),
            pointer_width: Some(PointerWidth::W32),
            library: Some("openvr_api".into()),
            report: Some(PathBuf::from("run.json")),
        }
    );
}

#[test]
fn inputs_may_follow_flags_and_double_dash() {
    let args = expect_generate_args(expect_cli_ok([
        "check",
        "--no-manifest",
        "a.yaml",
        "--",
        "--odd-name.yaml",
    ]));
    assert!(args.no_manifest);
    assert_eq!(
        args.inputs,
        vec![PathBuf::from("a.yaml"), PathBuf::from("--odd-name.yaml")]
    );
}

#[test]
fn check_rejects_an_output_directory() {
    let err = parse(["check", "a.yaml", "-o", "out"]).unwrap_err();
    assert!(err.message().starts_with("check never writes output"));
}

#[test]
fn rejects_invalid_values() {
    for (args, needle) in [
        (vec!["generate", "--lang", "go"], "invalid language 'go'"),
        (vec!["generate", "-j", "0"], "invalid job count '0'"),
        (vec!["generate", "-j", "many"], "invalid job count 'many'"),
        (vec!["generate", "--pointer-width", "16"], "invalid pointer width '16'"),
        (vec!["generate", "--error-format", "xml"], "invalid error format 'xml'"),
        (vec!["generate", "--log-level", "loud"], "invalid log level 'loud'"),
        (vec!["generate", "--library", " "], "--library must not be empty"),
        (vec!["generate", "-o"], "expected value after -o"),
        (vec!["generate", "--frobnicate"], "unsupported option '--frobnicate'"),
        (vec!["frobnicate"], "unknown command 'frobnicate'"),
        (vec![], "missing command"),
    ] {
        let err = Cli::parse_from(args.clone().into_iter()).unwrap_err();
        assert!(err.message().starts_with(needle), "{args:?}: {err}");
        assert!(err.message().contains("USAGE:"), "usage appended for {args:?}");
    }
}

#[test]
fn help_and_version_forms() {
    assert_eq!(expect_cli_ok(["help"]).command, Command::Help { topic: None });
    assert_eq!(
        expect_cli_ok(["--help", "Generate"]).command,
        Command::Help {
            topic: Some("generate".into())
        }
    );
    assert_eq!(
        expect_cli_ok(["check", "--help"]).command,
        Command::Help {
            topic: Some("check".into())
        }
    );
    assert_eq!(
        expect_cli_ok(["gen", "-h"]).command,
        Command::Help {
            topic: Some("generate".into())
        }
    );
    assert_eq!(expect_cli_ok(["-V"]).command, Command::Version);
    assert_eq!(expect_cli_ok(["version"]).command, Command::Version);
    assert_eq!(
        expect_cli_ok(["version", "--help"]).command,
        Command::Help {
            topic: Some("version".into())
        }
    );
    assert!(parse(["version", "extra"]).is_err());
}

#[test]
fn help_text_covers_every_command() {
    let usage = Cli::usage();
    for name in ["generate", "check", "help", "version", "NATBIND_LOG_LEVEL"] {
        assert!(usage.contains(name), "general help mentions {name}");
    }
    let generate = Cli::help_for("gen").unwrap();
    assert!(generate.starts_with("natbind generate - "));
    assert!(generate.contains("-o, --output <dir>"));
    assert!(generate.contains("--pointer-width <32|64>"));
    let check = Cli::help_for("check").unwrap();
    assert!(!check.contains("--output"));
    assert!(check.contains("--error-format"));

    let err = Cli::help_for("build").unwrap_err();
    assert!(err.message().starts_with(
        "unknown help topic 'build'; available commands: check, generate, help, version"
    ));
}

#[test]
fn command_names_are_stable() {
    assert_eq!(Command::Generate(GenerateArgs::default()).name(), "generate");
    assert_eq!(Command::Check(GenerateArgs::default()).name(), "check");
    assert_eq!(Command::Help { topic: None }.name(), "help");
    assert_eq!(Command::Version.name(), "version");
}
