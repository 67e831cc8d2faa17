use std::fmt::Write;

#[derive(Debug, Clone)]
struct OptionGuide {
    flag: &'static str,
    description: &'static str,
}

#[derive(Debug, Clone)]
struct CommandGuide {
    names: &'static [&'static str],
    summary: &'static str,
    usage: &'static [&'static str],
    options: &'static [OptionGuide],
    examples: &'static [&'static str],
}

const GLOBAL_OPTIONS: &[OptionGuide] = &[
    OptionGuide {
        flag: "-h, --help",
        description: "Show contextual help information.",
    },
    OptionGuide {
        flag: "-V, --version",
        description: "Print natbind version and build metadata.",
    },
];

const ENVIRONMENT: &[OptionGuide] = &[
    OptionGuide {
        flag: "NATBIND_LOG_FORMAT",
        description: "Default log format (auto, text, json).",
    },
    OptionGuide {
        flag: "NATBIND_LOG_LEVEL",
        description: "Default log level (error, warn, info, debug, trace).",
    },
    OptionGuide {
        flag: "NATBIND_ERROR_FORMAT",
        description: "Default error format (human, short, json).",
    },
    OptionGuide {
        flag: "RUST_LOG",
        description: "Full tracing filter; takes precedence over the log level.",
    },
    OptionGuide {
        flag: "NO_COLOR",
        description: "Disable coloured output.",
    },
];

const SHARED_OPTIONS: &[OptionGuide] = &[
    OptionGuide {
        flag: "-m, --manifest <path>",
        description: "Use this natbind.yaml instead of discovering one upwards from the working directory.",
    },
    OptionGuide {
        flag: "--no-manifest",
        description: "Ignore any natbind.yaml.",
    },
    OptionGuide {
        flag: "-l, --lang <rust|c>",
        description: "Target language of the emitted units (default rust).",
    },
    OptionGuide {
        flag: "-j, --jobs <n>",
        description: "Worker threads per parallel stage (default: available parallelism).",
    },
    OptionGuide {
        flag: "--pointer-width <32|64>",
        description: "Pointer width used for layouts and size assertions (default 64).",
    },
    OptionGuide {
        flag: "--library <name>",
        description: "Native library for descriptors that do not name one.",
    },
    OptionGuide {
        flag: "--report <path>",
        description: "Write the run report as JSON.",
    },
    OptionGuide {
        flag: "--error-format <format>",
        description: "Render errors as human, short, or json.",
    },
    OptionGuide {
        flag: "--log-format <format>",
        description: "Log output format (auto, text, json).",
    },
    OptionGuide {
        flag: "--log-level <level>",
        description: "Log verbosity (error, warn, info, debug, trace).",
    },
];

const GENERATE_OPTIONS: &[OptionGuide] = &[OptionGuide {
    flag: "-o, --output <dir>",
    description: "Directory receiving the generated units (or manifest `output`).",
}];

const COMMAND_GUIDES: &[CommandGuide] = &[
    CommandGuide {
        names: &["generate", "gen"],
        summary: "Load, link, and emit bindings for every descriptor, then write them.",
        usage: &[
            "natbind generate [inputs..] -o <dir> [options]",
            "natbind generate            # inputs and output from natbind.yaml",
        ],
        options: GENERATE_OPTIONS,
        examples: &[
            "natbind generate descriptors/openvr -o src/openvr --lang rust",
            "natbind generate descriptors/egl -o include --lang c --library EGL",
        ],
    },
    CommandGuide {
        names: &["check"],
        summary: "Run every stage without writing any file.",
        usage: &["natbind check [inputs..] [options]"],
        options: &[],
        examples: &[
            "natbind check descriptors --error-format short",
            "natbind check --manifest bindings/natbind.yaml --pointer-width 32",
        ],
    },
    CommandGuide {
        names: &["help"],
        summary: "Show general help or the guide for one command.",
        usage: &["natbind help [command]"],
        options: &[],
        examples: &["natbind help generate"],
    },
    CommandGuide {
        names: &["version", "--version", "-V"],
        summary: "Display natbind version, commit hash, and build metadata.",
        usage: &["natbind --version", "natbind version"],
        options: &[],
        examples: &["natbind --version"],
    },
];

fn takes_shared_options(guide: &CommandGuide) -> bool {
    matches!(guide.names[0], "generate" | "check")
}

pub(crate) fn render_general_help() -> String {
    let mut out = String::new();
    out.push_str("natbind - native API binding generator\n");
    out.push_str("Turns YAML interface descriptors into Rust modules or C headers.\n\n");
    out.push_str("USAGE:\n  natbind <command> [options]\n\n");
    out.push_str("COMMANDS:\n");
    for guide in COMMAND_GUIDES {
        let _ = writeln!(out, "  {:10} {}", guide.names[0], guide.summary);
    }
    out.push('\n');
    out.push_str("GLOBAL OPTIONS:\n");
    for option in GLOBAL_OPTIONS {
        let _ = writeln!(out, "  {:16} {}", option.flag, option.description);
    }
    out.push('\n');
    out.push_str("ENVIRONMENT:\n");
    for option in ENVIRONMENT {
        let _ = writeln!(out, "  {:22} {}", option.flag, option.description);
    }
    out.push('\n');
    out.push_str("Use `natbind help <command>` to view detailed usage and examples.\n");
    out
}

pub(crate) fn render_command_help(topic: &str) -> Option<String> {
    let guide = find_guide(topic)?;
    let mut out = String::new();
    let _ = writeln!(out, "natbind {} - {}", guide.names[0], guide.summary);
    out.push('\n');

    out.push_str("USAGE:\n");
    for usage in guide.usage {
        let _ = writeln!(out, "  {usage}");
    }

    if guide.names.len() > 1 {
        out.push_str("\nALIASES:\n");
        for alias in &guide.names[1..] {
            let _ = writeln!(out, "  {alias}");
        }
    }

    let shared: &[OptionGuide] = if takes_shared_options(guide) {
        SHARED_OPTIONS
    } else {
        &[]
    };
    if !guide.options.is_empty() || !shared.is_empty() {
        out.push_str("\nOPTIONS:\n");
        for option in guide.options.iter().chain(shared) {
            let _ = writeln!(out, "  {:26} {}", option.flag, option.description);
        }
    }

    if !guide.examples.is_empty() {
        out.push_str("\nEXAMPLES:\n");
        for example in guide.examples {
            let _ = writeln!(out, "  {example}");
        }
    }

    out.push_str("\nAll commands accept `-h`/`--help` for contextual guidance.\n");
    Some(out)
}

pub(crate) fn available_topics() -> impl Iterator<Item = &'static str> {
    COMMAND_GUIDES.iter().map(|guide| guide.names[0])
}

pub(crate) fn format_unknown_topic(topic: &str) -> String {
    let mut known = available_topics().collect::<Vec<_>>();
    known.sort_unstable();
    format!(
        "unknown help topic '{topic}'; available commands: {}",
        known.join(", ")
    )
}

fn find_guide(topic: &str) -> Option<&'static CommandGuide> {
    COMMAND_GUIDES.iter().find(|guide| {
        guide
            .names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(topic))
    })
}
