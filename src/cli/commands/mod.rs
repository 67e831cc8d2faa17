pub(crate) mod common;

mod check;
mod generate;

use super::CommandDescriptor;

const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "generate",
        aliases: &["gen"],
        parser: generate::parse,
    },
    CommandDescriptor {
        name: "check",
        aliases: &[],
        parser: check::parse,
    },
];

pub(crate) fn descriptors() -> &'static [CommandDescriptor] {
    COMMANDS
}
