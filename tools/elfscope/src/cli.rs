//! Command-line interface definitions for elfscope.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Print the sections, symbols, relocations and dynamic table of an ELF64 x86-64 file.
#[derive(Parser)]
#[command(name = "elfscope", version, about)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["all", "sections", "symbols", "relocations", "dynamics"]),
))]
pub struct Cli {
    /// Show the file header and every table.
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Show the section header table.
    #[arg(long, short = 'S')]
    pub sections: bool,

    /// Show the `.symtab` and `.dynsym` symbol tables.
    #[arg(long, short = 's')]
    pub symbols: bool,

    /// Show relocation entries, grouped by section.
    #[arg(long, short = 'r')]
    pub relocations: bool,

    /// Show the dynamic section.
    #[arg(long, short = 'd')]
    pub dynamics: bool,

    /// ELF file to inspect.
    pub file: PathBuf,

    /// Truncate symbol names to this many characters.
    #[arg(long, default_value_t = 30)]
    pub name_width: usize,

    /// Only report errors.
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log each decoding stage and its timing to stderr.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Which part of the file to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Header summary followed by every table.
    All,
    /// Section header table.
    Sections,
    /// Symbol tables.
    Symbols,
    /// Relocation tables.
    Relocations,
    /// Dynamic section.
    Dynamics,
}

impl Cli {
    /// The selected mode. Clap guarantees exactly one mode flag is set.
    pub fn mode(&self) -> Mode {
        if self.sections {
            Mode::Sections
        } else if self.symbols {
            Mode::Symbols
        } else if self.relocations {
            Mode::Relocations
        } else if self.dynamics {
            Mode::Dynamics
        } else {
            Mode::All
        }
    }
}
