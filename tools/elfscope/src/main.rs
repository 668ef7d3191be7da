//! elfscope: print the structure of an ELF64 x86-64 file.
//!
//! Pipeline: parse arguments → install logger → decode the file into an
//! [`ElfModel`] → render the selected tables to stdout.

mod cli;
mod present;
mod table;
mod verbose;

use std::fs::File;
use std::io::{BufReader, Write};

use anyhow::{Context, Result};
use clap::Parser;
use elfscope_elf::ElfModel;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(cli.quiet, cli.verbose).context("failed to install logger")?;

    let path = &cli.file;
    let model = {
        let _t = verbose::Timer::start("decode");
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut reader = BufReader::new(file);
        ElfModel::parse(&mut reader)
            .with_context(|| format!("failed to decode {}", path.display()))?
    };

    let options = present::Options {
        name_width: cli.name_width,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    present::render(&model, cli.mode(), &options, &mut out).context("failed to write output")?;
    out.flush().context("failed to write output")?;
    Ok(())
}
