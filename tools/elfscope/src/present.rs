//! Text rendering of a decoded [`ElfModel`].

use std::borrow::Cow;
use std::io::{self, Write};

use elfscope_elf::{ElfError, ElfModel, SymbolTableKind};

use crate::cli::Mode;
use crate::table::Table;

/// Placeholder for a cell whose cross-reference does not resolve.
const INVALID: &str = "<invalid>";

/// Presentation settings taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Maximum number of characters of a symbol name to print.
    pub name_width: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { name_width: 30 }
    }
}

/// Write the parts of `model` selected by `mode` to `out`.
///
/// # Errors
///
/// Only write errors from `out` are returned; unresolvable references are
/// printed as `<invalid>` and logged.
pub fn render<W: Write>(
    model: &ElfModel,
    mode: Mode,
    options: &Options,
    out: &mut W,
) -> io::Result<()> {
    match mode {
        Mode::All => {
            writeln!(out, "ELF class: {}", model.class())?;
            writeln!(out, "ELF type: {}", model.elf_type())?;
            writeln!(out)?;
            sections(model, out)?;
            writeln!(out)?;
            symbols(model, options, out)?;
            writeln!(out)?;
            relocations(model, out)?;
            writeln!(out)?;
            dynamics(model, out)
        }
        Mode::Sections => sections(model, out),
        Mode::Symbols => symbols(model, options, out),
        Mode::Relocations => relocations(model, out),
        Mode::Dynamics => dynamics(model, out),
    }
}

fn or_invalid<'a>(what: &str, resolved: Result<Cow<'a, str>, ElfError>) -> Cow<'a, str> {
    resolved.unwrap_or_else(|err| {
        log::warn!("{what}: {err}");
        Cow::Borrowed(INVALID)
    })
}

fn truncate(name: &str, width: usize) -> String {
    name.chars().take(width).collect()
}

fn sections<W: Write>(model: &ElfModel, out: &mut W) -> io::Result<()> {
    let catalog = model.sections();
    writeln!(out, "ELF section num: {}", catalog.len())?;
    writeln!(out, "sections:")?;

    let mut table = Table::new(&[
        "Number",
        "Type",
        "Name",
        "Flags",
        "Virtual Address",
        "File Offset",
        "Section Size",
        "Entry Size",
    ]);
    for section in catalog {
        let name = or_invalid(&format!("section {} name", section.index), catalog.name(section));
        let h = &section.header;
        table.row(vec![
            section.index.to_string(),
            section.section_type().to_string(),
            name.into_owned(),
            section.flags().to_string(),
            format!("{:#x}", h.sh_addr),
            format!("{:#x}", h.sh_offset),
            h.sh_size.to_string(),
            h.sh_entsize.to_string(),
        ]);
    }
    write!(out, "{table}")
}

fn symbols<W: Write>(model: &ElfModel, options: &Options, out: &mut W) -> io::Result<()> {
    for (i, kind) in SymbolTableKind::ALL.into_iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        let symbols = model.symbols(kind);
        writeln!(out, "{} num: {}", kind.section_name(), symbols.len())?;
        writeln!(out, "symbols:")?;

        let mut table = Table::new(&["index", "Type", "Bind", "Section", "Name", "Value", "Size"]);
        for (index, symbol) in symbols.iter().enumerate() {
            let what = format!("{} symbol {index}", kind.section_name());
            let name = or_invalid(&format!("{what} name"), model.symbol_name(symbol));
            let section = or_invalid(&format!("{what} section"), model.symbol_section_name(symbol));
            table.row(vec![
                index.to_string(),
                symbol.sym_type.to_string(),
                symbol.bind.to_string(),
                section.into_owned(),
                truncate(&name, options.name_width),
                format!("{:#x}", symbol.value()),
                symbol.size().to_string(),
            ]);
        }
        write!(out, "{table}")?;
    }
    Ok(())
}

fn relocations<W: Write>(model: &ElfModel, out: &mut W) -> io::Result<()> {
    let index = model.relocations();
    if index.is_empty() {
        return writeln!(out, "no relocations");
    }
    for (i, (name, relocs)) in index.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{name} relocation num: {}", relocs.len())?;
        writeln!(out, "relocations:")?;

        let mut table = Table::new(&["Offset", "Type", "Symbol Name", "Type", "Bind", "Section"]);
        for reloc in relocs {
            let Some(symbol) = model.relocation_symbol(name, reloc) else {
                log::trace!(
                    "{name}: skipping relocation at {:#x}, symbol {} unresolved",
                    reloc.offset(),
                    reloc.symbol_index
                );
                continue;
            };
            let what = format!("{name} relocation symbol {}", reloc.symbol_index);
            let symbol_name = or_invalid(&format!("{what} name"), model.symbol_name(symbol));
            let section = or_invalid(&format!("{what} section"), model.symbol_section_name(symbol));
            table.row(vec![
                format!("{:#x}", reloc.offset()),
                reloc.reloc_type.to_string(),
                symbol_name.into_owned(),
                symbol.sym_type.to_string(),
                symbol.bind.to_string(),
                section.into_owned(),
            ]);
        }
        write!(out, "{table}")?;
    }
    Ok(())
}

fn dynamics<W: Write>(model: &ElfModel, out: &mut W) -> io::Result<()> {
    let entries = model.dynamics();
    writeln!(out, "dynamic num: {}", entries.len())?;
    writeln!(out, "dynamics:")?;

    let mut table = Table::new(&["Tag", "Value"]);
    for entry in entries {
        let value = model
            .dynamic_value(entry)
            .map(|v| v.to_string())
            .unwrap_or_else(|err| {
                log::warn!("dynamic {}: {err}", entry.tag);
                INVALID.to_owned()
            });
        table.row(vec![entry.tag.to_string(), value]);
    }
    write!(out, "{table}")
}
