//! ELF64 relocation decoding (`SHT_RELA`).
//!
//! Relocations are reported, never applied. Each `Rela` record is split into
//! its symbol index and x86-64 relocation type and filed under the name of
//! the section that holds it.

use core::fmt;
use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::decode::{Record, read_table};
use crate::header::{ElfError, le_i64, le_u64};
use crate::section::Section;
use crate::source::ByteSource;
use crate::symbol::SymbolTableKind;

// ---------------------------------------------------------------------------
// x86-64 relocation type constants (ELF ABI supplement)
// ---------------------------------------------------------------------------

/// No relocation.
pub const R_X86_64_NONE: u32 = 0;

/// Absolute 64-bit: `S + A`.
pub const R_X86_64_64: u32 = 1;

/// PC-relative 32-bit: `S + A - P`.
pub const R_X86_64_PC32: u32 = 2;

/// 32-bit GOT entry offset.
pub const R_X86_64_GOT32: u32 = 3;

/// PLT-relative 32-bit: `L + A - P`.
pub const R_X86_64_PLT32: u32 = 4;

/// Copy symbol at runtime.
pub const R_X86_64_COPY: u32 = 5;

/// Global data: `S`.
pub const R_X86_64_GLOB_DAT: u32 = 6;

/// PLT jump slot: `S`.
pub const R_X86_64_JUMP_SLOT: u32 = 7;

/// Base-relative 64-bit: `B + A`.
pub const R_X86_64_RELATIVE: u32 = 8;

/// PC-relative 32-bit GOT offset.
pub const R_X86_64_GOTPCREL: u32 = 9;

/// Absolute 32-bit, zero-extended: `S + A`.
pub const R_X86_64_32: u32 = 10;

/// Absolute 32-bit, sign-extended: `S + A`.
pub const R_X86_64_32S: u32 = 11;

/// Absolute 16-bit.
pub const R_X86_64_16: u32 = 12;

/// PC-relative 16-bit.
pub const R_X86_64_PC16: u32 = 13;

/// Absolute 8-bit.
pub const R_X86_64_8: u32 = 14;

/// PC-relative 8-bit.
pub const R_X86_64_PC8: u32 = 15;

/// TLS module ID.
pub const R_X86_64_DTPMOD64: u32 = 16;

/// Offset in the TLS block.
pub const R_X86_64_DTPOFF64: u32 = 17;

/// Offset in the initial TLS block.
pub const R_X86_64_TPOFF64: u32 = 18;

/// PC-relative offset to a GD GOT entry.
pub const R_X86_64_TLSGD: u32 = 19;

/// PC-relative offset to an LD GOT entry.
pub const R_X86_64_TLSLD: u32 = 20;

/// 32-bit offset in the TLS block.
pub const R_X86_64_DTPOFF32: u32 = 21;

/// PC-relative offset to an IE GOT entry.
pub const R_X86_64_GOTTPOFF: u32 = 22;

/// 32-bit offset in the initial TLS block.
pub const R_X86_64_TPOFF32: u32 = 23;

/// PC-relative 64-bit.
pub const R_X86_64_PC64: u32 = 24;

/// 64-bit offset to the GOT.
pub const R_X86_64_GOTOFF64: u32 = 25;

/// PC-relative 32-bit offset to the GOT.
pub const R_X86_64_GOTPC32: u32 = 26;

/// Symbol size, 32-bit.
pub const R_X86_64_SIZE32: u32 = 32;

/// Symbol size, 64-bit.
pub const R_X86_64_SIZE64: u32 = 33;

/// Relaxable `GOTPCREL`.
pub const R_X86_64_GOTPCRELX: u32 = 41;

/// Relaxable `GOTPCREL` with a REX prefix.
pub const R_X86_64_REX_GOTPCRELX: u32 = 42;

/// Indirect function: `indirect(B + A)`.
pub const R_X86_64_IRELATIVE: u32 = 37;

/// Size of an ELF64 `Rela` entry (24 bytes).
const ELF64_RELA_SIZE: usize = 24;

/// A raw ELF64 relocation entry with addend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Elf64Rela {
    /// Offset within the section (or virtual address) where the relocation applies.
    pub r_offset: u64,
    /// Symbol index (upper 32 bits) and relocation type (lower 32 bits).
    pub r_info: u64,
    /// Addend value.
    pub r_addend: i64,
}

impl Elf64Rela {
    /// Symbol table index (upper 32 bits of `r_info`).
    #[must_use]
    pub fn r_sym(&self) -> u32 {
        (self.r_info >> 32) as u32
    }

    /// Relocation type (lower 32 bits of `r_info`).
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "the type is the low 32 bits of r_info")]
    pub fn r_type(&self) -> u32 {
        self.r_info as u32
    }
}

impl Record for Elf64Rela {
    const SIZE: usize = ELF64_RELA_SIZE;

    fn decode(b: &[u8]) -> Self {
        Self {
            r_offset: le_u64(b, 0),
            r_info: le_u64(b, 8),
            r_addend: le_i64(b, 16),
        }
    }
}

/// x86-64 relocation type descriptor; unknown types display as their raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationType(pub u32);

impl RelocationType {
    /// The `R_X86_64_*` name of this type, if it is a known psABI type.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            R_X86_64_NONE => "R_X86_64_NONE",
            R_X86_64_64 => "R_X86_64_64",
            R_X86_64_PC32 => "R_X86_64_PC32",
            R_X86_64_GOT32 => "R_X86_64_GOT32",
            R_X86_64_PLT32 => "R_X86_64_PLT32",
            R_X86_64_COPY => "R_X86_64_COPY",
            R_X86_64_GLOB_DAT => "R_X86_64_GLOB_DAT",
            R_X86_64_JUMP_SLOT => "R_X86_64_JUMP_SLOT",
            R_X86_64_RELATIVE => "R_X86_64_RELATIVE",
            R_X86_64_GOTPCREL => "R_X86_64_GOTPCREL",
            R_X86_64_32 => "R_X86_64_32",
            R_X86_64_32S => "R_X86_64_32S",
            R_X86_64_16 => "R_X86_64_16",
            R_X86_64_PC16 => "R_X86_64_PC16",
            R_X86_64_8 => "R_X86_64_8",
            R_X86_64_PC8 => "R_X86_64_PC8",
            R_X86_64_DTPMOD64 => "R_X86_64_DTPMOD64",
            R_X86_64_DTPOFF64 => "R_X86_64_DTPOFF64",
            R_X86_64_TPOFF64 => "R_X86_64_TPOFF64",
            R_X86_64_TLSGD => "R_X86_64_TLSGD",
            R_X86_64_TLSLD => "R_X86_64_TLSLD",
            R_X86_64_DTPOFF32 => "R_X86_64_DTPOFF32",
            R_X86_64_GOTTPOFF => "R_X86_64_GOTTPOFF",
            R_X86_64_TPOFF32 => "R_X86_64_TPOFF32",
            R_X86_64_PC64 => "R_X86_64_PC64",
            R_X86_64_GOTOFF64 => "R_X86_64_GOTOFF64",
            R_X86_64_GOTPC32 => "R_X86_64_GOTPC32",
            R_X86_64_SIZE32 => "R_X86_64_SIZE32",
            R_X86_64_SIZE64 => "R_X86_64_SIZE64",
            R_X86_64_IRELATIVE => "R_X86_64_IRELATIVE",
            R_X86_64_GOTPCRELX => "R_X86_64_GOTPCRELX",
            R_X86_64_REX_GOTPCRELX => "R_X86_64_REX_GOTPCRELX",
            _ => return None,
        })
    }
}

impl fmt::Display for RelocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A decoded relocation with its `r_info` split apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// The raw relocation record.
    pub raw: Elf64Rela,
    /// Index into the symbol table the owning section relates to.
    pub symbol_index: u32,
    /// Relocation type.
    pub reloc_type: RelocationType,
}

impl From<Elf64Rela> for Relocation {
    fn from(raw: Elf64Rela) -> Self {
        Self {
            raw,
            symbol_index: raw.r_sym(),
            reloc_type: RelocationType(raw.r_type()),
        }
    }
}

impl Relocation {
    /// Location the relocation patches.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.raw.r_offset
    }

    /// Constant addend.
    #[must_use]
    pub fn addend(&self) -> i64 {
        self.raw.r_addend
    }
}

/// The symbol table a relocation section's entries refer to, chosen by the
/// section's conventional name.
///
/// `.rela.dyn` and `.rela.plt` use `.dynsym`; `.rela.text` uses `.symtab`.
/// Any other name has no known symbol table.
#[must_use]
pub fn symbol_table_for(section_name: &str) -> Option<SymbolTableKind> {
    match section_name {
        ".rela.dyn" | ".rela.plt" => Some(SymbolTableKind::Dynamic),
        ".rela.text" => Some(SymbolTableKind::Static),
        _ => None,
    }
}

/// Relocations grouped by the name of the section holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationIndex {
    by_section: BTreeMap<String, Vec<Relocation>>,
}

impl RelocationIndex {
    /// Decode one `SHT_RELA` section and file its entries under `name`.
    ///
    /// Sections sharing a name are concatenated in on-disk order.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidEntrySize`] if the entry size is not 24 and
    /// [`ElfError::TruncatedInput`] if the section runs past the stream.
    pub fn read_section<R: Read + Seek>(
        &mut self,
        source: &mut ByteSource<'_, R>,
        section: &Section,
        name: &str,
    ) -> Result<(), ElfError> {
        let raw: Vec<Elf64Rela> = read_table(source, &section.header)?;
        log::trace!("{name}: {} relocations", raw.len());
        self.by_section
            .entry(name.to_owned())
            .or_default()
            .extend(raw.into_iter().map(Relocation::from));
        Ok(())
    }

    /// Relocations held by the section called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Relocation]> {
        self.by_section.get(name).map(Vec::as_slice)
    }

    /// Iterate over `(section name, relocations)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Relocation])> {
        self.by_section
            .iter()
            .map(|(name, relocs)| (name.as_str(), relocs.as_slice()))
    }

    /// Number of relocation sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_section.len()
    }

    /// Returns `true` if the file has no relocation sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_section.is_empty()
    }
}
