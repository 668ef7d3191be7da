//! Symbol table decoding (`.symtab`, `.dynsym`).
//!
//! Each symbol is decoded from its 24-byte record and split into type and
//! binding. Section symbols borrow the name of the section they describe;
//! every other symbol is looked up in the string table that goes with its
//! table (`.strtab` for `.symtab`, `.dynstr` for `.dynsym`).

use core::fmt;
use std::borrow::Cow;
use std::io::{Read, Seek};

use crate::decode::{Record, read_table};
use crate::header::{ElfError, le_u16, le_u32, le_u64};
use crate::section::{SHT_DYNSYM, SHT_SYMTAB, Section, SectionCatalog};
use crate::source::ByteSource;
use crate::strtab::{DYNSTR_NAME, STRTAB_NAME, StringTable};

/// Special section index: undefined.
pub const SHN_UNDEF: u16 = 0;

/// Special section index: absolute value, not relocated.
pub const SHN_ABS: u16 = 0xfff1;

/// Special section index: common block.
pub const SHN_COMMON: u16 = 0xfff2;

/// Symbol type: unspecified.
pub const STT_NOTYPE: u8 = 0;

/// Symbol type: data object.
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function.
pub const STT_FUNC: u8 = 2;

/// Symbol type: section.
pub const STT_SECTION: u8 = 3;

/// Symbol type: source file.
pub const STT_FILE: u8 = 4;

/// Symbol type: uninitialized common block.
pub const STT_COMMON: u8 = 5;

/// Symbol type: thread-local storage.
pub const STT_TLS: u8 = 6;

/// Symbol type: GNU indirect function.
pub const STT_GNU_IFUNC: u8 = 10;

/// Symbol binding: local.
pub const STB_LOCAL: u8 = 0;

/// Symbol binding: global.
pub const STB_GLOBAL: u8 = 1;

/// Symbol binding: weak.
pub const STB_WEAK: u8 = 2;

/// Size of an ELF64 symbol entry (24 bytes).
const ELF64_SYM_SIZE: usize = 24;

/// Parsed ELF64 symbol table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Elf64Symbol {
    /// Offset into the associated string table for this symbol's name.
    pub st_name: u32,
    /// Symbol type and binding packed into one byte.
    pub st_info: u8,
    /// Symbol visibility.
    pub st_other: u8,
    /// Section index this symbol is defined in.
    pub st_shndx: u16,
    /// Symbol value (address for defined symbols).
    pub st_value: u64,
    /// Symbol size in bytes.
    pub st_size: u64,
}

impl Elf64Symbol {
    /// Returns the symbol type (lower 4 bits of `st_info`).
    #[must_use]
    pub fn sym_type(&self) -> u8 {
        self.st_info & 0xf
    }

    /// Returns the symbol binding (upper 4 bits of `st_info`).
    #[must_use]
    pub fn sym_bind(&self) -> u8 {
        self.st_info >> 4
    }
}

impl Record for Elf64Symbol {
    const SIZE: usize = ELF64_SYM_SIZE;

    fn decode(b: &[u8]) -> Self {
        Self {
            st_name: le_u32(b, 0),
            st_info: b[4],
            st_other: b[5],
            st_shndx: le_u16(b, 6),
            st_value: le_u64(b, 8),
            st_size: le_u64(b, 16),
        }
    }
}

/// What kind of entity a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// `STT_NOTYPE`.
    NoType,
    /// `STT_OBJECT`.
    Object,
    /// `STT_FUNC`.
    Func,
    /// `STT_SECTION`.
    Section,
    /// `STT_FILE`.
    File,
    /// `STT_COMMON`.
    Common,
    /// `STT_TLS`.
    Tls,
    /// `STT_GNU_IFUNC`.
    GnuIfunc,
    /// Any other type nibble.
    Other(u8),
}

impl From<u8> for SymbolType {
    fn from(raw: u8) -> Self {
        match raw {
            STT_NOTYPE => Self::NoType,
            STT_OBJECT => Self::Object,
            STT_FUNC => Self::Func,
            STT_SECTION => Self::Section,
            STT_FILE => Self::File,
            STT_COMMON => Self::Common,
            STT_TLS => Self::Tls,
            STT_GNU_IFUNC => Self::GnuIfunc,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoType => "STT_NOTYPE",
            Self::Object => "STT_OBJECT",
            Self::Func => "STT_FUNC",
            Self::Section => "STT_SECTION",
            Self::File => "STT_FILE",
            Self::Common => "STT_COMMON",
            Self::Tls => "STT_TLS",
            Self::GnuIfunc => "STT_GNU_IFUNC",
            Self::Other(raw) => return write!(f, "{raw}"),
        };
        f.write_str(name)
    }
}

/// Linkage class of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBind {
    /// `STB_LOCAL`.
    Local,
    /// `STB_GLOBAL`.
    Global,
    /// `STB_WEAK`.
    Weak,
    /// Any other binding value.
    Other(u8),
}

impl From<u8> for SymbolBind {
    fn from(raw: u8) -> Self {
        match raw {
            STB_LOCAL => Self::Local,
            STB_GLOBAL => Self::Global,
            STB_WEAK => Self::Weak,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for SymbolBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("STB_LOCAL"),
            Self::Global => f.write_str("STB_GLOBAL"),
            Self::Weak => f.write_str("STB_WEAK"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Where a symbol's section index points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSection {
    /// `SHN_UNDEF`: referenced here, defined elsewhere.
    Undefined,
    /// `SHN_ABS`: absolute value.
    Absolute,
    /// `SHN_COMMON`: unallocated common block.
    Common,
    /// An ordinary section header index.
    Index(u16),
}

impl From<u16> for SymbolSection {
    fn from(raw: u16) -> Self {
        match raw {
            SHN_UNDEF => Self::Undefined,
            SHN_ABS => Self::Absolute,
            SHN_COMMON => Self::Common,
            index => Self::Index(index),
        }
    }
}

/// Which of the two symbol tables a symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolTableKind {
    /// `.symtab`, named through `.strtab`.
    Static,
    /// `.dynsym`, named through `.dynstr`.
    Dynamic,
}

impl SymbolTableKind {
    /// Both tables, static first.
    pub const ALL: [Self; 2] = [Self::Static, Self::Dynamic];

    /// Section type holding this table.
    #[must_use]
    pub const fn section_type(self) -> u32 {
        match self {
            Self::Static => SHT_SYMTAB,
            Self::Dynamic => SHT_DYNSYM,
        }
    }

    /// Conventional name of the table's section.
    #[must_use]
    pub const fn section_name(self) -> &'static str {
        match self {
            Self::Static => ".symtab",
            Self::Dynamic => ".dynsym",
        }
    }

    /// Conventional name of the string table holding this table's names.
    #[must_use]
    pub const fn string_table_name(self) -> &'static str {
        match self {
            Self::Static => STRTAB_NAME,
            Self::Dynamic => DYNSTR_NAME,
        }
    }
}

/// A decoded symbol with its derived type and binding.
///
/// Names and section labels are resolved on request, so a dangling
/// reference only affects the symbol it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// The raw symbol record.
    pub raw: Elf64Symbol,
    /// Table the symbol was read from.
    pub table: SymbolTableKind,
    /// Type derived from the low nibble of `st_info`.
    pub sym_type: SymbolType,
    /// Binding derived from the high nibble of `st_info`.
    pub bind: SymbolBind,
}

impl Symbol {
    /// Derive type and binding from a raw record of `table`.
    #[must_use]
    pub fn new(raw: Elf64Symbol, table: SymbolTableKind) -> Self {
        Self {
            raw,
            table,
            sym_type: SymbolType::from(raw.sym_type()),
            bind: SymbolBind::from(raw.sym_bind()),
        }
    }

    /// Resolve the display name.
    ///
    /// Section symbols take the name of the section they describe; every
    /// other symbol is looked up in `strtab`, the string table paired with
    /// [`Symbol::table`].
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::MissingStringTable`] if a string-table name is
    /// needed but `strtab` is `None`, and [`ElfError::IndexOutOfRange`] if
    /// the name offset or referenced section does not exist.
    pub fn name<'a>(
        &self,
        sections: &'a SectionCatalog,
        strtab: Option<&'a StringTable>,
    ) -> Result<Cow<'a, str>, ElfError> {
        match self.sym_type {
            SymbolType::Section => sections.name_of(usize::from(self.raw.st_shndx)),
            _ => strtab.ok_or(ElfError::MissingStringTable)?.get(self.raw.st_name),
        }
    }

    /// Symbol value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.raw.st_value
    }

    /// Symbol size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.raw.st_size
    }

    /// Classify the symbol's section index.
    #[must_use]
    pub fn section(&self) -> SymbolSection {
        SymbolSection::from(self.raw.st_shndx)
    }

    /// Display label for the symbol's section: a fixed label for the
    /// reserved indices, the section's name otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::IndexOutOfRange`] if the index is neither reserved
    /// nor a section of `sections`.
    pub fn section_name<'a>(
        &self,
        sections: &'a SectionCatalog,
    ) -> Result<Cow<'a, str>, ElfError> {
        match self.section() {
            SymbolSection::Undefined => Ok(Cow::Borrowed("SHN_UNDEF")),
            SymbolSection::Absolute => Ok(Cow::Borrowed("SHN_ABS")),
            SymbolSection::Common => Ok(Cow::Borrowed("SHN_COMMON")),
            SymbolSection::Index(index) => sections.name_of(usize::from(index)),
        }
    }
}

/// Decode one symbol table section.
///
/// # Errors
///
/// Returns [`ElfError::InvalidEntrySize`] if the section's entry size is not
/// 24 and [`ElfError::TruncatedInput`] if the section runs past the stream.
pub fn read_symbols<R: Read + Seek>(
    source: &mut ByteSource<'_, R>,
    section: &Section,
    table: SymbolTableKind,
) -> Result<Vec<Symbol>, ElfError> {
    let raw: Vec<Elf64Symbol> = read_table(source, &section.header)?;
    log::trace!("section {}: {} symbols", section.index, raw.len());
    Ok(raw.into_iter().map(|sym| Symbol::new(sym, table)).collect())
}
