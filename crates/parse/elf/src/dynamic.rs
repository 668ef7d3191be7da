//! Dynamic section decoding (`.dynamic`).

use core::fmt;
use std::borrow::Cow;
use std::io::{Read, Seek};

use crate::decode::{Record, read_table};
use crate::header::{ElfError, le_i64, le_u64};
use crate::section::Section;
use crate::source::ByteSource;
use crate::strtab::StringTable;

/// Marks the end of the dynamic array.
pub const DT_NULL: i64 = 0;
/// Name of a needed library (string).
pub const DT_NEEDED: i64 = 1;
/// Size of the PLT relocations.
pub const DT_PLTRELSZ: i64 = 2;
/// Address of the PLT/GOT.
pub const DT_PLTGOT: i64 = 3;
/// Address of the symbol hash table.
pub const DT_HASH: i64 = 4;
/// Address of the dynamic string table.
pub const DT_STRTAB: i64 = 5;
/// Address of the dynamic symbol table.
pub const DT_SYMTAB: i64 = 6;
/// Address of the `Rela` relocations.
pub const DT_RELA: i64 = 7;
/// Total size of the `Rela` relocations.
pub const DT_RELASZ: i64 = 8;
/// Size of one `Rela` relocation.
pub const DT_RELAENT: i64 = 9;
/// Size of the dynamic string table.
pub const DT_STRSZ: i64 = 10;
/// Size of one symbol table entry.
pub const DT_SYMENT: i64 = 11;
/// Address of the initialization function.
pub const DT_INIT: i64 = 12;
/// Address of the termination function.
pub const DT_FINI: i64 = 13;
/// Name of this shared object (string).
pub const DT_SONAME: i64 = 14;
/// Library search path (string, deprecated).
pub const DT_RPATH: i64 = 15;
/// Start symbol search here.
pub const DT_SYMBOLIC: i64 = 16;
/// Address of the `Rel` relocations.
pub const DT_REL: i64 = 17;
/// Total size of the `Rel` relocations.
pub const DT_RELSZ: i64 = 18;
/// Size of one `Rel` relocation.
pub const DT_RELENT: i64 = 19;
/// Type of relocation used for the PLT.
pub const DT_PLTREL: i64 = 20;
/// Reserved for debugger use.
pub const DT_DEBUG: i64 = 21;
/// Relocations may modify a non-writable segment.
pub const DT_TEXTREL: i64 = 22;
/// Address of the PLT relocations.
pub const DT_JMPREL: i64 = 23;
/// Process relocations of this object eagerly.
pub const DT_BIND_NOW: i64 = 24;
/// Address of the array of initialization functions.
pub const DT_INIT_ARRAY: i64 = 25;
/// Address of the array of termination functions.
pub const DT_FINI_ARRAY: i64 = 26;
/// Size of the initialization array.
pub const DT_INIT_ARRAYSZ: i64 = 27;
/// Size of the termination array.
pub const DT_FINI_ARRAYSZ: i64 = 28;
/// Library search path (string).
pub const DT_RUNPATH: i64 = 29;
/// Flags for this object.
pub const DT_FLAGS: i64 = 30;
/// Address of the GNU-style hash table.
pub const DT_GNU_HASH: i64 = 0x6fff_fef5;
/// Number of `R_*_RELATIVE` `Rela` relocations.
pub const DT_RELACOUNT: i64 = 0x6fff_fff9;
/// State flags (`DF_1_*`).
pub const DT_FLAGS_1: i64 = 0x6fff_fffb;
/// Address of the symbol version table.
pub const DT_VERSYM: i64 = 0x6fff_fff0;
/// Address of the version-needed table.
pub const DT_VERNEED: i64 = 0x6fff_fffe;
/// Number of version-needed entries.
pub const DT_VERNEEDNUM: i64 = 0x6fff_ffff;

/// Size of an ELF64 dynamic entry (16 bytes).
const ELF64_DYN_SIZE: usize = 16;

/// A raw ELF64 dynamic entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Elf64Dyn {
    /// Entry tag.
    pub d_tag: i64,
    /// Value or address, depending on the tag.
    pub d_val: u64,
}

impl Record for Elf64Dyn {
    const SIZE: usize = ELF64_DYN_SIZE;

    fn decode(b: &[u8]) -> Self {
        Self {
            d_tag: le_i64(b, 0),
            d_val: le_u64(b, 8),
        }
    }
}

/// How the value of a dynamic entry should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicValueKind {
    /// A virtual address.
    Address,
    /// A size, count or flag word.
    Integer,
    /// An offset into `.dynstr`.
    String,
    /// The tag is not recognized; the value is shown raw.
    Unrecognized,
}

/// Dynamic tag descriptor; unknown tags display as their raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicTag(pub i64);

impl DynamicTag {
    /// The `DT_*` name of this tag, if known.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            DT_NULL => "DT_NULL",
            DT_NEEDED => "DT_NEEDED",
            DT_PLTRELSZ => "DT_PLTRELSZ",
            DT_PLTGOT => "DT_PLTGOT",
            DT_HASH => "DT_HASH",
            DT_STRTAB => "DT_STRTAB",
            DT_SYMTAB => "DT_SYMTAB",
            DT_RELA => "DT_RELA",
            DT_RELASZ => "DT_RELASZ",
            DT_RELAENT => "DT_RELAENT",
            DT_STRSZ => "DT_STRSZ",
            DT_SYMENT => "DT_SYMENT",
            DT_INIT => "DT_INIT",
            DT_FINI => "DT_FINI",
            DT_SONAME => "DT_SONAME",
            DT_RPATH => "DT_RPATH",
            DT_SYMBOLIC => "DT_SYMBOLIC",
            DT_REL => "DT_REL",
            DT_RELSZ => "DT_RELSZ",
            DT_RELENT => "DT_RELENT",
            DT_PLTREL => "DT_PLTREL",
            DT_DEBUG => "DT_DEBUG",
            DT_TEXTREL => "DT_TEXTREL",
            DT_JMPREL => "DT_JMPREL",
            DT_BIND_NOW => "DT_BIND_NOW",
            DT_INIT_ARRAY => "DT_INIT_ARRAY",
            DT_FINI_ARRAY => "DT_FINI_ARRAY",
            DT_INIT_ARRAYSZ => "DT_INIT_ARRAYSZ",
            DT_FINI_ARRAYSZ => "DT_FINI_ARRAYSZ",
            DT_RUNPATH => "DT_RUNPATH",
            DT_FLAGS => "DT_FLAGS",
            DT_GNU_HASH => "DT_GNU_HASH",
            DT_RELACOUNT => "DT_RELACOUNT",
            DT_FLAGS_1 => "DT_FLAGS_1",
            DT_VERSYM => "DT_VERSYM",
            DT_VERNEED => "DT_VERNEED",
            DT_VERNEEDNUM => "DT_VERNEEDNUM",
            _ => return None,
        })
    }

    /// How this tag's value is interpreted.
    #[must_use]
    pub const fn value_kind(self) -> DynamicValueKind {
        match self.0 {
            DT_PLTGOT | DT_HASH | DT_STRTAB | DT_SYMTAB | DT_RELA | DT_INIT | DT_FINI
            | DT_REL | DT_JMPREL | DT_DEBUG | DT_INIT_ARRAY | DT_FINI_ARRAY | DT_GNU_HASH
            | DT_VERSYM | DT_VERNEED => DynamicValueKind::Address,
            DT_NULL | DT_PLTRELSZ | DT_RELASZ | DT_RELAENT | DT_STRSZ | DT_SYMENT
            | DT_SYMBOLIC | DT_RELSZ | DT_RELENT | DT_PLTREL | DT_TEXTREL | DT_BIND_NOW
            | DT_INIT_ARRAYSZ | DT_FINI_ARRAYSZ | DT_FLAGS | DT_FLAGS_1 | DT_VERNEEDNUM
            | DT_RELACOUNT => DynamicValueKind::Integer,
            DT_NEEDED | DT_SONAME | DT_RPATH | DT_RUNPATH => DynamicValueKind::String,
            _ => DynamicValueKind::Unrecognized,
        }
    }
}

impl fmt::Display for DynamicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The interpreted value of a dynamic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicValue<'a> {
    /// A virtual address.
    Address(u64),
    /// A size, count or flag word.
    Integer(u64),
    /// A name from `.dynstr`.
    String(Cow<'a, str>),
    /// The raw value of an unrecognized tag.
    Raw(u64),
}

impl fmt::Display for DynamicValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{addr:#x}"),
            Self::Integer(val) | Self::Raw(val) => write!(f, "{val}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// One entry of a dynamic section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    /// The raw dynamic record.
    pub raw: Elf64Dyn,
    /// Tag descriptor.
    pub tag: DynamicTag,
}

impl From<Elf64Dyn> for DynamicEntry {
    fn from(raw: Elf64Dyn) -> Self {
        Self {
            raw,
            tag: DynamicTag(raw.d_tag),
        }
    }
}

impl DynamicEntry {
    /// Interpret the entry's value according to its tag.
    ///
    /// # Errors
    ///
    /// For string-valued tags, returns [`ElfError::MissingStringTable`] if
    /// `dynstr` is `None` and [`ElfError::IndexOutOfRange`] if the offset is
    /// outside it.
    pub fn value<'a>(&self, dynstr: Option<&'a StringTable>) -> Result<DynamicValue<'a>, ElfError> {
        let val = self.raw.d_val;
        Ok(match self.tag.value_kind() {
            DynamicValueKind::Address => DynamicValue::Address(val),
            DynamicValueKind::Integer => DynamicValue::Integer(val),
            DynamicValueKind::Unrecognized => DynamicValue::Raw(val),
            DynamicValueKind::String => {
                let offset = u32::try_from(val).map_err(|_| ElfError::IndexOutOfRange)?;
                let table = dynstr.ok_or(ElfError::MissingStringTable)?;
                DynamicValue::String(table.get(offset)?)
            }
        })
    }
}

/// Decode one `SHT_DYNAMIC` section.
///
/// # Errors
///
/// Returns [`ElfError::InvalidEntrySize`] if the entry size is not 16 and
/// [`ElfError::TruncatedInput`] if the section runs past the stream.
pub fn read_dynamic<R: Read + Seek>(
    source: &mut ByteSource<'_, R>,
    section: &Section,
) -> Result<Vec<DynamicEntry>, ElfError> {
    let raw: Vec<Elf64Dyn> = read_table(source, &section.header)?;
    log::trace!("section {}: {} dynamic entries", section.index, raw.len());
    Ok(raw.into_iter().map(DynamicEntry::from).collect())
}
