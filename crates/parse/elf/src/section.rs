//! ELF64 section header table and the section catalog.

use core::fmt;
use std::borrow::Cow;
use std::io::{Read, Seek};

use crate::decode::{Record, read_records};
use crate::header::{ELF64_SHDR_SIZE, Elf64Header, ElfError, le_u32, le_u64};
use crate::source::ByteSource;
use crate::strtab::StringTable;

/// Section type: inactive header.
pub const SHT_NULL: u32 = 0;

/// Section type: program-defined contents.
pub const SHT_PROGBITS: u32 = 1;

/// Section type: symbol table.
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: relocation entries with addends.
pub const SHT_RELA: u32 = 4;

/// Section type: symbol hash table.
pub const SHT_HASH: u32 = 5;

/// Section type: dynamic linking information.
pub const SHT_DYNAMIC: u32 = 6;

/// Section type: notes.
pub const SHT_NOTE: u32 = 7;

/// Section type: occupies no file space (`.bss`).
pub const SHT_NOBITS: u32 = 8;

/// Section type: relocation entries without addends.
pub const SHT_REL: u32 = 9;

/// Section type: dynamic symbol table.
pub const SHT_DYNSYM: u32 = 11;

/// Section type: array of constructors.
pub const SHT_INIT_ARRAY: u32 = 14;

/// Section type: array of destructors.
pub const SHT_FINI_ARRAY: u32 = 15;

/// Section type: GNU-style hash table.
pub const SHT_GNU_HASH: u32 = 0x6fff_fff6;

/// Section type: GNU version needs.
pub const SHT_GNU_VERNEED: u32 = 0x6fff_fffe;

/// Section type: GNU symbol versions.
pub const SHT_GNU_VERSYM: u32 = 0x6fff_ffff;

/// Section flag: writable data.
pub const SHF_WRITE: u64 = 0x1;

/// Section flag: occupies memory during execution.
pub const SHF_ALLOC: u64 = 0x2;

/// Section flag: executable machine instructions.
pub const SHF_EXECINSTR: u64 = 0x4;

/// Parsed ELF64 section header entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Elf64SectionHeader {
    /// Offset into the section header string table for this section's name.
    pub sh_name: u32,
    /// Section type (`SHT_SYMTAB`, `SHT_STRTAB`, etc.).
    pub sh_type: u32,
    /// Section flags.
    pub sh_flags: u64,
    /// Virtual address of the section in memory (0 for non-loaded sections).
    pub sh_addr: u64,
    /// File offset of the section data.
    pub sh_offset: u64,
    /// Size of the section data in bytes.
    pub sh_size: u64,
    /// Associated section index (e.g., `.strtab` index for `.symtab`).
    pub sh_link: u32,
    /// Extra info (interpretation depends on section type).
    pub sh_info: u32,
    /// Required alignment of the section.
    pub sh_addralign: u64,
    /// Size of each entry (for sections with fixed-size entries).
    pub sh_entsize: u64,
}

impl Record for Elf64SectionHeader {
    const SIZE: usize = ELF64_SHDR_SIZE;

    fn decode(b: &[u8]) -> Self {
        Self {
            sh_name: le_u32(b, 0),
            sh_type: le_u32(b, 4),
            sh_flags: le_u64(b, 8),
            sh_addr: le_u64(b, 16),
            sh_offset: le_u64(b, 24),
            sh_size: le_u64(b, 32),
            sh_link: le_u32(b, 40),
            sh_info: le_u32(b, 44),
            sh_addralign: le_u64(b, 48),
            sh_entsize: le_u64(b, 56),
        }
    }
}

/// Section type descriptor; unknown types display as their raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionType(pub u32);

impl SectionType {
    /// The `SHT_*` name of this type, if it is one this crate knows.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            SHT_NULL => "SHT_NULL",
            SHT_PROGBITS => "SHT_PROGBITS",
            SHT_SYMTAB => "SHT_SYMTAB",
            SHT_STRTAB => "SHT_STRTAB",
            SHT_RELA => "SHT_RELA",
            SHT_HASH => "SHT_HASH",
            SHT_DYNAMIC => "SHT_DYNAMIC",
            SHT_NOTE => "SHT_NOTE",
            SHT_NOBITS => "SHT_NOBITS",
            SHT_REL => "SHT_REL",
            SHT_DYNSYM => "SHT_DYNSYM",
            SHT_INIT_ARRAY => "SHT_INIT_ARRAY",
            SHT_FINI_ARRAY => "SHT_FINI_ARRAY",
            SHT_GNU_HASH => "SHT_GNU_HASH",
            SHT_GNU_VERNEED => "SHT_GNU_VERNEED",
            SHT_GNU_VERSYM => "SHT_GNU_VERSYM",
            _ => return None,
        })
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Section flags word; displays the `SHF_WRITE`/`SHF_ALLOC`/`SHF_EXECINSTR` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionFlags(pub u64);

impl SectionFlags {
    /// Returns `true` if every bit of `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: u64) -> bool {
        self.0 & flag == flag
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (SHF_WRITE, "SHF_WRITE"),
            (SHF_ALLOC, "SHF_ALLOC"),
            (SHF_EXECINSTR, "SHF_EXECINSTR"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.contains(bit) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One entry of the section header table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Position of this header in the section header table.
    pub index: usize,
    /// The raw section header.
    pub header: Elf64SectionHeader,
}

impl Section {
    /// Offset of this section's name in the section header string table.
    #[must_use]
    pub fn name_offset(&self) -> u32 {
        self.header.sh_name
    }

    /// Section type descriptor.
    #[must_use]
    pub fn section_type(&self) -> SectionType {
        SectionType(self.header.sh_type)
    }

    /// Section flags.
    #[must_use]
    pub fn flags(&self) -> SectionFlags {
        SectionFlags(self.header.sh_flags)
    }
}

/// All sections of a file in on-disk order, with the section name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCatalog {
    sections: Vec<Section>,
    names: Option<StringTable>,
}

impl SectionCatalog {
    /// Read the section header table and the section header string table.
    ///
    /// `e_shstrndx == SHN_UNDEF` means the file carries no section names.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::TruncatedInput`] if the header table or the name
    /// table runs past the stream, and [`ElfError::IndexOutOfRange`] if
    /// `e_shstrndx` names no section.
    pub fn read<R: Read + Seek>(
        source: &mut ByteSource<'_, R>,
        header: &Elf64Header,
    ) -> Result<Self, ElfError> {
        let headers: Vec<Elf64SectionHeader> =
            read_records(source, header.e_shoff, u64::from(header.e_shnum))?;
        let sections: Vec<Section> = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| Section { index, header })
            .collect();
        log::trace!("read {} section headers at {:#x}", sections.len(), header.e_shoff);

        let names = match header.e_shstrndx {
            0 => None,
            shstrndx => {
                let shstrtab = sections
                    .get(usize::from(shstrndx))
                    .ok_or(ElfError::IndexOutOfRange)?;
                Some(StringTable::read(source, &shstrtab.header)?)
            }
        };

        Ok(Self::new(sections, names))
    }

    /// Assemble a catalog from already decoded parts.
    #[must_use]
    pub fn new(sections: Vec<Section>, names: Option<StringTable>) -> Self {
        Self { sections, names }
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if the file has no section headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterate over sections in on-disk order.
    pub fn iter(&self) -> core::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// Iterate over sections of the given type.
    pub fn of_type(&self, sh_type: u32) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(move |s| s.header.sh_type == sh_type)
    }

    /// The section at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::IndexOutOfRange`] if there is no such section.
    pub fn get(&self, index: usize) -> Result<&Section, ElfError> {
        self.sections.get(index).ok_or(ElfError::IndexOutOfRange)
    }

    /// The section header string table, if the file has one.
    #[must_use]
    pub fn name_table(&self) -> Option<&StringTable> {
        self.names.as_ref()
    }

    /// Resolve a section's display name through the section header string table.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::MissingStringTable`] if the file has no section
    /// names and [`ElfError::IndexOutOfRange`] if the name offset is past it.
    pub fn name(&self, section: &Section) -> Result<Cow<'_, str>, ElfError> {
        self.names
            .as_ref()
            .ok_or(ElfError::MissingStringTable)?
            .get(section.name_offset())
    }

    /// Resolve the display name of the section at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::IndexOutOfRange`] if there is no such section, or
    /// any error of [`SectionCatalog::name`].
    pub fn name_of(&self, index: usize) -> Result<Cow<'_, str>, ElfError> {
        self.name(self.get(index)?)
    }

    /// Find the first section with the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| self.name(s).is_ok_and(|n| n == name))
    }
}

impl<'a> IntoIterator for &'a SectionCatalog {
    type Item = &'a Section;
    type IntoIter = core::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ElfBuilder, SectionSpec};
    use std::io::Cursor;

    fn catalog(buf: &[u8]) -> Result<SectionCatalog, ElfError> {
        let mut cursor = Cursor::new(buf);
        let mut source = ByteSource::new(&mut cursor)?;
        let header = Elf64Header::read(&mut source)?;
        SectionCatalog::read(&mut source, &header)
    }

    fn sample() -> Vec<u8> {
        ElfBuilder::new()
            .section(
                SectionSpec::new(".text", SHT_PROGBITS)
                    .flags(SHF_ALLOC | SHF_EXECINSTR)
                    .data(vec![0x90; 16]),
            )
            .section(
                SectionSpec::new(".data", SHT_PROGBITS)
                    .flags(SHF_ALLOC | SHF_WRITE)
                    .addr(0x4000)
                    .data(vec![1, 2, 3, 4]),
            )
            .section(SectionSpec::new(".bss", SHT_NOBITS).flags(SHF_ALLOC | SHF_WRITE))
            .build()
    }

    #[test]
    fn no_sections_yields_empty_catalog() {
        let buf = ElfBuilder::new().without_section_table().build();
        let catalog = catalog(&buf).expect("valid ELF");
        assert!(catalog.is_empty());
        assert!(catalog.name_table().is_none());
    }

    #[test]
    fn sections_keep_on_disk_order_and_ordinals() {
        let buf = sample();
        let catalog = catalog(&buf).expect("valid ELF");

        // NULL, .text, .data, .bss, .shstrtab
        assert_eq!(catalog.len(), 5);
        for (i, section) in catalog.iter().enumerate() {
            assert_eq!(section.index, i);
        }
        assert_eq!(catalog.get(0).unwrap().section_type(), SectionType(SHT_NULL));
        assert_eq!(catalog.get(2).unwrap().header.sh_addr, 0x4000);
        assert_eq!(catalog.get(3).unwrap().section_type().to_string(), "SHT_NOBITS");
    }

    #[test]
    fn names_resolve_through_shstrtab() {
        let buf = sample();
        let catalog = catalog(&buf).expect("valid ELF");

        let names: Vec<String> = catalog
            .iter()
            .map(|s| catalog.name(s).unwrap().into_owned())
            .collect();
        assert_eq!(names, ["", ".text", ".data", ".bss", ".shstrtab"]);

        // The offset stored in the header points at exactly that string.
        let text = catalog.find_by_name(".text").unwrap();
        let table = catalog.name_table().unwrap().as_bytes();
        let at = text.name_offset() as usize;
        assert_eq!(&table[at..at + 6], b".text\0");
    }

    #[test]
    fn find_and_filter() {
        let buf = sample();
        let catalog = catalog(&buf).expect("valid ELF");
        assert_eq!(catalog.find_by_name(".data").map(|s| s.index), Some(2));
        assert!(catalog.find_by_name(".debug_info").is_none());
        assert_eq!(catalog.of_type(SHT_PROGBITS).count(), 2);
        assert_eq!(catalog.get(9), Err(ElfError::IndexOutOfRange));
        assert_eq!(catalog.name_of(9), Err(ElfError::IndexOutOfRange));
    }

    #[test]
    fn truncated_section_table() {
        let mut buf = sample();
        let len = buf.len();
        buf.truncate(len - 10);
        assert_eq!(catalog(&buf), Err(ElfError::TruncatedInput));
    }

    #[test]
    fn shstrndx_out_of_range() {
        let mut buf = sample();
        buf[62..64].copy_from_slice(&40u16.to_le_bytes());
        assert_eq!(catalog(&buf), Err(ElfError::IndexOutOfRange));
    }

    #[test]
    fn undefined_shstrndx_means_no_names() {
        let mut buf = sample();
        buf[62..64].copy_from_slice(&0u16.to_le_bytes());
        let catalog = catalog(&buf).expect("valid ELF");
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.name_of(1), Err(ElfError::MissingStringTable));
    }

    #[test]
    fn flags_display() {
        assert_eq!(SectionFlags(SHF_ALLOC | SHF_EXECINSTR).to_string(), "SHF_ALLOC SHF_EXECINSTR");
        assert_eq!(SectionFlags(SHF_WRITE | SHF_ALLOC).to_string(), "SHF_WRITE SHF_ALLOC");
        assert_eq!(SectionFlags(0).to_string(), "");
        assert_eq!(SectionType(0x1234).to_string(), "4660");
    }
}
