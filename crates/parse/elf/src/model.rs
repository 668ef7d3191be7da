//! The decoded file model and the pipeline that builds it.
//!
//! Pipeline: header → section headers → `.shstrtab` → `.strtab`/`.dynstr` →
//! symbol tables → relocations → dynamic entries. Each stage either succeeds
//! or aborts the whole parse; callers only ever see a complete [`ElfModel`].

use std::borrow::Cow;
use std::io::{Cursor, Read, Seek};

use crate::dynamic::{DynamicEntry, DynamicValue, read_dynamic};
use crate::header::{Elf64Header, ElfClass, ElfError, ElfType};
use crate::reloc::{Relocation, RelocationIndex, symbol_table_for};
use crate::section::{SHT_DYNAMIC, SHT_RELA, SHT_STRTAB, SectionCatalog};
use crate::source::ByteSource;
use crate::strtab::StringTable;
use crate::symbol::{Symbol, SymbolTableKind, read_symbols};

/// An immutable, fully cross-referenced view of one ELF64 x86-64 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfModel {
    header: Elf64Header,
    sections: SectionCatalog,
    strtab: Option<StringTable>,
    dynstr: Option<StringTable>,
    symbols: Vec<Symbol>,
    dynamic_symbols: Vec<Symbol>,
    relocations: RelocationIndex,
    dynamics: Vec<DynamicEntry>,
}

impl ElfModel {
    /// Decode a complete model from `reader`.
    ///
    /// The reader's position is left where it was; the reader is not closed.
    ///
    /// # Errors
    ///
    /// Returns the [`ElfError`] of the first stage that fails.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self, ElfError> {
        let mut source = ByteSource::new(reader)?;

        let header = Elf64Header::read(&mut source)?;
        log::debug!(
            "header: {} {}, {} sections at {:#x}",
            header.class(),
            header.elf_type(),
            header.e_shnum,
            header.e_shoff
        );

        let sections = SectionCatalog::read(&mut source, &header)?;
        log::debug!("section catalog: {} entries", sections.len());

        let (strtab, dynstr) = load_string_tables(&mut source, &sections)?;
        for (kind, table) in SymbolTableKind::ALL.into_iter().zip([&strtab, &dynstr]) {
            let found = if table.is_some() { "found" } else { "absent" };
            log::debug!("string table {}: {found}", kind.string_table_name());
        }

        let mut symbols = Vec::new();
        let mut dynamic_symbols = Vec::new();
        for kind in SymbolTableKind::ALL {
            let out = match kind {
                SymbolTableKind::Static => &mut symbols,
                SymbolTableKind::Dynamic => &mut dynamic_symbols,
            };
            for section in sections.of_type(kind.section_type()) {
                out.extend(read_symbols(&mut source, section, kind)?);
            }
        }
        log::debug!("symbols: {} static, {} dynamic", symbols.len(), dynamic_symbols.len());

        let mut relocations = RelocationIndex::default();
        for section in sections.of_type(SHT_RELA) {
            let name = sections.name(section)?;
            relocations.read_section(&mut source, section, &name)?;
        }
        log::debug!("relocations: {} sections", relocations.len());

        let mut dynamics = Vec::new();
        for section in sections.of_type(SHT_DYNAMIC) {
            dynamics.extend(read_dynamic(&mut source, section)?);
        }
        log::debug!("dynamic entries: {}", dynamics.len());

        Ok(Self {
            header,
            sections,
            strtab,
            dynstr,
            symbols,
            dynamic_symbols,
            relocations,
            dynamics,
        })
    }

    /// Decode a complete model from an in-memory image.
    ///
    /// # Errors
    ///
    /// Returns the [`ElfError`] of the first stage that fails.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ElfError> {
        Self::parse(&mut Cursor::new(data))
    }

    /// The file header.
    #[must_use]
    pub fn header(&self) -> &Elf64Header {
        &self.header
    }

    /// File class descriptor (always `ELF64` for a decoded model).
    #[must_use]
    pub fn class(&self) -> ElfClass {
        self.header.class()
    }

    /// Object file type descriptor.
    #[must_use]
    pub fn elf_type(&self) -> ElfType {
        self.header.elf_type()
    }

    /// All sections in on-disk order.
    #[must_use]
    pub fn sections(&self) -> &SectionCatalog {
        &self.sections
    }

    /// The `.strtab` contents, if present.
    #[must_use]
    pub fn string_table(&self) -> Option<&StringTable> {
        self.strtab.as_ref()
    }

    /// The `.dynstr` contents, if present.
    #[must_use]
    pub fn dynamic_string_table(&self) -> Option<&StringTable> {
        self.dynstr.as_ref()
    }

    /// The string table naming the symbols of `kind`, if present.
    #[must_use]
    pub fn string_table_for(&self, kind: SymbolTableKind) -> Option<&StringTable> {
        match kind {
            SymbolTableKind::Static => self.string_table(),
            SymbolTableKind::Dynamic => self.dynamic_string_table(),
        }
    }

    /// Symbols of the given table, in table order.
    #[must_use]
    pub fn symbols(&self, kind: SymbolTableKind) -> &[Symbol] {
        match kind {
            SymbolTableKind::Static => &self.symbols,
            SymbolTableKind::Dynamic => &self.dynamic_symbols,
        }
    }

    /// Symbols from `.symtab`.
    #[must_use]
    pub fn static_symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Symbols from `.dynsym`.
    #[must_use]
    pub fn dynamic_symbols(&self) -> &[Symbol] {
        &self.dynamic_symbols
    }

    /// Relocations grouped by owning section name.
    #[must_use]
    pub fn relocations(&self) -> &RelocationIndex {
        &self.relocations
    }

    /// Entries of the dynamic section(s).
    #[must_use]
    pub fn dynamics(&self) -> &[DynamicEntry] {
        &self.dynamics
    }

    /// Display name of a symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::MissingStringTable`] if the symbol's table has no
    /// string table, and [`ElfError::IndexOutOfRange`] if its name offset or
    /// described section does not exist.
    pub fn symbol_name(&self, symbol: &Symbol) -> Result<Cow<'_, str>, ElfError> {
        symbol.name(&self.sections, self.string_table_for(symbol.table))
    }

    /// Display label of a symbol's section.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::IndexOutOfRange`] if the symbol's section index is
    /// neither reserved nor an existing section.
    pub fn symbol_section_name(&self, symbol: &Symbol) -> Result<Cow<'_, str>, ElfError> {
        symbol.section_name(&self.sections)
    }

    /// The symbol a relocation from section `section_name` refers to.
    ///
    /// Returns `None` when the section's name does not identify a symbol
    /// table or the index is outside that table.
    #[must_use]
    pub fn relocation_symbol(&self, section_name: &str, reloc: &Relocation) -> Option<&Symbol> {
        let kind = symbol_table_for(section_name)?;
        let index = usize::try_from(reloc.symbol_index).ok()?;
        self.symbols(kind).get(index)
    }

    /// Interpret a dynamic entry's value, resolving names through `.dynstr`.
    ///
    /// # Errors
    ///
    /// See [`DynamicEntry::value`].
    pub fn dynamic_value(&self, entry: &DynamicEntry) -> Result<DynamicValue<'_>, ElfError> {
        entry.value(self.dynstr.as_ref())
    }
}

/// Find and load the string table of each symbol table kind among the
/// `SHT_STRTAB` sections.
fn load_string_tables<R: Read + Seek>(
    source: &mut ByteSource<'_, R>,
    sections: &SectionCatalog,
) -> Result<(Option<StringTable>, Option<StringTable>), ElfError> {
    if sections.name_table().is_none() {
        return Ok((None, None));
    }
    let mut found = [None, None];
    for section in sections.of_type(SHT_STRTAB) {
        let name = sections.name(section)?;
        for (slot, kind) in found.iter_mut().zip(SymbolTableKind::ALL) {
            if name == kind.string_table_name() {
                *slot = Some(StringTable::read(source, &section.header)?);
            }
        }
    }
    let [strtab, dynstr] = found;
    Ok((strtab, dynstr))
}

/// Holds the most recently decoded model.
///
/// [`ElfReader::read`] replaces the held model only when the new parse
/// succeeds completely.
#[derive(Debug, Clone, Default)]
pub struct ElfReader {
    model: Option<ElfModel>,
}

impl ElfReader {
    /// Creates a reader holding no model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `reader` and, on success, make the result the held model.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the previously held model is kept.
    pub fn read<R: Read + Seek>(&mut self, reader: &mut R) -> Result<&ElfModel, ElfError> {
        let model = ElfModel::parse(reader)?;
        Ok(self.model.insert(model))
    }

    /// The held model, if any parse has succeeded.
    #[must_use]
    pub fn model(&self) -> Option<&ElfModel> {
        self.model.as_ref()
    }

    /// Consume the reader and return the held model.
    #[must_use]
    pub fn into_model(self) -> Option<ElfModel> {
        self.model
    }
}
