//! String table sections (`.shstrtab`, `.strtab`, `.dynstr`).

use std::borrow::Cow;
use std::io::{Read, Seek};

use crate::header::ElfError;
use crate::section::Elf64SectionHeader;
use crate::source::ByteSource;

/// Conventional name of the section header string table.
pub const SHSTRTAB_NAME: &str = ".shstrtab";

/// Conventional name of the static symbol string table.
pub const STRTAB_NAME: &str = ".strtab";

/// Conventional name of the dynamic symbol string table.
pub const DYNSTR_NAME: &str = ".dynstr";

/// An owned copy of a string table section, indexed by byte offset.
///
/// The contents are kept verbatim, embedded NULs included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    data: Vec<u8>,
}

impl StringTable {
    /// Creates a string table from raw section contents.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load the contents of a string table section.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::TruncatedInput`] if the section runs past the stream.
    pub fn read<R: Read + Seek>(
        source: &mut ByteSource<'_, R>,
        shdr: &Elf64SectionHeader,
    ) -> Result<Self, ElfError> {
        source.read_range(shdr.sh_offset, shdr.sh_size).map(Self::new)
    }

    /// Looks up the NUL-terminated string starting at `offset`.
    ///
    /// A string missing its terminator runs to the end of the table. Invalid
    /// UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::IndexOutOfRange`] if `offset` is past the table.
    pub fn get(&self, offset: u32) -> Result<Cow<'_, str>, ElfError> {
        let start = usize::try_from(offset).map_err(|_| ElfError::IndexOutOfRange)?;
        let remaining = self.data.get(start..).ok_or(ElfError::IndexOutOfRange)?;
        if remaining.is_empty() {
            return Err(ElfError::IndexOutOfRange);
        }
        let end = remaining.iter().position(|&b| b == 0).unwrap_or(remaining.len());
        Ok(String::from_utf8_lossy(&remaining[..end]))
    }

    /// Size of the table in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the table holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw table contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
