//! ELF64 file header parsing and the crate-wide error type.
//!
//! The header is validated in a fixed order: length, magic, class, full
//! length, machine. The first failing gate decides the reported error.

use core::fmt;
use std::io::{self, Read, Seek};

use crate::source::ByteSource;

/// ELF magic bytes: `\x7fELF`.
pub(crate) const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 32-bit.
pub const ELFCLASS32: u8 = 1;

/// ELF class: 64-bit.
pub const ELFCLASS64: u8 = 2;

/// ELF type: relocatable object.
pub const ET_REL: u16 = 1;

/// ELF type: executable.
pub const ET_EXEC: u16 = 2;

/// ELF type: shared object (or PIE).
pub const ET_DYN: u16 = 3;

/// ELF type: core dump.
pub const ET_CORE: u16 = 4;

/// ELF machine: x86-64.
pub const EM_X86_64: u16 = 62;

/// Number of identification bytes needed to check magic and class.
const ELF_IDENT_PREFIX: usize = 5;

/// Size of an ELF64 file header (64 bytes).
pub(crate) const ELF64_EHDR_SIZE: usize = 64;

/// Size of an ELF64 section header entry (64 bytes).
pub(crate) const ELF64_SHDR_SIZE: usize = 64;

/// Read a little-endian `u16` from `data` at byte offset `off`.
///
/// # Panics
///
/// Panics if `off + 2 > data.len()`. Callers must bounds-check first.
pub(crate) fn le_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `u32` from `data` at byte offset `off`.
pub(crate) fn le_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `u64` from `data` at byte offset `off`.
pub(crate) fn le_u64(data: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `i64` from `data` at byte offset `off`.
pub(crate) fn le_i64(data: &[u8], off: usize) -> i64 {
    i64::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Errors that can occur while decoding an ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// The file does not start with the ELF magic bytes.
    NotAnElfFile,
    /// The ELF file is not 64-bit (`ELFCLASS64`).
    UnsupportedClass,
    /// The ELF machine type is not `EM_X86_64`.
    UnsupportedArchitecture,
    /// The input ended before a declared structure did.
    TruncatedInput,
    /// A table section declares an entry size that does not match its record.
    InvalidEntrySize,
    /// An index or offset points outside the table it refers to.
    IndexOutOfRange,
    /// A lookup needed `.strtab` or `.dynstr` but the file has none.
    MissingStringTable,
    /// The underlying reader failed for a reason other than end of input.
    Io(io::ErrorKind),
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnElfFile => write!(f, "not an ELF file (bad magic bytes)"),
            Self::UnsupportedClass => write!(f, "unsupported ELF class (expected ELFCLASS64)"),
            Self::UnsupportedArchitecture => {
                write!(f, "unsupported machine type (expected EM_X86_64)")
            }
            Self::TruncatedInput => write!(f, "input data truncated"),
            Self::InvalidEntrySize => write!(f, "section entry size does not match record size"),
            Self::IndexOutOfRange => write!(f, "table index or offset out of range"),
            Self::MissingStringTable => write!(f, "required string table not present"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for ElfError {}

impl From<io::Error> for ElfError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::TruncatedInput,
            kind => Self::Io(kind),
        }
    }
}

/// ELF file class, taken from `e_ident[EI_CLASS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// `ELFCLASS32`.
    Elf32,
    /// `ELFCLASS64`.
    Elf64,
    /// Any other class byte.
    Unknown(u8),
}

impl From<u8> for ElfClass {
    fn from(raw: u8) -> Self {
        match raw {
            ELFCLASS32 => Self::Elf32,
            ELFCLASS64 => Self::Elf64,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ElfClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elf32 => f.write_str("ELF32"),
            Self::Elf64 => f.write_str("ELF64"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// ELF object file type, taken from `e_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfType {
    /// `ET_REL`: relocatable object, usually a `.o` file.
    Relocatable,
    /// `ET_EXEC`: executable.
    Executable,
    /// `ET_DYN`: shared object or position-independent executable.
    SharedObject,
    /// `ET_CORE`: core dump.
    Core,
    /// Any other type value.
    Unknown(u16),
}

impl From<u16> for ElfType {
    fn from(raw: u16) -> Self {
        match raw {
            ET_REL => Self::Relocatable,
            ET_EXEC => Self::Executable,
            ET_DYN => Self::SharedObject,
            ET_CORE => Self::Core,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ElfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relocatable => f.write_str("ET_REL (relocatable file)"),
            Self::Executable => f.write_str("ET_EXEC (executable file)"),
            Self::SharedObject => f.write_str("ET_DYN (shared object file)"),
            Self::Core => f.write_str("ET_CORE (core file)"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// Parsed ELF64 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Header {
    /// Identification bytes (`e_ident`).
    pub e_ident: [u8; 16],
    /// Object file type.
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// Object file version.
    pub e_version: u32,
    /// Virtual address of the entry point.
    pub e_entry: u64,
    /// Offset of the program header table in the file.
    pub e_phoff: u64,
    /// Offset of the section header table in the file.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header.
    pub e_ehsize: u16,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl Elf64Header {
    /// Read and validate the file header from the start of `source`.
    ///
    /// The stream position is restored afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if the stream is not a 64-bit x86-64 ELF file.
    pub fn read<R: Read + Seek>(source: &mut ByteSource<'_, R>) -> Result<Self, ElfError> {
        let available = source.len().min(ELF64_EHDR_SIZE as u64);
        let data = source.read_range(0, available)?;
        Self::parse(&data)
    }

    /// Parse an ELF64 file header from raw bytes.
    ///
    /// `data` is the beginning of the file; it may be shorter than a full
    /// header, in which case the identification checks still run first.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if validation fails or the data is too short.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < ELF_IDENT_PREFIX {
            return Err(ElfError::TruncatedInput);
        }

        if data[..4] != ELF_MAGIC {
            return Err(ElfError::NotAnElfFile);
        }

        if data[4] != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass);
        }

        if data.len() < ELF64_EHDR_SIZE {
            return Err(ElfError::TruncatedInput);
        }

        let e_machine = le_u16(data, 18);
        if e_machine != EM_X86_64 {
            return Err(ElfError::UnsupportedArchitecture);
        }

        let mut e_ident = [0u8; 16];
        e_ident.copy_from_slice(&data[..16]);

        let header = Self {
            e_ident,
            e_type: le_u16(data, 16),
            e_machine,
            e_version: le_u32(data, 20),
            e_entry: le_u64(data, 24),
            e_phoff: le_u64(data, 32),
            e_shoff: le_u64(data, 40),
            e_flags: le_u32(data, 48),
            e_ehsize: le_u16(data, 52),
            e_phentsize: le_u16(data, 54),
            e_phnum: le_u16(data, 56),
            e_shentsize: le_u16(data, 58),
            e_shnum: le_u16(data, 60),
            e_shstrndx: le_u16(data, 62),
        };

        if header.e_shnum > 0 && usize::from(header.e_shentsize) != ELF64_SHDR_SIZE {
            return Err(ElfError::InvalidEntrySize);
        }

        Ok(header)
    }

    /// Returns the file class descriptor.
    #[must_use]
    pub fn class(&self) -> ElfClass {
        ElfClass::from(self.e_ident[4])
    }

    /// Returns the object file type descriptor.
    #[must_use]
    pub fn elf_type(&self) -> ElfType {
        ElfType::from(self.e_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_elf_header;

    #[test]
    fn parse_valid_header() {
        let buf = make_elf_header();
        let hdr = Elf64Header::parse(&buf).expect("valid header");
        assert_eq!(hdr.e_type, ET_REL);
        assert_eq!(hdr.e_machine, EM_X86_64);
        assert_eq!(hdr.e_shnum, 0);
        assert_eq!(hdr.class(), ElfClass::Elf64);
        assert_eq!(hdr.elf_type(), ElfType::Relocatable);
    }

    #[test]
    fn accepts_every_object_type() {
        for (raw, expected) in [
            (ET_REL, ElfType::Relocatable),
            (ET_EXEC, ElfType::Executable),
            (ET_DYN, ElfType::SharedObject),
            (0x1234, ElfType::Unknown(0x1234)),
        ] {
            let mut buf = make_elf_header();
            buf[16..18].copy_from_slice(&raw.to_le_bytes());
            let hdr = Elf64Header::parse(&buf).expect("type is not validated");
            assert_eq!(hdr.elf_type(), expected);
        }
    }

    #[test]
    fn reject_bad_magic() {
        let mut buf = make_elf_header();
        buf[1] = b'X';
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::NotAnElfFile));
    }

    #[test]
    fn reject_32bit_class() {
        let mut buf = make_elf_header();
        buf[4] = ELFCLASS32;
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedClass));
    }

    #[test]
    fn reject_unknown_class() {
        let mut buf = make_elf_header();
        buf[4] = 7;
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedClass));
    }

    #[test]
    fn reject_wrong_machine() {
        let mut buf = make_elf_header();
        buf[18..20].copy_from_slice(&0x03u16.to_le_bytes()); // EM_386
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedArchitecture));
    }

    #[test]
    fn reject_truncated_ident() {
        assert_eq!(Elf64Header::parse(&[0x7f, b'E', b'L']), Err(ElfError::TruncatedInput));
        assert_eq!(Elf64Header::parse(&[]), Err(ElfError::TruncatedInput));
    }

    #[test]
    fn short_non_elf_reports_magic_before_length() {
        // Five bytes are enough to look at the magic and class.
        assert_eq!(Elf64Header::parse(b"MZ\x90\x00\x03"), Err(ElfError::NotAnElfFile));
    }

    #[test]
    fn reject_truncated_after_ident() {
        let buf = make_elf_header();
        assert_eq!(Elf64Header::parse(&buf[..32]), Err(ElfError::TruncatedInput));
    }

    #[test]
    fn reject_bad_section_entry_size() {
        let mut buf = make_elf_header();
        buf[58..60].copy_from_slice(&40u16.to_le_bytes());
        buf[60..62].copy_from_slice(&1u16.to_le_bytes());
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::InvalidEntrySize));
    }

    #[test]
    fn io_errors_map_to_truncation_or_kind() {
        let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert_eq!(ElfError::from(eof), ElfError::TruncatedInput);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(ElfError::from(denied), ElfError::Io(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn display_errors() {
        let errors = [
            ElfError::NotAnElfFile,
            ElfError::UnsupportedClass,
            ElfError::UnsupportedArchitecture,
            ElfError::TruncatedInput,
            ElfError::InvalidEntrySize,
            ElfError::IndexOutOfRange,
            ElfError::MissingStringTable,
            ElfError::Io(io::ErrorKind::Other),
        ];
        for err in &errors {
            let msg = format!("{err}");
            assert!(!msg.is_empty());
        }
    }
}
