//! Fixed-layout record decoding.
//!
//! Every ELF table (section headers, symbols, `Rela` entries, dynamic
//! entries) is an array of little-endian records of one size. [`Record`]
//! describes a record layout; [`read_table`] decodes a whole table section
//! after checking that its declared entry size matches the layout.

use std::io::{Read, Seek};

use crate::header::ElfError;
use crate::section::Elf64SectionHeader;
use crate::source::ByteSource;

/// A fixed-size little-endian on-disk record.
pub trait Record: Sized {
    /// Size of one encoded record in bytes.
    const SIZE: usize;

    /// Decode one record from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Self;
}

/// Decode `count` consecutive records starting at file offset `offset`.
///
/// # Errors
///
/// Returns [`ElfError::TruncatedInput`] if the records run past the stream.
pub fn read_records<T: Record, R: Read + Seek>(
    source: &mut ByteSource<'_, R>,
    offset: u64,
    count: u64,
) -> Result<Vec<T>, ElfError> {
    let size = count
        .checked_mul(T::SIZE as u64)
        .ok_or(ElfError::TruncatedInput)?;
    let bytes = source.read_range(offset, size)?;
    Ok(bytes.chunks_exact(T::SIZE).map(T::decode).collect())
}

/// Decode every record of a table-shaped section.
///
/// The section must declare `sh_entsize == T::SIZE` and a size that is a
/// whole number of entries.
///
/// # Errors
///
/// Returns [`ElfError::InvalidEntrySize`] on an entry size mismatch and
/// [`ElfError::TruncatedInput`] if the section data runs past the stream.
pub fn read_table<T: Record, R: Read + Seek>(
    source: &mut ByteSource<'_, R>,
    shdr: &Elf64SectionHeader,
) -> Result<Vec<T>, ElfError> {
    let entry_size = T::SIZE as u64;
    if shdr.sh_entsize != entry_size || shdr.sh_size % entry_size != 0 {
        return Err(ElfError::InvalidEntrySize);
    }
    read_records(source, shdr.sh_offset, shdr.sh_size / entry_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::le_u32;
    use std::io::Cursor;

    #[derive(Debug, PartialEq)]
    struct Pair(u32, u32);

    impl Record for Pair {
        const SIZE: usize = 8;

        fn decode(bytes: &[u8]) -> Self {
            Self(le_u32(bytes, 0), le_u32(bytes, 4))
        }
    }

    fn table_header(offset: u64, size: u64, entsize: u64) -> Elf64SectionHeader {
        Elf64SectionHeader {
            sh_offset: offset,
            sh_size: size,
            sh_entsize: entsize,
            ..Elf64SectionHeader::default()
        }
    }

    fn data() -> Vec<u8> {
        let mut buf = vec![0xaa; 4];
        for v in [1u32, 2, 3, 4] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decodes_records_in_order() {
        let mut cursor = Cursor::new(data());
        let mut source = ByteSource::new(&mut cursor).unwrap();
        let pairs: Vec<Pair> = read_table(&mut source, &table_header(4, 16, 8)).unwrap();
        assert_eq!(pairs, vec![Pair(1, 2), Pair(3, 4)]);
    }

    #[test]
    fn empty_table_decodes_to_nothing() {
        let mut cursor = Cursor::new(data());
        let mut source = ByteSource::new(&mut cursor).unwrap();
        let pairs: Vec<Pair> = read_table(&mut source, &table_header(4, 0, 8)).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn mismatched_entry_size_rejected() {
        let mut cursor = Cursor::new(data());
        let mut source = ByteSource::new(&mut cursor).unwrap();
        let res: Result<Vec<Pair>, _> = read_table(&mut source, &table_header(4, 16, 4));
        assert_eq!(res, Err(ElfError::InvalidEntrySize));
        let res: Result<Vec<Pair>, _> = read_table(&mut source, &table_header(4, 12, 8));
        assert_eq!(res, Err(ElfError::InvalidEntrySize));
    }

    #[test]
    fn table_past_end_is_truncated() {
        let mut cursor = Cursor::new(data());
        let mut source = ByteSource::new(&mut cursor).unwrap();
        let res: Result<Vec<Pair>, _> = read_table(&mut source, &table_header(12, 16, 8));
        assert_eq!(res, Err(ElfError::TruncatedInput));
        let res: Result<Vec<Pair>, _> = read_records(&mut source, 0, u64::MAX);
        assert_eq!(res, Err(ElfError::TruncatedInput));
    }
}
