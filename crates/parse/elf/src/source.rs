//! Positional reads over a caller-owned seekable stream.
//!
//! ELF tables refer to each other by file offset, so decoding jumps around
//! the file. [`ByteSource::at`] hands out a [`ScopedRead`] that seeks to an
//! offset and puts the stream back where it was when dropped, whether the
//! read inside succeeded or not.

use std::io::{Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

use crate::header::ElfError;

/// Seekable byte access over a borrowed reader of known length.
///
/// The source never closes or takes ownership of the reader.
pub struct ByteSource<'r, R: Read + Seek> {
    reader: &'r mut R,
    len: u64,
}

impl<'r, R: Read + Seek> ByteSource<'r, R> {
    /// Wrap `reader`, measuring its length without moving its position.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if the reader cannot seek.
    pub fn new(reader: &'r mut R) -> Result<Self, ElfError> {
        let start = reader.stream_position()?;
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;
        Ok(Self { reader, len })
    }

    /// Total length of the stream in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the stream holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current position of the underlying reader.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if the position cannot be queried.
    pub fn position(&mut self) -> Result<u64, ElfError> {
        Ok(self.reader.stream_position()?)
    }

    /// Seek to `offset` for the lifetime of the returned scope.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if the reader cannot seek.
    pub fn at(&mut self, offset: u64) -> Result<ScopedRead<'_, R>, ElfError> {
        let saved = self.reader.stream_position()?;
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(ScopedRead {
            source: ByteSource {
                reader: &mut *self.reader,
                len: self.len,
            },
            saved,
        })
    }

    /// Fill `buf` from the current position.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::TruncatedInput`] on a short read.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ElfError> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    /// Copy `size` bytes starting at `offset`, leaving the position untouched.
    ///
    /// The range is checked against the stream length before anything is
    /// allocated, so a corrupt size cannot trigger a huge allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::TruncatedInput`] if the range ends past the stream.
    pub fn read_range(&mut self, offset: u64, size: u64) -> Result<Vec<u8>, ElfError> {
        let end = offset.checked_add(size).ok_or(ElfError::TruncatedInput)?;
        if end > self.len {
            return Err(ElfError::TruncatedInput);
        }
        let size = usize::try_from(size).map_err(|_| ElfError::TruncatedInput)?;
        let mut buf = vec![0u8; size];
        self.at(offset)?.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A read positioned at a fixed offset; restores the previous position on drop.
pub struct ScopedRead<'s, R: Read + Seek> {
    source: ByteSource<'s, R>,
    saved: u64,
}

impl<'s, R: Read + Seek> Deref for ScopedRead<'s, R> {
    type Target = ByteSource<'s, R>;

    fn deref(&self) -> &Self::Target {
        &self.source
    }
}

impl<R: Read + Seek> DerefMut for ScopedRead<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.source
    }
}

impl<R: Read + Seek> Drop for ScopedRead<'_, R> {
    fn drop(&mut self) {
        // Nothing useful can be done with a failed seek here; the next
        // positioned read seeks explicitly anyway.
        let _ = self.source.reader.seek(SeekFrom::Start(self.saved));
    }
}
