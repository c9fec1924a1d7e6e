//! Fixed-size byte containers

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{BlobError, BlobResult};

/// A byte buffer whose size is fixed at creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobFile {
    buffer: Vec<u8>,
}

impl BlobFile {
    /// Create a zero-filled buffer of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![0; size],
        }
    }

    /// Wrap existing bytes; their length becomes the fixed size
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { buffer: bytes }
    }

    /// Fixed size in bytes
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Replace the whole buffer with `bytes`, which must match the size
    pub fn load_bytes(&mut self, bytes: &[u8]) -> BlobResult<()> {
        if bytes.len() != self.size() {
            return Err(BlobError::SizeMismatch {
                expected: self.size(),
                found: bytes.len(),
            });
        }
        self.buffer.copy_from_slice(bytes);
        Ok(())
    }

    /// Fill the buffer from the next `size` bytes of `reader`
    ///
    /// Anything past the fixed size is left unread. The buffer is unchanged
    /// if the reader ends early.
    pub fn load<R: Read>(&mut self, reader: R) -> BlobResult<()> {
        let mut data = Vec::with_capacity(self.size());
        reader.take(self.size() as u64).read_to_end(&mut data)?;
        self.load_bytes(&data)?;

        tracing::debug!(target: "replica::blob", bytes = data.len(), "blob loaded");
        Ok(())
    }

    /// Write the whole buffer to `writer`
    pub fn save<W: Write>(&self, mut writer: W) -> BlobResult<()> {
        writer.write_all(&self.buffer)?;
        writer.flush()?;

        tracing::debug!(target: "replica::blob", bytes = self.size(), "blob saved");
        Ok(())
    }

    /// Load from a file
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> BlobResult<()> {
        let path = checked_path(path.as_ref())?;
        let file = File::open(path)?;
        tracing::debug!(target: "replica::blob", path = %path.display(), "loading blob file");
        self.load(BufReader::new(file))
    }

    /// Save to a file, replacing any existing content
    pub fn save_path(&self, path: impl AsRef<Path>) -> BlobResult<()> {
        let path = checked_path(path.as_ref())?;
        let file = File::create(path)?;
        tracing::debug!(target: "replica::blob", path = %path.display(), "saving blob file");
        self.save(BufWriter::new(file))
    }

    /// Bytes in `offset..offset + len`
    pub fn bytes(&self, offset: usize, len: usize) -> BlobResult<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.buffer[range])
    }

    /// Overwrite the bytes starting at `offset`
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> BlobResult<()> {
        let range = self.range(offset, bytes.len())?;
        self.buffer[range].copy_from_slice(bytes);
        Ok(())
    }

    fn range(&self, offset: usize, len: usize) -> BlobResult<std::ops::Range<usize>> {
        let out_of_range = || BlobError::OutOfRange {
            offset,
            len,
            size: self.size(),
        };
        let end = offset.checked_add(len).ok_or_else(out_of_range)?;
        if end > self.size() {
            return Err(out_of_range());
        }
        Ok(offset..end)
    }
}

fn checked_path(path: &Path) -> BlobResult<&Path> {
    if path.as_os_str().is_empty() {
        return Err(BlobError::invalid_argument("path", "must not be empty"));
    }
    Ok(path)
}
