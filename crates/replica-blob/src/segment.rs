//! Multi-segment containers
//!
//! A segment file is a blob whose tail, starting at `segment_offset`, is cut
//! into equally sized slots. Slot-relative offsets translate to absolute ones
//! as `segment_offset + slot * segment_size + offset`. Multi-byte values are
//! little-endian.

use std::io::{Read, Write};
use std::path::Path;

use crate::blob::BlobFile;
use crate::error::{BlobError, BlobResult};

/// A blob divided into fixed-size segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    blob: BlobFile,
    segment_offset: usize,
    segment_size: usize,
}

impl SegmentFile {
    /// Create a zero-filled file of `size` bytes
    pub fn new(size: usize, segment_offset: usize, segment_size: usize) -> BlobResult<Self> {
        Self::from_blob(BlobFile::new(size), segment_offset, segment_size)
    }

    /// Wrap existing bytes
    pub fn from_bytes(
        bytes: Vec<u8>,
        segment_offset: usize,
        segment_size: usize,
    ) -> BlobResult<Self> {
        Self::from_blob(BlobFile::from_bytes(bytes), segment_offset, segment_size)
    }

    /// Create a file of `size` bytes and fill it from `reader`
    pub fn from_reader<R: Read>(
        reader: R,
        size: usize,
        segment_offset: usize,
        segment_size: usize,
    ) -> BlobResult<Self> {
        let mut file = Self::new(size, segment_offset, segment_size)?;
        file.load(reader)?;
        Ok(file)
    }

    fn from_blob(blob: BlobFile, segment_offset: usize, segment_size: usize) -> BlobResult<Self> {
        if segment_size == 0 {
            return Err(BlobError::invalid_argument("segment_size", "must be positive"));
        }
        if segment_offset > blob.size() {
            return Err(BlobError::invalid_argument(
                "segment_offset",
                format!("{} is past the end of a {}-byte buffer", segment_offset, blob.size()),
            ));
        }
        Ok(Self {
            blob,
            segment_offset,
            segment_size,
        })
    }

    /// Underlying blob
    pub fn blob(&self) -> &BlobFile {
        &self.blob
    }

    /// Offset of the first segment
    pub fn segment_offset(&self) -> usize {
        self.segment_offset
    }

    /// Size of one segment
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Number of whole segments that fit in the buffer
    pub fn segment_count(&self) -> usize {
        (self.blob.size() - self.segment_offset) / self.segment_size
    }

    /// Refill the buffer from `reader`
    pub fn load<R: Read>(&mut self, reader: R) -> BlobResult<()> {
        self.blob.load(reader)
    }

    /// Write the buffer to `writer`
    pub fn save<W: Write>(&self, writer: W) -> BlobResult<()> {
        self.blob.save(writer)
    }

    /// Refill the buffer from a file
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> BlobResult<()> {
        self.blob.load_path(path)
    }

    /// Save the buffer to a file
    pub fn save_path(&self, path: impl AsRef<Path>) -> BlobResult<()> {
        self.blob.save_path(path)
    }

    /// Absolute offset of `offset` within segment `slot`
    pub fn segment_to_absolute(&self, slot: usize, offset: usize) -> BlobResult<usize> {
        slot.checked_mul(self.segment_size)
            .and_then(|start| start.checked_add(self.segment_offset))
            .and_then(|start| start.checked_add(offset))
            .ok_or_else(|| {
                BlobError::invalid_argument("slot", format!("slot {} offset {} overflows", slot, offset))
            })
    }

    /// Byte at an absolute offset
    pub fn offset_byte(&self, offset: usize) -> BlobResult<u8> {
        Ok(self.blob.bytes(offset, 1)?[0])
    }

    /// Little-endian `u16` at an absolute offset
    pub fn offset_u16(&self, offset: usize) -> BlobResult<u16> {
        Ok(u16::from_le_bytes(self.array_at(offset)?))
    }

    /// Little-endian `u32` at an absolute offset
    pub fn offset_u32(&self, offset: usize) -> BlobResult<u32> {
        Ok(u32::from_le_bytes(self.array_at(offset)?))
    }

    /// `len` bytes at an absolute offset
    pub fn offset_bytes(&self, offset: usize, len: usize) -> BlobResult<&[u8]> {
        self.blob.bytes(offset, len)
    }

    /// Write a byte at an absolute offset
    pub fn set_offset_byte(&mut self, offset: usize, value: u8) -> BlobResult<()> {
        self.blob.set_bytes(offset, &[value])
    }

    /// Write a little-endian `u16` at an absolute offset
    pub fn set_offset_u16(&mut self, offset: usize, value: u16) -> BlobResult<()> {
        self.blob.set_bytes(offset, &value.to_le_bytes())
    }

    /// Write a little-endian `u32` at an absolute offset
    pub fn set_offset_u32(&mut self, offset: usize, value: u32) -> BlobResult<()> {
        self.blob.set_bytes(offset, &value.to_le_bytes())
    }

    /// Write bytes at an absolute offset
    pub fn set_offset_bytes(&mut self, offset: usize, bytes: &[u8]) -> BlobResult<()> {
        self.blob.set_bytes(offset, bytes)
    }

    /// Byte at `offset` within segment `slot`
    pub fn slot_byte(&self, slot: usize, offset: usize) -> BlobResult<u8> {
        self.offset_byte(self.segment_to_absolute(slot, offset)?)
    }

    /// Little-endian `u16` at `offset` within segment `slot`
    pub fn slot_u16(&self, slot: usize, offset: usize) -> BlobResult<u16> {
        self.offset_u16(self.segment_to_absolute(slot, offset)?)
    }

    /// Little-endian `u32` at `offset` within segment `slot`
    pub fn slot_u32(&self, slot: usize, offset: usize) -> BlobResult<u32> {
        self.offset_u32(self.segment_to_absolute(slot, offset)?)
    }

    /// `len` bytes at `offset` within segment `slot`
    pub fn slot_bytes(&self, slot: usize, offset: usize, len: usize) -> BlobResult<&[u8]> {
        self.offset_bytes(self.segment_to_absolute(slot, offset)?, len)
    }

    /// Write a byte at `offset` within segment `slot`
    pub fn set_slot_byte(&mut self, slot: usize, offset: usize, value: u8) -> BlobResult<()> {
        let offset = self.segment_to_absolute(slot, offset)?;
        self.set_offset_byte(offset, value)
    }

    /// Write a little-endian `u16` at `offset` within segment `slot`
    pub fn set_slot_u16(&mut self, slot: usize, offset: usize, value: u16) -> BlobResult<()> {
        let offset = self.segment_to_absolute(slot, offset)?;
        self.set_offset_u16(offset, value)
    }

    /// Write a little-endian `u32` at `offset` within segment `slot`
    pub fn set_slot_u32(&mut self, slot: usize, offset: usize, value: u32) -> BlobResult<()> {
        let offset = self.segment_to_absolute(slot, offset)?;
        self.set_offset_u32(offset, value)
    }

    /// Write bytes at `offset` within segment `slot`
    pub fn set_slot_bytes(&mut self, slot: usize, offset: usize, bytes: &[u8]) -> BlobResult<()> {
        let offset = self.segment_to_absolute(slot, offset)?;
        self.set_offset_bytes(offset, bytes)
    }

    /// Whole segment `slot`
    pub fn segment_bytes(&self, slot: usize) -> BlobResult<&[u8]> {
        self.slot_bytes(slot, 0, self.segment_size)
    }

    /// Overwrite segment `slot`; `bytes` must be exactly one segment long
    pub fn set_segment_bytes(&mut self, slot: usize, bytes: &[u8]) -> BlobResult<()> {
        if bytes.len() != self.segment_size {
            return Err(BlobError::SizeMismatch {
                expected: self.segment_size,
                found: bytes.len(),
            });
        }
        self.set_slot_bytes(slot, 0, bytes)
    }

    fn array_at<const N: usize>(&self, offset: usize) -> BlobResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.blob.bytes(offset, N)?);
        Ok(out)
    }
}
