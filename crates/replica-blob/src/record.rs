//! Segment files holding one record per slot
//!
//! Records are decoded lazily and cached per slot. For class layouts
//! [`RecordFile::record`] hands out the cached object itself, so edits made
//! through it are seen by later calls and reach the buffer on every
//! [`RecordFile::commit`]. [`RecordFile::record_copy`] hands out an
//! independent deep copy instead.
//!
//! Struct layouts decode to a [`replica_core::StructValue`], which has no
//! identity: `record` returns a copy, and edits to it reach the file only
//! through [`RecordFile::set_record`].

use std::io::{Read, Write};
use std::path::Path;

use replica_core::{TypeId, TypeRegistry, Value, deep_clone_required};

use crate::error::{BlobError, BlobResult};
use crate::marshal::RecordLayout;
use crate::segment::SegmentFile;

/// A segment file whose slots each hold a record of one type
#[derive(Debug)]
pub struct RecordFile {
    segments: SegmentFile,
    layout: RecordLayout,
    cache: Vec<Option<Value>>,
}

impl RecordFile {
    /// Create a zero-filled file of `size` bytes with one record per segment
    pub fn new(
        registry: &TypeRegistry,
        record_type: TypeId,
        size: usize,
        segment_offset: usize,
    ) -> BlobResult<Self> {
        let layout = RecordLayout::of(registry, record_type)?;
        let segments = SegmentFile::new(size, segment_offset, layout.size().max(1))?;
        Self::with_layout(segments, layout)
    }

    /// Use existing segments; each segment must be able to hold a record
    pub fn with_layout(segments: SegmentFile, layout: RecordLayout) -> BlobResult<Self> {
        if segments.segment_size() < layout.size() {
            return Err(BlobError::SizeMismatch {
                expected: layout.size(),
                found: segments.segment_size(),
            });
        }
        let cache = vec![None; segments.segment_count()];
        Ok(Self {
            segments,
            layout,
            cache,
        })
    }

    /// Underlying segments
    pub fn segments(&self) -> &SegmentFile {
        &self.segments
    }

    /// Record layout
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Number of record slots
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the file holds no record slots
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cached record in `slot`, decoding it on first access
    pub fn record(&mut self, registry: &TypeRegistry, slot: usize) -> BlobResult<Value> {
        let len = self.len();
        let cached = self.cache.get_mut(slot).ok_or(BlobError::OutOfRange {
            offset: slot,
            len: 1,
            size: len,
        })?;
        if let Some(record) = cached {
            return Ok(record.clone());
        }

        let bytes = self.segments.slot_bytes(slot, 0, self.layout.size())?;
        let record = self.layout.read_record(registry, bytes)?;
        *cached = Some(record.clone());

        tracing::trace!(target: "replica::blob", slot, "record decoded");
        Ok(record)
    }

    /// Independent deep copy of the record in `slot`
    pub fn record_copy(&mut self, registry: &TypeRegistry, slot: usize) -> BlobResult<Value> {
        let record = self.record(registry, slot)?;
        Ok(deep_clone_required(registry, &record)?)
    }

    /// Encode `record` into `slot`, replacing the cached record
    pub fn set_record(&mut self, slot: usize, record: &Value) -> BlobResult<()> {
        if slot >= self.len() {
            return Err(BlobError::OutOfRange {
                offset: slot,
                len: 1,
                size: self.len(),
            });
        }
        self.encode(slot, record)?;
        self.cache[slot] = None;
        Ok(())
    }

    /// Write the cached record of `slot` back into the buffer
    ///
    /// The cached record stays shared, so later edits through it are picked
    /// up by the next commit.
    pub fn commit(&mut self, slot: usize) -> BlobResult<()> {
        if let Some(Some(record)) = self.cache.get(slot).cloned() {
            self.encode(slot, &record)?;
        }
        Ok(())
    }

    /// Write every cached record back into the buffer
    pub fn commit_all(&mut self) -> BlobResult<()> {
        for slot in 0..self.len() {
            self.commit(slot)?;
        }
        Ok(())
    }

    /// Refill the buffer from `reader`, dropping cached records
    pub fn load<R: Read>(&mut self, reader: R) -> BlobResult<()> {
        self.segments.load(reader)?;
        self.invalidate();
        Ok(())
    }

    /// Refill the buffer from a file, dropping cached records
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> BlobResult<()> {
        self.segments.load_path(path)?;
        self.invalidate();
        Ok(())
    }

    /// Write the buffer to `writer`; uncommitted edits are not included
    pub fn save<W: Write>(&self, writer: W) -> BlobResult<()> {
        self.segments.save(writer)
    }

    /// Save the buffer to a file; uncommitted edits are not included
    pub fn save_path(&self, path: impl AsRef<Path>) -> BlobResult<()> {
        self.segments.save_path(path)
    }

    fn encode(&mut self, slot: usize, record: &Value) -> BlobResult<()> {
        let bytes = self.layout.write_record(record)?;
        self.segments.set_slot_bytes(slot, 0, &bytes)
    }

    fn invalidate(&mut self) {
        self.cache.iter_mut().for_each(|record| *record = None);
    }
}
