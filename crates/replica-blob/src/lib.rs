//! # Replica Blob
//!
//! Fixed-size binary containers and record marshalling for the
//! [`replica_core`] object model.
//!
//! - [`BlobFile`]: a fixed-size byte buffer with stream and file I/O
//! - [`SegmentFile`]: a blob cut into equally sized slots
//! - [`RecordLayout`]: packed little-endian layout of a class or struct
//! - [`RecordFile`]: one record per segment, with independent copies on demand

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod blob;
pub mod error;
pub mod marshal;
pub mod record;
pub mod segment;
pub mod utf16;

pub use blob::BlobFile;
pub use error::{BlobError, BlobResult};
pub use marshal::{RecordLayout, read_object, read_struct};
pub use record::RecordFile;
pub use segment::SegmentFile;
