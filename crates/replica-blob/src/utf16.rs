//! UTF-16LE text in byte buffers

use crate::error::{BlobError, BlobResult};

/// Encode text as UTF-16LE bytes
pub fn encode(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode UTF-16LE bytes
pub fn decode(bytes: &[u8]) -> BlobResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(BlobError::InvalidLength(bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|err| BlobError::InvalidUtf16(err.to_string()))
}
