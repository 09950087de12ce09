//! Error type shared by every codec and game reader.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// A file or buffer does not have the fixed length its role requires
    #[error("{role}: expected {expected:#x} bytes, got {actual:#x}")]
    SizeMismatch {
        role: String,
        expected: usize,
        actual: usize,
    },
    /// Encoded output does not fit in the storage allotted to it
    #[error("level {level}: encoded size {size:#x} exceeds limit {limit:#x} (map too large)")]
    EncodingOverflow {
        level: usize,
        size: usize,
        limit: usize,
    },
    #[error("no definition for tile value {value:#04x}")]
    UnknownTileValue { value: u8 },
    /// The value has no representation in the target encoding
    #[error("tile value {value:#04x} cannot be encoded")]
    UnencodableValue { value: u8 },
    #[error("malformed stream: {0}")]
    MalformedStream(String),
    #[error("offset {offset:#x} is out of bounds for buffer of length {len:#x}")]
    OutOfBounds { offset: usize, len: usize },
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("level {level} does not exist (valid levels: 1..={count})")]
    LevelOutOfRange { level: usize, count: usize },
    #[error("file not found in catalogue: {0:?}")]
    MissingFile(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub fn size_mismatch(role: impl Into<String>, expected: usize, actual: usize) -> Self {
        CodecError::SizeMismatch {
            role: role.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Check a buffer against the fixed length expected for `role`.
pub fn expect_len(role: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(CodecError::size_mismatch(role, expected, data.len()));
    }
    Ok(())
}
