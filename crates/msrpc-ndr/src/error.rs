//! NDR error types

use thiserror::Error;

/// Errors raised while encoding or decoding an NDR stream.
///
/// Every variant aborts only the marshal or unmarshal call that produced it.
/// Malformed padding is never reported; only malformed counts are.
#[derive(Debug, Error)]
pub enum NdrError {
    #[error("short buffer: needed {needed} bytes, have {have}")]
    ShortBuffer { needed: usize, have: usize },

    #[error("buffer overflow: {count} elements of {element_size} bytes exceed the {remaining} bytes remaining")]
    BufferOverflow {
        count: usize,
        element_size: usize,
        remaining: usize,
    },

    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("conformance mismatch: max_count={max_count}, offset={offset}, actual_count={actual_count}")]
    ConformanceMismatch {
        max_count: usize,
        offset: usize,
        actual_count: usize,
    },

    #[error("invalid string: {0}")]
    InvalidString(String),

    #[error("invalid pointer referent: {0:#010x}")]
    InvalidPointer(u32),

    #[error("invalid union discriminant: {0}")]
    InvalidDiscriminant(i64),

    #[error("allocation of {requested} bytes exceeds limit of {limit}")]
    AllocationLimitExceeded { requested: usize, limit: usize },

    #[error("integer overflow computing {0}")]
    IntegerOverflow(&'static str),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("UTF-16 error: {0}")]
    Utf16(#[from] std::char::DecodeUtf16Error),
}

/// Result type for NDR operations
pub type Result<T> = std::result::Result<T, NdrError>;

/// Reject `value` unless `min <= value <= max`.
///
/// Used by prepare hooks to enforce declared `[range]` attributes before any
/// byte is written.
pub fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(NdrError::FieldOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
