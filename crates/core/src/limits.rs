//! Size limits for values loaded from untrusted JSON
//!
//! Catalog and share documents arrive from outside the process, so the
//! decoders bound how deep a document may nest before it is converted.
//!
//! | Limit | Value | Constant |
//! |-------|-------|----------|
//! | Max nesting depth | 64 levels | [`MAX_NESTING_DEPTH`] |
//! | Max array size | 100k elements | [`MAX_ARRAY_SIZE`] |

use thiserror::Error;

/// Default maximum nesting depth of a loaded JSON value (64 levels)
///
/// Resolution recurses through nested objects, so depth is bounded at
/// the load boundary.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum number of elements in an ObjectArray or EnumArray value
pub const MAX_ARRAY_SIZE: usize = 100_000;

/// Error type for limit violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Value nesting exceeds maximum depth
    #[error("nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Actual nesting depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Array exceeds maximum size
    #[error("array size {size} exceeds maximum of {max} elements")]
    ArrayTooLarge {
        /// Actual array size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}

/// Check an array length against [`MAX_ARRAY_SIZE`]
pub fn check_array_size(size: usize) -> Result<(), LimitError> {
    if size > MAX_ARRAY_SIZE {
        return Err(LimitError::ArrayTooLarge {
            size,
            max: MAX_ARRAY_SIZE,
        });
    }
    Ok(())
}
