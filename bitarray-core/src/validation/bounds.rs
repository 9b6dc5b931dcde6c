//! Index, capacity and merge-shape validation

use crate::{BitArrayError, Result};

/// Reject a zero capacity
pub const fn check_capacity(bit_size: usize) -> Result<()> {
    if bit_size == 0 {
        return Err(BitArrayError::InvalidCapacity);
    }
    Ok(())
}

/// Reject an index at or beyond `bit_size`
#[inline]
pub const fn check_index(index: usize, bit_size: usize) -> Result<()> {
    if index >= bit_size {
        return Err(BitArrayError::IndexOutOfBounds { index, bit_size });
    }
    Ok(())
}

/// Reject a merge operand whose byte length differs from ours
#[inline]
pub const fn check_merge_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(BitArrayError::LengthMismatch { expected, actual });
    }
    Ok(())
}
