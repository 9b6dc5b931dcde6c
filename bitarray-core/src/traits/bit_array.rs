//! The capability set every bit array backend satisfies
//!
//! Callers depend only on [`BitArray`]; the concrete storage strategy is
//! chosen once at construction. Two arrays of different concrete types
//! exchange content exclusively through [`BitArray::to_byte_array`].

use alloc::vec::Vec;
use core::any::Any;

use crate::Result;

/// Fixed-capacity, bit-addressable storage
///
/// Implementations are not internally synchronized. Mutation takes
/// `&mut self`, so one instance has a single writer at a time; sharing an
/// instance across threads needs an external lock.
pub trait BitArray {
    /// Whether bit `index` is set
    fn get_bit(&self, index: usize) -> Result<bool>;

    /// Set bit `index`, returning whether its value changed
    fn set_bit(&mut self, index: usize) -> Result<bool>;

    /// Unset bit `index`; no-op if already clear
    fn clear_bit(&mut self, index: usize) -> Result<()>;

    /// Set bit `index` only if it is currently unset
    ///
    /// Returns `true` if the bit was set by this call.
    fn set_bit_if_unset(&mut self, index: usize) -> Result<bool> {
        if self.get_bit(index)? {
            return Ok(false);
        }
        self.set_bit(index)
    }

    /// Reset every bit to zero
    fn clear(&mut self) -> Result<()>;

    /// In-place bitwise OR with `other`
    ///
    /// `other.num_bytes()` must equal `self.num_bytes()`; otherwise the call
    /// fails with [`LengthMismatch`](crate::BitArrayError::LengthMismatch)
    /// and `self` is left unchanged.
    fn or(&mut self, other: &dyn BitArray) -> Result<()>;

    /// In-place bitwise AND with `other`, under the same shape rule as [`or`](Self::or)
    fn and(&mut self, other: &dyn BitArray) -> Result<()>;

    /// Number of addressable bits
    fn bit_size(&self) -> usize;

    /// Length of the canonical byte serialization
    fn num_bytes(&self) -> usize;

    /// Canonical serialization: `num_bytes()` bytes, bit `i` at byte `i >> 3`,
    /// position `i & 7`
    fn to_byte_array(&self) -> Result<Vec<u8>>;

    /// Index of the highest set bit, or `None` if no bit is set
    fn highest_bit_set(&self) -> Result<Option<usize>>;

    /// Index of the lowest set bit, or `None` if no bit is set
    fn lowest_bit_set(&self) -> Result<Option<usize>>;

    /// First set bit with an index strictly greater than `from`
    fn next_set_bit(&self, from: usize) -> Result<Option<usize>>;

    /// Number of set bits
    fn count_ones(&self) -> Result<usize> {
        Ok(self
            .to_byte_array()?
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum())
    }

    /// Release the backing storage; calling it again is a no-op
    fn close(&mut self) -> Result<()>;

    /// Whether [`close`](Self::close) has released this array's storage
    fn is_closed(&self) -> bool {
        false
    }

    /// Downcast hook used by same-type merge fast paths
    fn as_any(&self) -> &dyn Any;
}

/// Iterator over the set bits of a [`BitArray`] in ascending order
///
/// Yields `Err` once and then stops if the underlying array fails.
pub struct SetBits<'a> {
    array: &'a dyn BitArray,
    last: Option<usize>,
    done: bool,
}

impl Iterator for SetBits<'_> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let found = match self.last {
            None => self.array.lowest_bit_set(),
            Some(prev) => self.array.next_set_bit(prev),
        };
        match found {
            Ok(Some(index)) => {
                self.last = Some(index);
                Some(Ok(index))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterate the set bits of `array` in ascending order
pub fn set_bits(array: &dyn BitArray) -> SetBits<'_> {
    SetBits {
        array,
        last: None,
        done: false,
    }
}
