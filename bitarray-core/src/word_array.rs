//! Dense in-memory bit array backed by 64-bit words

use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use crate::layout::{
    highest_set_in_words, lowest_set_in_words, next_set_in_words, valid_word_mask,
    word_from_bytes, word_index, word_mask, words_for_bits, words_to_bytes, WORD_BYTES,
};
use crate::validation::{check_capacity, check_index, check_merge_len};
use crate::{BitArray, BitArrayError, Result};

/// Dense bit array over an owned `Vec<u64>`
///
/// Point operations are O(1); scans and merges are O(words). The number of
/// set bits is kept as mutation state, so [`count_ones`](BitArray::count_ones)
/// is O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryWordArray {
    words: Vec<u64>,
    bit_size: usize,
    /// Sum of `count_ones` over `words`, updated on every mutation
    bit_count: usize,
}

impl InMemoryWordArray {
    /// Create a zeroed array of `bit_size` bits
    pub fn new(bit_size: usize) -> Result<Self> {
        check_capacity(bit_size)?;
        Ok(Self {
            words: vec![0; words_for_bits(bit_size)],
            bit_size,
            bit_count: 0,
        })
    }

    /// Rebuild an array of `bit_size` bits from its canonical serialization
    ///
    /// `bytes` must be exactly as long as the array's `num_bytes()`. Bits at
    /// or beyond `bit_size` are ignored.
    pub fn from_bytes(bit_size: usize, bytes: &[u8]) -> Result<Self> {
        let mut array = Self::new(bit_size)?;
        check_merge_len(array.num_bytes(), bytes.len())?;
        array.load_bytes(bytes);
        Ok(array)
    }

    /// Overwrite every word from `bytes` and recompute the popcount once
    fn load_bytes(&mut self, bytes: &[u8]) {
        for (k, word) in self.words.iter_mut().enumerate() {
            *word = word_from_bytes(bytes, k) & valid_word_mask(k, self.bit_size);
        }
        self.bit_count = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    /// Backing words, bit `i` at word `i / 64`, position `i % 64`
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Replace every word with `combine(old, incoming)`, keeping the popcount current
    fn merge_words(
        &mut self,
        incoming: impl Fn(usize) -> u64,
        combine: impl Fn(u64, u64) -> u64,
    ) {
        for k in 0..self.words.len() {
            let old = self.words[k];
            let new = combine(old, incoming(k)) & valid_word_mask(k, self.bit_size);
            if new != old {
                self.bit_count += new.count_ones() as usize;
                self.bit_count -= old.count_ones() as usize;
                self.words[k] = new;
            }
        }
    }

    fn merge(&mut self, other: &dyn BitArray, combine: impl Fn(u64, u64) -> u64) -> Result<()> {
        check_merge_len(self.num_bytes(), other.num_bytes())?;
        if let Some(same) = other.as_any().downcast_ref::<InMemoryWordArray>() {
            self.merge_words(|k| same.words[k], combine);
        } else {
            let bytes = other.to_byte_array()?;
            check_merge_len(self.num_bytes(), bytes.len())?;
            self.merge_words(|k| word_from_bytes(&bytes, k), combine);
        }
        Ok(())
    }
}

impl BitArray for InMemoryWordArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        Ok(self.words[word_index(index)] & word_mask(index) != 0)
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        let word = &mut self.words[word_index(index)];
        let mask = word_mask(index);
        if *word & mask != 0 {
            return Ok(false);
        }
        *word |= mask;
        self.bit_count += 1;
        Ok(true)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.bit_size)?;
        let word = &mut self.words[word_index(index)];
        let mask = word_mask(index);
        if *word & mask != 0 {
            *word &= !mask;
            self.bit_count -= 1;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.words.fill(0);
        self.bit_count = 0;
        Ok(())
    }

    fn or(&mut self, other: &dyn BitArray) -> Result<()> {
        self.merge(other, |a, b| a | b)
    }

    fn and(&mut self, other: &dyn BitArray) -> Result<()> {
        self.merge(other, |a, b| a & b)
    }

    fn bit_size(&self) -> usize {
        self.bit_size
    }

    fn num_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    fn to_byte_array(&self) -> Result<Vec<u8>> {
        Ok(words_to_bytes(&self.words))
    }

    fn highest_bit_set(&self) -> Result<Option<usize>> {
        Ok(highest_set_in_words(&self.words))
    }

    fn lowest_bit_set(&self) -> Result<Option<usize>> {
        Ok(lowest_set_in_words(&self.words))
    }

    fn next_set_bit(&self, from: usize) -> Result<Option<usize>> {
        check_index(from, self.bit_size)?;
        Ok(next_set_in_words(&self.words, from))
    }

    fn count_ones(&self) -> Result<usize> {
        Ok(self.bit_count)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Copies any array into memory, keeping its bit size
impl<'a> TryFrom<&'a dyn BitArray> for InMemoryWordArray {
    type Error = BitArrayError;

    fn try_from(source: &'a dyn BitArray) -> Result<Self> {
        let mut array = Self::new(source.bit_size())?;
        array.load_bytes(&source.to_byte_array()?);
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_bits;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn recount(array: &InMemoryWordArray) -> usize {
        array.words().iter().map(|w| w.count_ones() as usize).sum()
    }

    #[test]
    fn test_set_get_clear() {
        let mut bits = InMemoryWordArray::new(100).unwrap();
        assert!(!bits.get_bit(42).unwrap());
        assert!(bits.set_bit(42).unwrap());
        assert!(bits.get_bit(42).unwrap());
        assert!(!bits.set_bit(42).unwrap());
        bits.clear_bit(42).unwrap();
        assert!(!bits.get_bit(42).unwrap());
        bits.clear_bit(42).unwrap();
        assert_eq!(bits.count_ones().unwrap(), 0);
    }

    #[test]
    fn test_boundaries() {
        let mut bits = InMemoryWordArray::new(128).unwrap();
        assert!(bits.set_bit(0).unwrap());
        assert!(bits.set_bit(127).unwrap());
        assert!(bits.get_bit(127).unwrap());
        assert_eq!(
            bits.set_bit(128),
            Err(BitArrayError::IndexOutOfBounds {
                index: 128,
                bit_size: 128
            })
        );
        assert!(bits.get_bit(1000).is_err());
        assert_eq!(
            InMemoryWordArray::new(0),
            Err(BitArrayError::InvalidCapacity)
        );
    }

    #[test]
    fn test_sizes_round_to_words() {
        let bits = InMemoryWordArray::new(100).unwrap();
        assert_eq!(bits.bit_size(), 100);
        assert_eq!(bits.num_bytes(), 16);
        assert_eq!(bits.to_byte_array().unwrap().len(), 16);
    }

    #[test]
    fn test_extreme_bits_scenario() {
        let mut bits = InMemoryWordArray::new(128).unwrap();
        for i in [0, 63, 64, 127] {
            bits.set_bit(i).unwrap();
        }
        assert_eq!(bits.highest_bit_set().unwrap(), Some(127));
        assert_eq!(bits.lowest_bit_set().unwrap(), Some(0));
        assert_eq!(bits.next_set_bit(0).unwrap(), Some(63));
        assert_eq!(bits.next_set_bit(63).unwrap(), Some(64));
        assert_eq!(bits.next_set_bit(64).unwrap(), Some(127));
        assert_eq!(bits.next_set_bit(127).unwrap(), None);
    }

    #[test]
    fn test_next_set_bit_crosses_words() {
        let mut bits = InMemoryWordArray::new(640).unwrap();
        bits.set_bit(3).unwrap();
        bits.set_bit(600).unwrap();
        assert_eq!(bits.next_set_bit(3).unwrap(), Some(600));
        assert_eq!(bits.next_set_bit(10).unwrap(), Some(600));
    }

    #[test]
    fn test_empty_scans() {
        let bits = InMemoryWordArray::new(256).unwrap();
        assert_eq!(bits.highest_bit_set().unwrap(), None);
        assert_eq!(bits.lowest_bit_set().unwrap(), None);
        assert_eq!(bits.next_set_bit(0).unwrap(), None);
    }

    #[test]
    fn test_byte_round_trip() {
        let mut bits = InMemoryWordArray::new(200).unwrap();
        for i in [1, 8, 9, 70, 130, 199] {
            bits.set_bit(i).unwrap();
        }
        let bytes = bits.to_byte_array().unwrap();
        assert_eq!(bytes[0], 0b0000_0010);
        assert_eq!(bytes[1], 0b0000_0011);

        let copy = InMemoryWordArray::from_bytes(200, &bytes).unwrap();
        for i in 0..200 {
            assert_eq!(copy.get_bit(i).unwrap(), bits.get_bit(i).unwrap());
        }
        assert_eq!(copy.count_ones().unwrap(), 6);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert_eq!(
            InMemoryWordArray::from_bytes(128, &[0u8; 8]),
            Err(BitArrayError::LengthMismatch {
                expected: 16,
                actual: 8
            })
        );
    }

    #[test]
    fn test_or_and_laws() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut a = InMemoryWordArray::new(300).unwrap();
        let mut b = InMemoryWordArray::new(300).unwrap();
        for _ in 0..120 {
            a.set_bit(rng.gen_range(0..300)).unwrap();
            b.set_bit(rng.gen_range(0..300)).unwrap();
        }

        let before = a.clone();
        a.or(&b).unwrap();
        for i in 0..300 {
            assert_eq!(a.get_bit(i).unwrap(), before.get_bit(i).unwrap() || b.get_bit(i).unwrap());
        }
        assert_eq!(a.count_ones().unwrap(), recount(&a));

        let before = a.clone();
        let mut c = InMemoryWordArray::new(300).unwrap();
        for i in (0..300).step_by(3) {
            c.set_bit(i).unwrap();
        }
        a.and(&c).unwrap();
        for i in 0..300 {
            assert_eq!(a.get_bit(i).unwrap(), before.get_bit(i).unwrap() && c.get_bit(i).unwrap());
        }
        assert_eq!(a.count_ones().unwrap(), recount(&a));
    }

    #[test]
    fn test_merge_shape_violation_leaves_target_unchanged() {
        let mut a = InMemoryWordArray::new(128).unwrap();
        a.set_bit(5).unwrap();
        let mut b = InMemoryWordArray::new(256).unwrap();
        b.set_bit(9).unwrap();

        let before = a.clone();
        assert_eq!(
            a.or(&b),
            Err(BitArrayError::LengthMismatch {
                expected: 16,
                actual: 32
            })
        );
        assert!(a.and(&b).is_err());
        assert_eq!(a, before);
    }

    #[test]
    fn test_merge_masks_bits_beyond_capacity() {
        let mut small = InMemoryWordArray::new(70).unwrap();
        let mut wide = InMemoryWordArray::new(128).unwrap();
        wide.set_bit(69).unwrap();
        wide.set_bit(100).unwrap();
        small.or(&wide).unwrap();
        assert_eq!(small.highest_bit_set().unwrap(), Some(69));
        assert_eq!(small.count_ones().unwrap(), 1);
    }

    #[test]
    fn test_popcount_invariant_random_ops() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bits = InMemoryWordArray::new(1000).unwrap();
        let mut other = InMemoryWordArray::new(1000).unwrap();
        for step in 0..5000 {
            let i = rng.gen_range(0..1000);
            match rng.gen_range(0..4) {
                0 | 1 => {
                    bits.set_bit(i).unwrap();
                }
                2 => bits.clear_bit(i).unwrap(),
                _ => {
                    other.set_bit(i).unwrap();
                }
            }
            if step % 500 == 0 {
                if rng.gen_bool(0.5) {
                    bits.or(&other).unwrap();
                } else {
                    bits.and(&other).unwrap();
                }
            }
            assert_eq!(bits.count_ones().unwrap(), recount(&bits));
        }
        bits.clear().unwrap();
        assert_eq!(bits.count_ones().unwrap(), 0);
    }

    #[test]
    fn test_set_bits_iterator() {
        let mut bits = InMemoryWordArray::new(256).unwrap();
        for i in [7, 64, 65, 255] {
            bits.set_bit(i).unwrap();
        }
        let found: Vec<usize> = set_bits(&bits).map(|r| r.unwrap()).collect();
        assert_eq!(found, vec![7, 64, 65, 255]);
    }

    #[test]
    fn test_set_bit_if_unset() {
        let mut bits = InMemoryWordArray::new(64).unwrap();
        assert!(bits.set_bit_if_unset(10).unwrap());
        assert!(!bits.set_bit_if_unset(10).unwrap());
        assert_eq!(bits.count_ones().unwrap(), 1);
    }
}
