//! Sparse bit array over a huge index space
//!
//! The index space is split into fixed-size buckets of words. A bucket is
//! allocated only when a bit inside it is first set; until then it reads as
//! all-zero without touching the allocator. This keeps memory proportional to
//! the number of populated buckets rather than to the capacity.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use crate::layout::{
    bytes_for_bits, highest_set_in_words, lowest_set_in_words, next_set_in_words,
    valid_word_mask, word_from_bytes, word_index, word_mask, words_to_bytes, WORD_BITS,
    WORD_BYTES,
};
use crate::validation::{check_index, check_merge_len};
use crate::{BitArray, BitArrayError, Result};

/// Shape of a [`SparseBucketArray`]
///
/// Only obtainable through [`BucketGeometry::new`] or a checked
/// deserialization, so every value in hand lays out in whole words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "GeometryFields"))]
pub struct BucketGeometry {
    num_buckets: usize,
    bits_per_bucket: usize,
}

/// Unchecked wire form of a [`BucketGeometry`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct GeometryFields {
    num_buckets: usize,
    bits_per_bucket: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<GeometryFields> for BucketGeometry {
    type Error = BitArrayError;

    fn try_from(fields: GeometryFields) -> Result<Self> {
        BucketGeometry::new(fields.num_buckets, fields.bits_per_bucket)
    }
}

impl BucketGeometry {
    /// Create and validate a geometry
    pub const fn new(num_buckets: usize, bits_per_bucket: usize) -> Result<Self> {
        if num_buckets == 0 {
            return Err(BitArrayError::InvalidCapacity);
        }
        if bits_per_bucket == 0 || bits_per_bucket % WORD_BITS != 0 {
            return Err(BitArrayError::InvalidGeometry);
        }
        if num_buckets.checked_mul(bits_per_bucket).is_none() {
            return Err(BitArrayError::InvalidCapacity);
        }
        Ok(Self {
            num_buckets,
            bits_per_bucket,
        })
    }

    /// Number of independently allocated buckets
    pub const fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Logical bits covered by each bucket, a positive multiple of 64
    pub const fn bits_per_bucket(&self) -> usize {
        self.bits_per_bucket
    }

    /// Total addressable bits
    pub const fn bit_size(&self) -> usize {
        self.num_buckets * self.bits_per_bucket
    }

    /// Words in each bucket
    pub const fn words_per_bucket(&self) -> usize {
        self.bits_per_bucket / WORD_BITS
    }

    /// Bucket holding bit `index`
    #[inline]
    pub const fn bucket_of(&self, index: usize) -> usize {
        index / self.bits_per_bucket
    }

    /// Offset of bit `index` inside its bucket
    #[inline]
    pub const fn offset_in_bucket(&self, index: usize) -> usize {
        index % self.bits_per_bucket
    }
}

/// Bit array whose buckets are allocated on first write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBucketArray {
    geometry: BucketGeometry,
    buckets: Vec<Option<Box<[u64]>>>,
}

impl SparseBucketArray {
    /// Create an array with every bucket unallocated
    pub fn new(num_buckets: usize, bits_per_bucket: usize) -> Result<Self> {
        Ok(Self::with_geometry(BucketGeometry::new(
            num_buckets,
            bits_per_bucket,
        )?))
    }

    /// Create an array with every bucket of `geometry` unallocated
    pub fn with_geometry(geometry: BucketGeometry) -> Self {
        Self {
            geometry,
            buckets: vec![None; geometry.num_buckets],
        }
    }

    /// Rebuild an array from its canonical serialization
    ///
    /// Only buckets containing at least one set bit are allocated.
    pub fn from_bytes(geometry: BucketGeometry, bytes: &[u8]) -> Result<Self> {
        let mut array = Self::with_geometry(geometry);
        check_merge_len(array.num_bytes(), bytes.len())?;
        array.merge_bytes(bytes, |a, b| a | b);
        Ok(array)
    }

    /// Geometry this array was built with
    pub fn geometry(&self) -> BucketGeometry {
        self.geometry
    }

    /// Number of buckets currently holding storage
    pub fn allocated_buckets(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }

    /// Whether bucket `bucket` holds storage
    pub fn is_bucket_allocated(&self, bucket: usize) -> bool {
        matches!(self.buckets.get(bucket), Some(Some(_)))
    }

    /// Combine every bucket with words taken from a serialized operand
    ///
    /// An unallocated bucket is only allocated when the combined result is
    /// non-zero, so AND never allocates and OR allocates only for buckets the
    /// operand actually populates.
    fn merge_bytes(&mut self, bytes: &[u8], combine: impl Fn(u64, u64) -> u64) {
        let bit_size = self.geometry.bit_size();
        let words_per_bucket = self.geometry.words_per_bucket();
        for b in 0..self.buckets.len() {
            let base = b * words_per_bucket;
            if let Some(words) = self.buckets[b].as_mut() {
                for (j, word) in words.iter_mut().enumerate() {
                    let k = base + j;
                    let incoming = word_from_bytes(bytes, k);
                    *word = combine(*word, incoming) & valid_word_mask(k, bit_size);
                }
                continue;
            }
            let incoming: Vec<u64> = (0..words_per_bucket)
                .map(|j| combine(0, word_from_bytes(bytes, base + j)))
                .collect();
            if incoming.iter().any(|&w| w != 0) {
                self.buckets[b] = Some(incoming.into_boxed_slice());
            }
        }
    }

    fn or_same(&mut self, other: &SparseBucketArray) {
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            let Some(other_words) = theirs else {
                continue;
            };
            match mine {
                Some(words) => {
                    for (a, b) in words.iter_mut().zip(other_words.iter()) {
                        *a |= *b;
                    }
                }
                None => *mine = Some(other_words.clone()),
            }
        }
    }

    fn and_same(&mut self, other: &SparseBucketArray) {
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            match theirs {
                None => *mine = None,
                Some(other_words) => {
                    if let Some(words) = mine {
                        for (a, b) in words.iter_mut().zip(other_words.iter()) {
                            *a &= *b;
                        }
                    }
                }
            }
        }
    }

    fn same_geometry<'a>(&self, other: &'a dyn BitArray) -> Option<&'a SparseBucketArray> {
        other
            .as_any()
            .downcast_ref::<SparseBucketArray>()
            .filter(|o| o.geometry == self.geometry)
    }
}

impl BitArray for SparseBucketArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size())?;
        let offset = self.geometry.offset_in_bucket(index);
        Ok(match &self.buckets[self.geometry.bucket_of(index)] {
            Some(words) => words[word_index(offset)] & word_mask(offset) != 0,
            None => false,
        })
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size())?;
        let bucket = self.geometry.bucket_of(index);
        let offset = self.geometry.offset_in_bucket(index);
        let words_per_bucket = self.geometry.words_per_bucket();
        let words = self.buckets[bucket]
            .get_or_insert_with(|| vec![0u64; words_per_bucket].into_boxed_slice());
        let word = &mut words[word_index(offset)];
        let mask = word_mask(offset);
        if *word & mask != 0 {
            return Ok(false);
        }
        *word |= mask;
        Ok(true)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.bit_size())?;
        let offset = self.geometry.offset_in_bucket(index);
        if let Some(words) = self.buckets[self.geometry.bucket_of(index)].as_mut() {
            words[word_index(offset)] &= !word_mask(offset);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buckets.fill(None);
        Ok(())
    }

    fn or(&mut self, other: &dyn BitArray) -> Result<()> {
        check_merge_len(self.num_bytes(), other.num_bytes())?;
        if let Some(same) = self.same_geometry(other) {
            self.or_same(same);
        } else {
            let bytes = other.to_byte_array()?;
            check_merge_len(self.num_bytes(), bytes.len())?;
            self.merge_bytes(&bytes, |a, b| a | b);
        }
        Ok(())
    }

    fn and(&mut self, other: &dyn BitArray) -> Result<()> {
        check_merge_len(self.num_bytes(), other.num_bytes())?;
        if let Some(same) = self.same_geometry(other) {
            self.and_same(same);
        } else {
            let bytes = other.to_byte_array()?;
            check_merge_len(self.num_bytes(), bytes.len())?;
            self.merge_bytes(&bytes, |a, b| a & b);
        }
        Ok(())
    }

    fn bit_size(&self) -> usize {
        self.geometry.bit_size()
    }

    fn num_bytes(&self) -> usize {
        bytes_for_bits(self.bit_size())
    }

    fn to_byte_array(&self) -> Result<Vec<u8>> {
        let bucket_bytes = self.geometry.words_per_bucket() * WORD_BYTES;
        let mut out = Vec::with_capacity(self.num_bytes());
        for bucket in &self.buckets {
            match bucket {
                Some(words) => out.extend_from_slice(&words_to_bytes(words)),
                None => out.resize(out.len() + bucket_bytes, 0),
            }
        }
        Ok(out)
    }

    fn highest_bit_set(&self) -> Result<Option<usize>> {
        Ok(self.buckets.iter().enumerate().rev().find_map(|(b, bucket)| {
            let words = bucket.as_deref()?;
            highest_set_in_words(words).map(|i| b * self.geometry.bits_per_bucket + i)
        }))
    }

    fn lowest_bit_set(&self) -> Result<Option<usize>> {
        Ok(self.buckets.iter().enumerate().find_map(|(b, bucket)| {
            let words = bucket.as_deref()?;
            lowest_set_in_words(words).map(|i| b * self.geometry.bits_per_bucket + i)
        }))
    }

    fn next_set_bit(&self, from: usize) -> Result<Option<usize>> {
        check_index(from, self.bit_size())?;
        let bits_per_bucket = self.geometry.bits_per_bucket;
        let first = self.geometry.bucket_of(from);

        // Rest of the bucket holding `from`
        if let Some(words) = self.buckets[first].as_deref() {
            if let Some(i) = next_set_in_words(words, self.geometry.offset_in_bucket(from)) {
                return Ok(Some(first * bits_per_bucket + i));
            }
        }
        Ok(self.buckets[first + 1..]
            .iter()
            .enumerate()
            .find_map(|(n, bucket)| {
                let words = bucket.as_deref()?;
                lowest_set_in_words(words).map(|i| (first + 1 + n) * bits_per_bucket + i)
            }))
    }

    fn count_ones(&self) -> Result<usize> {
        Ok(self
            .buckets
            .iter()
            .flatten()
            .flat_map(|words| words.iter())
            .map(|w| w.count_ones() as usize)
            .sum())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
