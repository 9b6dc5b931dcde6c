//! Bloom filter layered on any [`BitArray`] backend
//!
//! The filter never looks at how its bits are stored: the same code runs on
//! a dense array, a sparse one, or a persistent file-backed one.

use crate::{BitArray, Result};

/// Probabilistic set over a [`BitArray`]
#[derive(Debug, Clone)]
pub struct BloomFilter<B: BitArray> {
    bits: B,
    /// Number of hash functions to use
    hash_count: u8,
}

impl<B: BitArray> BloomFilter<B> {
    /// Wrap `bits` with a fixed number of hash functions
    pub fn new(bits: B, hash_count: u8) -> Self {
        Self {
            bits,
            hash_count: hash_count.max(1),
        }
    }

    /// Wrap `bits` with a hash count tuned for `expected_elements`
    pub fn with_expected_elements(bits: B, expected_elements: usize) -> Self {
        // Optimal hash function count: k = (m/n) * ln(2)
        // where m = bit_size, n = expected_elements
        let optimal_k = if expected_elements > 0 {
            // Using integer approximation: ln(2) ≈ 0.693 ≈ 693/1000
            let m = bits.bit_size();
            let k_times_1000 = m.saturating_mul(693) / expected_elements;
            k_times_1000.div_ceil(1000).min(u8::MAX as usize) as u8
        } else {
            3
        };

        Self {
            bits,
            hash_count: optimal_k.clamp(1, 8),
        }
    }

    /// Insert a value into the filter
    pub fn insert(&mut self, value: usize) -> Result<()> {
        for i in 0..self.hash_count {
            let index = self.bit_for(value, i);
            self.bits.set_bit(index)?;
        }
        Ok(())
    }

    /// Check if a value might be in the set (may have false positives)
    pub fn contains(&self, value: usize) -> Result<bool> {
        for i in 0..self.hash_count {
            if !self.bits.get_bit(self.bit_for(value, i))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Clear all bits in the filter
    pub fn clear(&mut self) -> Result<()> {
        self.bits.clear()
    }

    /// Fold another filter's members into this one
    ///
    /// Both filters must hash the same way; the backends only need matching
    /// byte lengths.
    pub fn union<O: BitArray>(&mut self, other: &BloomFilter<O>) -> Result<()> {
        self.bits.or(&other.bits)
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> u8 {
        self.hash_count
    }

    /// Get the underlying bit array
    pub fn bits(&self) -> &B {
        &self.bits
    }

    /// Release the filter and return its bit array
    pub fn into_inner(self) -> B {
        self.bits
    }

    fn bit_for(&self, value: usize, seed: u8) -> usize {
        (hash_function(value, seed) % self.bits.bit_size() as u64) as usize
    }
}

/// FNV-1a over the value's little-endian bytes, mixed with a seed
fn hash_function(value: usize, seed: u8) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64; // FNV offset basis
    for &byte in &(value as u64).to_le_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3); // FNV prime
    }

    hash ^= seed as u64;
    hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    // Final avalanche so the seed reaches the low bits used for indexing
    hash ^= hash >> 33;
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryWordArray, SparseBucketArray};

    #[test]
    fn test_bloom_filter_basic() {
        let mut filter = BloomFilter::new(InMemoryWordArray::new(256).unwrap(), 3);

        filter.insert(42).unwrap();
        filter.insert(100).unwrap();
        filter.insert(500).unwrap();

        assert!(filter.contains(42).unwrap());
        assert!(filter.contains(100).unwrap());
        assert!(filter.contains(500).unwrap());

        filter.clear().unwrap();
        assert!(!filter.contains(42).unwrap());
    }

    #[test]
    fn test_optimal_hash_count() {
        let filter = BloomFilter::with_expected_elements(InMemoryWordArray::new(256).unwrap(), 100);
        assert_eq!(filter.hash_count(), 2);

        let filter = BloomFilter::with_expected_elements(InMemoryWordArray::new(4096).unwrap(), 10);
        assert_eq!(filter.hash_count(), 8);

        let filter = BloomFilter::with_expected_elements(InMemoryWordArray::new(64).unwrap(), 0);
        assert_eq!(filter.hash_count(), 3);
    }

    #[test]
    fn test_sparse_backend_and_union() {
        let mut a = BloomFilter::new(SparseBucketArray::new(64, 1024).unwrap(), 4);
        let mut b = BloomFilter::new(InMemoryWordArray::new(64 * 1024).unwrap(), 4);
        for v in 0..50 {
            a.insert(v).unwrap();
            b.insert(v + 1000).unwrap();
        }
        a.union(&b).unwrap();
        for v in 0..50 {
            assert!(a.contains(v).unwrap());
            assert!(a.contains(v + 1000).unwrap());
        }
        assert!(a.bits().allocated_buckets() <= 64);
    }

    #[test]
    fn test_into_inner_keeps_bits() {
        let mut filter = BloomFilter::new(InMemoryWordArray::new(128).unwrap(), 2);
        filter.insert(7).unwrap();
        let bits = filter.into_inner();
        assert!(bits.count_ones().unwrap() >= 1);
    }
}
