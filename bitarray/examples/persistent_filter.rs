//! Persistent bloom filter over a memory-mapped bit array
//!
//! Run twice: the second run finds the values inserted by the first.

use bitarray::{BitArray, BloomFilter, MmapFileBackedArray, Result};

fn main() -> Result<()> {
    let path = std::env::temp_dir().join("persistent_filter.bits");
    let backing = MmapFileBackedArray::open(&path, 1 << 16)?;
    let mut filter = BloomFilter::with_expected_elements(backing, 1_000);
    println!(
        "Filter at {} with {} hash functions",
        path.display(),
        filter.hash_count()
    );

    let probes = [42usize, 1_000, 65_535];
    for value in probes {
        println!("{value}: seen before = {}", filter.contains(value)?);
        filter.insert(value)?;
    }

    let mut bits = filter.into_inner();
    println!("{} bits set", bits.count_ones()?);
    bits.close()
}
