//! bitarray - Bit-Addressable Storage Engines
//!
//! This library provides one [`BitArray`] contract over four storage
//! strategies that trade memory residency, persistence and speed differently.
//!
//! ## Architecture
//!
//! The workspace separates the contract from the I/O:
//!
//! - **bitarray-core**: the trait, byte layout, validation, and the two
//!   in-memory engines (no I/O)
//! - **bitarray**: the file-backed engines and backend configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bitarray::{BitArray, BitArrayConfig, BloomFilter, MmapFileBackedArray};
//!
//! fn example() -> bitarray::Result<()> {
//!     // Pick a backend from configuration and use it through the trait
//!     let config = BitArrayConfig::from_json(r#"{"backend":"in_memory","capacity":1024}"#)?;
//!     let mut bits = config.open()?;
//!     bits.set_bit(42)?;
//!     assert_eq!(bits.lowest_bit_set()?, Some(42));
//!
//!     // A persistent bloom filter over a memory-mapped file
//!     let backing = MmapFileBackedArray::open("seen.bits", 1 << 20)?;
//!     let mut seen = BloomFilter::with_expected_elements(backing, 10_000);
//!     seen.insert(7)?;
//!     assert!(seen.contains(7)?);
//!     seen.into_inner().close()
//! }
//! ```
//!
//! ## Backends
//!
//! - **InMemoryWordArray**: dense 64-bit words with an O(1) popcount
//! - **SparseBucketArray**: buckets allocated on first write
//! - **SyncFileBackedArray**: every mutation written straight to the file
//! - **MmapFileBackedArray**: the same file layout through a memory mapping

// Re-export the contract and in-memory engines
pub use bitarray_core::{
    // Core trait and scanning
    set_bits, BitArray, SetBits,
    // In-memory engines
    BucketGeometry, InMemoryWordArray, SparseBucketArray,
    // Consumers
    BloomFilter,
    // Error handling
    BitArrayError, ErrorCategory, Result,
};

// Implementation modules
mod file_io;
#[cfg(feature = "serde")]
pub mod config;
#[cfg(feature = "mmap")]
pub mod mmap_backend;
pub mod sync_backend;

// Public exports
pub use sync_backend::SyncFileBackedArray;

#[cfg(feature = "mmap")]
pub use mmap_backend::MmapFileBackedArray;

#[cfg(feature = "serde")]
pub use config::BitArrayConfig;
