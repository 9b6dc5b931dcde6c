#![no_std]

//! bitarray-core - Bit Array Contract and In-Memory Engines
//!
//! This crate provides the [`BitArray`] trait, the canonical byte layout every
//! backend serializes to, and the two backends that need no I/O: a dense
//! word array and a lazily allocated sparse bucket array.

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod bloom_filter;
pub mod error;
pub mod layout;
pub mod sparse;
pub mod traits;
pub mod validation;
pub mod word_array;

pub use bloom_filter::BloomFilter;
pub use error::*;
pub use sparse::{BucketGeometry, SparseBucketArray};
pub use traits::*;
pub use word_array::InMemoryWordArray;
