//! Declarative backend selection
//!
//! A [`BitArrayConfig`] names a backend and its shape. Opening it is the only
//! place that knows the concrete type; everything downstream works against
//! `Box<dyn BitArray>`.

use crate::SyncFileBackedArray;
use bitarray_core::{
    BitArray, BitArrayError, BucketGeometry, InMemoryWordArray, Result, SparseBucketArray,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend to open, and with what shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BitArrayConfig {
    /// Dense words in memory
    InMemory { capacity: usize },
    /// Lazily allocated buckets in memory
    Sparse { geometry: BucketGeometry },
    /// File written through one byte at a time
    SyncFile { path: PathBuf, capacity: usize },
    /// Memory-mapped file
    Mmap { path: PathBuf, capacity: usize },
}

impl BitArrayConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            warn!("Rejected bit array configuration: {e}");
            BitArrayError::InvalidConfig
        })
    }

    /// Serialize back to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| BitArrayError::InvalidConfig)
    }

    /// Configured number of addressable bits
    pub fn capacity(&self) -> usize {
        match self {
            BitArrayConfig::InMemory { capacity }
            | BitArrayConfig::SyncFile { capacity, .. }
            | BitArrayConfig::Mmap { capacity, .. } => *capacity,
            BitArrayConfig::Sparse { geometry } => geometry.bit_size(),
        }
    }

    /// Construct the configured backend
    pub fn open(&self) -> Result<Box<dyn BitArray>> {
        match self {
            BitArrayConfig::InMemory { capacity } => {
                Ok(Box::new(InMemoryWordArray::new(*capacity)?))
            }
            BitArrayConfig::Sparse { geometry } => {
                Ok(Box::new(SparseBucketArray::with_geometry(*geometry)))
            }
            BitArrayConfig::SyncFile { path, capacity } => {
                Ok(Box::new(SyncFileBackedArray::open(path, *capacity)?))
            }
            #[cfg(feature = "mmap")]
            BitArrayConfig::Mmap { path, capacity } => {
                Ok(Box::new(crate::MmapFileBackedArray::open(path, *capacity)?))
            }
            #[cfg(not(feature = "mmap"))]
            BitArrayConfig::Mmap { .. } => Err(BitArrayError::Unsupported(
                "memory-mapped backend not compiled in",
            )),
        }
    }
}
