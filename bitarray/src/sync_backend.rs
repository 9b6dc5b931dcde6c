//! Synchronously written file-backed bit array
//!
//! Every point mutation is a read-modify-write of a single byte straight
//! through the file handle: seek, read one byte, modify it, seek back, write
//! it. There is no in-memory copy of the bits, so once a mutating call
//! returns its byte has been handed to the operating system.

use crate::file_io::{
    combine_region, highest_in_region, lowest_in_region, masked_copy, next_in_region,
    open_region, operand_bytes, read_byte, read_region, write_byte, write_region,
};
use bitarray_core::layout::{byte_index, byte_mask};
use bitarray_core::validation::check_index;
use bitarray_core::{BitArray, BitArrayError, Result};
use log::debug;
use std::{
    any::Any,
    fs::File,
    path::{Path, PathBuf},
};

/// Bit array stored directly in a file, one syscall per byte mutated
#[derive(Debug)]
pub struct SyncFileBackedArray {
    /// `None` once closed
    file: Option<File>,
    path: PathBuf,
    bit_size: usize,
    region_len: usize,
}

impl SyncFileBackedArray {
    /// Open or create the file at `path` as an array of `bit_size` bits
    pub fn open<P: AsRef<Path>>(path: P, bit_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, region_len) = open_region(&path, bit_size)?;
        Ok(Self {
            file: Some(file),
            path,
            bit_size,
            region_len,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the operating system to flush written bytes to the device
    pub fn sync(&self) -> Result<()> {
        self.file()?
            .sync_data()
            .map_err(|e| BitArrayError::io("Failed to sync backing file", &e))
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(BitArrayError::Closed)
    }

    /// Current region with bits past the capacity cleared
    fn region(&self) -> Result<Vec<u8>> {
        let region = read_region(self.file()?, self.region_len)?;
        Ok(masked_copy(&region, self.bit_size))
    }

    fn merge(&mut self, other: &dyn BitArray, combine: impl Fn(u8, u8) -> u8) -> Result<()> {
        let incoming = operand_bytes(self.region_len, other)?;
        let file = self.file()?;
        let mut region = read_region(file, self.region_len)?;
        combine_region(&mut region, &incoming, self.bit_size, combine);
        write_region(file, &region)
    }
}

impl BitArray for SyncFileBackedArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        let byte = read_byte(self.file()?, byte_index(index) as u64)?;
        Ok(byte & byte_mask(index) != 0)
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        let file = self.file()?;
        let offset = byte_index(index) as u64;
        let byte = read_byte(file, offset)?;
        let mask = byte_mask(index);
        if byte & mask != 0 {
            return Ok(false);
        }
        write_byte(file, offset, byte | mask)?;
        Ok(true)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.bit_size)?;
        let file = self.file()?;
        let offset = byte_index(index) as u64;
        let byte = read_byte(file, offset)?;
        let mask = byte_mask(index);
        if byte & mask != 0 {
            write_byte(file, offset, byte & !mask)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        write_region(self.file()?, &vec![0u8; self.region_len])
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
        self.region_len
    }

    fn to_byte_array(&self) -> Result<Vec<u8>> {
        self.region()
    }

    fn highest_bit_set(&self) -> Result<Option<usize>> {
        let region = read_region(self.file()?, self.region_len)?;
        Ok(highest_in_region(&region, self.bit_size))
    }

    fn lowest_bit_set(&self) -> Result<Option<usize>> {
        let region = read_region(self.file()?, self.region_len)?;
        Ok(lowest_in_region(&region, self.bit_size))
    }

    fn next_set_bit(&self, from: usize) -> Result<Option<usize>> {
        check_index(from, self.bit_size)?;
        let region = read_region(self.file()?, self.region_len)?;
        Ok(next_in_region(&region, from, self.bit_size))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_data()
                .map_err(|e| BitArrayError::io("Failed to sync backing file", &e))?;
            debug!("Closed {}", self.path.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitarray_core::{InMemoryWordArray, SparseBucketArray};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_fresh_file_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.bits");
        std::fs::File::create(&path).unwrap();

        let mut bits = SyncFileBackedArray::open(&path, 16).unwrap();
        assert_eq!(bits.num_bytes(), 3);
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), bits.num_bytes());
        assert!(on_disk.iter().all(|&b| b == 0));

        assert!(bits.set_bit(5).unwrap());
        drop(bits);

        let reopened = SyncFileBackedArray::open(&path, 16).unwrap();
        assert!(reopened.get_bit(5).unwrap());
        assert!(!reopened.get_bit(4).unwrap());
    }

    #[test]
    fn test_every_mutation_reaches_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.bits");
        let mut bits = SyncFileBackedArray::open(&path, 64).unwrap();

        bits.set_bit(9).unwrap();
        assert_eq!(std::fs::read(&path).unwrap()[1], 0b0000_0010);
        bits.clear_bit(9).unwrap();
        assert_eq!(std::fs::read(&path).unwrap()[1], 0);
    }

    #[test]
    fn test_set_get_clear_and_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut bits = SyncFileBackedArray::open(dir.path().join("b.bits"), 40).unwrap();

        assert!(bits.set_bit(0).unwrap());
        assert!(bits.set_bit(39).unwrap());
        assert!(!bits.set_bit(39).unwrap());
        assert!(bits.get_bit(39).unwrap());
        bits.clear_bit(0).unwrap();
        bits.clear_bit(0).unwrap();
        assert!(!bits.get_bit(0).unwrap());
        assert_eq!(
            bits.set_bit(40),
            Err(BitArrayError::IndexOutOfBounds {
                index: 40,
                bit_size: 40
            })
        );
        assert!(bits.set_bit_if_unset(7).unwrap());
        assert!(!bits.set_bit_if_unset(7).unwrap());
    }

    #[test]
    fn test_scans_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut bits = SyncFileBackedArray::open(dir.path().join("s.bits"), 100).unwrap();
        assert_eq!(bits.highest_bit_set().unwrap(), None);
        assert_eq!(bits.lowest_bit_set().unwrap(), None);

        for i in [3, 17, 99] {
            bits.set_bit(i).unwrap();
        }
        assert_eq!(bits.lowest_bit_set().unwrap(), Some(3));
        assert_eq!(bits.highest_bit_set().unwrap(), Some(99));
        assert_eq!(bits.next_set_bit(3).unwrap(), Some(17));
        assert_eq!(bits.next_set_bit(17).unwrap(), Some(99));
        assert_eq!(bits.next_set_bit(99).unwrap(), None);
        assert_eq!(bits.count_ones().unwrap(), 3);

        bits.clear().unwrap();
        assert_eq!(bits.count_ones().unwrap(), 0);
    }

    #[test]
    fn test_merge_with_foreign_arrays() {
        let dir = tempfile::tempdir().unwrap();
        // (120 >> 3) + 1 = 16 bytes, the same as a 128-bit dense array
        let mut bits = SyncFileBackedArray::open(dir.path().join("m.bits"), 120).unwrap();
        let mut dense = InMemoryWordArray::new(128).unwrap();
        assert_eq!(bits.num_bytes(), dense.num_bytes());

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..40 {
            bits.set_bit(rng.gen_range(0..120)).unwrap();
            dense.set_bit(rng.gen_range(0..128)).unwrap();
        }

        let before = bits.to_byte_array().unwrap();
        bits.or(&dense).unwrap();
        for i in 0..120 {
            let was = before[i >> 3] & (1 << (i & 7)) != 0;
            assert_eq!(bits.get_bit(i).unwrap(), was || dense.get_bit(i).unwrap());
        }
        assert!(bits.highest_bit_set().unwrap().unwrap() < 120);

        let mut mask = SparseBucketArray::new(2, 64).unwrap();
        mask.set_bit(dense.lowest_bit_set().unwrap().unwrap()).unwrap();
        bits.and(&mask).unwrap();
        assert_eq!(bits.count_ones().unwrap(), 1);
    }

    #[test]
    fn test_merge_shape_violation_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shape.bits");
        let mut bits = SyncFileBackedArray::open(&path, 16).unwrap();
        bits.set_bit(2).unwrap();
        let before = std::fs::read(&path).unwrap();

        let other = InMemoryWordArray::new(64).unwrap();
        assert_eq!(
            bits.or(&other),
            Err(BitArrayError::LengthMismatch {
                expected: 3,
                actual: 8
            })
        );
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let dir = tempfile::tempdir().unwrap();
        let mut bits = SyncFileBackedArray::open(dir.path().join("c.bits"), 8).unwrap();
        bits.set_bit(1).unwrap();
        bits.close().unwrap();
        bits.close().unwrap();
        assert!(bits.is_closed());
        assert_eq!(bits.get_bit(1), Err(BitArrayError::Closed));
        assert_eq!(bits.sync(), Err(BitArrayError::Closed));
    }
}
