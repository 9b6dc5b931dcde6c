//! Memory-mapped file-backed bit array
//!
//! Uses the same on-disk layout as [`SyncFileBackedArray`](crate::SyncFileBackedArray),
//! but reads and writes go through a writable mapping of the region. Point
//! operations are plain memory accesses; the operating system writes dirty
//! pages back on its own schedule, or when [`MmapFileBackedArray::flush`]
//! or [`close`](BitArray::close) is called.

use crate::file_io::{
    combine_region, highest_in_region, lowest_in_region, masked_copy, next_in_region,
    open_region, operand_bytes,
};
use bitarray_core::layout::{byte_index, byte_mask};
use bitarray_core::validation::{check_index, check_merge_len};
use bitarray_core::{BitArray, BitArrayError, Result};
use log::{debug, warn};
use memmap2::{MmapMut, MmapOptions};
use std::{
    any::Any,
    fs::File,
    path::{Path, PathBuf},
};

/// Bit array over a writable memory mapping of its backing file
#[derive(Debug)]
pub struct MmapFileBackedArray {
    /// `None` once closed; always released before `file`
    mmap: Option<MmapMut>,
    file: Option<File>,
    path: PathBuf,
    bit_size: usize,
    region_len: usize,
}

impl MmapFileBackedArray {
    /// Open or create the file at `path` and map it as an array of `bit_size` bits
    pub fn open<P: AsRef<Path>>(path: P, bit_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, region_len) = open_region(&path, bit_size)?;

        // SAFETY: The mapping covers exactly the region that open_region just
        // sized, and this instance owns the handle. Other processes changing
        // or truncating the file while it is mapped is outside this type's
        // contract, as with any file mapping.
        let mmap = unsafe {
            MmapOptions::new()
                .len(region_len)
                .map_mut(&file)
                .map_err(|e| BitArrayError::io("Failed to map backing file", &e))?
        };

        Ok(Self {
            mmap: Some(mmap),
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

    /// Write dirty pages back to the file and wait for completion
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .as_ref()
            .ok_or(BitArrayError::Closed)?
            .flush()
            .map_err(|e| BitArrayError::io("Failed to flush mapping", &e))
    }

    fn region(&self) -> Result<&[u8]> {
        self.mmap.as_deref().ok_or(BitArrayError::Closed)
    }

    fn region_mut(&mut self) -> Result<&mut [u8]> {
        self.mmap.as_deref_mut().ok_or(BitArrayError::Closed)
    }

    fn merge(&mut self, other: &dyn BitArray, combine: impl Fn(u8, u8) -> u8) -> Result<()> {
        let bit_size = self.bit_size;
        if let Some(same) = other.as_any().downcast_ref::<MmapFileBackedArray>() {
            check_merge_len(self.region_len, same.region_len)?;
            let incoming = same.region()?;
            combine_region(self.region_mut()?, incoming, bit_size, combine);
        } else {
            let incoming = operand_bytes(self.region_len, other)?;
            combine_region(self.region_mut()?, &incoming, bit_size, combine);
        }
        Ok(())
    }
}

impl BitArray for MmapFileBackedArray {
    fn get_bit(&self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        Ok(self.region()?[byte_index(index)] & byte_mask(index) != 0)
    }

    fn set_bit(&mut self, index: usize) -> Result<bool> {
        check_index(index, self.bit_size)?;
        let byte = &mut self.region_mut()?[byte_index(index)];
        let mask = byte_mask(index);
        if *byte & mask != 0 {
            return Ok(false);
        }
        *byte |= mask;
        Ok(true)
    }

    fn clear_bit(&mut self, index: usize) -> Result<()> {
        check_index(index, self.bit_size)?;
        self.region_mut()?[byte_index(index)] &= !byte_mask(index);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.region_mut()?.fill(0);
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
        self.region_len
    }

    fn to_byte_array(&self) -> Result<Vec<u8>> {
        Ok(masked_copy(self.region()?, self.bit_size))
    }

    fn highest_bit_set(&self) -> Result<Option<usize>> {
        Ok(highest_in_region(self.region()?, self.bit_size))
    }

    fn lowest_bit_set(&self) -> Result<Option<usize>> {
        Ok(lowest_in_region(self.region()?, self.bit_size))
    }

    fn next_set_bit(&self, from: usize) -> Result<Option<usize>> {
        check_index(from, self.bit_size)?;
        Ok(next_in_region(self.region()?, from, self.bit_size))
    }

    fn count_ones(&self) -> Result<usize> {
        Ok(masked_copy(self.region()?, self.bit_size)
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum())
    }

    /// Flush, unmap, then close the file
    ///
    /// Never fails: a flush error is logged and the mapping is released
    /// regardless, so the file handle can always be closed afterwards.
    fn close(&mut self) -> Result<()> {
        if let Some(mmap) = self.mmap.take() {
            if let Err(e) = mmap.flush() {
                warn!("Failed to flush {} before unmapping: {e}", self.path.display());
            }
            drop(mmap);
        }
        if self.file.take().is_some() {
            debug!("Closed {}", self.path.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.mmap.is_none()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
