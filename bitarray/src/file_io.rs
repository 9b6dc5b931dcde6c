//! Backing-file preparation and region helpers shared by the file backends
//!
//! Both file-backed arrays use the same on-disk layout: a flat region of
//! `(bit_size >> 3) + 1` bytes at the start of the file, bit `i` at byte
//! `i >> 3`, position `i & 7`. Bytes past the region are never touched.

use bitarray_core::layout::{
    file_region_len, highest_set_in_bytes, lowest_set_in_bytes, next_set_in_bytes,
    valid_byte_mask,
};
use bitarray_core::validation::{check_capacity, check_merge_len};
use bitarray_core::{BitArray, BitArrayError, Result};
use log::debug;
use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
};

/// Reject an empty path or one that names something other than a regular file
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(BitArrayError::InvalidPath);
    }
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_file() => Err(BitArrayError::InvalidPath),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BitArrayError::io("Failed to inspect backing path", &e)),
    }
}

/// Open (creating if needed) the backing file and make sure it holds a full region
///
/// Arguments are validated before the file is touched. A file shorter than
/// the region is extended with zeros; a longer one is left as it is.
pub(crate) fn open_region(path: &Path, bit_size: usize) -> Result<(File, usize)> {
    check_capacity(bit_size)?;
    validate_path(path)?;
    let region_len = file_region_len(bit_size);

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| BitArrayError::io("Failed to open backing file", &e))?;
    let current_len = file
        .metadata()
        .map_err(|e| BitArrayError::io("Failed to read backing file metadata", &e))?
        .len();
    if current_len < region_len as u64 {
        file.set_len(region_len as u64)
            .map_err(|e| BitArrayError::io("Failed to extend backing file", &e))?;
        debug!(
            "Extended {} from {current_len} to {region_len} bytes",
            path.display()
        );
    }

    debug!(
        "Opened {} for {bit_size} bits ({region_len} bytes)",
        path.display()
    );
    Ok((file, region_len))
}

/// Read the byte at `offset`
pub(crate) fn read_byte(mut file: &File, offset: u64) -> Result<u8> {
    let mut buf = [0u8; 1];
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| BitArrayError::io("Failed to seek backing file", &e))?;
    file.read_exact(&mut buf)
        .map_err(|e| BitArrayError::io("Failed to read backing file", &e))?;
    Ok(buf[0])
}

/// Write the byte at `offset`
pub(crate) fn write_byte(mut file: &File, offset: u64, value: u8) -> Result<()> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| BitArrayError::io("Failed to seek backing file", &e))?;
    file.write_all(&[value])
        .map_err(|e| BitArrayError::io("Failed to write backing file", &e))
}

/// Read the whole region in one call
pub(crate) fn read_region(mut file: &File, region_len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; region_len];
    file.seek(SeekFrom::Start(0))
        .map_err(|e| BitArrayError::io("Failed to seek backing file", &e))?;
    file.read_exact(&mut buf)
        .map_err(|e| BitArrayError::io("Failed to read backing file", &e))?;
    Ok(buf)
}

/// Overwrite the whole region in one call
pub(crate) fn write_region(mut file: &File, bytes: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(0))
        .map_err(|e| BitArrayError::io("Failed to seek backing file", &e))?;
    file.write_all(bytes)
        .map_err(|e| BitArrayError::io("Failed to write backing file", &e))
}

/// Serialized bytes of a merge operand, after checking its shape
///
/// The length is checked before the operand is serialized so a mismatched
/// merge costs nothing and mutates nothing.
pub(crate) fn operand_bytes(region_len: usize, other: &dyn BitArray) -> Result<Vec<u8>> {
    check_merge_len(region_len, other.num_bytes())?;
    let bytes = other.to_byte_array()?;
    check_merge_len(region_len, bytes.len())?;
    Ok(bytes)
}

/// Combine `incoming` into `region` byte by byte, keeping bits past `bit_size` clear
pub(crate) fn combine_region(
    region: &mut [u8],
    incoming: &[u8],
    bit_size: usize,
    combine: impl Fn(u8, u8) -> u8,
) {
    for (i, (a, b)) in region.iter_mut().zip(incoming).enumerate() {
        *a = combine(*a, *b) & valid_byte_mask(i, bit_size);
    }
}

/// Copy of `region` with bits past `bit_size` cleared
pub(crate) fn masked_copy(region: &[u8], bit_size: usize) -> Vec<u8> {
    let mut out = region.to_vec();
    if let Some(last) = out.len().checked_sub(1) {
        out[last] &= valid_byte_mask(last, bit_size);
    }
    out
}

/// Highest set bit below `bit_size`
pub(crate) fn highest_in_region(region: &[u8], bit_size: usize) -> Option<usize> {
    let last = region.len().checked_sub(1)?;
    let tail = region[last] & valid_byte_mask(last, bit_size);
    if tail != 0 {
        return Some(last * 8 + 7 - tail.leading_zeros() as usize);
    }
    highest_set_in_bytes(&region[..last])
}

/// Lowest set bit below `bit_size`
pub(crate) fn lowest_in_region(region: &[u8], bit_size: usize) -> Option<usize> {
    lowest_set_in_bytes(region).filter(|&i| i < bit_size)
}

/// First set bit after `from` and below `bit_size`
pub(crate) fn next_in_region(region: &[u8], from: usize, bit_size: usize) -> Option<usize> {
    next_set_in_bytes(region, from).filter(|&i| i < bit_size)
}
