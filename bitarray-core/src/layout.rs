//! Bit-to-byte layout shared by every backend
//!
//! Bit `i` lives in byte `i >> 3` at position `i & 7`, least-significant bit
//! first. Words are assembled from bytes in little-endian order, so word `k`
//! covers bytes `[8k, 8k + 8)`. This module holds only pure arithmetic on
//! that layout; no I/O.

use alloc::vec::Vec;

/// Bits per storage word
pub const WORD_BITS: usize = 64;

/// Bytes per storage word
pub const WORD_BYTES: usize = 8;

/// Byte holding bit `index`
#[inline]
pub const fn byte_index(index: usize) -> usize {
    index >> 3
}

/// Mask selecting bit `index` inside its byte
#[inline]
pub const fn byte_mask(index: usize) -> u8 {
    1 << (index & 7)
}

/// Word holding bit `index`
#[inline]
pub const fn word_index(index: usize) -> usize {
    index / WORD_BITS
}

/// Mask selecting bit `index` inside its word
#[inline]
pub const fn word_mask(index: usize) -> u64 {
    1 << (index % WORD_BITS)
}

/// Whole bytes needed for `bits` bits
#[inline]
pub const fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Whole words needed for `bits` bits
#[inline]
pub const fn words_for_bits(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Length of the on-disk region for a file-backed array of `bits` bits
///
/// One byte more than `bits >> 3`, so the region always has room for bit
/// index `bits` itself.
#[inline]
pub const fn file_region_len(bits: usize) -> usize {
    (bits >> 3) + 1
}

/// Mask of the valid bits in byte `byte` of an array holding `bit_size` bits
#[inline]
pub const fn valid_byte_mask(byte: usize, bit_size: usize) -> u8 {
    let first = byte * 8;
    if first >= bit_size {
        0
    } else if bit_size - first >= 8 {
        u8::MAX
    } else {
        (1u8 << (bit_size - first)) - 1
    }
}

/// Mask of the valid bits in word `word` of an array holding `bit_size` bits
#[inline]
pub const fn valid_word_mask(word: usize, bit_size: usize) -> u64 {
    let first = word * WORD_BITS;
    if first >= bit_size {
        0
    } else if bit_size - first >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << (bit_size - first)) - 1
    }
}

/// Assemble word `k` from bytes `[8k, 8k + 8)`, zero-padding a short tail
#[inline]
pub fn word_from_bytes(bytes: &[u8], k: usize) -> u64 {
    let start = k * WORD_BYTES;
    if start >= bytes.len() {
        return 0;
    }
    let end = (start + WORD_BYTES).min(bytes.len());
    let mut buf = [0u8; WORD_BYTES];
    buf[..end - start].copy_from_slice(&bytes[start..end]);
    u64::from_le_bytes(buf)
}

/// Serialize words into the canonical little-endian byte layout
pub fn words_to_bytes(words: &[u64]) -> Vec<u8> {
    #[cfg(target_endian = "little")]
    {
        bytemuck::cast_slice::<u64, u8>(words).to_vec()
    }
    #[cfg(not(target_endian = "little"))]
    {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

/// Index of the lowest set bit in a byte region, or `None`
pub fn lowest_set_in_bytes(bytes: &[u8]) -> Option<usize> {
    bytes
        .iter()
        .position(|&b| b != 0)
        .map(|i| i * 8 + bytes[i].trailing_zeros() as usize)
}

/// Index of the highest set bit in a byte region, or `None`
pub fn highest_set_in_bytes(bytes: &[u8]) -> Option<usize> {
    bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i * 8 + 7 - bytes[i].leading_zeros() as usize)
}

/// First set bit strictly after `from` in a byte region, or `None`
pub fn next_set_in_bytes(bytes: &[u8], from: usize) -> Option<usize> {
    let start = from.checked_add(1)?;
    let first_byte = byte_index(start);
    if first_byte >= bytes.len() {
        return None;
    }
    // Drop the bits at or before `from` in the first byte
    let head = bytes[first_byte] & (u8::MAX << (start & 7));
    if head != 0 {
        return Some(first_byte * 8 + head.trailing_zeros() as usize);
    }
    lowest_set_in_bytes(&bytes[first_byte + 1..]).map(|i| i + (first_byte + 1) * 8)
}

/// First set bit strictly after `from` in a word region, or `None`
pub fn next_set_in_words(words: &[u64], from: usize) -> Option<usize> {
    let start = from.checked_add(1)?;
    let first_word = word_index(start);
    if first_word >= words.len() {
        return None;
    }
    let head = words[first_word] & (u64::MAX << (start % WORD_BITS));
    if head != 0 {
        return Some(first_word * WORD_BITS + head.trailing_zeros() as usize);
    }
    words[first_word + 1..]
        .iter()
        .position(|&w| w != 0)
        .map(|i| {
            let k = first_word + 1 + i;
            k * WORD_BITS + words[k].trailing_zeros() as usize
        })
}

/// Index of the lowest set bit in a word region, or `None`
pub fn lowest_set_in_words(words: &[u64]) -> Option<usize> {
    words
        .iter()
        .position(|&w| w != 0)
        .map(|k| k * WORD_BITS + words[k].trailing_zeros() as usize)
}

/// Index of the highest set bit in a word region, or `None`
pub fn highest_set_in_words(words: &[u64]) -> Option<usize> {
    words
        .iter()
        .rposition(|&w| w != 0)
        .map(|k| k * WORD_BITS + (WORD_BITS - 1) - words[k].leading_zeros() as usize)
}
