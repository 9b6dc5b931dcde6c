//! Abstract interfaces for bit array storage
//!
//! This module defines the trait every backend implements. Traits are pure
//! interfaces; the concrete engines live in their own modules.

pub mod bit_array;

pub use bit_array::{set_bits, BitArray, SetBits};
