//! Argument validation shared by every backend
//!
//! Pure checks with no I/O; each backend calls these before touching its
//! storage so that a rejected call never performs a partial mutation.

pub mod bounds;

pub use bounds::{check_capacity, check_index, check_merge_len};
