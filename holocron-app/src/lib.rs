//! Harvest loop behind the `holocron` binary.
pub mod harvest;
