//! Shared foundational types used across the rtservo workspace.
//!
//! This crate provides bit-field arithmetic for packing register words and
//! clock frequency values with unit parsing.

#![warn(missing_docs)]

pub mod bits;
pub mod frequency;

pub use bits::{mask, BitField};
pub use frequency::{Frequency, ParseFrequencyError};
