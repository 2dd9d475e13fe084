//! Type compatibility analysis
//!
//! Classifies each bound field pair into the conversion the emitter must
//! generate for it.

pub mod compatibility;
pub mod temporal;

pub use compatibility::{Conversion, NameCompatibility, SuffixStripping, classify};
pub use temporal::validate_pattern;
