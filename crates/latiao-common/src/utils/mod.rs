//! Utility helpers shared by all LaTiao crates.

pub mod error;
pub mod hash;
