//! Query language front ends.
//!
//! | Module | Language |
//! | ------ | -------- |
//! | [`latiao`] | LaTiao column-derivation programs |

pub mod latiao;
