//! Identifier types.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Prefix of every field id minted by an operator.
///
/// Hosts only ever see ids with this prefix stripped; see [`FieldId::public`].
pub const DERIVED_FID_PREFIX: &str = "lt_";

/// Opaque handle of a program inside a program store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(u64);

impl ProgramId {
    /// Creates a program id from a raw value.
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column identifier, unique across the origin and derived sets of a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Arc<str>);

impl FieldId {
    /// Creates a field id from a string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Mints a fresh, globally unique id for a derived column.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(format!("{DERIVED_FID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this id was minted by [`FieldId::generate`].
    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.0.starts_with(DERIVED_FID_PREFIX)
    }

    /// Returns the id as shown to hosts: derived ids lose their internal prefix.
    #[must_use]
    pub fn public(&self) -> Self {
        match self.0.strip_prefix(DERIVED_FID_PREFIX) {
            Some(rest) => Self::new(rest),
            None => self.clone(),
        }
    }

    /// Re-applies the internal prefix to an id previously made public.
    #[must_use]
    pub fn internal(public: &str) -> Self {
        Self::new(format!("{DERIVED_FID_PREFIX}{public}"))
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for FieldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_derived() {
        let a = FieldId::generate();
        let b = FieldId::generate();
        assert_ne!(a, b);
        assert!(a.is_derived());
        assert!(!FieldId::new("price").is_derived());
    }

    #[test]
    fn test_public_roundtrip() {
        let id = FieldId::generate();
        let public = id.public();
        assert!(!public.is_derived());
        assert_eq!(FieldId::internal(public.as_str()), id);
        assert_eq!(FieldId::new("price").public().as_str(), "price");
    }
}
