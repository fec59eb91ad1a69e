//! Columns: a field token plus its row data.

use serde::{Deserialize, Serialize};

use super::field::{FieldMode, FieldToken};
use crate::utils::error::{Error, Result};

/// Row data of one column.
///
/// `text` fields hold strings, every other mode holds `f64`. In JSON,
/// non-finite numbers are written as `null` and read back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnData {
    /// Numeric rows.
    Numbers(Vec<f64>),
    /// String rows.
    Texts(Vec<String>),
}

impl ColumnData {
    /// Returns an empty column of the storage kind `mode` expects.
    #[must_use]
    pub fn empty_for(mode: FieldMode) -> Self {
        if mode.is_text() {
            Self::Texts(Vec::new())
        } else {
            Self::Numbers(Vec::new())
        }
    }

    /// Gives empty data the storage kind of `mode`. JSON `[]` always reads
    /// as numeric, so an empty text column needs this before use.
    #[must_use]
    pub fn into_mode(self, mode: FieldMode) -> Self {
        if self.is_empty() { Self::empty_for(mode) } else { self }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numbers(v) => v.len(),
            Self::Texts(v) => v.len(),
        }
    }

    /// Returns whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the numeric rows, if numeric.
    #[must_use]
    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Self::Numbers(v) => Some(v),
            Self::Texts(_) => None,
        }
    }

    /// Returns the string rows, if textual.
    #[must_use]
    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            Self::Texts(v) => Some(v),
            Self::Numbers(_) => None,
        }
    }

    /// Returns whether this data is storable under `mode`.
    #[must_use]
    pub fn fits(&self, mode: FieldMode) -> bool {
        match self {
            Self::Texts(_) => mode.is_text(),
            // An empty array carries no kind.
            Self::Numbers(v) => !mode.is_text() || v.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Numbers(Vec<Option<f64>>),
            Texts(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Numbers(v) => Self::Numbers(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()),
            Raw::Texts(v) => Self::Texts(v),
        })
    }
}

/// A field and its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Field metadata.
    #[serde(flatten)]
    pub token: FieldToken,
    /// Row data.
    pub data: ColumnData,
}

impl Column {
    /// Creates a column, checking that the data kind matches the field mode.
    pub fn new(token: FieldToken, data: ColumnData) -> Result<Self> {
        let data = data.into_mode(token.mode);
        let column = Self { token, data };
        column.validate()?;
        Ok(column)
    }

    /// Checks that the data kind matches the field mode.
    pub fn validate(&self) -> Result<()> {
        if self.data.fits(self.token.mode) {
            Ok(())
        } else {
            Err(Error::type_error(format!(
                "Column \"{}\" has mode {} but holds {} data.",
                self.token.fid,
                self.token.mode,
                if self.token.mode.is_text() { "numeric" } else { "string" }
            )))
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_roundtrips_through_null() {
        let data = ColumnData::Numbers(vec![1.0, f64::NAN]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, "[1.0,null]");
        let back: ColumnData = serde_json::from_str(&json).unwrap();
        let nums = back.as_numbers().unwrap();
        assert_eq!(nums[0], 1.0);
        assert!(nums[1].is_nan());
    }

    #[test]
    fn test_column_flattens_field() {
        let col: Column = serde_json::from_str(
            r#"{"fid":"city","name":"city","mode":"collection","data":["x","y"]}"#,
        )
        .unwrap();
        assert_eq!(col.token.mode, FieldMode::Text);
        assert_eq!(col.data.as_texts().unwrap(), &["x".to_string(), "y".to_string()]);
        assert!(col.validate().is_ok());
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let field = FieldToken::origin("p", "p", FieldMode::Vec);
        assert!(Column::new(field.clone(), ColumnData::Texts(vec!["a".into()])).is_err());
        assert!(Column::new(field, ColumnData::Numbers(vec![])).is_ok());
    }

    #[test]
    fn test_empty_text_column_is_textual() {
        let col: Column = serde_json::from_str(r#"{"fid":"city","name":"city","mode":"text","data":[]}"#).unwrap();
        assert_eq!(col.data, ColumnData::Numbers(vec![]));
        let col = Column::new(col.token, col.data).unwrap();
        assert_eq!(col.data.as_texts(), Some(&[][..]));
    }
}
