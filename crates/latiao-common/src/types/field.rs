//! Field tokens and their provenance.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::date::DateDimension;
use super::id::FieldId;

/// Storage mode of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    /// Numeric, orderable (ordinal).
    Set,
    /// Numeric, continuous (quantitative).
    #[serde(alias = "group")]
    Vec,
    /// String (nominal).
    #[serde(alias = "collection")]
    Text,
    /// Boolean stored as 0/1.
    Bool,
}

impl FieldMode {
    /// Returns whether columns of this mode hold strings.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Vec => "vec",
            Self::Text => "text",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar expansion a date-derived field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateExpansion {
    /// The linearized millisecond timestamp itself.
    Utime,
    /// One projected calendar field.
    Dim(DateDimension),
}

impl DateExpansion {
    /// Returns the host-facing tag (`utime`, `$y`, `$M`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utime => "utime",
            Self::Dim(DateDimension::Year) => "$y",
            Self::Dim(DateDimension::Month) => "$M",
            Self::Dim(DateDimension::Weekday) => "$W",
            Self::Dim(DateDimension::Day) => "$D",
            Self::Dim(DateDimension::Hour) => "$H",
            Self::Dim(DateDimension::Minute) => "$m",
            Self::Dim(DateDimension::Second) => "$s",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let dim = match s {
            "utime" => return Some(Self::Utime),
            "$y" => DateDimension::Year,
            "$M" => DateDimension::Month,
            "$W" => DateDimension::Weekday,
            "$D" => DateDimension::Day,
            "$H" => DateDimension::Hour,
            "$m" => DateDimension::Minute,
            "$s" => DateDimension::Second,
            _ => return None,
        };
        Some(Self::Dim(dim))
    }
}

/// Operator-specific detail recorded in [`ExtInfo`].
///
/// Serialized as a plain string: `""`, a date expansion tag, or free text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtDetail {
    /// Nothing to record.
    #[default]
    None,
    /// Date expansion produced by `$toDate` and its projections.
    Date(DateExpansion),
    /// Free-form description (e.g. a partition predicate).
    Text(String),
}

impl Serialize for ExtDetail {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_str(""),
            Self::Date(exp) => serializer.serialize_str(exp.as_str()),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for ExtDetail {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.is_empty() {
            return Ok(Self::None);
        }
        Ok(DateExpansion::parse(&raw).map_or(Self::Text(raw), Self::Date))
    }
}

/// Provenance of a derived field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtInfo {
    /// Name of the producing operation (`"$normalize"`, `"dateTimeExpand"`, ...).
    #[serde(rename = "extOpt")]
    pub ext_op: String,
    /// Visible fields this one was derived from.
    pub ext_from: Vec<FieldId>,
    /// Operation-specific detail.
    #[serde(rename = "extInfo", default)]
    pub ext_info: ExtDetail,
}

impl ExtInfo {
    /// Creates provenance without detail.
    pub fn new(ext_op: impl Into<String>, ext_from: Vec<FieldId>) -> Self {
        Self {
            ext_op: ext_op.into(),
            ext_from,
            ext_info: ExtDetail::None,
        }
    }

    /// Sets the detail.
    #[must_use]
    pub fn with_detail(mut self, detail: ExtDetail) -> Self {
        self.ext_info = detail;
        self
    }

    /// Returns the date expansion this field carries, if any.
    #[must_use]
    pub fn date_expansion(&self) -> Option<DateExpansion> {
        match self.ext_info {
            ExtDetail::Date(exp) => Some(exp),
            _ => None,
        }
    }
}

/// Host-facing semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Ordered categories.
    Ordinal,
    /// Continuous numbers.
    Quantitative,
    /// Unordered categories.
    Nominal,
    /// Time.
    Temporal,
}

/// Host-facing analytic role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticType {
    /// Grouping axis.
    Dimension,
    /// Aggregated value.
    Measure,
}

fn default_out() -> bool {
    true
}

/// Reference to a column.
///
/// Fields with `out = true` are visible to the user and stop lineage walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldToken {
    /// Unique id within a program.
    pub fid: FieldId,
    /// Display name; also resolvable from program text.
    pub name: String,
    /// Storage mode, fixed at creation.
    pub mode: FieldMode,
    /// Provenance, present on derived fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_info: Option<ExtInfo>,
    /// Whether the field is visible.
    #[serde(default = "default_out")]
    pub out: bool,
}

impl FieldToken {
    /// Creates a visible origin field.
    pub fn origin(fid: impl Into<FieldId>, name: impl Into<String>, mode: FieldMode) -> Self {
        Self {
            fid: fid.into(),
            name: name.into(),
            mode,
            ext_info: None,
            out: true,
        }
    }

    /// Creates a hidden derived field with a freshly minted id.
    pub fn derived(name: impl Into<String>, mode: FieldMode, ext_info: ExtInfo) -> Self {
        Self {
            fid: FieldId::generate(),
            name: name.into(),
            mode,
            ext_info: Some(ext_info),
            out: false,
        }
    }

    /// Returns the provenance sources, empty for origin fields.
    #[must_use]
    pub fn ext_from(&self) -> &[FieldId] {
        self.ext_info.as_ref().map_or(&[], |info| info.ext_from.as_slice())
    }

    /// Returns the date expansion this field carries, if any.
    #[must_use]
    pub fn date_expansion(&self) -> Option<DateExpansion> {
        self.ext_info.as_ref().and_then(ExtInfo::date_expansion)
    }

    /// Maps the field onto its host-facing semantic type.
    #[must_use]
    pub fn semantic_type(&self) -> SemanticType {
        match self.date_expansion() {
            Some(DateExpansion::Utime) => SemanticType::Temporal,
            Some(DateExpansion::Dim(DateDimension::Year)) => SemanticType::Quantitative,
            Some(DateExpansion::Dim(_)) => SemanticType::Ordinal,
            None => match self.mode {
                FieldMode::Set => SemanticType::Ordinal,
                FieldMode::Vec => SemanticType::Quantitative,
                FieldMode::Text | FieldMode::Bool => SemanticType::Nominal,
            },
        }
    }

    /// Maps the field onto its host-facing analytic type.
    #[must_use]
    pub fn analytic_type(&self) -> AnalyticType {
        if self.date_expansion().is_none() && self.mode == FieldMode::Vec {
            AnalyticType::Measure
        } else {
            AnalyticType::Dimension
        }
    }

    /// Returns a copy whose derived ids (own and provenance) lose their
    /// internal prefix.
    #[must_use]
    pub fn to_public(&self) -> Self {
        let mut out = self.clone();
        out.fid = self.fid.public();
        if let Some(info) = &mut out.ext_info {
            for fid in &mut info.ext_from {
                *fid = fid.public();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_aliases() {
        let m: FieldMode = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(m, FieldMode::Vec);
        let m: FieldMode = serde_json::from_str("\"collection\"").unwrap();
        assert_eq!(m, FieldMode::Text);
        assert_eq!(serde_json::to_string(&FieldMode::Vec).unwrap(), "\"vec\"");
    }

    #[test]
    fn test_field_json_shape() {
        let field: FieldToken =
            serde_json::from_str(r#"{"fid":"price","name":"Price","mode":"vec"}"#).unwrap();
        assert!(field.out);
        assert!(field.ext_info.is_none());

        let derived = FieldToken::derived(
            "m",
            FieldMode::Set,
            ExtInfo::new("dateTimeExpand", vec![FieldId::new("t")])
                .with_detail(ExtDetail::Date(DateExpansion::Dim(DateDimension::Month))),
        );
        let json = serde_json::to_value(&derived).unwrap();
        assert_eq!(json["extInfo"]["extOpt"], "dateTimeExpand");
        assert_eq!(json["extInfo"]["extFrom"][0], "t");
        assert_eq!(json["extInfo"]["extInfo"], "$M");
        assert_eq!(json["out"], false);
    }

    #[test]
    fn test_semantic_mapping() {
        let date = |exp| {
            FieldToken::derived(
                "d",
                FieldMode::Vec,
                ExtInfo::new("dateTimeExpand", vec![]).with_detail(ExtDetail::Date(exp)),
            )
        };
        assert_eq!(date(DateExpansion::Utime).semantic_type(), SemanticType::Temporal);
        assert_eq!(
            date(DateExpansion::Dim(DateDimension::Year)).semantic_type(),
            SemanticType::Quantitative
        );
        assert_eq!(
            date(DateExpansion::Dim(DateDimension::Day)).semantic_type(),
            SemanticType::Ordinal
        );
        assert_eq!(date(DateExpansion::Utime).analytic_type(), AnalyticType::Dimension);

        let price = FieldToken::origin("price", "price", FieldMode::Vec);
        assert_eq!(price.semantic_type(), SemanticType::Quantitative);
        assert_eq!(price.analytic_type(), AnalyticType::Measure);
        let flag = FieldToken::origin("f", "f", FieldMode::Bool);
        assert_eq!(flag.semantic_type(), SemanticType::Nominal);
    }

    #[test]
    fn test_to_public_strips_prefix() {
        let src = FieldId::generate();
        let field = FieldToken::derived("n", FieldMode::Vec, ExtInfo::new("$normalize", vec![src.clone()]));
        let public = field.to_public();
        assert!(!public.fid.is_derived());
        assert_eq!(public.ext_from()[0], src.public());
    }
}
