//! Cell values and declared column types.
//!
//! A [`CellValue`] is one typed cell of a sequence or context column. The
//! kernel never infers a column's [`ColumnType`] from its values; types are
//! declared by the caller and values only contribute statistics.
//!
//! # Missing values
//!
//! `Null` and `Float(NaN)` are both "missing". In numeric columns they set the
//! missing flag; in categorical columns they collapse into a single `Null`
//! category.
//!
//! # Example
//!
//! ```rust
//! use seqtensor::kernel::{CellValue, ColumnType};
//!
//! let kind: ColumnType = "count".parse().unwrap();
//! assert!(kind.is_numeric());
//!
//! let cells: Vec<CellValue> = vec![3.5.into(), "b".into(), None::<f64>.into()];
//! assert!(cells[2].is_missing());
//! ```

use crate::error::{Result, SeqTensorError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Declared type of a sequence or context column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Real-valued numeric column
    Continuous,
    /// Integer-valued numeric column, rounded on decode
    Count,
    /// Unordered closed set of values, one-hot encoded
    Categorical,
    /// Ordered closed set of values, one-hot encoded
    Ordinal,
}

impl ColumnType {
    /// Continuous and count columns share the normalize/missing-flag encoding.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Continuous | ColumnType::Count)
    }

    /// Categorical and ordinal columns share the one-hot encoding.
    pub fn is_categorical(self) -> bool {
        !self.is_numeric()
    }

    /// The declaration string for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Continuous => "continuous",
            ColumnType::Count => "count",
            ColumnType::Categorical => "categorical",
            ColumnType::Ordinal => "ordinal",
        }
    }
}

impl FromStr for ColumnType {
    type Err = SeqTensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continuous" => Ok(ColumnType::Continuous),
            "count" => Ok(ColumnType::Count),
            "categorical" => Ok(ColumnType::Categorical),
            "ordinal" => Ok(ColumnType::Ordinal),
            other => Err(SeqTensorError::UnsupportedColumnType(other.to_string())),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed cell of input or decoded data.
///
/// Equality and hashing treat floats by bit pattern so that values can key
/// category maps. Use [`CellValue::canonical`] before comparing values that
/// may hold `NaN` or `-0.0`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl CellValue {
    /// `Null` or a NaN float.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Collapse missing values to `Null` and `-0.0` to `0.0`.
    ///
    /// Categories are keyed by their canonical form.
    pub fn canonical(&self) -> CellValue {
        match self {
            CellValue::Float(f) if f.is_nan() => CellValue::Null,
            CellValue::Float(f) if *f == 0.0 => CellValue::Float(0.0),
            other => other.clone(),
        }
    }

    /// Read the cell as a number for a numeric column.
    ///
    /// Returns `Ok(None)` for missing values. Booleans read as 0/1.
    pub fn to_numeric(&self, column: usize) -> Result<Option<f64>> {
        match self {
            CellValue::Null => Ok(None),
            CellValue::Float(f) if f.is_nan() => Ok(None),
            CellValue::Float(f) => Ok(Some(*f)),
            CellValue::Int(i) => Ok(Some(*i as f64)),
            CellValue::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
            CellValue::Str(s) => Err(SeqTensorError::NonNumericValue {
                column,
                value: s.clone(),
            }),
        }
    }

    /// Like [`CellValue::to_numeric`], but rejects infinite values.
    pub fn to_finite(&self, column: usize) -> Result<Option<f64>> {
        match self.to_numeric(column)? {
            Some(v) if !v.is_finite() => Err(SeqTensorError::NonFiniteValue { column, value: v }),
            other => Ok(other),
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => a.to_bits() == b.to_bits(),
            (CellValue::Str(a), CellValue::Str(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Str(s) => s.hash(state),
            CellValue::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Str(s) => write!(f, "{:?}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

// =============================================================================
// Conversions from Rust primitives
// =============================================================================

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Float(value as f64)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Str(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Str(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// JSON scalars map onto cells; arrays and objects are rendered as strings.
impl From<&serde_json::Value> for CellValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::Str(n.to_string())
                }
            }
            serde_json::Value::String(s) => CellValue::Str(s.clone()),
            other => CellValue::Str(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_column_types() {
        assert_eq!("continuous".parse::<ColumnType>().unwrap(), ColumnType::Continuous);
        assert_eq!("count".parse::<ColumnType>().unwrap(), ColumnType::Count);
        assert_eq!("categorical".parse::<ColumnType>().unwrap(), ColumnType::Categorical);
        assert_eq!("ordinal".parse::<ColumnType>().unwrap(), ColumnType::Ordinal);
    }

    #[test]
    fn test_parse_unsupported_type() {
        let err = "datetime".parse::<ColumnType>().unwrap_err();
        assert!(matches!(err, SeqTensorError::UnsupportedColumnType(ref t) if t == "datetime"));
    }

    #[test]
    fn test_column_type_serde_lowercase() {
        let json = serde_json::to_string(&ColumnType::Ordinal).unwrap();
        assert_eq!(json, "\"ordinal\"");
        let back: ColumnType = serde_json::from_str("\"count\"").unwrap();
        assert_eq!(back, ColumnType::Count);
    }

    #[test]
    fn test_missing_values() {
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::Float(f64::NAN).is_missing());
        assert!(!CellValue::Float(0.0).is_missing());
        assert!(!CellValue::Str("".into()).is_missing());
    }

    #[test]
    fn test_to_numeric() {
        assert_eq!(CellValue::Int(7).to_numeric(0).unwrap(), Some(7.0));
        assert_eq!(CellValue::Bool(true).to_numeric(0).unwrap(), Some(1.0));
        assert_eq!(CellValue::Float(f64::NAN).to_numeric(0).unwrap(), None);
        assert_eq!(CellValue::Null.to_numeric(0).unwrap(), None);

        let err = CellValue::from("x").to_numeric(3).unwrap_err();
        assert!(matches!(err, SeqTensorError::NonNumericValue { column: 3, .. }));
    }

    #[test]
    fn test_to_finite() {
        assert_eq!(CellValue::Float(2.5).to_finite(0).unwrap(), Some(2.5));
        assert_eq!(CellValue::Null.to_finite(0).unwrap(), None);

        let err = CellValue::Float(f64::NEG_INFINITY).to_finite(2).unwrap_err();
        assert!(matches!(err, SeqTensorError::NonFiniteValue { column: 2, .. }));
    }

    #[test]
    fn test_canonical_collapses_nan_and_negative_zero() {
        assert_eq!(CellValue::Float(f64::NAN).canonical(), CellValue::Null);
        assert_eq!(CellValue::Float(-0.0).canonical(), CellValue::Float(0.0));
        assert_eq!(CellValue::Int(4).canonical(), CellValue::Int(4));
    }

    #[test]
    fn test_hash_distinguishes_variants() {
        let set: HashSet<CellValue> = [
            CellValue::Int(1),
            CellValue::Float(1.0),
            CellValue::Str("1".into()),
            CellValue::Bool(true),
            CellValue::Int(1),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_from_option_and_json() {
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
        assert_eq!(CellValue::from(Some("a")), CellValue::Str("a".into()));

        let json: serde_json::Value = serde_json::json!([1, 2.5, "x", null, true]);
        let cells: Vec<CellValue> = json
            .as_array()
            .unwrap()
            .iter()
            .map(CellValue::from)
            .collect();
        assert_eq!(
            cells,
            vec![
                CellValue::Int(1),
                CellValue::Float(2.5),
                CellValue::Str("x".into()),
                CellValue::Null,
                CellValue::Bool(true),
            ]
        );
    }
}
