//! Cell values and column type tags for the tabular containers

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int,
    Float,
    Str,
    Bool,
}

impl DType {
    /// Parse a type name as used by `astype` arguments
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" => Some(Self::Str),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A single dynamically-typed cell
///
/// `Null` is valid in a column of any dtype.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    /// The dtype this value belongs to, `None` for `Null`
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::Int(_) => Some(DType::Int),
            Self::Float(_) => Some(DType::Float),
            Self::Str(_) => Some(DType::Str),
            Self::Bool(_) => Some(DType::Bool),
            Self::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Approximate heap-inclusive size in bytes, used for memory deltas
    pub fn approx_size(&self) -> usize {
        let heap = match self {
            Self::Str(s) => s.capacity(),
            _ => 0,
        };
        std::mem::size_of::<Self>() + heap
    }

    /// Ordering between two values, with Int/Float coercion.
    /// `None` when the values are not comparable (mixed kinds, nulls).
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Convert to the given dtype, `None` when the conversion is not defined
    pub fn cast(&self, to: DType) -> Option<Self> {
        match (self, to) {
            (Self::Null, _) => Some(Self::Null),
            (Self::Int(v), DType::Int) => Some(Self::Int(*v)),
            (Self::Int(v), DType::Float) => Some(Self::Float(*v as f64)),
            (Self::Int(v), DType::Str) => Some(Self::Str(v.to_string())),
            (Self::Int(v), DType::Bool) => Some(Self::Bool(*v != 0)),
            (Self::Float(v), DType::Float) => Some(Self::Float(*v)),
            (Self::Float(v), DType::Int) => Some(Self::Int(*v as i64)),
            (Self::Float(v), DType::Str) => Some(Self::Str(v.to_string())),
            (Self::Float(_), DType::Bool) => None,
            (Self::Str(v), DType::Str) => Some(Self::Str(v.clone())),
            (Self::Str(v), DType::Int) => v.parse().ok().map(Self::Int),
            (Self::Str(v), DType::Float) => v.parse().ok().map(Self::Float),
            (Self::Str(v), DType::Bool) => v.parse().ok().map(Self::Bool),
            (Self::Bool(v), DType::Bool) => Some(Self::Bool(*v)),
            (Self::Bool(v), DType::Int) => Some(Self::Int(i64::from(*v))),
            (Self::Bool(v), DType::Float) => Some(Self::Float(f64::from(u8::from(*v)))),
            (Self::Bool(v), DType::Str) => Some(Self::Str(v.to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_coerces_int_and_float() {
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float(3.0).compare(&Value::Int(3)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_mixed_kinds_is_none() {
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_cast_int_to_float_and_back() {
        assert_eq!(Value::Int(3).cast(DType::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::Float(3.9).cast(DType::Int), Some(Value::Int(3)));
    }

    #[test]
    fn test_cast_str_parse_failure_is_none() {
        assert_eq!(Value::Str("abc".into()).cast(DType::Int), None);
        assert_eq!(
            Value::Str("42".into()).cast(DType::Int),
            Some(Value::Int(42))
        );
    }

    #[test]
    fn test_null_casts_to_null() {
        assert_eq!(Value::Null.cast(DType::Int), Some(Value::Null));
        assert_eq!(Value::Null.cast(DType::Str), Some(Value::Null));
    }

    #[test]
    fn test_approx_size_counts_string_heap() {
        let short = Value::Int(1).approx_size();
        let long = Value::Str("a".repeat(100)).approx_size();
        assert!(long > short + 90);
    }

    #[test]
    fn test_dtype_parse_round_trip() {
        for dtype in [DType::Int, DType::Float, DType::Str, DType::Bool] {
            assert_eq!(DType::parse(&dtype.to_string()), Some(dtype));
        }
        assert_eq!(DType::parse("object"), None);
    }

    #[test]
    fn test_serialize_untagged() {
        assert_eq!(serde_json::to_string(&Value::Int(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&Value::Str("x".into())).unwrap(),
            "\"x\""
        );
    }
}
