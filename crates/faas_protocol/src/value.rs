//! `ArgValue`: the on-the-wire structured value used for function
//! arguments, return values, and default-argument literals.
//!
//! spec.md §3/§4.6 names the declared parameter/return types `bool`,
//! `int`, `float`, `complex`, `str`, `bytes`, `bytes-buffer`, plus
//! `array`/`map` of such. `Opaque` exists only for values that cannot be
//! represented in the wire's JSON form and therefore take the
//! `pickle_base64` encoding path (spec.md §4.4).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    BytesBuffer,
    Array,
    Map,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "{s}")
    }
}

/// A structured argument/return value.
///
/// `Complex`, `Bytes`, and `BytesBuffer` are tagged objects on the wire
/// (`{"type": "...", ...}`) because raw JSON cannot distinguish them from
/// a plain number/string; every other variant serializes as the JSON
/// value it looks like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    Bytes { bytes_b64: String },
    BytesBuffer { buffer_b64: String },
    Array(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
    /// Not representable on the wire as JSON; carries an opaque
    /// serialized blob that must go out `pickle_base64`-encoded.
    Opaque(Vec<u8>),
}

impl ArgValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ArgValue::Bool(_) => ValueType::Bool,
            ArgValue::Int(_) => ValueType::Int,
            ArgValue::Float(_) => ValueType::Float,
            ArgValue::Complex { .. } => ValueType::Complex,
            ArgValue::Str(_) => ValueType::Str,
            ArgValue::Bytes { .. } => ValueType::Bytes,
            ArgValue::BytesBuffer { .. } => ValueType::BytesBuffer,
            ArgValue::Array(_) => ValueType::Array,
            ArgValue::Map(_) => ValueType::Map,
            ArgValue::Opaque(_) => ValueType::Bytes,
        }
    }

    /// Does this value represent the argument-reference sentinel
    /// `"$<name>.output"`? Only valid inside workflows (spec.md §3).
    ///
    /// Uses exact `"$"` prefix / `".output"` suffix slicing rather than
    /// `str::trim_matches`, which strips character *sets* rather than a
    /// literal prefix/suffix (spec.md §9, Open Questions).
    pub fn as_output_reference(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) if s.starts_with('$') && s.ends_with(".output") => {
                Some(&s[1..s.len() - ".output".len()])
            }
            _ => None,
        }
    }

    /// True if this value can be represented directly as JSON (spec.md
    /// §4.4 encoding discriminator).
    pub fn is_json_representable(&self) -> bool {
        !matches!(self, ArgValue::Opaque(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_output_reference_by_exact_affixes() {
        let v = ArgValue::Str("$add.output".to_string());
        assert_eq!(v.as_output_reference(), Some("add"));
    }

    #[test]
    fn rejects_values_without_the_full_affix() {
        assert_eq!(ArgValue::Str("add.output".to_string()).as_output_reference(), None);
        assert_eq!(ArgValue::Str("$add".to_string()).as_output_reference(), None);
        assert_eq!(ArgValue::Int(5).as_output_reference(), None);
    }

    #[test]
    fn opaque_values_are_not_json_representable() {
        assert!(!ArgValue::Opaque(vec![1, 2, 3]).is_json_representable());
        assert!(ArgValue::Int(1).is_json_representable());
    }
}
