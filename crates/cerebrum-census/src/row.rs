// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Schema-less result rows handed to storage

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Text written in place of an undefined ratio
pub const UNDEFINED_SENTINEL: &str = "NaN";

/// A single cell value in a flat row
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    /// Ratio with a zero denominator
    Undefined,
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Undefined => Some(UNDEFINED_SENTINEL),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Scalar::Undefined)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Int(v) => serializer.serialize_i64(*v),
            Scalar::Float(v) => serializer.serialize_f64(*v),
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Undefined => serializer.serialize_str(UNDEFINED_SENTINEL),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(Scalar::Int)
            .unwrap_or(Scalar::Float(v as f64))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Column name -> value, in column emission order
pub type FlatRow = IndexMap<String, Scalar>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_serializes_as_sentinel() {
        let mut row = FlatRow::new();
        row.insert("Region".to_string(), Scalar::from("VISp"));
        row.insert("nregion".to_string(), Scalar::from(6u64));
        row.insert("inhibitory fraction".to_string(), Scalar::Undefined);
        row.insert("fraction wi. region".to_string(), Scalar::from(0.5));

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"Region":"VISp","nregion":6,"inhibitory fraction":"NaN","fraction wi. region":0.5}"#
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
        assert_eq!(Scalar::Undefined.as_f64(), None);
        assert_eq!(Scalar::Undefined.as_str(), Some("NaN"));
        assert!(Scalar::Undefined.is_undefined());
        assert_eq!(Scalar::from(u64::MAX), Scalar::Float(u64::MAX as f64));
    }
}
