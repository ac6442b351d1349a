//! Typed operator attributes

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
}

impl AttrValue {
    /// Numeric value as a float (integers widen)
    pub fn as_f64(&self) -> f64 {
        match *self {
            AttrValue::Int(v) => v as f64,
            AttrValue::Float(v) => v,
        }
    }

    /// Integer value, if this is an integer attribute
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            AttrValue::Int(v) => Some(v),
            AttrValue::Float(_) => None,
        }
    }

    /// Convert to the variant of `default`, if the value fits it
    ///
    /// Integers widen to floats; floats narrow to integers only when integral.
    pub fn coerce_like(&self, default: &AttrValue) -> Option<AttrValue> {
        match (default, *self) {
            (AttrValue::Float(_), v) => Some(AttrValue::Float(v.as_f64())),
            (AttrValue::Int(_), AttrValue::Int(v)) => Some(AttrValue::Int(v)),
            (AttrValue::Int(_), AttrValue::Float(v)) if v.fract() == 0.0 && v.is_finite() => {
                Some(AttrValue::Int(v as i64))
            }
            (AttrValue::Int(_), AttrValue::Float(_)) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

/// Attribute set of one operator instance, keyed by attribute name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, AttrValue>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.0.insert(name.into(), value);
    }

    /// Float attribute; missing names are a configuration error
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.get(name)
            .map(AttrValue::as_f64)
            .ok_or_else(|| Error::ConfigError(format!("missing attribute '{name}'")))
    }

    /// Integer attribute; missing names or float values are a configuration error
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::ConfigError(format!("missing attribute '{name}'")))?;
        value.as_i64().ok_or_else(|| {
            Error::ConfigError(format!(
                "attribute '{name}' must be an int, got {} {value}",
                value.kind()
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AttrValue)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Describe a type mismatch between a supplied attribute and its default
pub(crate) fn type_mismatch(op: &str, name: &str, value: &AttrValue, default: &AttrValue) -> Error {
    Error::ConfigError(format!(
        "{op}: attribute '{name}' expects {}, got {} {value}",
        default.kind(),
        value.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_int_to_float() {
        let v = AttrValue::Int(1).coerce_like(&AttrValue::Float(0.0));
        assert_eq!(v, Some(AttrValue::Float(1.0)));
    }

    #[test]
    fn test_coerce_integral_float_to_int() {
        let v = AttrValue::Float(1.0).coerce_like(&AttrValue::Int(0));
        assert_eq!(v, Some(AttrValue::Int(1)));
        assert_eq!(AttrValue::Float(0.5).coerce_like(&AttrValue::Int(0)), None);
    }

    #[test]
    fn test_get_typed() {
        let attrs: Attrs = [
            ("alpha".to_string(), AttrValue::Float(0.5)),
            ("transB".to_string(), AttrValue::Int(1)),
        ]
        .into_iter()
        .collect();

        assert_eq!(attrs.get_f64("alpha").unwrap(), 0.5);
        assert_eq!(attrs.get_f64("transB").unwrap(), 1.0);
        assert_eq!(attrs.get_i64("transB").unwrap(), 1);
        assert!(matches!(attrs.get_i64("alpha"), Err(Error::ConfigError(_))));
        assert!(matches!(attrs.get_f64("beta"), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_untagged_serde() {
        let attrs: Attrs = serde_yaml::from_str("alpha: 0.2\ntransA: 1\n").unwrap();
        assert_eq!(attrs.get("alpha"), Some(&AttrValue::Float(0.2)));
        assert_eq!(attrs.get("transA"), Some(&AttrValue::Int(1)));
    }

    #[test]
    fn test_from_literals() {
        assert_eq!(AttrValue::from(1), AttrValue::Int(1));
        assert_eq!(AttrValue::from(0.25), AttrValue::Float(0.25));
    }
}
