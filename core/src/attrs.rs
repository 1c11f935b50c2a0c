//! Typed attribute values, bags and schemas.
//!
//! An operator instance carries a named bag of [`AttrValue`]s. The
//! operator's registration declares an [`AttrSchema`]: per attribute, the
//! expected kind and either a required flag or a documented default. The
//! registry validates the bag against the schema before any procedure
//! runs, so the lowering rules can use the typed accessors without
//! re-checking presence.

use crate::errors::{LowerResult, LoweringError};
use anyhow::{bail, format_err};
use num_traits::FromPrimitive;
use std::collections::HashMap;
use tindex_data::TVec;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f32),
    Str(String),
    Ints(TVec<i64>),
    Bool(bool),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::Str(_) => AttrKind::Str,
            AttrValue::Ints(_) => AttrKind::Ints,
            AttrValue::Bool(_) => AttrKind::Bool,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> AttrValue {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> AttrValue {
        AttrValue::Int(v as i64)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> AttrValue {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> AttrValue {
        AttrValue::Str(v.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> AttrValue {
        AttrValue::Bool(v)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> AttrValue {
        AttrValue::Ints(v.into())
    }
}

impl From<&[i64]> for AttrValue {
    fn from(v: &[i64]) -> AttrValue {
        AttrValue::Ints(v.iter().copied().collect())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttrKind {
    Int,
    Float,
    Str,
    Ints,
    Bool,
}

impl AttrKind {
    fn as_str(&self) -> &'static str {
        match self {
            AttrKind::Int => "int",
            AttrKind::Float => "float",
            AttrKind::Str => "string",
            AttrKind::Ints => "list<int>",
            AttrKind::Bool => "bool",
        }
    }
}

/// The attribute bag attached to one operator instance. The values come
/// from outside (graph import, config); this crate only reads them.
#[derive(Debug, Clone, Default)]
pub struct OpConfig {
    attr: HashMap<String, AttrValue>,
}

impl OpConfig {
    pub fn new() -> OpConfig {
        OpConfig::default()
    }

    pub fn attr<S: ToString, V: Into<AttrValue>>(mut self, name: S, value: V) -> OpConfig {
        self.attr.insert(name.to_string(), value.into());
        self
    }

    pub fn insert<S: ToString, V: Into<AttrValue>>(&mut self, name: S, value: V) {
        self.attr.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attr.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attr.contains_key(name)
    }

    pub fn get_attr_int<T: FromPrimitive>(&self, name: &str) -> LowerResult<T> {
        self.get_attr_opt_int(name)?
            .ok_or_else(|| LoweringError::MissingAttribute(name.to_string()).into())
    }

    pub fn get_attr_opt_int<T: FromPrimitive>(&self, name: &str) -> LowerResult<Option<T>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue::Int(i)) => Ok(Some(T::from_i64(*i).ok_or_else(|| {
                format_err!("Attribute '{}' value {} does not fit the expected integer type", name, i)
            })?)),
            Some(_) => bail!(LoweringError::AttributeType {
                name: name.to_string(),
                expected: AttrKind::Int.as_str(),
            }),
        }
    }

    pub fn get_attr_float<T: FromPrimitive>(&self, name: &str) -> LowerResult<T> {
        self.get_attr_opt_float(name)?
            .ok_or_else(|| LoweringError::MissingAttribute(name.to_string()).into())
    }

    pub fn get_attr_opt_float<T: FromPrimitive>(&self, name: &str) -> LowerResult<Option<T>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue::Float(f)) => Ok(Some(T::from_f32(*f).ok_or_else(|| {
                format_err!("Attribute '{}' value {} does not fit the expected float type", name, f)
            })?)),
            Some(_) => bail!(LoweringError::AttributeType {
                name: name.to_string(),
                expected: AttrKind::Float.as_str(),
            }),
        }
    }

    pub fn get_attr_list_int<T: FromPrimitive>(&self, name: &str) -> LowerResult<Vec<T>> {
        self.get_attr_opt_list_int(name)?
            .ok_or_else(|| LoweringError::MissingAttribute(name.to_string()).into())
    }

    pub fn get_attr_opt_list_int<T: FromPrimitive>(&self, name: &str) -> LowerResult<Option<Vec<T>>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue::Ints(list)) => Ok(Some(
                list.iter()
                    .map(|&i| {
                        T::from_i64(i).ok_or_else(|| {
                            format_err!(
                                "Attribute '{}' element {} does not fit the expected integer type",
                                name,
                                i
                            )
                        })
                    })
                    .collect::<LowerResult<Vec<T>>>()?,
            )),
            Some(_) => bail!(LoweringError::AttributeType {
                name: name.to_string(),
                expected: AttrKind::Ints.as_str(),
            }),
        }
    }

    pub fn get_attr_str(&self, name: &str) -> LowerResult<&str> {
        self.get_attr_opt_str(name)?
            .ok_or_else(|| LoweringError::MissingAttribute(name.to_string()).into())
    }

    pub fn get_attr_opt_str(&self, name: &str) -> LowerResult<Option<&str>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue::Str(s)) => Ok(Some(s)),
            Some(_) => bail!(LoweringError::AttributeType {
                name: name.to_string(),
                expected: AttrKind::Str.as_str(),
            }),
        }
    }

    pub fn get_attr_bool(&self, name: &str) -> LowerResult<bool> {
        self.get_attr_opt_bool(name)?
            .ok_or_else(|| LoweringError::MissingAttribute(name.to_string()).into())
    }

    pub fn get_attr_opt_bool(&self, name: &str) -> LowerResult<Option<bool>> {
        match self.attr.get(name) {
            None => Ok(None),
            Some(AttrValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => bail!(LoweringError::AttributeType {
                name: name.to_string(),
                expected: AttrKind::Bool.as_str(),
            }),
        }
    }
}

/// One declared attribute: expected kind, plus a default when the
/// attribute is a documented tunable rather than a requirement.
#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub name: String,
    pub kind: AttrKind,
    pub default: Option<AttrValue>,
}

impl AttrSpec {
    pub fn required(name: &str, kind: AttrKind) -> AttrSpec {
        AttrSpec { name: name.to_string(), kind, default: None }
    }

    pub fn with_default(name: &str, default: AttrValue) -> AttrSpec {
        AttrSpec { name: name.to_string(), kind: default.kind(), default: Some(default) }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The attribute contract declared at operator registration.
#[derive(Debug, Clone, Default)]
pub struct AttrSchema {
    specs: Vec<AttrSpec>,
}

impl AttrSchema {
    pub fn push(&mut self, spec: AttrSpec) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[AttrSpec] {
        &self.specs
    }

    /// Check the bag against the contract, then return a view of it with
    /// schema defaults filled in. Attributes the schema does not mention
    /// pass through untouched.
    pub fn resolve(&self, config: &OpConfig) -> LowerResult<OpConfig> {
        let mut resolved = config.clone();
        for spec in &self.specs {
            match config.get(&spec.name) {
                Some(value) if value.kind() != spec.kind => bail!(LoweringError::AttributeType {
                    name: spec.name.clone(),
                    expected: spec.kind.as_str(),
                }),
                Some(_) => (),
                None => match &spec.default {
                    Some(default) => resolved.insert(&spec.name, default.clone()),
                    None => bail!(LoweringError::MissingAttribute(spec.name.clone())),
                },
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::lowering_error;

    #[test]
    fn typed_accessors() {
        let config = OpConfig::new().attr("stage", 2i64).attr("epsilon", 1e-3f32);
        assert_eq!(config.get_attr_int::<usize>("stage").unwrap(), 2);
        assert_eq!(config.get_attr_float::<f32>("epsilon").unwrap(), 1e-3);
    }

    #[test]
    fn missing_required_attribute() {
        let config = OpConfig::new();
        let err = config.get_attr_list_int::<i64>("axes").unwrap_err();
        assert!(matches!(
            lowering_error(&err),
            Some(LoweringError::MissingAttribute(name)) if name == "axes"
        ));
    }

    #[test]
    fn kind_mismatch() {
        let config = OpConfig::new().attr("axes", 12i64);
        let err = config.get_attr_list_int::<i64>("axes").unwrap_err();
        assert!(matches!(lowering_error(&err), Some(LoweringError::AttributeType { .. })));
    }

    #[test]
    fn schema_fills_defaults() {
        let mut schema = AttrSchema::default();
        schema.push(AttrSpec::with_default("epsilon", AttrValue::Float(1e-5)));
        let resolved = schema.resolve(&OpConfig::new()).unwrap();
        assert_eq!(resolved.get_attr_float::<f32>("epsilon").unwrap(), 1e-5);
    }

    #[test]
    fn schema_rejects_absent_required() {
        let mut schema = AttrSchema::default();
        schema.push(AttrSpec::required("axes", AttrKind::Ints));
        let err = schema.resolve(&OpConfig::new()).unwrap_err();
        assert!(matches!(lowering_error(&err), Some(LoweringError::MissingAttribute(_))));
    }
}
