//! The IR template compiler.
//!
//! Two small, separately testable responsibilities: derive the bracketed
//! index-variable layout for a set of kept axes, and substitute
//! placeholders in a template fragment. All numeric reasoning (padding
//! geometry, strides, flattened extents) happens in the calling lowering
//! rule, which folds it into plain scalars before substitution; the
//! compiler itself only replaces exact `@name@` tokens with their
//! pre-rendered value.

use crate::errors::{LowerResult, LoweringError};
use anyhow::bail;
use itertools::Itertools;
use log::trace;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Placeholder delimiter in IR templates.
pub const PLACEHOLDER_MARKER: char = '@';

/// Reserved prefix of backend annotation lines appended after the IR.
/// Annotations are inert metadata for the kernel generator, not part of
/// the tensor-index grammar.
pub const ANNOTATION_MARKER: &str = "## @:";

/// A scalar bound to a placeholder, rendered verbatim at substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f32),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigValue::Int(i) => write!(fmt, "{i}"),
            // {:?} keeps the value recognizable as a float ("8.0", "1e-5")
            ConfigValue::Float(f) => write!(fmt, "{f:?}"),
            ConfigValue::Text(s) => write!(fmt, "{s}"),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> ConfigValue {
        ConfigValue::Int(v)
    }
}

impl From<usize> for ConfigValue {
    fn from(v: usize) -> ConfigValue {
        ConfigValue::Int(v as i64)
    }
}

impl From<f32> for ConfigValue {
    fn from(v: f32) -> ConfigValue {
        ConfigValue::Float(v)
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> ConfigValue {
        ConfigValue::Text(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> ConfigValue {
        ConfigValue::Text(v.to_string())
    }
}

/// Placeholder name to pre-folded scalar. Built fresh per translation
/// call; iteration order is irrelevant because tokens are exact-match.
pub type ConfigMap = HashMap<String, ConfigValue>;

/// Bracketed index-variable layout for a kept axis set.
///
/// Each kept axis gets its own variable `N<axis>`, in ascending axis
/// order. The empty set collapses to the single shared variable `N`:
/// with no axis singled out, one variable scans everything.
///
/// ```
/// use std::collections::BTreeSet;
/// use tindex_core::expr::make_layout;
/// assert_eq!(make_layout(&BTreeSet::from([0, 2])), "[N0, N2]");
/// assert_eq!(make_layout(&BTreeSet::new()), "[N]");
/// ```
pub fn make_layout(axes: &BTreeSet<usize>) -> String {
    if axes.is_empty() {
        "[N]".to_string()
    } else {
        format!("[{}]", axes.iter().map(|ax| format!("N{ax}")).join(", "))
    }
}

/// Replace every `@name@` token of `template` with its value from
/// `config`. Any token left over afterwards means the template references
/// a name the caller did not bind, and that is fatal.
pub fn create_code_from_template(template: &str, config: &ConfigMap) -> LowerResult<String> {
    let mut code = template.to_string();
    for (name, value) in config {
        code = code.replace(&format!("@{name}@"), &value.to_string());
    }
    if let Some(start) = code.find(PLACEHOLDER_MARKER) {
        let token = code[start + 1..].split(PLACEHOLDER_MARKER).next().unwrap_or("");
        bail!(LoweringError::UnresolvedPlaceholder(token.to_string()));
    }
    trace!("emitted IR fragment: {}", code.trim());
    Ok(code)
}
