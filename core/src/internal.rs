//! Private crate prelude: the names operator lowerings use all the time.

pub use std::collections::BTreeSet;

pub use anyhow::{bail, ensure, format_err, Context};
pub use derive_new::new;
pub use log::{debug, trace};
pub use maplit::hashmap;

pub use crate::attrs::{AttrKind, AttrSchema, AttrSpec, AttrValue, OpConfig};
pub use crate::errors::{LowerResult, LoweringError};
pub use crate::expr::{
    create_code_from_template, make_layout, ConfigMap, ConfigValue, ANNOTATION_MARKER,
};
pub use crate::node::NodeView;
pub use crate::registry::{OperatorDefinition, Registry};
pub use tindex_data::internal::*;
