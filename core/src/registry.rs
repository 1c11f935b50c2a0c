//! Operator registry and declaration builder.
//!
//! The registry is an explicit value owned by the embedding compiler, not
//! process-wide state: it is populated once at startup (single writer),
//! then only read. All methods after construction take `&self`, so
//! post-initialization concurrent readers need no locking.

use crate::attrs::{AttrKind, AttrSchema, AttrSpec, AttrValue, OpConfig};
use crate::errors::{LowerResult, LoweringError};
use crate::node::NodeView;
use anyhow::{bail, Context};
use log::debug;
use std::collections::HashMap;

pub type InferShapesFn = fn(&mut dyn NodeView, &OpConfig) -> LowerResult<()>;
pub type TranslateFn = fn(&dyn NodeView, &OpConfig) -> LowerResult<String>;

/// One registered operator kind: its attribute contract and its two
/// procedures. Immutable once registered.
#[derive(Debug)]
pub struct OperatorDefinition {
    kind: String,
    schema: AttrSchema,
    infer: Option<InferShapesFn>,
    translate: Option<TranslateFn>,
}

impl OperatorDefinition {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn schema(&self) -> &AttrSchema {
        &self.schema
    }

    /// Validate the bag against the schema, fill defaults, then run the
    /// shape-inference procedure on the node.
    pub fn infer_shapes(&self, node: &mut dyn NodeView, config: &OpConfig) -> LowerResult<()> {
        let config = self.schema.resolve(config)?;
        let infer = self
            .infer
            .with_context(|| format!("Operator {} declared without a shape inference procedure", self.kind))?;
        infer(node, &config)
    }

    /// Validate the bag against the schema, fill defaults, then run the
    /// translation procedure, yielding the node's tensor-index IR.
    pub fn translate(&self, node: &dyn NodeView, config: &OpConfig) -> LowerResult<String> {
        let config = self.schema.resolve(config)?;
        let translate = self
            .translate
            .with_context(|| format!("Operator {} declared without a translation procedure", self.kind))?;
        translate(node, &config)
    }
}

/// Chained declaration of one operator kind. Attribute, shape-inference
/// and translation calls can come in any order; `register` finalizes the
/// entry.
#[must_use = "an operator declaration does nothing until register() is called"]
pub struct OperatorBuilder<'r> {
    registry: &'r mut Registry,
    def: OperatorDefinition,
}

impl OperatorBuilder<'_> {
    pub fn attr(mut self, name: &str, kind: AttrKind) -> Self {
        self.def.schema.push(AttrSpec::required(name, kind));
        self
    }

    pub fn attr_with_default(mut self, name: &str, default: impl Into<AttrValue>) -> Self {
        self.def.schema.push(AttrSpec::with_default(name, default.into()));
        self
    }

    pub fn infer_shapes(mut self, f: InferShapesFn) -> Self {
        self.def.infer = Some(f);
        self
    }

    pub fn translate(mut self, f: TranslateFn) -> Self {
        self.def.translate = Some(f);
        self
    }

    pub fn register(self) -> LowerResult<()> {
        let kind = self.def.kind.clone();
        if self.registry.ops.contains_key(&kind) {
            bail!(LoweringError::DuplicateOperator(kind));
        }
        debug!("registering operator {}", kind);
        self.registry.ops.insert(kind, self.def);
        Ok(())
    }
}

/// The operator table: kind name to definition.
#[derive(Default)]
pub struct Registry {
    ops: HashMap<String, OperatorDefinition>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry carrying every operator this crate knows how to lower.
    pub fn with_builtin_operators() -> LowerResult<Registry> {
        let mut registry = Registry::new();
        crate::ops::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn declare<'r>(&'r mut self, kind: &str) -> OperatorBuilder<'r> {
        OperatorBuilder {
            registry: self,
            def: OperatorDefinition {
                kind: kind.to_string(),
                schema: AttrSchema::default(),
                infer: None,
                translate: None,
            },
        }
    }

    pub fn lookup(&self, kind: &str) -> LowerResult<&OperatorDefinition> {
        match self.ops.get(kind) {
            Some(def) => Ok(def),
            None => bail!(LoweringError::UnknownOperator(kind.to_string())),
        }
    }

    pub fn operator_kinds(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(|k| k.as_str())
    }

    /// Run shape inference for `kind` on `node`, tagging failures with
    /// the node identity so the compilation pass can report which
    /// operator instance broke.
    pub fn infer_shapes(
        &self,
        kind: &str,
        node: &mut dyn NodeView,
        config: &OpConfig,
    ) -> LowerResult<()> {
        let def = self.lookup(kind)?;
        let name = node.name().to_string();
        def.infer_shapes(node, config)
            .with_context(|| format!("Inferring shapes for {kind} node {name}"))
    }

    /// Translate `kind` on `node` to its tensor-index IR.
    pub fn translate(
        &self,
        kind: &str,
        node: &dyn NodeView,
        config: &OpConfig,
    ) -> LowerResult<String> {
        let def = self.lookup(kind)?;
        def.translate(node, config)
            .with_context(|| format!("Translating {} node {}", kind, node.name()))
    }
}
