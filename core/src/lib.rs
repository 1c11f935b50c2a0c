//! # tindex-core
//!
//! Operator lowering layer of a tensor-program compiler: given an
//! operator kind, a typed attribute bag and a node's tensor metadata,
//! infer the output shape and element type, then emit the tensor-index
//! IR handed to the downstream kernel generator.
//!
//! ## Example
//!
//! ```
//! use tindex_core::prelude::*;
//!
//! // The graph system owns its nodes; the lowering layer only sees this view.
//! struct Node {
//!     inputs: Vec<(Shape, DatumType)>,
//!     output: Option<(Shape, DatumType)>,
//! }
//!
//! impl NodeView for Node {
//!     fn name(&self) -> &str {
//!         "conv"
//!     }
//!     fn input_count(&self) -> usize {
//!         self.inputs.len()
//!     }
//!     fn input_shape(&self, i: usize) -> &Shape {
//!         &self.inputs[i].0
//!     }
//!     fn input_datum_type(&self, i: usize) -> DatumType {
//!         self.inputs[i].1
//!     }
//!     fn output_shape(&self, i: usize) -> Option<&Shape> {
//!         assert_eq!(i, 0);
//!         self.output.as_ref().map(|(shape, _)| shape)
//!     }
//!     fn output_datum_type(&self, i: usize) -> Option<DatumType> {
//!         assert_eq!(i, 0);
//!         self.output.as_ref().map(|(_, dt)| *dt)
//!     }
//!     fn set_output(&mut self, _i: usize, shape: Shape, dt: DatumType) {
//!         self.output = Some((shape, dt));
//!     }
//! }
//!
//! let registry = Registry::with_builtin_operators().unwrap();
//!
//! // a 3x3 kernel over a 5x5 activation, no padding
//! let mut node = Node {
//!     inputs: vec![
//!         (tvec!(1, 16, 5, 5), DatumType::F32),
//!         (tvec!(32, 16, 3, 3), DatumType::F32),
//!     ],
//!     output: None,
//! };
//! let config = OpConfig::new()
//!     .attr("N", 1usize)
//!     .attr("C", 32usize)
//!     .attr("H", 3usize)
//!     .attr("W", 3usize)
//!     .attr("P", 0usize)
//!     .attr("S", 1usize)
//!     .attr("D", 1usize);
//!
//! registry.infer_shapes("ImplicitGemm", &mut node, &config).unwrap();
//! assert_eq!(node.output_shape(0).unwrap(), &tvec!(32, 9));
//!
//! let ir = registry.translate("ImplicitGemm", &node, &config).unwrap();
//! assert!(ir.contains("output0[M, N] +=! kernel[M, K] * data[K, N];"));
//! ```
//!
//! The registry is an explicit value: build it once at startup, then hand
//! `&Registry` to every compilation pass. The IR string is consumed
//! verbatim by the external kernel generator and treated as opaque here.

pub mod attrs;
pub mod errors;
pub mod expr;
mod internal;
pub mod node;
pub mod ops;
pub mod registry;

pub use errors::{LowerResult, LoweringError};

pub mod prelude {
    pub use crate::attrs::{AttrKind, AttrValue, OpConfig};
    pub use crate::errors::{LowerResult, LoweringError};
    pub use crate::node::NodeView;
    pub use crate::registry::Registry;
    pub use tindex_data::prelude::*;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .try_init();
}
