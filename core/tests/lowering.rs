//! End-to-end lowering pass over the built-in registry: the way the
//! owning graph compiler drives this crate, one node at a time.

use tindex_core::errors::lowering_error;
use tindex_core::prelude::*;

/// Minimal graph node for the tests; the real one lives in the embedding
/// compiler.
struct GraphNode {
    name: String,
    inputs: Vec<(Shape, DatumType)>,
    outputs: Vec<Option<(Shape, DatumType)>>,
}

impl GraphNode {
    fn new(name: &str, inputs: Vec<(Shape, DatumType)>) -> GraphNode {
        GraphNode { name: name.to_string(), inputs, outputs: vec![None] }
    }

    fn output(&self) -> (Shape, DatumType) {
        self.outputs[0].clone().expect("shape inference has run")
    }
}

impl NodeView for GraphNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_count(&self) -> usize {
        self.inputs.len()
    }

    fn input_shape(&self, i: usize) -> &Shape {
        &self.inputs[i].0
    }

    fn input_datum_type(&self, i: usize) -> DatumType {
        self.inputs[i].1
    }

    fn output_shape(&self, i: usize) -> Option<&Shape> {
        self.outputs.get(i)?.as_ref().map(|(shape, _)| shape)
    }

    fn output_datum_type(&self, i: usize) -> Option<DatumType> {
        self.outputs.get(i)?.as_ref().map(|(_, dt)| *dt)
    }

    fn set_output(&mut self, i: usize, shape: Shape, datum_type: DatumType) {
        if self.outputs.len() <= i {
            self.outputs.resize_with(i + 1, || None);
        }
        self.outputs[i] = Some((shape, datum_type));
    }
}

fn lower(
    registry: &Registry,
    kind: &str,
    node: &mut GraphNode,
    config: &OpConfig,
) -> LowerResult<String> {
    registry.infer_shapes(kind, node, config)?;
    registry.translate(kind, &*node, config)
}

#[test]
fn softmax_pipeline_wires_stage_outputs_into_stage_inputs() {
    let registry = Registry::with_builtin_operators().unwrap();
    let source = (tvec!(2usize, 3, 4), DatumType::F32);
    let axes = vec![1i64];

    let config = |stage: i64| {
        OpConfig::new().attr("axes", axes.clone()).attr("stage", stage)
    };

    let mut max = GraphNode::new("softmax.max", vec![source.clone()]);
    let frag0 = lower(&registry, "SoftmaxBasic", &mut max, &config(0)).unwrap();
    assert_eq!(max.output().0, tvec!(2, 4));

    let mut exp = GraphNode::new("softmax.exp", vec![source.clone(), max.output()]);
    let frag1 = lower(&registry, "SoftmaxBasic", &mut exp, &config(1)).unwrap();
    assert_eq!(exp.output().0, tvec!(2, 3, 4));

    let mut sum = GraphNode::new("softmax.sum", vec![exp.output()]);
    let frag2 = lower(&registry, "SoftmaxBasic", &mut sum, &config(2)).unwrap();
    assert_eq!(sum.output().0, tvec!(2, 4));

    let mut div = GraphNode::new("softmax.div", vec![exp.output(), sum.output()]);
    let frag3 = lower(&registry, "SoftmaxBasic", &mut div, &config(3)).unwrap();
    assert_eq!(div.output().0, tvec!(2, 3, 4));

    let fragments = [frag0, frag1, frag2, frag3];
    for (ix, a) in fragments.iter().enumerate() {
        assert!(!a.contains('@'));
        for b in &fragments[ix + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn shape_inference_and_translation_are_deterministic() {
    let registry = Registry::with_builtin_operators().unwrap();
    let config = OpConfig::new()
        .attr("N", 1usize)
        .attr("C", 32usize)
        .attr("H", 3usize)
        .attr("W", 3usize)
        .attr("P", 1usize)
        .attr("S", 1usize)
        .attr("D", 1usize);
    let inputs =
        vec![(tvec!(1usize, 16, 3, 3), DatumType::F32), (tvec!(32usize, 16, 3, 3), DatumType::F32)];

    let mut first = GraphNode::new("conv", inputs.clone());
    let mut second = GraphNode::new("conv", inputs);
    let ir_first = lower(&registry, "ImplicitGemm", &mut first, &config).unwrap();
    let ir_second = lower(&registry, "ImplicitGemm", &mut second, &config).unwrap();
    assert_eq!(first.output(), second.output());
    assert_eq!(ir_first, ir_second);

    // repeated translation on the same node is idempotent too
    let ir_again = registry.translate("ImplicitGemm", &first, &config).unwrap();
    assert_eq!(ir_first, ir_again);
}

#[test]
fn padded_conv_gather_reads_the_pad_tensor() {
    let registry = Registry::with_builtin_operators().unwrap();
    let config = OpConfig::new()
        .attr("N", 1usize)
        .attr("C", 32usize)
        .attr("H", 3usize)
        .attr("W", 3usize)
        .attr("P", 1usize)
        .attr("S", 1usize)
        .attr("D", 1usize);
    let mut node = GraphNode::new(
        "conv",
        vec![(tvec!(1usize, 16, 3, 3), DatumType::F32), (tvec!(32usize, 16, 3, 3), DatumType::F32)],
    );
    let ir = lower(&registry, "ImplicitGemm", &mut node, &config).unwrap();
    assert_eq!(ir.matches("pad[N, C, H0, W0] =").count(), 1);
    assert!(ir.find("pad[N, C, H0, W0]").unwrap() < ir.find("data[K, N]").unwrap());
    assert!(ir.contains("data[K, N] = pad["));
}

#[test]
fn half_precision_conv_carries_the_backend_annotation() {
    let registry = Registry::with_builtin_operators().unwrap();
    let config = OpConfig::new()
        .attr("N", 1usize)
        .attr("C", 32usize)
        .attr("H", 3usize)
        .attr("W", 3usize)
        .attr("P", 0usize)
        .attr("S", 1usize)
        .attr("D", 1usize);
    let mut node = GraphNode::new(
        "conv",
        vec![(tvec!(1usize, 16, 5, 5), DatumType::F16), (tvec!(32usize, 16, 3, 3), DatumType::F16)],
    );
    let ir = lower(&registry, "ImplicitGemm", &mut node, &config).unwrap();
    assert_eq!(ir.matches("## @:").count(), 1);
    assert!(ir.trim_end().ends_with("tensorCoreConfig=(0, 1)"));
}

#[test]
fn unknown_operator_is_reported_by_name() {
    let registry = Registry::with_builtin_operators().unwrap();
    let mut node = GraphNode::new("node", vec![(tvec!(2usize, 2), DatumType::F32)]);
    let err = registry.infer_shapes("Gelu", &mut node, &OpConfig::new()).unwrap_err();
    assert!(matches!(
        lowering_error(&err),
        Some(LoweringError::UnknownOperator(kind)) if kind == "Gelu"
    ));
}

#[test]
fn missing_axes_is_a_hard_failure_not_an_empty_reduction() {
    let registry = Registry::with_builtin_operators().unwrap();
    let mut node = GraphNode::new("softmax.max", vec![(tvec!(2usize, 3, 4), DatumType::F32)]);
    let config = OpConfig::new().attr("stage", 0i64);
    let err = registry.infer_shapes("SoftmaxBasic", &mut node, &config).unwrap_err();
    assert!(matches!(
        lowering_error(&err),
        Some(LoweringError::MissingAttribute(name)) if name == "axes"
    ));
}

#[test]
fn stage_set_is_closed() {
    let registry = Registry::with_builtin_operators().unwrap();
    let mut node = GraphNode::new("softmax.max", vec![(tvec!(2usize, 3, 4), DatumType::F32)]);
    let config = OpConfig::new().attr("axes", vec![1i64]).attr("stage", 4i64);
    let err = registry.infer_shapes("SoftmaxBasic", &mut node, &config).unwrap_err();
    assert!(matches!(lowering_error(&err), Some(LoweringError::InvalidStage(4))));
}

#[test]
fn failures_name_the_operator_instance() {
    let registry = Registry::with_builtin_operators().unwrap();
    let mut node = GraphNode::new("block3.conv7", vec![(tvec!(2usize, 3, 4), DatumType::F32)]);
    let config = OpConfig::new().attr("axes", vec![1i64]).attr("stage", 9i64);
    let err = registry.infer_shapes("SoftmaxBasic", &mut node, &config).unwrap_err();
    let report = format!("{err:#}");
    assert!(report.contains("block3.conv7"));
    assert!(report.contains("SoftmaxBasic"));
}
