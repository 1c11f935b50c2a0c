//! Staged softmax lowering.
//!
//! Softmax needs a cross-element reduction whose result is broadcast back
//! over the original tensor, so it cannot be one tensor-index expression.
//! It is emitted as four fragments selected by the `stage` attribute; the
//! graph layer instantiates one node per stage and wires each stage
//! output to the next stage input. This crate translates a single stage
//! in isolation.

use crate::internal::*;

/// The four fragments of the decomposition. Closed set: any other
/// `stage` value is fatal, there is no extension point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Reduce the input over the softmax axes, keeping the running max.
    ReduceMax = 0,
    /// Subtract the stage-0 max and exponentiate, elementwise.
    Exponentiate = 1,
    /// Reduce the stage-1 result over the same axes into a sum.
    ReduceSum = 2,
    /// Divide the stage-1 result by the stage-2 sum, elementwise.
    Normalize = 3,
}

impl Stage {
    pub fn from_attr(stage: i64) -> LowerResult<Stage> {
        match stage {
            0 => Ok(Stage::ReduceMax),
            1 => Ok(Stage::Exponentiate),
            2 => Ok(Stage::ReduceSum),
            3 => Ok(Stage::Normalize),
            _ => bail!(LoweringError::InvalidStage(stage)),
        }
    }

    /// Reduction stages take one input; the elementwise combine stages
    /// also consume the preceding reduction's output.
    pub fn arity(&self) -> usize {
        match self {
            Stage::ReduceMax | Stage::ReduceSum => 1,
            Stage::Exponentiate | Stage::Normalize => 2,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Stage::ReduceMax => " @output0@@temp_layout@ >=! @input0@@input0_layout@; ",
            Stage::Exponentiate => {
                " @output0@@input0_layout@ = (@input0@@input0_layout@ - @input1@@temp_layout@).call(`exp`); "
            }
            Stage::ReduceSum => " @output0@@temp_layout@ +=! @input0@@input0_layout@; ",
            Stage::Normalize => {
                " @output0@@input0_layout@ = @input0@@input0_layout@ / @input1@@temp_layout@; "
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SoftmaxAttrs {
    axes: TVec<usize>,
    stage: Stage,
}

impl SoftmaxAttrs {
    fn parse(node: &dyn NodeView, config: &OpConfig) -> LowerResult<SoftmaxAttrs> {
        let stage = Stage::from_attr(config.get_attr_int("stage")?)?;
        let rank = node.input_shape(0).len();
        let mut axes = tvec!();
        for ax in config.get_attr_list_int::<i64>("axes")? {
            if ax < 0 || ax as usize >= rank {
                bail!(LoweringError::shape(format!(
                    "softmax axis {ax} out of range for rank {rank} input"
                )));
            }
            axes.push(ax as usize);
        }
        if node.input_count() != stage.arity() {
            bail!(LoweringError::shape(format!(
                "stage {:?} expects {} input(s), node has {}",
                stage,
                stage.arity(),
                node.input_count()
            )));
        }
        Ok(SoftmaxAttrs { axes, stage })
    }

    /// Axes surviving the reduction, in ascending order.
    fn kept_axes(&self, rank: usize) -> BTreeSet<usize> {
        (0..rank).filter(|ax| !self.axes.contains(ax)).collect()
    }
}

pub fn register(registry: &mut Registry) -> LowerResult<()> {
    registry
        .declare("SoftmaxBasic")
        .attr("axes", AttrKind::Ints)
        .attr("stage", AttrKind::Int)
        .infer_shapes(infer_shapes)
        .translate(translate)
        .register()
}

fn infer_shapes(node: &mut dyn NodeView, config: &OpConfig) -> LowerResult<()> {
    let attrs = SoftmaxAttrs::parse(&*node, config)?;
    let input_shape = node.input_shape(0).clone();
    let output_shape: Shape = match attrs.stage {
        Stage::Exponentiate | Stage::Normalize => input_shape,
        Stage::ReduceMax | Stage::ReduceSum => input_shape
            .iter()
            .enumerate()
            .filter(|(ax, _)| !attrs.axes.contains(ax))
            .map(|(_, dim)| *dim)
            .collect(),
    };
    node.set_output(0, output_shape, node.input_datum_type(0));
    Ok(())
}

fn translate(node: &dyn NodeView, config: &OpConfig) -> LowerResult<String> {
    let attrs = SoftmaxAttrs::parse(node, config)?;
    let rank = node.input_shape(0).len();
    let input_axes: BTreeSet<usize> = (0..rank).collect();
    let kept_axes = attrs.kept_axes(rank);

    let mut substitutions: ConfigMap = hashmap! {
        "temp_layout".to_string() => ConfigValue::from(make_layout(&kept_axes)),
        "input0_layout".to_string() => ConfigValue::from(make_layout(&input_axes)),
        "input0".to_string() => ConfigValue::from("input0"),
        "output0".to_string() => ConfigValue::from("output0"),
    };
    if attrs.stage.arity() == 2 {
        substitutions.insert("input1".to_string(), ConfigValue::from("input1"));
    }
    create_code_from_template(attrs.stage.template(), &substitutions)
}
