//! Instance normalization.
//!
//! `Scale * (T - mean(T)) / sqrt(var(T) + epsilon) + Bias` over a
//! `[N, C, I]` tensor with per-channel scale and bias. Mean and variance
//! are emitted as named intermediate tensors; the kernel generator sees
//! three fragments forming one expression sequence.

use crate::internal::*;

pub fn register(registry: &mut Registry) -> LowerResult<()> {
    registry
        .declare("InstanceNormalization")
        .attr_with_default("epsilon", 1e-5f32)
        .infer_shapes(infer_shapes)
        .translate(translate)
        .register()
}

fn check_ranks(node: &dyn NodeView) -> LowerResult<()> {
    if node.input_count() != 3 {
        bail!(LoweringError::shape(format!(
            "InstanceNormalization expects data, scale and bias inputs, node has {}",
            node.input_count()
        )));
    }
    if node.input_shape(0).len() != 3 {
        bail!(LoweringError::shape(format!(
            "InstanceNormalization data must be rank 3 [N, C, I], got rank {}",
            node.input_shape(0).len()
        )));
    }
    for (i, role) in [(1, "scale"), (2, "bias")] {
        if node.input_shape(i).len() != 1 {
            bail!(LoweringError::shape(format!(
                "InstanceNormalization {} must be rank 1, got rank {}",
                role,
                node.input_shape(i).len()
            )));
        }
    }
    Ok(())
}

fn infer_shapes(node: &mut dyn NodeView, _config: &OpConfig) -> LowerResult<()> {
    check_ranks(&*node)?;
    let shape = node.input_shape(0).clone();
    node.set_output(0, shape, node.input_datum_type(0));
    Ok(())
}

fn translate(node: &dyn NodeView, config: &OpConfig) -> LowerResult<String> {
    check_ranks(node)?;
    let epsilon: f32 = config.get_attr_float("epsilon")?;
    let spatial = node.input_shape(0)[2];

    let template = concat!(
        "avg[N,C] +=! @input0@[N,C,I] / @dims@;",
        "var[N,C] +=! (@input0@[N,C,I] - avg[N,C]).call(`pow`, 2) / @dims@;",
        "@output0@[N, C, I] = @input2@[C] + @input1@[C] * (@input0@[N, C, I] - ",
        "avg[N,C]) / (@epsilon@ + var[N,C]).call(`sqrt`);"
    );
    let substitutions = hashmap! {
        "input0".to_string() => ConfigValue::from("input0"),
        "input1".to_string() => ConfigValue::from("input1"),
        "input2".to_string() => ConfigValue::from("input2"),
        "output0".to_string() => ConfigValue::from("output0"),
        "dims".to_string() => ConfigValue::from(spatial as f32),
        "epsilon".to_string() => ConfigValue::from(epsilon),
    };
    create_code_from_template(template, &substitutions)
}
