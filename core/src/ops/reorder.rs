//! Storage-order reorder from CNHW to NCHW.
//!
//! The input is the flattened `[C, N*H*W]` matrix an implicit-GEMM
//! convolution produces; the output is the conventional `[N, C, H, W]`
//! activation tensor. The gather expression decodes the flat column
//! index with the pre-folded `H*W` constant.

use crate::internal::*;

#[derive(Debug, Clone, new)]
struct ReorderAttrs {
    n: usize,
    c: usize,
    h: usize,
    w: usize,
}

impl ReorderAttrs {
    fn parse(config: &OpConfig) -> LowerResult<ReorderAttrs> {
        Ok(ReorderAttrs::new(
            config.get_attr_int("N")?,
            config.get_attr_int("C")?,
            config.get_attr_int("H")?,
            config.get_attr_int("W")?,
        ))
    }
}

pub fn register(registry: &mut Registry) -> LowerResult<()> {
    registry
        .declare("CNHW2NCHW")
        .attr("N", AttrKind::Int)
        .attr("C", AttrKind::Int)
        .attr("H", AttrKind::Int)
        .attr("W", AttrKind::Int)
        .infer_shapes(infer_shapes)
        .translate(translate)
        .register()
}

fn infer_shapes(node: &mut dyn NodeView, config: &OpConfig) -> LowerResult<()> {
    let attrs = ReorderAttrs::parse(config)?;
    if node.input_count() != 1 {
        bail!(LoweringError::shape(format!(
            "CNHW2NCHW expects one input, node has {}",
            node.input_count()
        )));
    }
    let output_shape = tvec!(attrs.n, attrs.c, attrs.h, attrs.w);
    node.set_output(0, output_shape, node.input_datum_type(0));
    Ok(())
}

fn translate(node: &dyn NodeView, config: &OpConfig) -> LowerResult<String> {
    let attrs = ReorderAttrs::parse(config)?;
    if node.input_count() != 1 {
        bail!(LoweringError::shape(format!(
            "CNHW2NCHW expects one input, node has {}",
            node.input_count()
        )));
    }
    let template = " @output0@[N, C, H, W] = @input0@[C, W+H*@W@+N*@H*W@] \
                    where N in @N@, H in @H@, W in @W@; ";
    let substitutions = hashmap! {
        "input0".to_string() => ConfigValue::from("input0"),
        "output0".to_string() => ConfigValue::from("output0"),
        "N".to_string() => ConfigValue::from(attrs.n),
        "H".to_string() => ConfigValue::from(attrs.h),
        "W".to_string() => ConfigValue::from(attrs.w),
        "H*W".to_string() => ConfigValue::from(attrs.h * attrs.w),
    };
    create_code_from_template(template, &substitutions)
}
