//! Convolution lowered to an implicit GEMM.
//!
//! The unrolled-patch operand of the matrix product is never
//! materialized: every element of the virtual `[K, N]` matrix is reached
//! through integer division/modulo arithmetic on its flat indices, so the
//! only buffers the kernel generator sees are the activation (possibly
//! padded), the reshaped kernel and the output.

use crate::internal::*;

/// `tensorCoreConfig=(0, 1)` asks the backend to map the product onto
/// mixed-precision matrix-multiply hardware, operands 0 and 1 in natural
/// order.
const TENSOR_CORE_ANNOTATION: &str = "## @: tensorCoreConfig=(0, 1)";

#[derive(Debug, Clone, new)]
struct ImplicitGemmAttrs {
    /// Batch size, cross-checked against the activation shape.
    n: usize,
    /// Output channels.
    f: usize,
    /// Output spatial extents.
    h: usize,
    w: usize,
    /// Symmetric zero padding.
    p: usize,
    /// Stride and dilation, identical on both spatial axes.
    s: usize,
    d: usize,
}

impl ImplicitGemmAttrs {
    fn parse(config: &OpConfig) -> LowerResult<ImplicitGemmAttrs> {
        Ok(ImplicitGemmAttrs::new(
            config.get_attr_int("N")?,
            config.get_attr_int("C")?,
            config.get_attr_int("H")?,
            config.get_attr_int("W")?,
            config.get_attr_int("P")?,
            config.get_attr_int("S")?,
            config.get_attr_int("D")?,
        ))
    }
}

pub fn register(registry: &mut Registry) -> LowerResult<()> {
    registry
        .declare("ImplicitGemm")
        .attr("N", AttrKind::Int)
        .attr("C", AttrKind::Int)
        .attr("H", AttrKind::Int)
        .attr("W", AttrKind::Int)
        .attr("P", AttrKind::Int)
        .attr("S", AttrKind::Int)
        .attr("D", AttrKind::Int)
        .infer_shapes(infer_shapes)
        .translate(translate)
        .register()
}

fn infer_shapes(node: &mut dyn NodeView, config: &OpConfig) -> LowerResult<()> {
    let attrs = ImplicitGemmAttrs::parse(config)?;
    check_arity(&*node)?;
    let output_shape = tvec!(attrs.f, attrs.n * attrs.h * attrs.w);
    node.set_output(0, output_shape, node.input_datum_type(0));
    Ok(())
}

fn check_arity(node: &dyn NodeView) -> LowerResult<()> {
    if node.input_count() != 2 {
        bail!(LoweringError::shape(format!(
            "ImplicitGemm expects activation and kernel inputs, node has {}",
            node.input_count()
        )));
    }
    for (i, role) in [(0, "activation"), (1, "kernel")] {
        if node.input_shape(i).len() != 4 {
            bail!(LoweringError::shape(format!(
                "ImplicitGemm {} must be rank 4, got rank {}",
                role,
                node.input_shape(i).len()
            )));
        }
    }
    Ok(())
}

/// The input extent the attributes imply on one spatial axis. Signed so
/// that degenerate attribute sets fail the consistency check instead of
/// wrapping.
fn expected_input_extent(out: usize, kernel: usize, stride: usize, dilation: usize, pad: usize) -> i64 {
    (out as i64 - 1) * stride as i64 + (kernel as i64 - 1) * dilation as i64 + 1 - 2 * pad as i64
}

fn translate(node: &dyn NodeView, config: &OpConfig) -> LowerResult<String> {
    let attrs = ImplicitGemmAttrs::parse(config)?;
    check_arity(node)?;

    let activation = node.input_shape(0);
    let kernel = node.input_shape(1);
    let (n, c, inh, inw) = (activation[0], activation[1], activation[2], activation[3]);
    let (kh, kw) = (kernel[2], kernel[3]);
    let ImplicitGemmAttrs { n: batch, f, h, w, p, s, d } = attrs;

    if n != batch {
        bail!(LoweringError::shape(format!(
            "batch attribute N={batch} disagrees with activation batch {n}"
        )));
    }
    // True comparison: geometry that disagrees with the actual input is a
    // malformed graph, never something to overwrite.
    let expected_inh = expected_input_extent(h, kh, s, d, p);
    if expected_inh != inh as i64 {
        bail!(LoweringError::PaddingConsistency {
            axis: "height",
            expected: expected_inh,
            actual: inh,
        });
    }
    let expected_inw = expected_input_extent(w, kw, s, d, p);
    if expected_inw != inw as i64 {
        bail!(LoweringError::PaddingConsistency {
            axis: "width",
            expected: expected_inw,
            actual: inw,
        });
    }

    let data_source = if p != 0 { "pad" } else { "@input0@" };
    let pad_template = " pad[N, C, H0, W0] = @input0@[N, C, H0-@p@, W0-@p@]\
                        .when([H0>=@p@, H0<@inh+p@, W0>=@p@, W0<@inw+p@], \
                        const(0.0).cast(@input0@[N, C, H0-@p@, W0-@p@].dtype())) \
                        where H0 in @padh@, W0 in @padw@; ";
    let data_template = format!(
        " data[K, N] = {data_source}[N//@h*w@, K//@kh*kw@, \
         N%@h*w@//@w@*@s@+K%@kh*kw@//@kw@*@d@, N%@w@*@s@+K%@kw@*@d@] \
         where K in @kh*kw*c@, N in @n*h*w@; "
    );
    let kernel_template = " kernel[M, K] = @input1@[M, K//@kh*kw@, K%@kh*kw@//@kw@, K%@kw@] \
                           where K in @kh*kw*c@, M in @f@; ";
    let compute_template = " @output0@[M, N] +=! kernel[M, K] * data[K, N]; ";

    let mut template = String::new();
    if p != 0 {
        template.push_str(pad_template);
    }
    template.push_str(&data_template);
    template.push_str(kernel_template);
    template.push_str(compute_template);

    let substitutions = hashmap! {
        "input0".to_string() => ConfigValue::from("input0"),
        "input1".to_string() => ConfigValue::from("input1"),
        "output0".to_string() => ConfigValue::from("output0"),
        "p".to_string() => ConfigValue::from(p),
        "s".to_string() => ConfigValue::from(s),
        "d".to_string() => ConfigValue::from(d),
        "padh".to_string() => ConfigValue::from(inh + 2 * p),
        "padw".to_string() => ConfigValue::from(inw + 2 * p),
        "inh+p".to_string() => ConfigValue::from(inh + p),
        "inw+p".to_string() => ConfigValue::from(inw + p),
        "w".to_string() => ConfigValue::from(w),
        "h*w".to_string() => ConfigValue::from(h * w),
        "kw".to_string() => ConfigValue::from(kw),
        "kh*kw".to_string() => ConfigValue::from(kh * kw),
        "kh*kw*c".to_string() => ConfigValue::from(kh * kw * c),
        "n*h*w".to_string() => ConfigValue::from(n * h * w),
        "f".to_string() => ConfigValue::from(f),
    };
    let mut ir = create_code_from_template(&template, &substitutions)?;

    let output_dt = node
        .output_datum_type(0)
        .context("ImplicitGemm translation needs the inferred output type; run shape inference first")?;
    if output_dt == DatumType::F16 {
        ir.push_str(TENSOR_CORE_ANNOTATION);
    }
    Ok(ir)
}
