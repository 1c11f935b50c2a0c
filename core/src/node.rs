//! The boundary with the external graph.

use tindex_data::prelude::*;

/// One graph node, as seen from the lowering layer.
///
/// The graph owns its nodes; this crate never constructs one. Shape
/// inference reads input metadata and writes back exactly one thing: the
/// output shape and element type. Translation only reads.
pub trait NodeView {
    fn name(&self) -> &str;

    fn input_count(&self) -> usize;
    fn input_shape(&self, i: usize) -> &Shape;
    fn input_datum_type(&self, i: usize) -> DatumType;

    /// Output facts are only available once shape inference has run.
    fn output_shape(&self, i: usize) -> Option<&Shape>;
    fn output_datum_type(&self, i: usize) -> Option<DatumType>;

    fn set_output(&mut self, i: usize, shape: Shape, datum_type: DatumType);
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Stand-in for the external graph node in unit tests.
    pub struct TestNode {
        pub name: String,
        pub inputs: Vec<(Shape, DatumType)>,
        pub outputs: Vec<Option<(Shape, DatumType)>>,
    }

    impl TestNode {
        pub fn new(name: &str, inputs: Vec<(Shape, DatumType)>) -> TestNode {
            TestNode { name: name.to_string(), inputs, outputs: vec![None] }
        }
    }

    impl NodeView for TestNode {
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
}
