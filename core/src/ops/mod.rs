//! Built-in operator lowerings.

use crate::errors::LowerResult;
use crate::registry::Registry;

pub mod conv;
pub mod norm;
pub mod reorder;
pub mod softmax;

pub fn register_all(registry: &mut Registry) -> LowerResult<()> {
    softmax::register(registry)?;
    reorder::register(registry)?;
    conv::register(registry)?;
    norm::register(registry)?;
    Ok(())
}
