//! Shape and element-type model for the tindex operator lowering layer.
//!
//! This crate carries no tensor data: the lowering layer only ever
//! manipulates shape metadata and text, so the value model stops at
//! [`Shape`] and [`DatumType`].

#[macro_use]
mod macros;

mod datum;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere in tindex, for node inputs and outputs, or
/// tensor dimensions.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

/// A tensor shape: ordered non-negative dimension sizes. Rank is the
/// length. Procedures that expect a given rank treat a violation as a
/// hard error, never a coercion.
pub type Shape = TVec<usize>;

pub mod prelude {
    pub use crate::datum::DatumType;
    pub use crate::tvec;
    pub use crate::Shape;
    pub use crate::TVec;
}

pub mod internal {
    pub use crate::prelude::*;
    pub use num_traits as tindex_num_traits;
    pub use smallvec as tindex_smallvec;
}

pub use anyhow;
