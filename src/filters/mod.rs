//! Filter model and formula helpers

pub mod formula;
pub mod model;

pub use model::{FilterKey, FilterModel, FilterModelBuilder, FilterSpec, MaterialType, Range};
