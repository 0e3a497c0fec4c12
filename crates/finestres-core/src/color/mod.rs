pub mod compose;

pub use compose::{compose, WeightMatrix};
