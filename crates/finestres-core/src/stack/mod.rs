pub mod combine;
pub mod mean;
pub mod median;

pub use combine::{combine, normalize, stack_by_filter, CombineMethod};
