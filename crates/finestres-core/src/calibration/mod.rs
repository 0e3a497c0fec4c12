pub mod builder;
pub mod config;
pub mod set;
pub mod types;

pub use builder::CalibrationSetBuilder;
pub use config::CalibrationConfig;
pub use set::{AppliedMasters, CalibrationSet};
pub use types::{BuilderState, CalibrationStage, ExposureKey, ProgressReporter, SkippedFrame};
