use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::stack::CombineMethod;

/// Settings of one master-generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Reducer for dark groups.
    pub dark_method: CombineMethod,
    /// Reducer for flat groups.
    pub flat_method: CombineMethod,
    /// A generated master replaces a master already on disk for the same
    /// exposure or filter. When false both are kept, which fails the run with
    /// a duplicate-master error.
    pub replace_existing: bool,
    /// Write generated masters to disk.
    pub save_masters: bool,
    /// Where generated masters are written. Defaults to the folder of the
    /// first input frame of each group.
    pub output_dir: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dark_method: CombineMethod::Median,
            flat_method: CombineMethod::Median,
            replace_existing: true,
            save_masters: true,
            output_dir: None,
        }
    }
}
