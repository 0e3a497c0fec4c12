use std::cmp::Ordering;

/// Exposure time in seconds, usable as an ordered map key.
///
/// Ordering and equality follow `f64::total_cmp`, so NaN is a key like any
/// other value.
#[derive(Clone, Copy, Debug)]
pub struct ExposureKey(pub f64);

impl PartialEq for ExposureKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ExposureKey {}

impl PartialOrd for ExposureKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExposureKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for ExposureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<f64> for ExposureKey {
    fn from(seconds: f64) -> Self {
        Self(seconds)
    }
}

/// Lifecycle of a [`CalibrationSetBuilder`](super::CalibrationSetBuilder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuilderState {
    Scanning,
    Grouped,
    MastersGenerated,
    Failed(String),
}

impl BuilderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MastersGenerated | Self::Failed(_))
    }
}

impl std::fmt::Display for BuilderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "scanning"),
            Self::Grouped => write!(f, "grouped"),
            Self::MastersGenerated => write!(f, "finished"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// A frame left out of the calibration set, with the reason shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFrame {
    pub title: String,
    pub reason: String,
}

/// Builder stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationStage {
    Loading,
    CombiningDarks,
    CombiningFlats,
    Writing,
}

impl std::fmt::Display for CalibrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading frames"),
            Self::CombiningDarks => write!(f, "Combining darks"),
            Self::CombiningFlats => write!(f, "Combining flats"),
            Self::Writing => write!(f, "Writing masters"),
        }
    }
}

/// Thread-safe progress reporting for the calibration builder.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// (files or groups) in this stage.
    fn begin_stage(&self, _stage: CalibrationStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
