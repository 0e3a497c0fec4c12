use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::calibrate::calibrate;
use crate::error::{FinestresError, Result};
use crate::frame::{Frame, FrameRole};
use crate::io::list_fits_files;

use super::types::ExposureKey;

/// Master frames available for calibrating light frames: one master dark per
/// exposure time and one master flat per filter.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSet {
    darks: BTreeMap<ExposureKey, Frame>,
    flats: BTreeMap<String, Frame>,
}

/// Masters applied by [`CalibrationSet::calibrate_light`], by title.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedMasters {
    pub dark: Option<String>,
    pub flat: Option<String>,
}

impl AppliedMasters {
    /// Both a dark and a flat were applied.
    pub fn is_complete(&self) -> bool {
        self.dark.is_some() && self.flat.is_some()
    }
}

impl CalibrationSet {
    pub(super) fn from_parts(
        darks: BTreeMap<ExposureKey, Frame>,
        flats: BTreeMap<String, Frame>,
    ) -> Self {
        Self { darks, flats }
    }

    /// Collect the master darks and master flats among `frames`.
    ///
    /// Other frames, and masters missing their exposure or filter, are
    /// ignored. Two masters for the same key are an error.
    pub fn from_masters(frames: impl IntoIterator<Item = Frame>) -> Result<Self> {
        let mut set = Self::default();
        for frame in frames {
            match (frame.role.clone(), frame.exposure, frame.filter.clone()) {
                (Some(FrameRole::MasterDark), Some(exposure), _) => {
                    let key = ExposureKey(exposure);
                    if set.darks.contains_key(&key) {
                        return Err(FinestresError::DuplicateMaster {
                            kind: "dark".to_string(),
                            key: key.to_string(),
                        });
                    }
                    set.darks.insert(key, frame);
                }
                (Some(FrameRole::MasterFlat), _, Some(filter)) => {
                    if set.flats.contains_key(&filter) {
                        return Err(FinestresError::DuplicateMaster {
                            kind: "flat".to_string(),
                            key: filter,
                        });
                    }
                    set.flats.insert(filter, frame);
                }
                _ => debug!(title = %frame.title(), "Not a usable master, ignored"),
            }
        }
        Ok(set)
    }

    /// Load every master frame stored in `dir`. Files that cannot be loaded
    /// are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let frames = list_fits_files(dir)?
            .iter()
            .filter_map(|path| match Frame::load(path) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!(error = %e, "Could not load frame, skipping");
                    None
                }
            })
            .collect::<Vec<_>>();
        Self::from_masters(frames)
    }

    pub fn master_dark(&self, exposure: f64) -> Option<&Frame> {
        self.darks.get(&ExposureKey(exposure))
    }

    pub fn master_flat(&self, filter: &str) -> Option<&Frame> {
        self.flats.get(filter)
    }

    pub fn darks(&self) -> impl Iterator<Item = (ExposureKey, &Frame)> {
        self.darks.iter().map(|(k, f)| (*k, f))
    }

    pub fn flats(&self) -> impl Iterator<Item = (&str, &Frame)> {
        self.flats.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.darks.len() + self.flats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.darks.is_empty() && self.flats.is_empty()
    }

    /// Calibrate a light frame with the master dark of its exposure and the
    /// master flat of its filter.
    ///
    /// A missing master is not an error: the frame is calibrated with what
    /// is available and the result reports which masters were applied.
    pub fn calibrate_light(&self, frame: &mut Frame) -> Result<AppliedMasters> {
        let dark = frame.exposure.and_then(|e| self.master_dark(e));
        let flat = frame.filter.as_deref().and_then(|f| self.master_flat(f));

        if dark.is_none() {
            warn!(
                title = %frame.title(),
                exposure = ?frame.exposure,
                "No master dark for this exposure time"
            );
        }
        if flat.is_none() {
            warn!(
                title = %frame.title(),
                filter = ?frame.filter,
                "No master flat for this filter"
            );
        }

        calibrate(frame, dark, flat)?;
        Ok(AppliedMasters {
            dark: dark.map(|d| d.title().to_string()),
            flat: flat.map(|f| f.title().to_string()),
        })
    }
}
