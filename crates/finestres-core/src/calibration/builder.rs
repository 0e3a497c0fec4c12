use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::calibrate::calibrate;
use crate::error::{FinestresError, Result};
use crate::frame::{Frame, FrameKind, FrameRole};
use crate::io::list_fits_files;
use crate::stack::{combine, normalize};

use super::config::CalibrationConfig;
use super::set::CalibrationSet;
use super::types::{
    BuilderState, CalibrationStage, ExposureKey, NoOpReporter, ProgressReporter, SkippedFrame,
};

/// Turns a folder of raw darks and flats into master frames.
///
/// The builder moves through `Scanning -> Grouped -> MastersGenerated`, or
/// ends in `Failed` when generation hits an error. Classification problems
/// are not errors: offending frames are skipped and recorded.
pub struct CalibrationSetBuilder {
    config: CalibrationConfig,
    state: BuilderState,
    darks: BTreeMap<ExposureKey, Vec<Frame>>,
    flats: BTreeMap<String, Vec<Frame>>,
    master_darks: BTreeMap<ExposureKey, Vec<Frame>>,
    master_flats: BTreeMap<String, Vec<Frame>>,
    skipped: Vec<SkippedFrame>,
}

impl CalibrationSetBuilder {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: BuilderState::Scanning,
            darks: BTreeMap::new(),
            flats: BTreeMap::new(),
            master_darks: BTreeMap::new(),
            master_flats: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    /// Raw darks grouped by exposure time.
    pub fn darks(&self) -> &BTreeMap<ExposureKey, Vec<Frame>> {
        &self.darks
    }

    /// Raw flats grouped by filter.
    pub fn flats(&self) -> &BTreeMap<String, Vec<Frame>> {
        &self.flats
    }

    /// Masters found among the scanned frames, by exposure time.
    pub fn existing_master_darks(&self) -> &BTreeMap<ExposureKey, Vec<Frame>> {
        &self.master_darks
    }

    /// Masters found among the scanned frames, by filter.
    pub fn existing_master_flats(&self) -> &BTreeMap<String, Vec<Frame>> {
        &self.master_flats
    }

    pub fn skipped(&self) -> &[SkippedFrame] {
        &self.skipped
    }

    /// Classify `frames` into dark and flat groups.
    pub fn scan(&mut self, frames: impl IntoIterator<Item = Frame>) -> Result<()> {
        self.expect_state(BuilderState::Scanning)?;

        for frame in frames {
            self.classify(frame);
        }
        self.state = BuilderState::Grouped;

        info!(
            dark_groups = self.darks.len(),
            flat_groups = self.flats.len(),
            master_darks = self.master_darks.len(),
            master_flats = self.master_flats.len(),
            skipped = self.skipped.len(),
            "Grouped calibration frames"
        );
        Ok(())
    }

    /// Load every FITS file in `dir` and classify it.
    pub fn scan_directory(&mut self, dir: &Path) -> Result<()> {
        self.scan_directory_reported(dir, &NoOpReporter)
    }

    /// [`scan_directory`](Self::scan_directory) with progress reporting.
    ///
    /// Files that cannot be loaded are recorded as skipped.
    pub fn scan_directory_reported(
        &mut self,
        dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        self.expect_state(BuilderState::Scanning)?;

        let files = list_fits_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "Scanning calibration folder");

        reporter.begin_stage(CalibrationStage::Loading, Some(files.len()));
        let done = AtomicUsize::new(0);
        let loaded: Vec<Result<Frame>> = files
            .par_iter()
            .map(|path| {
                let frame = Frame::load(path);
                reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
                frame
            })
            .collect();
        reporter.finish_stage();

        let mut frames = Vec::with_capacity(loaded.len());
        for (path, result) in files.iter().zip(loaded) {
            match result {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    let title = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warn!(file = %title, error = %e, "Could not load frame, skipping");
                    self.skipped.push(SkippedFrame {
                        title,
                        reason: e.to_string(),
                    });
                }
            }
        }
        self.scan(frames)
    }

    /// Combine every group into a master frame.
    pub fn generate(&mut self) -> Result<CalibrationSet> {
        self.generate_reported(&NoOpReporter)
    }

    /// [`generate`](Self::generate) with progress reporting.
    ///
    /// Stops at the first error: the builder becomes `Failed` and every
    /// partial result is discarded. Masters are only written once all groups
    /// have been combined successfully.
    pub fn generate_reported(&mut self, reporter: &dyn ProgressReporter) -> Result<CalibrationSet> {
        self.expect_state(BuilderState::Grouped)?;

        match self.run_generation(reporter) {
            Ok(set) => {
                self.state = BuilderState::MastersGenerated;
                info!(
                    master_darks = set.darks().count(),
                    master_flats = set.flats().count(),
                    "Calibration masters generated"
                );
                Ok(set)
            }
            Err(e) => {
                self.darks.clear();
                self.flats.clear();
                self.master_darks.clear();
                self.master_flats.clear();
                self.state = BuilderState::Failed(e.to_string());
                warn!(error = %e, "Master generation failed");
                Err(e)
            }
        }
    }

    fn run_generation(&mut self, reporter: &dyn ProgressReporter) -> Result<CalibrationSet> {
        let replace = self.config.replace_existing;
        let mut replaced = Vec::new();

        let dark_groups = std::mem::take(&mut self.darks);
        reporter.begin_stage(CalibrationStage::CombiningDarks, Some(dark_groups.len()));
        for (i, (exposure, group)) in dark_groups.into_iter().enumerate() {
            debug!(exposure = %exposure, count = group.len(), "Combining darks");
            let master = combine(&group, self.config.dark_method)?;
            replaced.extend(register(&mut self.master_darks, exposure, master, replace));
            reporter.advance(i + 1);
        }
        reporter.finish_stage();

        // Flats are dark-subtracted, so every exposure needs a single master first.
        let mut darks = single_masters("dark", std::mem::take(&mut self.master_darks))?;

        let flat_groups = std::mem::take(&mut self.flats);
        reporter.begin_stage(CalibrationStage::CombiningFlats, Some(flat_groups.len()));
        for (i, (filter, mut group)) in flat_groups.into_iter().enumerate() {
            debug!(filter = %filter, count = group.len(), "Combining flats");
            for flat in &mut group {
                let dark = flat.exposure.and_then(|e| darks.get(&ExposureKey(e)));
                match dark {
                    Some(dark) => calibrate(flat, Some(dark), None)?,
                    None => warn!(
                        title = %flat.title(),
                        exposure = ?flat.exposure,
                        "No master dark for flat, combining it uncalibrated"
                    ),
                }
            }
            let mut master = combine(&group, self.config.flat_method)?;
            normalize(&mut master)?;
            replaced.extend(register(&mut self.master_flats, filter, master, replace));
            reporter.advance(i + 1);
        }
        reporter.finish_stage();

        let mut flats = single_masters("flat", std::mem::take(&mut self.master_flats))?;

        if self.config.save_masters {
            self.persist(&mut darks, &mut flats, reporter)?;
            remove_replaced(&replaced, &darks, &flats);
        }
        Ok(CalibrationSet::from_parts(darks, flats))
    }

    /// Write the masters generated in this run. Masters that were loaded
    /// from disk are unchanged and left alone.
    fn persist(
        &self,
        darks: &mut BTreeMap<ExposureKey, Frame>,
        flats: &mut BTreeMap<String, Frame>,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        if let Some(dir) = &self.config.output_dir {
            std::fs::create_dir_all(dir)?;
        }

        let pending: Vec<&mut Frame> = darks
            .values_mut()
            .chain(flats.values_mut())
            .filter(|f| f.is_dirty())
            .collect();

        reporter.begin_stage(CalibrationStage::Writing, Some(pending.len()));
        for (i, master) in pending.into_iter().enumerate() {
            if let Some(dir) = &self.config.output_dir {
                let path = dir.join(master.title());
                master.set_path(path);
            }
            master.save()?;
            info!(path = %master.path().display(), "Saved master");
            reporter.advance(i + 1);
        }
        reporter.finish_stage();
        Ok(())
    }

    fn classify(&mut self, frame: Frame) {
        if frame.kind != FrameKind::Image {
            let reason = format!("not a single-channel image ({})", frame.kind);
            info!(title = %frame.title(), "Skipping frame: {reason}");
            return self.skip(frame, reason);
        }

        let Some(exposure) = frame.exposure else {
            warn!(title = %frame.title(), "Frame has no exposure time, skipping");
            return self.skip(frame, "no exposure time".to_string());
        };
        let exposure = ExposureKey(exposure);

        match frame.role.clone() {
            Some(FrameRole::Dark) => self.darks.entry(exposure).or_default().push(frame),
            Some(FrameRole::MasterDark) => {
                debug!(title = %frame.title(), exposure = %exposure, "Found existing master dark");
                self.master_darks.entry(exposure).or_default().push(frame);
            }
            Some(role @ (FrameRole::Flat | FrameRole::MasterFlat)) => {
                let Some(filter) = frame.filter.clone() else {
                    warn!(title = %frame.title(), "Flat has no filter, skipping");
                    return self.skip(frame, "flat without filter".to_string());
                };
                let groups = if role == FrameRole::Flat {
                    &mut self.flats
                } else {
                    debug!(title = %frame.title(), filter = %filter, "Found existing master flat");
                    &mut self.master_flats
                };
                groups.entry(filter).or_default().push(frame);
            }
            Some(FrameRole::Light) => {
                info!(title = %frame.title(), "Skipping light frame");
                self.skip(frame, "light frame".to_string());
            }
            Some(other) => {
                warn!(title = %frame.title(), role = %other, "Unexpected frame role, skipping");
                self.skip(frame, format!("unexpected frame role '{other}'"));
            }
            None => {
                warn!(title = %frame.title(), "Frame has no role, skipping");
                self.skip(frame, "no frame role".to_string());
            }
        }
    }

    fn skip(&mut self, frame: Frame, reason: String) {
        self.skipped.push(SkippedFrame {
            title: frame.title().to_string(),
            reason,
        });
    }

    fn expect_state(&self, expected: BuilderState) -> Result<()> {
        if self.state != expected {
            return Err(FinestresError::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            });
        }
        Ok(())
    }
}

/// Add a generated master to its group. Returns the masters it replaces.
fn register<K: Ord>(
    groups: &mut BTreeMap<K, Vec<Frame>>,
    key: K,
    master: Frame,
    replace: bool,
) -> Vec<Frame> {
    let entry = groups.entry(key).or_default();
    let replaced = if replace {
        std::mem::take(entry)
    } else {
        Vec::new()
    };
    entry.push(master);
    replaced
}

/// Delete the files of replaced masters, unless a new master was written
/// over the same path.
fn remove_replaced(
    replaced: &[Frame],
    darks: &BTreeMap<ExposureKey, Frame>,
    flats: &BTreeMap<String, Frame>,
) {
    for old in replaced.iter().filter(|f| !f.is_dirty()) {
        let path = old.path();
        if darks.values().chain(flats.values()).any(|m| m.path() == path) {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Removed replaced master"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove replaced master"),
        }
    }
}

/// Require exactly one master per key.
fn single_masters<K: Ord + std::fmt::Display>(
    kind: &str,
    groups: BTreeMap<K, Vec<Frame>>,
) -> Result<BTreeMap<K, Frame>> {
    groups
        .into_iter()
        .map(|(key, mut masters)| match (masters.pop(), masters.is_empty()) {
            (Some(master), true) => Ok((key, master)),
            _ => Err(FinestresError::DuplicateMaster {
                kind: kind.to_string(),
                key: key.to_string(),
            }),
        })
        .collect()
}
