use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibrate::matching_pixels;
use crate::consts::{KEY_FILTER, KEY_IMAGE_TYPE, PARALLEL_PIXEL_THRESHOLD, UNKNOWN_FILTER};
use crate::error::{FinestresError, HomogeneityField, Result};
use crate::frame::{Frame, FrameKind, FrameRole};

use super::mean::nan_mean;
use super::median::nan_median;

/// Per-pixel reducer used to combine a group of exposures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMethod {
    Mean,
    #[default]
    Median,
}

impl std::fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Median => write!(f, "median"),
        }
    }
}

impl std::str::FromStr for CombineMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!(
                "invalid average method '{other}', valid methods are: mean, median"
            )),
        }
    }
}

/// Combine a homogeneous group of exposures into a new master frame.
///
/// All frames must be single-channel images sharing role and exposure time;
/// frames that are not darks must also share the filter. Pixels are reduced
/// with a NaN-ignoring mean or median. The result starts from a copy of the
/// first frame's header. Inputs are left untouched.
pub fn combine(frames: &[Frame], method: CombineMethod) -> Result<Frame> {
    let reference = frames.first().ok_or(FinestresError::EmptyInput)?;

    for frame in frames {
        frame.pixels()?;
    }
    if let Some(frame) = frames.iter().find(|f| f.kind != FrameKind::Image) {
        return Err(FinestresError::Kind {
            title: frame.title().to_string(),
            kind: frame.kind,
        });
    }
    check_homogeneity(frames)?;

    let shape = reference.pixels()?.shape().to_vec();
    let views = frames
        .iter()
        .map(|f| matching_pixels(f, &shape).map(|p| p.view()))
        .collect::<Result<Vec<_>>>()?;
    let data = reduce(&views, method)?;

    let is_dark = reference.role == Some(FrameRole::Dark);
    let role = reference.role.as_ref().map(FrameRole::master);
    let filter = if is_dark { None } else { reference.filter.clone() };

    let mut header = reference.header.clone();
    if let Some(role) = &role {
        header.set(KEY_IMAGE_TYPE, role.as_str());
    }
    if is_dark {
        header.remove(KEY_FILTER);
    }
    header.push_history(&format!(
        "Combined {} exposures using {} method.",
        frames.len(),
        method
    ));

    let path = master_path(reference, filter.as_deref());
    let mut master = Frame::from_pixels(path, data, header);
    master.kind = FrameKind::Image;
    master.role = role;
    master.exposure = reference.exposure;
    master.filter = filter;

    info!(
        count = frames.len(),
        method = %method,
        role = ?master.role,
        exposure = ?master.exposure,
        filter = ?master.filter,
        "Combined exposures"
    );
    Ok(master)
}

/// Divide a master flat by its maximum pixel value (NaN ignored), so the new
/// maximum is exactly 1.0.
pub fn normalize(master: &mut Frame) -> Result<()> {
    if master.role != Some(FrameRole::MasterFlat) {
        return Err(FinestresError::Role {
            expected: FrameRole::MasterFlat.to_string(),
            found: describe_role(master.role.as_ref()),
        });
    }

    let max = master
        .pixels()?
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return Err(FinestresError::Normalization {
            title: master.title().to_string(),
            max,
        });
    }

    master.pixels_mut()?.mapv_inplace(|v| v / max);
    master.push_history(format!("Normalized by maximum value {max}"));
    Ok(())
}

/// Group frames by filter (`"Unknown"` when absent) and combine each group.
pub fn stack_by_filter(frames: &[Frame], method: CombineMethod) -> Result<BTreeMap<String, Frame>> {
    let mut groups: BTreeMap<String, Vec<Frame>> = BTreeMap::new();
    for frame in frames {
        let key = frame.filter.clone().unwrap_or_else(|| UNKNOWN_FILTER.to_string());
        groups.entry(key).or_default().push(frame.clone());
    }

    groups
        .into_iter()
        .map(|(filter, group)| combine(&group, method).map(|master| (filter, master)))
        .collect()
}

fn check_homogeneity(frames: &[Frame]) -> Result<()> {
    let reference = &frames[0];
    let check_filter = reference.role != Some(FrameRole::Dark);

    for frame in frames {
        if frame.role != reference.role {
            return Err(mismatch(
                HomogeneityField::Role,
                frame,
                describe_role(reference.role.as_ref()),
                describe_role(frame.role.as_ref()),
            ));
        }
        if !same_exposure(frame.exposure, reference.exposure) {
            return Err(mismatch(
                HomogeneityField::Exposure,
                frame,
                describe_option(reference.exposure),
                describe_option(frame.exposure),
            ));
        }
        if check_filter && frame.filter != reference.filter {
            return Err(mismatch(
                HomogeneityField::Filter,
                frame,
                describe_option(reference.filter.as_ref()),
                describe_option(frame.filter.as_ref()),
            ));
        }
    }
    Ok(())
}

fn same_exposure(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
        (None, None) => true,
        _ => false,
    }
}

fn mismatch(field: HomogeneityField, frame: &Frame, expected: String, found: String) -> FinestresError {
    FinestresError::Homogeneity {
        field,
        title: frame.title().to_string(),
        expected,
        found,
    }
}

fn describe_role(role: Option<&FrameRole>) -> String {
    role.map_or_else(|| "no frame role".to_string(), |r| format!("'{r}'"))
}

fn describe_option<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

/// Reduce same-shape arrays pixel by pixel.
///
/// Parallelizes over pixel lanes for images >= `PARALLEL_PIXEL_THRESHOLD`.
fn reduce(views: &[ArrayViewD<f64>], method: CombineMethod) -> Result<ArrayD<f64>> {
    let stacked = ndarray::stack(Axis(0), views).map_err(|_| FinestresError::ShapeMismatch {
        title: "stacked exposures".to_string(),
        expected: format!("{:?}", views[0].shape()),
        found: views.iter().map(|v| v.len()).collect(),
    })?;
    let reducer: fn(ArrayView1<f64>) -> f64 = match method {
        CombineMethod::Mean => nan_mean,
        CombineMethod::Median => nan_median,
    };

    let n_pixels = views[0].len();
    let lanes = Zip::from(stacked.lanes(Axis(0)));
    let data = if n_pixels >= PARALLEL_PIXEL_THRESHOLD && views.len() > 1 {
        lanes.par_map_collect(|lane| reducer(lane))
    } else {
        lanes.map_collect(|lane| reducer(lane))
    };
    Ok(data)
}

/// Default output path: next to the first input, named after the group.
fn master_path(reference: &Frame, filter: Option<&str>) -> PathBuf {
    let name = match reference.role {
        Some(FrameRole::Dark) => format!(
            "master_dark_{}s.fits",
            describe_option(reference.exposure)
        ),
        Some(FrameRole::Flat) => format!("master_flat_{}.fits", file_name_part(filter)),
        _ => format!("master_stack_{}.fits", file_name_part(filter)),
    };
    match reference.path().parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Filter name usable inside a file name: path separators and other
/// characters outside `[A-Za-z0-9._-]` become `_`.
fn file_name_part(filter: Option<&str>) -> String {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => filter
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
        None => UNKNOWN_FILTER.to_string(),
    }
}
