use std::path::PathBuf;

use ndarray::{Array3, ArrayView2, Axis, Ix2, Zip};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{
    COLOR_CHANNEL_COUNT, COLOR_STACK_FILE_NAME, KEY_IMAGE_TYPE, PARALLEL_PIXEL_THRESHOLD,
};
use crate::error::{FinestresError, Result};
use crate::frame::{Frame, FrameKind, FrameRole};
use crate::io::header::Header;

/// 3x3 channel mixing matrix.
///
/// Row `i` holds the (red, green, blue) input coefficients of output channel
/// `i`. The identity matrix reproduces a plain RGB composite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix(pub [[f64; 3]; 3]);

impl WeightMatrix {
    pub fn identity() -> Self {
        Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.0
    }
}

impl Default for WeightMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for WeightMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows: Vec<String> = self
            .0
            .iter()
            .map(|row| format!("{},{},{}", row[0], row[1], row[2]))
            .collect();
        write!(f, "{}", rows.join(";"))
    }
}

/// Parses `"r,g,b;r,g,b;r,g,b"`, one row per output channel.
impl std::str::FromStr for WeightMatrix {
    type Err = FinestresError;

    fn from_str(s: &str) -> Result<Self> {
        let rows: Vec<&str> = s.split(';').collect();
        if rows.len() != COLOR_CHANNEL_COUNT {
            return Err(FinestresError::InvalidWeights(format!(
                "expected 3 rows, found {}",
                rows.len()
            )));
        }

        let mut matrix = [[0.0; 3]; 3];
        for (i, row) in rows.iter().enumerate() {
            let values: Vec<&str> = row.split(',').collect();
            if values.len() != COLOR_CHANNEL_COUNT {
                return Err(FinestresError::InvalidWeights(format!(
                    "row {} has {} values, expected 3",
                    i + 1,
                    values.len()
                )));
            }
            for (j, value) in values.iter().enumerate() {
                matrix[i][j] = value.trim().parse().map_err(|_| {
                    FinestresError::InvalidWeights(format!("'{}' is not a number", value.trim()))
                })?;
            }
        }
        Ok(Self(matrix))
    }
}

/// Combine three single-channel frames into an `(H, W, 3)` color frame.
///
/// `output[.., i] = Σ_j weights[i][j] * input_j`. The result is a
/// "Color Stack" without a meaningful exposure time. Inputs are not mutated.
pub fn compose(red: &Frame, green: &Frame, blue: &Frame, weights: &WeightMatrix) -> Result<Frame> {
    let r = channel_view(red)?;
    let g = channel_view(green)?;
    let b = channel_view(blue)?;

    for (frame, view) in [(green, &g), (blue, &b)] {
        if view.dim() != r.dim() {
            return Err(FinestresError::ShapeMismatch {
                title: frame.title().to_string(),
                expected: format!("{:?}", r.shape()),
                found: view.shape().to_vec(),
            });
        }
    }

    let (h, w) = r.dim();
    let mut data = Array3::<f64>::zeros((h, w, COLOR_CHANNEL_COUNT));
    for (i, row) in weights.rows().iter().enumerate() {
        let [wr, wg, wb] = *row;
        let zip = Zip::from(data.index_axis_mut(Axis(2), i))
            .and(&r)
            .and(&g)
            .and(&b);
        let mix = |out: &mut f64, &r: &f64, &g: &f64, &b: &f64| *out = wr * r + wg * g + wb * b;
        if h * w >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(mix);
        } else {
            zip.for_each(mix);
        }
    }

    let mut header = Header::new();
    header.set(KEY_IMAGE_TYPE, FrameRole::ColorStack.as_str());
    header.push_history(&format!(
        "Color composite of red={}, green={}, blue={}",
        red.title(),
        green.title(),
        blue.title()
    ));
    header.push_history(&format!("Channel weights: {weights}"));

    let path = match red.path().parent() {
        Some(dir) => dir.join(COLOR_STACK_FILE_NAME),
        None => PathBuf::from(COLOR_STACK_FILE_NAME),
    };
    let mut frame = Frame::from_pixels(path, data.into_dyn(), header);
    frame.kind = FrameKind::ColorImage;
    frame.role = Some(FrameRole::ColorStack);
    frame.exposure = Some(f64::NAN);
    frame.filter = None;

    info!(height = h, width = w, weights = %weights, "Composed color stack");
    Ok(frame)
}

fn channel_view(frame: &Frame) -> Result<ArrayView2<'_, f64>> {
    let pixels = frame.pixels()?;
    pixels
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| FinestresError::ShapeMismatch {
            title: frame.title().to_string(),
            expected: "a 2-D array".to_string(),
            found: pixels.shape().to_vec(),
        })
}
