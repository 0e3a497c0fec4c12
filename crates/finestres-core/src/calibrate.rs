use ndarray::ArrayD;
use tracing::debug;

use crate::error::{FinestresError, Result};
use crate::frame::Frame;

/// Calibrate a frame in place: subtract `dark`, then divide by `flat`.
///
/// The result is `(raw - dark) / flat`. Every input is validated before the
/// frame is touched, so a missing array or a shape mismatch leaves it unchanged.
/// Each applied step appends a `HISTORY` entry and marks the frame dirty.
pub fn calibrate(frame: &mut Frame, dark: Option<&Frame>, flat: Option<&Frame>) -> Result<()> {
    let shape = frame.pixels()?.shape().to_vec();
    let dark = dark
        .map(|d| matching_pixels(d, &shape).map(|p| (d.title(), p)))
        .transpose()?;
    let flat = flat
        .map(|f| matching_pixels(f, &shape).map(|p| (f.title(), p)))
        .transpose()?;

    if let Some((title, dark_pixels)) = dark {
        *frame.pixels_mut()? -= dark_pixels;
        frame.push_history(format!("Subtracted dark frame: {title}"));
        debug!(frame = %frame.title(), dark = %title, "Subtracted dark");
    }

    if let Some((title, flat_pixels)) = flat {
        *frame.pixels_mut()? /= flat_pixels;
        frame.push_history(format!("Divided by flat frame: {title}"));
        debug!(frame = %frame.title(), flat = %title, "Divided by flat");
    }

    Ok(())
}

/// Pixels of `frame`, provided they have exactly `shape`.
pub(crate) fn matching_pixels<'a>(frame: &'a Frame, shape: &[usize]) -> Result<&'a ArrayD<f64>> {
    let pixels = frame.pixels()?;
    if pixels.shape() != shape {
        return Err(FinestresError::ShapeMismatch {
            title: frame.title().to_string(),
            expected: format!("{shape:?}"),
            found: pixels.shape().to_vec(),
        });
    }
    Ok(pixels)
}
