use ndarray::ArrayView1;

/// Mean of the values along one pixel lane, ignoring NaN.
///
/// Returns NaN when every value is NaN.
pub fn nan_mean(values: ArrayView1<f64>) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for &v in values.iter() {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
