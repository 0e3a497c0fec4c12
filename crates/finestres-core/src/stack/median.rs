use ndarray::ArrayView1;

/// Median of the values along one pixel lane, ignoring NaN.
///
/// Even counts average the two middle values. Returns NaN when every value
/// is NaN.
pub fn nan_median(values: ArrayView1<f64>) -> f64 {
    let mut pixel_values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    compute_median(&mut pixel_values)
}

/// Uses `select_nth_unstable` for O(n) median without a full sort.
fn compute_median(pixel_values: &mut [f64]) -> f64 {
    let n = pixel_values.len();
    if n == 0 {
        f64::NAN
    } else if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
