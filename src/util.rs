// Neumaier's variant of Kahan summation
pub(crate) fn compensated_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.;
    let mut correction = 0.;
    for x in values {
        let t = sum + x;
        if f64::abs(sum) >= f64::abs(x) {
            correction += (sum - t) + x;
        } else {
            correction += (x - t) + sum;
        }
        sum = t;
    }
    sum + correction
}

/// Whether `a` and `b` agree up to `tolerance` relative to `scale`
pub(crate) fn approx_eq(a: f64, b: f64, tolerance: f64, scale: f64) -> bool {
    (a - b).abs() <= tolerance * f64::max(scale.abs(), 1.)
}
