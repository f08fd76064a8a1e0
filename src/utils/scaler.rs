use num::Float;

/// Clamp into `[0, 1]`. NaN maps to 0.
#[inline]
pub fn clamp01<F: Float>(value: F) -> F {
    if value.is_nan() {
        return F::zero();
    }
    value.max(F::zero()).min(F::one())
}

/// Linear map of `[lo, hi]` onto `[0, 1]`, clamped.
#[inline]
pub fn rescale01<F: Float>(value: F, lo: F, hi: F) -> F {
    if hi <= lo {
        return if value >= hi { F::one() } else { F::zero() };
    }
    clamp01((value - lo) / (hi - lo))
}

/// `1 - H(p) / H_max` of a count distribution.
///
/// 1 for a single category, 0 for a uniform spread, 0 for no data.
pub fn concentration<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let counts: Vec<f64> = counts.into_iter().filter(|&c| c > 0).map(|c| c as f64).collect();
    match counts.len() {
        0 => 0.0,
        1 => 1.0,
        k => {
            let total: f64 = counts.iter().sum();
            let entropy: f64 = counts
                .iter()
                .map(|&c| {
                    let p = c / total;
                    -p * p.ln()
                })
                .sum();
            clamp01(1.0 - entropy / (k as f64).ln())
        }
    }
}
