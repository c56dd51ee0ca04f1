use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Critical chi-square value for p < 0.05 at one degree of freedom.
///
/// Pairwise flags compare against this single fixed threshold; the exact
/// p-value is reported alongside so consumers can render finer levels.
pub const CHI_SQUARE_CRITICAL_P05: f64 = 3.841;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PairTest {
    pub chi_square: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Pearson chi-square over the 2×2 table formed by two cohorts'
/// `(matching, eligible)` counts, one degree of freedom, no continuity
/// correction.
///
/// Returns `None` for untestable input: a zero denominator on either side,
/// or a one-sided table (every eligible row matched, or none did, across
/// both cohorts). Skipped pairs are omitted from the output rather than
/// flagged. The statistic is symmetric in the two cohorts, bit for bit.
pub(crate) fn test_pair(a: (u32, u32), b: (u32, u32)) -> Option<PairTest> {
    let (hit_a, n_a) = a;
    let (hit_b, n_b) = b;
    if n_a == 0 || n_b == 0 {
        return None;
    }
    let miss_a = n_a.checked_sub(hit_a)?;
    let miss_b = n_b.checked_sub(hit_b)?;

    // (matched, not matched) x (cohort A, cohort B).
    let a = hit_a as f64;
    let b = miss_a as f64;
    let c = hit_b as f64;
    let d = miss_b as f64;

    let col_hit = a + c;
    let col_miss = b + d;
    if col_hit == 0.0 || col_miss == 0.0 {
        return None;
    }

    let n = a + b + c + d;
    let row_a = a + b;
    let row_b = c + d;
    let chi_square = n * (a * d - b * c).powi(2) / (row_a * row_b * col_hit * col_miss);
    let p_value = upper_tail_p(chi_square)?;

    Some(PairTest {
        chi_square,
        p_value,
        significant: chi_square > CHI_SQUARE_CRITICAL_P05,
    })
}

/// `P(X > chi_square)` for `X ~ ChiSquared(1)`.
fn upper_tail_p(chi_square: f64) -> Option<f64> {
    let dist = ChiSquared::new(1.0).ok()?;
    let mut p = 1.0 - dist.cdf(chi_square);
    if !p.is_finite() {
        return None;
    }
    if p < 0.0 && p > -1e-12 {
        p = 0.0;
    } else if p > 1.0 && p < 1.0 + 1e-12 {
        p = 1.0;
    }
    Some(p)
}
