use serde::{Deserialize, Serialize};

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

/// Copy `values` into a new vector sorted ascending.
pub fn sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.into_iter().collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator), `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() as f64 - 1.0)).sqrt())
}

// ── Percentiles ───────────────────────────────────────────────────────────────

/// The four latency percentiles shown on every report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Percentiles {
    /// Compute from an ascending slice; `None` when there is nothing to rank.
    pub fn from_sorted(sorted_data: &[f64]) -> Option<Self> {
        if sorted_data.is_empty() {
            return None;
        }
        Some(Self {
            p50: percentile(sorted_data, 50.0),
            p90: percentile(sorted_data, 90.0),
            p95: percentile(sorted_data, 95.0),
            p99: percentile(sorted_data, 99.0),
        })
    }

    /// `(label, value)` pairs in ascending percentile order.
    pub fn labelled(&self) -> [(&'static str, f64); 4] {
        [
            ("P50", self.p50),
            ("P90", self.p90),
            ("P95", self.p95),
            ("P99", self.p99),
        ]
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
