//! IQR outlier removal on price per m².
//!
//! Quartiles use linear interpolation between closest ranks, so
//! `q(p) = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])`
//! with `h = (n - 1) * p` over the sorted values.

use serde::Serialize;

pub const IQR_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFence {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Fence for a column; `None` when no finite values exist.
///
/// A single value gives `q1 == q3` and a zero-width fence around it.
pub fn iqr_fence(values: &[f64]) -> Option<IqrFence> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrFence {
        q1,
        q3,
        lower: q1 - IQR_FACTOR * iqr,
        upper: q3 + IQR_FACTOR * iqr,
    })
}

/// Keeps rows whose value lies inside the IQR fence, in input order.
///
/// The fence is recomputed on the survivors until no row falls outside it,
/// so the output is a fixed point: filtering it again returns it unchanged.
pub fn remove_outliers<T, V>(mut rows: Vec<T>, value_of: V) -> Vec<T>
where
    V: Fn(&T) -> f64,
{
    loop {
        let values: Vec<f64> = rows.iter().map(&value_of).collect();
        let Some(fence) = iqr_fence(&values) else {
            return Vec::new();
        };
        let before = rows.len();
        rows.retain(|r| fence.contains(value_of(r)));
        if rows.len() == before {
            return rows;
        }
    }
}
