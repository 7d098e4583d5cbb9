//! Percentile-band outlier removal on latitude and longitude.

use tracing::debug;

use crate::model::LocationSample;

/// Lower percentile of the retained band, in percent.
pub const LOWER_PERCENTILE: f64 = 0.05;
/// Upper percentile of the retained band, in percent.
pub const UPPER_PERCENTILE: f64 = 99.95;

/// `q`-th percentile (0–100) of `values` with linear interpolation between
/// closest ranks. Returns `None` for an empty slice.
///
/// The zero-based rank is `q/100 * (n + 1) - 1` clamped to `[0, n - 1]`, so
/// percentiles beyond the first or last rank resolve to the minimum or maximum.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_of_sorted(&sorted, q)
}

/// [`percentile`] over values already in ascending order.
fn percentile_of_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let n = sorted.len();
    let rank = ((q / 100.0) * (n + 1) as f64 - 1.0).clamp(0.0, (n - 1) as f64);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Inclusive lower and upper bounds of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
}

impl Band {
    /// Sorts `values` in place and reads both bounds from the one ordering.
    fn of(values: &mut [f64]) -> Option<Self> {
        values.sort_by(f64::total_cmp);
        Some(Self {
            lo: percentile_of_sorted(values, LOWER_PERCENTILE)?,
            hi: percentile_of_sorted(values, UPPER_PERCENTILE)?,
        })
    }
}

/// Drops samples outside the [0.05, 99.95] percentile band of the batch on
/// either axis. Input order is preserved.
///
/// The latitude upper bound is exclusive while the longitude upper bound is
/// inclusive, matching the behaviour the dashboard has always had.
pub fn filter(samples: Vec<LocationSample>) -> Vec<LocationSample> {
    let mut lats: Vec<f64> = samples.iter().map(|s| s.latitude).collect();
    let mut lons: Vec<f64> = samples.iter().map(|s| s.longitude).collect();

    let (Some(lat), Some(lon)) = (Band::of(&mut lats), Band::of(&mut lons)) else {
        return Vec::new();
    };

    let before = samples.len();
    let kept: Vec<LocationSample> = samples
        .into_iter()
        .filter(|s| {
            lat.lo <= s.latitude
                && s.latitude < lat.hi
                && lon.lo <= s.longitude
                && s.longitude <= lon.hi
        })
        .collect();

    debug!(before, kept = kept.len(), ?lat, ?lon, "Outlier filter applied");
    kept
}
