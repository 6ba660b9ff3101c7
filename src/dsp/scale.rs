//! Percentile auto-scaling and its per-buffer cache.

use crate::error::SignalError;
use crate::source::{BufferId, ChannelBuffer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const MIN_RANGE: f32 = 0.8;
pub const LOWER_PERCENTILE: f32 = 0.05;
pub const UPPER_PERCENTILE: f32 = 0.95;
pub const TOP_PADDING: f32 = 0.15;
pub const BOTTOM_PADDING: f32 = 0.05;

/// Display value range. `max - min` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
    pub range: f32,
    pub center: f32,
    pub median: f32,
    /// The data spread was below the minimum and got widened.
    pub floored: bool,
}

impl ScaleRange {
    /// Maps `value` into `[0, 1]` across the range, clamped.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        ((value - self.min) / self.range).clamp(0.0, 1.0)
    }

    fn from_bounds(min: f32, max: f32, median: f32, floored: bool) -> Self {
        Self {
            min,
            max,
            range: max - min,
            center: 0.5 * (min + max),
            median,
            floored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScaler {
    pub min_range: f32,
    pub top_padding: f32,
    pub bottom_padding: f32,
}

impl Default for AutoScaler {
    fn default() -> Self {
        Self {
            min_range: MIN_RANGE,
            top_padding: TOP_PADDING,
            bottom_padding: BOTTOM_PADDING,
        }
    }
}

impl AutoScaler {
    pub fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        self.min_range = if self.min_range.is_finite() && self.min_range > 0.0 {
            self.min_range
        } else {
            fallback.min_range
        };
        self.top_padding = self.top_padding.clamp(0.0, 1.0);
        self.bottom_padding = self.bottom_padding.clamp(0.0, 1.0);
        self
    }

    /// Robust range from the 5th/95th percentiles, floored and padded.
    pub fn scale(&self, samples: &[f32]) -> ScaleRange {
        let (data_min, median, data_max) = match percentiles(samples) {
            Some(p) => p,
            None => (0.0, 0.0, 0.0),
        };

        let spread = data_max - data_min;
        let floored = spread < self.min_range;
        let (lo, hi) = if floored {
            let mid = 0.5 * (data_min + data_max);
            (mid - 0.5 * self.min_range, mid + 0.5 * self.min_range)
        } else {
            (data_min, data_max)
        };
        let range = hi - lo;
        ScaleRange::from_bounds(
            lo - range * self.bottom_padding,
            hi + range * self.top_padding,
            median,
            floored,
        )
    }
}

// (5th, 50th, 95th) nearest-rank percentiles via O(n) selection on a copy.
fn percentiles(samples: &[f32]) -> Option<(f32, f32, f32)> {
    if samples.is_empty() {
        return None;
    }
    let mut scratch = samples.to_vec();
    let last = scratch.len() - 1;
    let rank = |p: f32| ((last as f32) * p).round() as usize;
    let mut pick = |p: f32| {
        let idx = rank(p).min(last);
        *scratch.select_nth_unstable_by(idx, f32::total_cmp).1
    };
    Some((pick(LOWER_PERCENTILE), pick(0.5), pick(UPPER_PERCENTILE)))
}

/// Scale ranges memoized on buffer identity.
#[derive(Debug, Clone, Default)]
pub struct ScaleCache {
    scaler: AutoScaler,
    entries: HashMap<BufferId, ScaleRange>,
    computed: u64,
}

impl ScaleCache {
    pub fn new(scaler: AutoScaler) -> Self {
        Self {
            scaler: scaler.sanitized(),
            ..Self::default()
        }
    }

    pub fn scaler(&self) -> AutoScaler {
        self.scaler
    }

    /// Replaces the scaler; cached ranges are dropped when it changed.
    pub fn set_scaler(&mut self, scaler: AutoScaler) {
        let scaler = scaler.sanitized();
        if scaler != self.scaler {
            self.scaler = scaler;
            self.entries.clear();
        }
    }

    pub fn get(&mut self, buffer: &ChannelBuffer) -> ScaleRange {
        if let Some(range) = self.entries.get(&buffer.id()) {
            return *range;
        }
        let range = self.scaler.scale(buffer.samples());
        if range.floored && !buffer.is_empty() {
            let err = SignalError::DegenerateRange {
                range: range.range,
            };
            debug!("[scale] '{}' {}: {err}", buffer.name(), buffer.id());
        }
        self.computed += 1;
        self.entries.insert(buffer.id(), range);
        range
    }

    /// Forgets every buffer not in `live`.
    pub fn retain(&mut self, live: &[ChannelBuffer]) {
        self.entries
            .retain(|id, _| live.iter().any(|b| b.id() == *id));
    }

    /// Number of ranges actually computed (cache misses).
    pub fn computed(&self) -> u64 {
        self.computed
    }
}
