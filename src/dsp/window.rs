//! Playback cursor and sweep-window selection.
//!
//! The window restarts every `duration` seconds and reveals samples from its
//! start up to the elapsed fraction, so the trace sweeps across the plot
//! instead of scrolling.

use serde::Serialize;
use std::ops::Range;

// Largest f32 strictly below 1.0.
const ALMOST_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Playback position in seconds, bounded to `[0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeCursor {
    position: f32,
    duration: f32,
}

impl TimeCursor {
    pub fn new(duration: f32) -> Self {
        Self {
            position: 0.0,
            duration: if duration.is_finite() {
                duration.max(0.0)
            } else {
                0.0
            },
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Jumps anywhere inside the bounds.
    pub fn seek(&mut self, seconds: f32) {
        self.position = self.clamp(seconds);
    }

    /// Moves forward to `seconds`; earlier times are ignored.
    pub fn advance_to(&mut self, seconds: f32) {
        let next = self.clamp(seconds);
        if next > self.position {
            self.position = next;
        }
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    pub fn at_end(&self) -> bool {
        self.duration > 0.0 && self.position >= self.duration
    }

    fn clamp(&self, seconds: f32) -> f32 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration)
    }
}

/// Samples revealed for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Window {
    pub index: u64,
    pub start_sample: usize,
    /// Revealed samples, starting at `start_sample`.
    pub sample_count: usize,
    pub samples_per_window: usize,
    /// Elapsed part of the current window, in `[0, 1)`.
    pub fraction_elapsed: f32,
}

impl Window {
    pub fn range(&self) -> Range<usize> {
        self.start_sample..self.start_sample + self.sample_count
    }

    /// Revealed range clipped to a buffer of `len` samples.
    pub fn range_within(&self, len: usize) -> Range<usize> {
        let start = self.start_sample.min(len);
        start..(start + self.sample_count).min(len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSelector {
    duration: f32,
}

impl Default for WindowSelector {
    fn default() -> Self {
        Self { duration: 1.0 }
    }
}

impl WindowSelector {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                Self::default().duration
            },
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Window for time `seconds` over a buffer of `len` samples at `sample_rate`.
    pub fn select(&self, seconds: f32, sample_rate: f32, len: usize) -> Window {
        if sample_rate.is_nan() || sample_rate <= 0.0 || !seconds.is_finite() {
            return Window::default();
        }
        let t = f64::from(seconds.max(0.0));
        let duration = f64::from(self.duration);
        let rate = f64::from(sample_rate);

        // `seconds` and `duration` are f32, so 1.3 s arrives as 1.2999999523 s.
        // Anything within that rounding error of a boundary counts as reached.
        let windows = t / duration;
        let window_slack = t * f64::from(f32::EPSILON) / duration;
        let sample_slack = window_slack * duration * rate;

        let index = (windows + window_slack).floor();
        let elapsed = (windows - index).max(0.0);
        let samples_per_window = (duration * rate).round().max(1.0) as usize;
        let fraction = (elapsed as f32).clamp(0.0, ALMOST_ONE);

        let start = ((index * duration * rate + sample_slack).floor() as usize).min(len);
        let wanted = ((elapsed * samples_per_window as f64 + sample_slack).floor() as usize)
            .min(samples_per_window.saturating_sub(1));
        Window {
            index: index as u64,
            start_sample: start,
            sample_count: wanted.min(len - start),
            samples_per_window,
            fraction_elapsed: fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_elapsed_fraction_of_current_window() {
        let w = WindowSelector::new(1.0).select(1.3, 50.0, 150);
        assert_eq!(w.index, 1);
        assert_eq!(w.start_sample, 50);
        assert_eq!(w.samples_per_window, 50);
        assert!((w.fraction_elapsed - 0.3).abs() < 1e-5);
        assert_eq!(w.sample_count, 15);
    }

    #[test]
    fn decimal_cursor_times_land_on_their_sample() {
        let sel = WindowSelector::new(0.1);
        let w = sel.select(3.0, 100.0, 1_000);
        assert_eq!((w.index, w.start_sample, w.sample_count), (30, 300, 0));

        let sel = WindowSelector::new(1.0);
        for (t, count) in [(0.1, 25), (0.7, 175), (2.9, 225), (11.3, 75)] {
            assert_eq!(sel.select(t, 250.0, 10_000).sample_count, count, "t={t}");
        }
    }

    #[test]
    fn same_cursor_same_window() {
        let sel = WindowSelector::new(2.5);
        for t in [0.0, 0.01, 2.5, 3.75, 9.99] {
            assert_eq!(sel.select(t, 256.0, 4_000), sel.select(t, 256.0, 4_000));
        }
    }

    #[test]
    fn never_reveals_past_buffer_end() {
        let sel = WindowSelector::new(1.0);
        let len = 130;
        for step in 0..=400 {
            let t = step as f32 * 0.01;
            let w = sel.select(t, 50.0, len);
            assert!((0.0..1.0).contains(&w.fraction_elapsed), "t={t}");
            assert!(w.start_sample + w.sample_count <= len, "t={t} {w:?}");
            assert_eq!(w.range(), w.range_within(len));
        }
    }

    #[test]
    fn window_boundary_restarts_the_sweep() {
        let w = WindowSelector::new(1.0).select(2.0, 100.0, 1_000);
        assert_eq!(w.index, 2);
        assert_eq!(w.start_sample, 200);
        assert_eq!(w.sample_count, 0);
        assert_eq!(w.fraction_elapsed, 0.0);
    }

    #[test]
    fn cursor_is_bounded_and_monotonic_while_advancing() {
        let mut c = TimeCursor::new(3.0);
        c.advance_to(1.0);
        c.advance_to(0.5);
        assert_eq!(c.position(), 1.0);
        c.advance_to(10.0);
        assert_eq!(c.position(), 3.0);
        assert!(c.at_end());
        c.seek(-4.0);
        assert_eq!(c.position(), 0.0);
        c.seek(f32::NAN);
        assert_eq!(c.position(), 0.0);
        c.seek(2.0);
        assert_eq!(c.position(), 2.0);
    }

    #[test]
    fn degenerate_inputs_select_nothing() {
        let sel = WindowSelector::new(-1.0);
        assert_eq!(sel.duration(), 1.0);
        assert_eq!(sel.select(0.5, 0.0, 100), Window::default());
        assert_eq!(sel.select(f32::NAN, 100.0, 100), Window::default());
        assert_eq!(sel.select(0.5, 100.0, 0).sample_count, 0);
    }
}
