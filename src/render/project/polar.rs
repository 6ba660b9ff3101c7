use super::{FrameInput, PolarPlot, Project, Projected, ProjectedPoint};
use crate::dsp::ScaleRange;
use crate::error::SignalError;
use crate::render::common::Rect;
use crate::source::{BufferId, ChannelBuffer};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

// Share of the half-extent used by the outer ring.
const RADIUS_FILL: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarMode {
    /// Only the sample under the cursor.
    #[default]
    Latest,
    /// Every sample from the start up to the cursor, spread over one turn.
    Cumulative,
}

/// Normalized radii gathered across frames for cumulative mode.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    source: Option<BufferId>,
    radii: Vec<f32>,
    rebuilds: u64,
}

impl Accumulator {
    fn sync(&mut self, channel: &ChannelBuffer, scale: ScaleRange, count: usize) -> &[f32] {
        if self.source != Some(channel.id()) || count < self.radii.len() {
            self.source = Some(channel.id());
            self.radii.clear();
            self.rebuilds += 1;
        }
        let from = self.radii.len();
        self.radii.extend(
            channel.samples()[from..count]
                .iter()
                .map(|&s| scale.normalize(s)),
        );
        &self.radii
    }
}

#[derive(Debug, Clone)]
pub struct PolarProjector {
    mode: PolarMode,
    cycle: f32,
    accumulator: Accumulator,
}

impl Default for PolarProjector {
    fn default() -> Self {
        Self::new(PolarMode::Latest, 1.0)
    }
}

impl PolarProjector {
    pub fn new(mode: PolarMode, cycle_seconds: f32) -> Self {
        Self {
            mode,
            cycle: if cycle_seconds.is_finite() && cycle_seconds > 0.0 {
                cycle_seconds
            } else {
                1.0
            },
            accumulator: Accumulator::default(),
        }
    }

    pub fn mode(&self) -> PolarMode {
        self.mode
    }

    /// Radii currently held for cumulative mode.
    pub fn accumulated(&self) -> usize {
        self.accumulator.radii.len()
    }

    /// Times the cumulative point set was rebuilt from scratch.
    pub fn rebuilds(&self) -> u64 {
        self.accumulator.rebuilds
    }
}

impl Project for PolarProjector {
    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected {
        let Some(channel) = input.channels.first().filter(|c| !c.is_empty()) else {
            return Projected::Empty(SignalError::EmptyBuffer);
        };
        let scale = input.scale(0);
        let (cx, cy) = area.center();
        let max_radius = RADIUS_FILL * area.width.min(area.height) * 0.5;
        let at = |radius: f32, angle: f32| {
            (
                cx + max_radius * radius * angle.cos(),
                cy + max_radius * radius * angle.sin(),
            )
        };

        let last = channel.len() - 1;
        let elapsed = (input.cursor.max(0.0) * channel.sample_rate()).floor() as usize;

        let (points, sweep_angle) = match self.mode {
            PolarMode::Latest => {
                let index = elapsed.min(last);
                let amplitude = channel.samples()[index];
                let angle = TAU * (input.cursor.max(0.0) % self.cycle) / self.cycle;
                let (x, y) = at(scale.normalize(amplitude), angle);
                (vec![ProjectedPoint::sample(x, y, index, amplitude)], angle)
            }
            PolarMode::Cumulative => {
                let count = (elapsed + 1).min(channel.len());
                let radii = self.accumulator.sync(channel, scale, count);
                let samples = channel.samples();
                let points = radii
                    .iter()
                    .enumerate()
                    .map(|(i, &r)| {
                        let (x, y) = at(r, TAU * i as f32 / count as f32);
                        ProjectedPoint::sample(x, y, i, samples[i])
                    })
                    .collect();
                (points, TAU * (count - 1) as f32 / count as f32)
            }
        };

        Projected::Polar(PolarPlot {
            name: channel.name().to_string(),
            center: (cx, cy),
            max_radius,
            sweep_angle,
            cumulative: self.mode == PolarMode::Cumulative,
            scale,
            points,
        })
    }

    fn reset(&mut self) {
        self.accumulator = Accumulator::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::AutoScaler;
    use crate::render::project::tests::input_for;
    use crate::source::synth::sine;

    fn plot(out: Projected) -> PolarPlot {
        match out {
            Projected::Polar(plot) => plot,
            other => panic!("expected a polar plot, got {other:?}"),
        }
    }

    fn angle_of(plot: &PolarPlot, p: &ProjectedPoint) -> f32 {
        (p.y - plot.center.1).atan2(p.x - plot.center.0).rem_euclid(TAU)
    }

    fn setup() -> (Vec<ChannelBuffer>, Vec<ScaleRange>) {
        let ch = vec![ChannelBuffer::new("ecg", 10.0, sine(1.0, 1.0, 10.0, 20))];
        let scales = vec![AutoScaler::default().scale(ch[0].samples())];
        (ch, scales)
    }

    #[test]
    fn latest_and_cumulative_place_the_cursor_differently() {
        let (ch, scales) = setup();
        let area = Rect::new(0.0, 0.0, 200.0, 200.0);
        let input = input_for(&ch, &scales, 1.5, 1.0);

        let latest = plot(PolarProjector::new(PolarMode::Latest, 1.0).project(&input, area));
        assert_eq!(latest.points.len(), 1);
        assert!((latest.sweep_angle - std::f32::consts::PI).abs() < 1e-5);

        let mut projector = PolarProjector::new(PolarMode::Cumulative, 1.0);
        let cumulative = plot(projector.project(&input, area));
        assert_eq!(cumulative.points.len(), 16);
        let expected = TAU * 15.0 / 16.0;
        assert!((cumulative.sweep_angle - expected).abs() < 1e-5);
        assert!((latest.sweep_angle - cumulative.sweep_angle).abs() > 0.1);

        // Both show sample 15 at the cursor, at different angles.
        let newest = cumulative.points[15];
        assert_eq!(newest.tag, latest.points[0].tag);
        let r = (newest.x - 100.0).hypot(newest.y - 100.0);
        if r > 1.0 {
            assert!((angle_of(&cumulative, &newest) - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn radius_stays_inside_the_ring() {
        let (ch, scales) = setup();
        let area = Rect::new(0.0, 0.0, 300.0, 100.0);
        let mut projector = PolarProjector::new(PolarMode::Cumulative, 1.0);
        let plot = plot(projector.project(&input_for(&ch, &scales, 1.9, 1.0), area));
        assert!((plot.max_radius - 45.0).abs() < 1e-4);
        for p in &plot.points {
            let r = (p.x - plot.center.0).hypot(p.y - plot.center.1);
            assert!(r <= plot.max_radius + 1e-3);
        }
    }

    #[test]
    fn cumulative_grows_then_rebuilds_on_seek_back() {
        let (ch, scales) = setup();
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut projector = PolarProjector::new(PolarMode::Cumulative, 1.0);

        projector.project(&input_for(&ch, &scales, 0.5, 1.0), area);
        assert_eq!(projector.accumulated(), 6);
        projector.project(&input_for(&ch, &scales, 1.5, 1.0), area);
        assert_eq!(projector.accumulated(), 16);
        assert_eq!(projector.rebuilds(), 1);

        projector.project(&input_for(&ch, &scales, 0.2, 1.0), area);
        assert_eq!(projector.accumulated(), 3);
        assert_eq!(projector.rebuilds(), 2);

        // Past the end the count stops at the buffer length.
        projector.project(&input_for(&ch, &scales, 50.0, 1.0), area);
        assert_eq!(projector.accumulated(), 20);
    }

    #[test]
    fn new_buffer_restarts_accumulation() {
        let (ch, scales) = setup();
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut projector = PolarProjector::new(PolarMode::Cumulative, 1.0);
        projector.project(&input_for(&ch, &scales, 1.0, 1.0), area);

        let (other, other_scales) = setup();
        projector.project(&input_for(&other, &other_scales, 1.2, 1.0), area);
        assert_eq!(projector.rebuilds(), 2);
        assert_eq!(projector.accumulated(), 13);
    }
}
