use super::{FrameInput, Lane, PointTag, Project, Projected, ProjectedPoint};
use crate::render::common::Rect;

/// Vertical jump, as a share of lane height, above which points are inserted.
pub const INTERPOLATION_THRESHOLD: f32 = 0.10;

/// Sweep trace; one stacked lane per channel.
#[derive(Debug, Clone, Copy)]
pub struct LinearProjector {
    pub interpolation_threshold: f32,
}

impl Default for LinearProjector {
    fn default() -> Self {
        Self {
            interpolation_threshold: INTERPOLATION_THRESHOLD,
        }
    }
}

impl Project for LinearProjector {
    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected {
        let lanes = area
            .lanes(input.channels.len())
            .into_iter()
            .zip(input.channels)
            .enumerate()
            .map(|(i, (lane, channel))| {
                let scale = input.scale(i);
                let window = input
                    .selector
                    .select(input.cursor, channel.sample_rate(), channel.len());
                let range = window.range_within(channel.len());
                let step = lane.width / window.samples_per_window.max(1) as f32;
                let threshold = lane.height * self.interpolation_threshold;

                let mut points = Vec::with_capacity(range.len());
                let mut prev: Option<(f32, f32)> = None;
                for (offset, index) in range.enumerate() {
                    let amplitude = channel.samples()[index];
                    let x = lane.x + offset as f32 * step;
                    let y = lane.y + lane.height * (1.0 - scale.normalize(amplitude));
                    if let Some(from) = prev {
                        densify(&mut points, from, (x, y), threshold);
                    }
                    points.push(ProjectedPoint::sample(x, y, index, amplitude));
                    prev = Some((x, y));
                }
                Lane {
                    name: channel.name().to_string(),
                    area: lane,
                    scale,
                    points,
                }
            })
            .collect();
        Projected::Trace(lanes)
    }
}

// Evenly spaced points strictly between `from` and `to` when the jump exceeds `threshold`.
fn densify(out: &mut Vec<ProjectedPoint>, from: (f32, f32), to: (f32, f32), threshold: f32) {
    let dy = (to.1 - from.1).abs();
    if threshold <= 0.0 || dy <= threshold {
        return;
    }
    let inserted = (dy / threshold).ceil() as usize - 1;
    let parts = (inserted + 1) as f32;
    out.extend((1..=inserted).map(|j| {
        let t = j as f32 / parts;
        ProjectedPoint {
            x: from.0 + (to.0 - from.0) * t,
            y: from.1 + (to.1 - from.1) * t,
            tag: PointTag::Interpolated,
        }
    }));
}
