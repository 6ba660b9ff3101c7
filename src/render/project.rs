//! Sample-to-screen projections.
//!
//! Every projector maps `(frame input, plot area, scale)` to a [`Projected`]
//! value in plot pixel coordinates. Projection never fails hard: unusable
//! input comes back as [`Projected::Empty`] and is drawn as a placeholder.

pub mod heatmap;
pub mod linear;
pub mod polar;

pub use heatmap::{DensityProjector, SpectrogramProjector};
pub use linear::LinearProjector;
pub use polar::{PolarMode, PolarProjector};

use crate::dsp::{ScaleRange, Window, WindowSelector};
use crate::error::SignalError;
use crate::render::common::Rect;
use crate::source::ChannelBuffer;
use serde::Serialize;

/// What one frame projects: the selected channels, their scales and the cursor.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub channels: &'a [ChannelBuffer],
    /// One range per channel, same order.
    pub scales: &'a [ScaleRange],
    pub selector: WindowSelector,
    /// Window of the first channel.
    pub window: Window,
    pub cursor: f32,
    pub duration: f32,
}

impl FrameInput<'_> {
    /// Playback progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.cursor / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn scale(&self, channel: usize) -> ScaleRange {
        self.scales.get(channel).copied().unwrap_or(FALLBACK_SCALE)
    }
}

const FALLBACK_SCALE: ScaleRange = ScaleRange {
    min: -1.0,
    max: 1.0,
    range: 2.0,
    center: 0.0,
    median: 0.0,
    floored: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PointTag {
    Sample { index: usize, amplitude: f32 },
    /// Inserted between two samples to smooth a steep edge.
    Interpolated,
    Density { count: u32 },
    Spectral { value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub x: f32,
    pub y: f32,
    pub tag: PointTag,
}

impl ProjectedPoint {
    pub fn sample(x: f32, y: f32, index: usize, amplitude: f32) -> Self {
        Self {
            x,
            y,
            tag: PointTag::Sample { index, amplitude },
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self.tag, PointTag::Sample { .. })
    }
}

/// One stacked channel of a linear trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub name: String,
    pub area: Rect,
    pub scale: ScaleRange,
    pub points: Vec<ProjectedPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarPlot {
    pub name: String,
    pub center: (f32, f32),
    pub max_radius: f32,
    /// Angle of the newest point in radians.
    pub sweep_angle: f32,
    pub cumulative: bool,
    pub scale: ScaleRange,
    pub points: Vec<ProjectedPoint>,
}

/// Axis extents and titles of a heat map.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatAxes {
    pub x: (f32, f32),
    pub y: (f32, f32),
    pub x_title: String,
    pub y_title: String,
}

/// Grid of colored cells; each point is a cell centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub area: Rect,
    pub cell_width: f32,
    pub cell_height: f32,
    pub cells: Vec<ProjectedPoint>,
    pub min: f32,
    pub max: f32,
    pub total: u64,
    pub progress: f32,
    pub axes: HeatAxes,
}

impl Heatmap {
    /// Cell intensity in `[0, 1]` between the map's min and max.
    pub fn level(&self, point: &ProjectedPoint) -> f32 {
        let value = match point.tag {
            PointTag::Density { count } if count == 0 => return 0.0,
            PointTag::Density { count } => count as f32,
            PointTag::Spectral { value } => value,
            _ => return 0.0,
        };
        let span = self.max - self.min;
        if span <= 0.0 {
            1.0
        } else {
            ((value - self.min) / span).clamp(0.0, 1.0)
        }
    }

    pub fn cell_rect(&self, point: &ProjectedPoint) -> Rect {
        Rect::new(
            point.x - self.cell_width * 0.5,
            point.y - self.cell_height * 0.5,
            self.cell_width,
            self.cell_height,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    Trace(Vec<Lane>),
    Polar(PolarPlot),
    Heatmap(Heatmap),
    /// Nothing drawable; the error explains the placeholder.
    Empty(SignalError),
}

impl Projected {
    pub fn point_count(&self) -> usize {
        match self {
            Projected::Trace(lanes) => lanes.iter().map(|l| l.points.len()).sum(),
            Projected::Polar(plot) => plot.points.len(),
            Projected::Heatmap(map) => map.cells.len(),
            Projected::Empty(_) => 0,
        }
    }
}

pub trait Project {
    /// Channels this projection needs.
    fn required_channels(&self) -> usize {
        1
    }

    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected;

    /// Drops state accumulated across frames.
    fn reset(&mut self) {}
}

#[derive(Debug)]
pub enum Projector {
    Linear(LinearProjector),
    Polar(PolarProjector),
    Density(DensityProjector),
    Spectrogram(SpectrogramProjector),
}

impl Default for Projector {
    fn default() -> Self {
        Projector::Linear(LinearProjector::default())
    }
}

impl Projector {
    fn inner(&mut self) -> &mut dyn Project {
        match self {
            Projector::Linear(p) => p,
            Projector::Polar(p) => p,
            Projector::Density(p) => p,
            Projector::Spectrogram(p) => p,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Projector::Linear(_) => "linear",
            Projector::Polar(p) if p.mode() == PolarMode::Cumulative => "polar cumulative",
            Projector::Polar(_) => "polar latest",
            Projector::Density(_) => "density",
            Projector::Spectrogram(_) => "spectrogram",
        }
    }
}

impl Project for Projector {
    fn required_channels(&self) -> usize {
        match self {
            Projector::Linear(p) => p.required_channels(),
            Projector::Polar(p) => p.required_channels(),
            Projector::Density(p) => p.required_channels(),
            Projector::Spectrogram(p) => p.required_channels(),
        }
    }

    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected {
        let required = self.required_channels();
        if input.channels.len() < required {
            return Projected::Empty(SignalError::ChannelMismatch {
                required,
                selected: input.channels.len(),
            });
        }
        if input.channels[..required].iter().any(ChannelBuffer::is_empty) {
            return Projected::Empty(SignalError::EmptyBuffer);
        }
        self.inner().project(input, area)
    }

    fn reset(&mut self) {
        self.inner().reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dsp::AutoScaler;

    pub(crate) fn input_for<'a>(
        channels: &'a [ChannelBuffer],
        scales: &'a [ScaleRange],
        cursor: f32,
        window_seconds: f32,
    ) -> FrameInput<'a> {
        let selector = WindowSelector::new(window_seconds);
        let first = &channels[0];
        FrameInput {
            channels,
            scales,
            selector,
            window: selector.select(cursor, first.sample_rate(), first.len()),
            cursor,
            duration: channels.iter().map(ChannelBuffer::duration).fold(0.0, f32::max),
        }
    }

    #[test]
    fn density_with_one_channel_is_a_channel_mismatch() {
        let ch = vec![ChannelBuffer::new("a", 10.0, [1.0, 2.0])];
        let scales = vec![AutoScaler::default().scale(ch[0].samples())];
        let mut projector = Projector::Density(DensityProjector::default());
        let area = Rect::new(0.0, 0.0, 10.0, 10.0);
        let out = projector.project(&input_for(&ch, &scales, 0.1, 1.0), area);
        assert_eq!(
            out,
            Projected::Empty(SignalError::ChannelMismatch {
                required: 2,
                selected: 1
            })
        );
    }

    #[test]
    fn empty_buffer_projects_a_placeholder() {
        let ch = vec![ChannelBuffer::new("a", 10.0, [])];
        let scales = vec![AutoScaler::default().scale(&[])];
        let area = Rect::new(0.0, 0.0, 10.0, 10.0);
        for mut projector in [
            Projector::default(),
            Projector::Polar(PolarProjector::new(PolarMode::Latest, 1.0)),
            Projector::Spectrogram(SpectrogramProjector::default()),
        ] {
            let out = projector.project(&input_for(&ch, &scales, 0.5, 1.0), area);
            assert_eq!(out, Projected::Empty(SignalError::EmptyBuffer), "{}", projector.name());
        }
    }

    #[test]
    fn level_spans_min_to_max() {
        let map = Heatmap {
            area: Rect::default(),
            cell_width: 1.0,
            cell_height: 1.0,
            cells: Vec::new(),
            min: 2.0,
            max: 6.0,
            total: 0,
            progress: 1.0,
            axes: HeatAxes {
                x: (0.0, 1.0),
                y: (0.0, 1.0),
                x_title: String::new(),
                y_title: String::new(),
            },
        };
        let cell = |count| ProjectedPoint {
            x: 0.0,
            y: 0.0,
            tag: PointTag::Density { count },
        };
        assert_eq!(map.level(&cell(0)), 0.0);
        assert_eq!(map.level(&cell(2)), 0.0);
        assert_eq!(map.level(&cell(4)), 0.5);
        assert_eq!(map.level(&cell(6)), 1.0);
    }
}
