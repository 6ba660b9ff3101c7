//! Heat-map projections: paired-channel density and spectrogram.

use super::{FrameInput, HeatAxes, Heatmap, PointTag, Project, Projected, ProjectedPoint};
use crate::dsp::density::{
    DensityBinner, DensityGrid, GridResolution, PairKey, ProgressiveDensity, pair_key,
};
use crate::dsp::spectrogram::{Spectrogram, SpectrogramAnalyzer, SpectrogramConfig};
use crate::error::SignalError;
use crate::render::common::Rect;
use crate::source::BufferId;
use tracing::debug;

/// 2-D histogram of the first two channels, optionally revealed with playback.
#[derive(Debug)]
pub struct DensityProjector {
    resolution: GridResolution,
    animate: bool,
    progressive: Option<ProgressiveDensity>,
    full: Option<(PairKey, DensityGrid)>,
    computed: u64,
}

impl Default for DensityProjector {
    fn default() -> Self {
        Self::new(GridResolution::Auto, true)
    }
}

impl DensityProjector {
    pub fn new(resolution: GridResolution, animate: bool) -> Self {
        Self {
            resolution,
            animate,
            progressive: None,
            full: None,
            computed: 0,
        }
    }

    /// Histograms built from scratch (cache misses).
    pub fn computed(&self) -> u64 {
        self.computed
    }

    fn grid(&mut self, input: &FrameInput<'_>) -> Option<(DensityGrid, f32)> {
        let (x, y) = (&input.channels[0], &input.channels[1]);
        if !self.animate {
            let key = pair_key(x, y, self.resolution);
            if self.full.as_ref().is_none_or(|(k, _)| *k != key) {
                let grid = DensityBinner::new(self.resolution).bin(x.samples(), y.samples())?;
                debug!("[renderer] density histogram binned for {} x {}", x.id(), y.id());
                self.computed += 1;
                self.full = Some((key, grid));
            }
            let (_, grid) = self.full.as_ref()?;
            return Some((grid.clone(), 1.0));
        }
        let stale = self
            .progressive
            .as_ref()
            .is_none_or(|p| !p.matches(x, y, self.resolution));
        if stale {
            debug!("[renderer] density histogram rebuilt for {} x {}", x.id(), y.id());
            self.progressive = Some(ProgressiveDensity::new(x, y, self.resolution)?);
            self.computed += 1;
        }
        let progress = input.progress();
        let progressive = self.progressive.as_mut()?;
        Some((progressive.advance(progress).clone(), progress))
    }
}

impl Project for DensityProjector {
    fn required_channels(&self) -> usize {
        2
    }

    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected {
        if input.channels.len() < 2 {
            return Projected::Empty(SignalError::ChannelMismatch {
                required: 2,
                selected: input.channels.len(),
            });
        }
        let Some((grid, progress)) = self.grid(input) else {
            return Projected::Empty(SignalError::EmptyBuffer);
        };

        let size = grid.size.max(1) as f32;
        let (cw, ch) = (area.width / size, area.height / size);
        let cells = grid
            .cells()
            .map(|(col, row, count)| ProjectedPoint {
                x: area.x + (col as f32 + 0.5) * cw,
                y: area.bottom() - (row as f32 + 0.5) * ch,
                tag: PointTag::Density { count },
            })
            .collect();
        let b = grid.bounds;
        Projected::Heatmap(Heatmap {
            area,
            cell_width: cw,
            cell_height: ch,
            cells,
            min: grid.min_density as f32,
            max: grid.max_density as f32,
            total: grid.total,
            progress,
            axes: HeatAxes {
                x: (b.x_min, b.x_max),
                y: (b.y_min, b.y_max),
                x_title: input.channels[0].name().to_string(),
                y_title: input.channels[1].name().to_string(),
            },
        })
    }

    fn reset(&mut self) {
        self.progressive = None;
        self.full = None;
    }
}

/// Short-time spectrum of the first channel, revealed up to the cursor.
#[derive(Debug)]
pub struct SpectrogramProjector {
    analyzer: SpectrogramAnalyzer,
    cache: Option<(BufferId, Spectrogram)>,
    computed: u64,
}

impl Default for SpectrogramProjector {
    fn default() -> Self {
        Self::new(SpectrogramConfig::default())
    }
}

impl SpectrogramProjector {
    pub fn new(config: SpectrogramConfig) -> Self {
        Self {
            analyzer: SpectrogramAnalyzer::new(config),
            cache: None,
            computed: 0,
        }
    }

    /// Transforms actually run (cache misses).
    pub fn computed(&self) -> u64 {
        self.computed
    }
}

impl Project for SpectrogramProjector {
    fn project(&mut self, input: &FrameInput<'_>, area: Rect) -> Projected {
        let Some(channel) = input.channels.first() else {
            return Projected::Empty(SignalError::ChannelMismatch {
                required: 1,
                selected: 0,
            });
        };
        if self.cache.as_ref().is_none_or(|(id, _)| *id != channel.id()) {
            let computed = self
                .analyzer
                .compute(channel.samples(), channel.sample_rate());
            let Some(spectro) = computed else {
                return Projected::Empty(SignalError::EmptyBuffer);
            };
            self.computed += 1;
            self.cache = Some((channel.id(), spectro));
        }
        let Some((_, spectro)) = &self.cache else {
            return Projected::Empty(SignalError::EmptyBuffer);
        };

        let visible = spectro.frames_until(input.cursor);
        let (cw, ch) = (
            area.width / spectro.frames.max(1) as f32,
            area.height / spectro.bins.max(1) as f32,
        );
        let mut cells = Vec::new();
        for frame in 0..visible {
            for (bin, &value) in spectro.column(frame).iter().enumerate() {
                if spectro.level(value) <= 0.0 {
                    continue;
                }
                cells.push(ProjectedPoint {
                    x: area.x + (frame as f32 + 0.5) * cw,
                    y: area.bottom() - (bin as f32 + 0.5) * ch,
                    tag: PointTag::Spectral { value },
                });
            }
        }

        let lowest = spectro.frequencies.first().copied().unwrap_or(0.0);
        let highest = spectro.frequencies.last().copied().unwrap_or(0.0);
        Projected::Heatmap(Heatmap {
            area,
            cell_width: cw,
            cell_height: ch,
            cells,
            min: spectro.min,
            max: spectro.max,
            total: (visible * spectro.bins) as u64,
            progress: input.progress(),
            axes: HeatAxes {
                x: (0.0, channel.duration()),
                y: (lowest, highest),
                x_title: "time (s)".to_string(),
                y_title: if spectro.is_mel() {
                    "mel band centre (Hz)".to_string()
                } else {
                    "frequency (Hz)".to_string()
                },
            },
        })
    }

    fn reset(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrogram::SpectrogramScale;
    use crate::dsp::{AutoScaler, ScaleRange};
    use crate::render::project::tests::input_for;
    use crate::source::ChannelBuffer;
    use crate::source::synth::sine;

    fn heatmap(out: Projected) -> Heatmap {
        match out {
            Projected::Heatmap(map) => map,
            other => panic!("expected a heat map, got {other:?}"),
        }
    }

    fn pair() -> (Vec<ChannelBuffer>, Vec<ScaleRange>) {
        let x = sine(2.0, 1.0, 100.0, 400);
        let ch = vec![
            ChannelBuffer::new("x", 100.0, x.clone()),
            ChannelBuffer::new("y", 100.0, x),
        ];
        let scales = ch.iter().map(|c| AutoScaler::default().scale(c.samples())).collect();
        (ch, scales)
    }

    #[test]
    fn identical_channels_light_the_diagonal() {
        let (ch, scales) = pair();
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut projector = DensityProjector::new(GridResolution::Fixed(10), false);
        let map = heatmap(projector.project(&input_for(&ch, &scales, 0.0, 1.0), area));
        assert_eq!(map.total, 400);
        assert_eq!(map.progress, 1.0);
        for cell in &map.cells {
            // Row 0 sits at the bottom, so the diagonal runs bottom-left to top-right.
            assert!((cell.x + cell.y - 100.0).abs() < 1e-3, "{cell:?}");
        }
    }

    #[test]
    fn static_density_is_binned_once_per_pair() {
        let (ch, scales) = pair();
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut projector = DensityProjector::new(GridResolution::Fixed(16), false);
        let first = heatmap(projector.project(&input_for(&ch, &scales, 0.5, 1.0), area));
        for step in 1..30 {
            let cursor = step as f32 * 0.1;
            let again = heatmap(projector.project(&input_for(&ch, &scales, cursor, 1.0), area));
            assert_eq!(again.cells, first.cells);
        }
        assert_eq!(projector.computed(), 1);

        // New buffers with the same samples are a different pair.
        let (other, _) = pair();
        projector.project(&input_for(&other, &scales, 0.5, 1.0), area);
        assert_eq!(projector.computed(), 2);
        projector.reset();
        projector.project(&input_for(&other, &scales, 0.5, 1.0), area);
        assert_eq!(projector.computed(), 3);
    }

    #[test]
    fn animated_density_follows_playback() {
        let (ch, scales) = pair();
        let area = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut projector = DensityProjector::new(GridResolution::Fixed(10), true);

        let half = heatmap(projector.project(&input_for(&ch, &scales, 2.0, 1.0), area));
        assert_eq!(half.total, 200);
        let full = heatmap(projector.project(&input_for(&ch, &scales, 4.0, 1.0), area));
        assert_eq!(full.total, 400);
        let back = heatmap(projector.project(&input_for(&ch, &scales, 1.0, 1.0), area));
        assert_eq!(back.total, 100);
        assert_eq!(full.axes, back.axes);
    }

    #[test]
    fn spectrogram_reveals_columns_up_to_the_cursor_and_is_memoized() {
        let ch = vec![ChannelBuffer::new("speech", 1_000.0, sine(125.0, 1.0, 1_000.0, 2_000))];
        let scales = [AutoScaler::default().scale(ch[0].samples())];
        let area = Rect::new(0.0, 0.0, 300.0, 129.0);
        let mut projector = SpectrogramProjector::new(SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
            ..SpectrogramConfig::default()
        });

        let early = heatmap(projector.project(&input_for(&ch, &scales, 0.5, 1.0), area));
        let late = heatmap(projector.project(&input_for(&ch, &scales, 1.5, 1.0), area));
        assert_eq!(projector.computed(), 1);
        assert!(late.cells.len() > early.cells.len());
        assert!(early.cells.iter().all(|c| c.x < 150.0));
        assert_eq!(early.axes.y, (0.0, 500.0));

        // The loudest cell of each column sits in the 125 Hz row.
        let loudest = late
            .cells
            .iter()
            .max_by(|a, b| late.level(a).total_cmp(&late.level(b)))
            .map(|c| c.y);
        let row_125 = area.bottom() - 32.5 * late.cell_height;
        assert!(loudest.is_some_and(|y| (y - row_125).abs() < 1e-3));
    }

    #[test]
    fn mel_spectrogram_projects_one_row_per_band() {
        let ch = vec![ChannelBuffer::new("speech", 1_000.0, sine(125.0, 1.0, 1_000.0, 2_000))];
        let scales = [AutoScaler::default().scale(ch[0].samples())];
        let area = Rect::new(0.0, 0.0, 300.0, 160.0);
        let mut projector = SpectrogramProjector::new(SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
            scale: SpectrogramScale::Mel {
                bands: 16,
                fmin: 0.0,
                fmax: None,
            },
            ..SpectrogramConfig::default()
        });

        let map = heatmap(projector.project(&input_for(&ch, &scales, 2.0, 1.0), area));
        assert_eq!(map.cell_height, 10.0);
        assert_eq!(map.axes.y_title, "mel band centre (Hz)");
        assert!(map.axes.y.0 > 0.0 && map.axes.y.1 < 500.0);
        let loudest = map
            .cells
            .iter()
            .max_by(|a, b| map.level(a).total_cmp(&map.level(b)))
            .map(|c| c.y);
        let band_4 = area.bottom() - 4.5 * map.cell_height;
        assert!(loudest.is_some_and(|y| (y - band_4).abs() < 1e-3));
    }
}
