use crate::dsp::density::GridResolution;
use crate::dsp::scale::AutoScaler;
use crate::dsp::spectrogram::{SpectrogramConfig, SpectrogramScale};
use crate::render::frame::{DEFAULT_DISPLAY_RATE, FrameRenderer};
use crate::render::project::{
    DensityProjector, LinearProjector, PolarMode, PolarProjector, Projector, SpectrogramProjector,
};
use crate::render::theme::RenderStyle;
use crate::source::SampleSource;
use crate::source::synth::SynthKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MIN_DISPLAY_RATE: f32 = 1.0;
const MAX_DISPLAY_RATE: f32 = 48_000.0;
const MAX_WINDOW_SECONDS: f32 = 60.0;
const MAX_SOURCE_RATE: f32 = 192_000.0;
// Upper bound on generated samples per channel.
const MAX_SOURCE_SAMPLES: f32 = 20_000_000.0;

settings_enum! {
    pub enum Domain {
        #[default]
        Ecg => "ECG",
        Eeg => "EEG",
        Doppler => "Doppler",
        Speech => "Speech",
        Recurrence => "Recurrence",
    }
}

settings_enum! {
    pub enum ProjectionMode {
        #[default]
        Linear => "Linear sweep",
        PolarLatest => "Polar (latest point)",
        PolarCumulative => "Polar (cumulative)",
        Density => "Density heat map",
        Spectrogram => "Spectrogram",
    }
}

settings_enum! {
    pub enum Theme {
        #[default]
        Dark => "Dark",
        Light => "Light",
    }
}

impl Domain {
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| {
            d.to_string().eq_ignore_ascii_case(name)
                || serde_json::to_value(d)
                    .ok()
                    .is_some_and(|v| v.as_str() == Some(name))
        })
    }
}

/// How one viewer turns a loaded recording into frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub display_rate: f32,
    pub window_seconds: f32,
    pub projection: ProjectionMode,
    /// Seconds per turn in polar latest-point mode.
    pub cycle_seconds: f32,
    pub grid: GridResolution,
    pub animate_density: bool,
    /// Channel indices to show; empty shows all.
    pub selected_channels: Vec<usize>,
    pub scaler: AutoScaler,
    pub spectrogram: SpectrogramConfig,
    pub theme: Theme,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            display_rate: DEFAULT_DISPLAY_RATE,
            window_seconds: 1.0,
            projection: ProjectionMode::Linear,
            cycle_seconds: 1.0,
            grid: GridResolution::Auto,
            animate_density: true,
            selected_channels: Vec::new(),
            scaler: AutoScaler::default(),
            spectrogram: SpectrogramConfig::default(),
            theme: Theme::Dark,
        }
    }
}

impl ViewerConfig {
    pub fn preset(domain: Domain) -> Self {
        let base = Self::default();
        match domain {
            Domain::Ecg => Self {
                display_rate: 250.0,
                window_seconds: 2.5,
                ..base
            },
            Domain::Eeg => Self {
                display_rate: 128.0,
                window_seconds: 2.0,
                ..base
            },
            Domain::Doppler => Self {
                display_rate: 4_000.0,
                window_seconds: 1.0,
                projection: ProjectionMode::Spectrogram,
                spectrogram: SpectrogramConfig {
                    fft_size: 256,
                    ..SpectrogramConfig::default()
                },
                ..base
            },
            Domain::Speech => Self {
                display_rate: 1_000.0,
                window_seconds: 0.5,
                projection: ProjectionMode::PolarCumulative,
                spectrogram: SpectrogramConfig {
                    scale: SpectrogramScale::Mel {
                        bands: 40,
                        fmin: 0.0,
                        fmax: None,
                    },
                    ..SpectrogramConfig::default()
                },
                ..base
            },
            Domain::Recurrence => Self {
                display_rate: 100.0,
                window_seconds: 2.0,
                projection: ProjectionMode::Density,
                ..base
            },
        }
    }

    pub fn sanitize(&mut self) {
        let fallback = Self::default();
        self.display_rate = if self.display_rate.is_finite() {
            self.display_rate.clamp(MIN_DISPLAY_RATE, MAX_DISPLAY_RATE)
        } else {
            fallback.display_rate
        };
        self.window_seconds = if self.window_seconds.is_finite() && self.window_seconds > 0.0 {
            self.window_seconds.min(MAX_WINDOW_SECONDS)
        } else {
            fallback.window_seconds
        };
        if !(self.cycle_seconds.is_finite() && self.cycle_seconds > 0.0) {
            self.cycle_seconds = fallback.cycle_seconds;
        }
        self.scaler = self.scaler.sanitized();
        self.spectrogram = self.spectrogram.sanitized();
        self.selected_channels.dedup();
    }

    pub fn projector(&self) -> Projector {
        match self.projection {
            ProjectionMode::Linear => Projector::Linear(LinearProjector::default()),
            ProjectionMode::PolarLatest => {
                Projector::Polar(PolarProjector::new(PolarMode::Latest, self.cycle_seconds))
            }
            ProjectionMode::PolarCumulative => {
                Projector::Polar(PolarProjector::new(PolarMode::Cumulative, self.cycle_seconds))
            }
            ProjectionMode::Density => {
                Projector::Density(DensityProjector::new(self.grid, self.animate_density))
            }
            ProjectionMode::Spectrogram => {
                Projector::Spectrogram(SpectrogramProjector::new(self.spectrogram))
            }
        }
    }

    pub fn style(&self) -> RenderStyle {
        match self.theme {
            Theme::Dark => RenderStyle::dark(),
            Theme::Light => RenderStyle::light(),
        }
    }

    pub fn build_renderer(&self) -> FrameRenderer {
        FrameRenderer::new(self.projector(), self.style())
            .with_display_rate(self.display_rate)
            .with_window_seconds(self.window_seconds)
            .with_scaler(self.scaler)
            .with_selection(self.selected_channels.clone())
    }
}

/// Synthetic recording used when no file is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SynthKind,
    pub sample_rate: f32,
    pub duration: f32,
    pub seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::preset(Domain::default())
    }
}

impl SourceConfig {
    pub fn preset(domain: Domain) -> Self {
        let (kind, sample_rate, duration) = match domain {
            Domain::Ecg => (SynthKind::Ecg { bpm: 72.0, noise: 0.02 }, 500.0, 10.0),
            Domain::Eeg => (SynthKind::Eeg { channels: 4 }, 256.0, 10.0),
            Domain::Doppler => (
                SynthKind::Chirp {
                    start_hz: 200.0,
                    end_hz: 1_200.0,
                },
                8_000.0,
                3.0,
            ),
            Domain::Speech => (
                SynthKind::Harmonics {
                    fundamental: 90.0,
                    partials: 4,
                },
                8_000.0,
                3.0,
            ),
            Domain::Recurrence => (
                SynthKind::Recurrence {
                    frequency: 1.0,
                    lag: 0.25,
                },
                200.0,
                10.0,
            ),
        };
        Self {
            kind,
            sample_rate,
            duration,
            seed: 1,
        }
    }

    pub fn sanitize(&mut self) {
        let fallback = Self::preset(Domain::default());
        self.sample_rate = if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
            self.sample_rate.clamp(MIN_DISPLAY_RATE, MAX_SOURCE_RATE)
        } else {
            fallback.sample_rate
        };
        self.duration = if self.duration.is_finite() && self.duration > 0.0 {
            self.duration.min(MAX_SOURCE_SAMPLES / self.sample_rate)
        } else {
            fallback.duration
        };
        self.kind = self.kind.sanitized();
    }

    pub fn sample_source(&self) -> SampleSource<'static> {
        SampleSource::Synthetic {
            kind: self.kind,
            sample_rate: self.sample_rate,
            duration: self.duration,
            seed: self.seed,
        }
    }
}

/// Contents of `settings.json`. Missing entries fall back to the presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub domain: Domain,
    pub viewers: HashMap<Domain, ViewerConfig>,
    pub sources: HashMap<Domain, SourceConfig>,
}

impl Settings {
    pub fn sanitize(&mut self) {
        self.viewers.values_mut().for_each(ViewerConfig::sanitize);
        self.sources.values_mut().for_each(SourceConfig::sanitize);
    }

    pub fn viewer(&self, domain: Domain) -> ViewerConfig {
        let mut config = self
            .viewers
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| ViewerConfig::preset(domain));
        config.sanitize();
        config
    }

    pub fn source(&self, domain: Domain) -> SourceConfig {
        let mut config = self
            .sources
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| SourceConfig::preset(domain));
        config.sanitize();
        config
    }
}
