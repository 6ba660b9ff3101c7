//! Short-time Fourier transform of a whole channel buffer.

use crate::util::audio::{magnitude_to_db, power_to_db};
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::sync::Arc;

const MIN_FFT_SIZE: usize = 16;
const MAX_FFT_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowKind {
    // Symmetric form: both ends of the frame get the same weight.
    fn coefficients(self, len: usize) -> Vec<f32> {
        if len < 2 {
            return vec![1.0; len];
        }
        let denom = (len - 1) as f32;
        (0..len)
            .map(|n| {
                let phase = n as f32 * TAU / denom;
                match self {
                    WindowKind::Rectangular => 1.0,
                    WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                }
            })
            .collect()
    }
}

/// Value stored per cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrogramScale {
    Magnitude,
    Power,
    /// Relative to the loudest cell, so the maximum is 0 dB.
    #[default]
    Decibels,
    /// Power summed through triangular mel filters, in dB below the loudest band.
    Mel {
        bands: usize,
        fmin: f32,
        /// Upper edge in Hz; `None` is the Nyquist frequency.
        fmax: Option<f32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub fft_size: usize,
    /// Frame advance in samples; 0 selects a quarter of `fft_size`.
    pub hop_size: usize,
    pub window: WindowKind,
    pub scale: SpectrogramScale,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            hop_size: 0,
            window: WindowKind::Hann,
            scale: SpectrogramScale::Decibels,
        }
    }
}

impl SpectrogramConfig {
    pub fn sanitized(mut self) -> Self {
        self.fft_size = self.fft_size.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE);
        self.hop_size = if self.hop_size == 0 {
            (self.fft_size / 4).max(1)
        } else {
            self.hop_size.min(self.fft_size)
        };
        if let SpectrogramScale::Mel { bands, fmin, fmax } = &mut self.scale {
            *bands = (*bands).clamp(1, self.fft_size / 2);
            *fmin = if fmin.is_finite() { fmin.max(0.0) } else { 0.0 };
            let lo = *fmin;
            *fmax = fmax.filter(|&f| f.is_finite() && f > lo);
        }
        self
    }
}

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters evenly spaced on the mel scale over one FFT's bins.
#[derive(Debug, Clone, PartialEq)]
pub struct MelFilterbank {
    weights: Vec<Vec<f32>>,
    centres: Vec<f32>,
}

impl MelFilterbank {
    pub fn new(fft_size: usize, bands: usize, sample_rate: f32, fmin: f32, fmax: f32) -> Self {
        let bins = fft_size / 2 + 1;
        let bands = bands.max(1);
        let (lo, hi) = (hz_to_mel(fmin), hz_to_mel(fmax));
        let step = (hi - lo) / (bands + 1) as f32;
        let edges_hz: Vec<f32> = (0..bands + 2)
            .map(|i| mel_to_hz(lo + step * i as f32))
            .collect();
        let edges: Vec<usize> = edges_hz
            .iter()
            .map(|&f| ((fft_size + 1) as f32 * f / sample_rate).floor().max(0.0) as usize)
            .collect();

        let weights = edges
            .windows(3)
            .map(|w| {
                let (left, centre, right) = (w[0], w[1], w[2]);
                let mut row = vec![0.0; bins];
                for k in left..centre.min(bins) {
                    row[k] = (k - left) as f32 / (centre - left) as f32;
                }
                for k in centre..right.min(bins) {
                    row[k] = (right - k) as f32 / (right - centre) as f32;
                }
                row
            })
            .collect();
        Self {
            weights,
            centres: edges_hz[1..=bands].to_vec(),
        }
    }

    pub fn bands(&self) -> usize {
        self.weights.len()
    }

    /// Centre frequency of each band in Hz.
    pub fn centres(&self) -> &[f32] {
        &self.centres
    }

    pub fn weight(&self, band: usize, bin: usize) -> f32 {
        self.weights
            .get(band)
            .and_then(|row| row.get(bin))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// Frames × bins of spectral values, frame-major.
///
/// With a mel scale the "bins" are mel bands and `frequencies` holds their
/// centres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrogram {
    pub bins: usize,
    pub frames: usize,
    pub values: Vec<f32>,
    /// Centre frequency of each bin in Hz.
    pub frequencies: Vec<f32>,
    /// Start time of each frame in seconds.
    pub times: Vec<f32>,
    pub min: f32,
    pub max: f32,
    pub scale: SpectrogramScale,
}

impl Spectrogram {
    pub fn column(&self, frame: usize) -> &[f32] {
        let start = (frame * self.bins).min(self.values.len());
        &self.values[start..(start + self.bins).min(self.values.len())]
    }

    #[inline]
    pub fn value(&self, frame: usize, bin: usize) -> f32 {
        self.values
            .get(frame * self.bins + bin)
            .copied()
            .unwrap_or(self.min)
    }

    /// Number of frames starting at or before `seconds`.
    pub fn frames_until(&self, seconds: f32) -> usize {
        self.times.partition_point(|&t| t <= seconds)
    }

    /// Value mapped into `[0, 1]` across the spectrogram's own extent.
    pub fn level(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 1.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn peak_bin(&self, frame: usize) -> Option<usize> {
        self.column(frame)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    pub fn is_mel(&self) -> bool {
        matches!(self.scale, SpectrogramScale::Mel { .. })
    }
}

/// Reusable forward transform for one configuration.
pub struct SpectrogramAnalyzer {
    config: SpectrogramConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    buf: Vec<f32>,
    out: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl std::fmt::Debug for SpectrogramAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrogramAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpectrogramAnalyzer {
    pub fn new(config: SpectrogramConfig) -> Self {
        let config = config.sanitized();
        let size = config.fft_size;
        let fft = RealFftPlanner::new().plan_fft_forward(size);
        Self {
            window: config.window.coefficients(size),
            buf: vec![0.0; size],
            out: vec![Complex32::default(); size / 2 + 1],
            scratch: vec![Complex32::default(); fft.get_scratch_len()],
            fft,
            config,
        }
    }

    pub fn config(&self) -> SpectrogramConfig {
        self.config
    }

    /// Transforms the whole buffer; `None` when there are no samples.
    ///
    /// Frames advance by `hop_size` until the last one reaches past the end
    /// of the buffer; that frame is zero-padded.
    pub fn compute(&mut self, samples: &[f32], sample_rate: f32) -> Option<Spectrogram> {
        if samples.is_empty() || sample_rate.is_nan() || sample_rate <= 0.0 {
            return None;
        }
        let size = self.config.fft_size;
        let hop = self.config.hop_size;
        let bins = size / 2 + 1;
        let frames = if samples.len() <= size {
            1
        } else {
            1 + (samples.len() - size).div_ceil(hop)
        };
        let magnitude = self.config.scale == SpectrogramScale::Magnitude
            || self.config.scale == SpectrogramScale::Decibels;

        let mut values = Vec::with_capacity(frames * bins);
        for frame in 0..frames {
            let start = frame * hop;
            let chunk = &samples[start.min(samples.len())..(start + size).min(samples.len())];
            self.buf.fill(0.0);
            for ((dst, &s), &w) in self.buf.iter_mut().zip(chunk).zip(&self.window) {
                *dst = s * w;
            }
            self.out.fill(Complex32::default());
            if self
                .fft
                .process_with_scratch(&mut self.buf, &mut self.out, &mut self.scratch)
                .is_err()
            {
                values.extend(std::iter::repeat_n(0.0, bins));
                continue;
            }
            values.extend(
                self.out
                    .iter()
                    .map(|c| if magnitude { c.norm() } else { c.norm_sqr() }),
            );
        }

        let mut frequencies: Vec<f32> = (0..bins)
            .map(|b| b as f32 * sample_rate / size as f32)
            .collect();
        let mut rows = bins;
        match self.config.scale {
            SpectrogramScale::Magnitude | SpectrogramScale::Power => {}
            SpectrogramScale::Decibels => {
                let reference = values.iter().copied().fold(0.0, f32::max);
                for v in &mut values {
                    *v = magnitude_to_db(*v, reference);
                }
            }
            SpectrogramScale::Mel { bands, fmin, fmax } => {
                let nyquist = sample_rate * 0.5;
                let hi = fmax.unwrap_or(nyquist).min(nyquist);
                let bank = MelFilterbank::new(size, bands, sample_rate, fmin.min(hi), hi);
                let mel: Vec<f32> = values.chunks_exact(bins).flat_map(|p| bank.apply(p)).collect();
                let reference = mel.iter().copied().fold(0.0, f32::max);
                values = mel.into_iter().map(|v| power_to_db(v, reference)).collect();
                frequencies = bank.centres().to_vec();
                rows = bank.bands();
            }
        }

        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(Spectrogram {
            bins: rows,
            frames,
            values,
            frequencies,
            times: (0..frames)
                .map(|f| (f * hop) as f32 / sample_rate)
                .collect(),
            min,
            max,
            scale: self.config.scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synth::sine;

    #[test]
    fn sine_peaks_at_its_bin() {
        let samples = sine(125.0, 1.0, 1_000.0, 1_000);
        let spectro = SpectrogramAnalyzer::new(SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
            ..SpectrogramConfig::default()
        })
        .compute(&samples, 1_000.0)
        .expect("non-empty");

        assert_eq!(spectro.bins, 129);
        assert!((spectro.frequencies[32] - 125.0).abs() < 1e-3);
        for frame in 0..spectro.frames - 1 {
            assert_eq!(spectro.peak_bin(frame), Some(32), "frame {frame}");
        }
        assert!(spectro.max.abs() < 1e-4);
        assert!(spectro.min < -40.0);
    }

    #[test]
    fn frame_count_covers_the_tail() {
        let mut analyzer = SpectrogramAnalyzer::new(SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
            ..SpectrogramConfig::default()
        });
        let spectro = analyzer.compute(&vec![0.5; 1_000], 500.0).expect("non-empty");
        assert_eq!(spectro.frames, 13);
        assert_eq!(spectro.values.len(), 13 * 129);
        assert!((spectro.times[2] - 128.0 / 500.0).abs() < 1e-6);
        assert_eq!(spectro.frames_until(0.0), 1);
        assert_eq!(spectro.frames_until(100.0), 13);
    }

    #[test]
    fn short_signal_is_zero_padded_into_one_frame() {
        let mut analyzer = SpectrogramAnalyzer::new(SpectrogramConfig {
            scale: SpectrogramScale::Power,
            ..SpectrogramConfig::default()
        });
        let spectro = analyzer.compute(&[1.0; 10], 100.0).expect("non-empty");
        assert_eq!(spectro.frames, 1);
        assert!(spectro.value(0, 0) > 0.0);
        assert!(analyzer.compute(&[], 100.0).is_none());
    }

    #[test]
    fn default_hop_is_a_quarter_frame() {
        let config = SpectrogramConfig {
            fft_size: 512,
            hop_size: 0,
            ..SpectrogramConfig::default()
        }
        .sanitized();
        assert_eq!(config.hop_size, 128);
        assert_eq!(
            SpectrogramConfig {
                fft_size: 1,
                ..SpectrogramConfig::default()
            }
            .sanitized()
            .fft_size,
            MIN_FFT_SIZE
        );
    }

    #[test]
    fn symmetric_windows_match_at_both_ends() {
        for kind in [WindowKind::Hann, WindowKind::Hamming, WindowKind::Blackman] {
            let w = kind.coefficients(33);
            assert!((w[0] - w[32]).abs() < 1e-5, "{kind:?}");
            assert!((w[16] - 1.0).abs() < 1e-4, "{kind:?}");
        }
    }

    #[test]
    fn mel_filters_are_triangles_on_the_mel_scale() {
        assert!((hz_to_mel(700.0) - 2595.0 * 2f32.log10()).abs() < 1e-2);
        assert!((mel_to_hz(hz_to_mel(440.0)) - 440.0).abs() < 1e-2);

        let bank = MelFilterbank::new(256, 16, 1_000.0, 0.0, 500.0);
        assert_eq!(bank.bands(), 16);
        assert!(bank.centres().windows(2).all(|w| w[0] < w[1]));
        // Band 4 rises from bin 24 to a peak at bin 30 and falls to zero at 37.
        assert_eq!(bank.weight(4, 24), 0.0);
        assert_eq!(bank.weight(4, 30), 1.0);
        assert!((bank.weight(4, 32) - 5.0 / 7.0).abs() < 1e-6);
        assert_eq!(bank.weight(4, 37), 0.0);
    }

    #[test]
    fn mel_spectrogram_peaks_in_the_band_holding_the_tone() {
        let samples = sine(125.0, 1.0, 1_000.0, 1_000);
        let spectro = SpectrogramAnalyzer::new(SpectrogramConfig {
            fft_size: 256,
            hop_size: 64,
            scale: SpectrogramScale::Mel {
                bands: 16,
                fmin: 0.0,
                fmax: None,
            },
            ..SpectrogramConfig::default()
        })
        .compute(&samples, 1_000.0)
        .expect("non-empty");

        assert!(spectro.is_mel());
        assert_eq!(spectro.bins, 16);
        assert_eq!(spectro.values.len(), spectro.frames * 16);
        assert!((spectro.frequencies[4] - 120.26).abs() < 0.5);
        for frame in 0..spectro.frames - 1 {
            assert_eq!(spectro.peak_bin(frame), Some(4), "frame {frame}");
        }
        assert!(spectro.max.abs() < 1e-4);
    }

    #[test]
    fn mel_settings_are_clamped() {
        let config = SpectrogramConfig {
            fft_size: 64,
            scale: SpectrogramScale::Mel {
                bands: 500,
                fmin: -10.0,
                fmax: Some(f32::NAN),
            },
            ..SpectrogramConfig::default()
        }
        .sanitized();
        assert_eq!(
            config.scale,
            SpectrogramScale::Mel {
                bands: 32,
                fmin: 0.0,
                fmax: None
            }
        );
    }
}
