//! Deterministic synthetic signals for the demo viewers.

use super::{ChannelBuffer, ChannelSet};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

// P, Q, R, S, T waves as (beat phase, amplitude, width).
const ECG_WAVES: [(f32, f32, f32); 5] = [
    (0.20, 0.15, 0.025),
    (0.36, -0.12, 0.010),
    (0.40, 1.00, 0.012),
    (0.44, -0.25, 0.012),
    (0.65, 0.30, 0.050),
];

// EEG rhythm bands as (frequency Hz, amplitude).
const EEG_BANDS: [(f32, f32); 4] = [(2.5, 0.35), (6.0, 0.25), (10.0, 0.6), (20.0, 0.15)];

/// Xorshift128+ generator, seeded through splitmix64.
#[derive(Debug, Clone, Copy)]
pub struct Rng {
    s0: u64,
    s1: u64,
}

impl Rng {
    pub fn from_seed(seed: u64) -> Self {
        let s0 = splitmix64(seed);
        let s1 = splitmix64(seed.wrapping_add(0x9e37_79b9_7f4a_7c15));
        Self {
            s0: if s0 == 0 && s1 == 0 { 1 } else { s0 },
            s1,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);
        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);
        result
    }

    /// Uniform in `[-1, 1)`.
    pub fn bipolar(&mut self) -> f32 {
        ((self.next_u64() >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// What to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SynthKind {
    Sine { frequency: f32, amplitude: f32 },
    /// Sum of `partials` harmonics with 1/k amplitudes, like a voiced vowel.
    Harmonics { fundamental: f32, partials: usize },
    Ecg { bpm: f32, noise: f32 },
    Eeg { channels: usize },
    Chirp { start_hz: f32, end_hz: f32 },
    /// Two channels, the second a delayed and noisy copy of the first.
    Recurrence { frequency: f32, lag: f32 },
}

pub const MAX_SYNTH_CHANNELS: usize = 64;
pub const MAX_PARTIALS: usize = 64;

impl SynthKind {
    /// Caps the per-kind counts that size the generated buffers.
    pub fn sanitized(self) -> Self {
        match self {
            SynthKind::Eeg { channels } => SynthKind::Eeg {
                channels: channels.clamp(1, MAX_SYNTH_CHANNELS),
            },
            SynthKind::Harmonics {
                fundamental,
                partials,
            } => SynthKind::Harmonics {
                fundamental,
                partials: partials.clamp(1, MAX_PARTIALS),
            },
            other => other,
        }
    }

    pub fn generate(self, sample_rate: f32, duration: f32, seed: u64) -> ChannelSet {
        let rate = sample_rate.max(1.0);
        let n = (duration.max(0.0) * rate).round() as usize;
        let mut rng = Rng::from_seed(seed);
        let channels = match self {
            SynthKind::Sine {
                frequency,
                amplitude,
            } => vec![ChannelBuffer::new(
                "sine",
                rate,
                sine(frequency, amplitude, rate, n),
            )],
            SynthKind::Harmonics {
                fundamental,
                partials,
            } => vec![ChannelBuffer::new(
                "voice",
                rate,
                harmonics(fundamental, partials, rate, n),
            )],
            SynthKind::Ecg { bpm, noise } => vec![ChannelBuffer::new(
                "ECG lead II",
                rate,
                ecg(bpm, rate, n)
                    .into_iter()
                    .map(|s| s + noise * rng.bipolar()),
            )],
            SynthKind::Eeg { channels } => (0..channels.max(1))
                .map(|ch| {
                    ChannelBuffer::new(format!("EEG {}", ch + 1), rate, eeg(&mut rng, rate, n))
                })
                .collect(),
            SynthKind::Chirp { start_hz, end_hz } => vec![ChannelBuffer::new(
                "doppler",
                rate,
                chirp(start_hz, end_hz, rate, n),
            )],
            SynthKind::Recurrence { frequency, lag } => {
                let x = sine(frequency, 1.0, rate, n);
                let shift = (lag.max(0.0) * rate).round() as usize;
                let y: Vec<f32> = (0..n)
                    .map(|i| x[(i + shift) % n.max(1)] + 0.1 * rng.bipolar())
                    .collect();
                vec![
                    ChannelBuffer::new("x(t)", rate, x),
                    ChannelBuffer::new("x(t + lag)", rate, y),
                ]
            }
        };
        ChannelSet::new(channels)
    }
}

pub fn sine(frequency: f32, amplitude: f32, sample_rate: f32, n: usize) -> Vec<f32> {
    let k = TAU * frequency / sample_rate;
    (0..n).map(|i| amplitude * (k * i as f32).sin()).collect()
}

pub fn harmonics(fundamental: f32, partials: usize, sample_rate: f32, n: usize) -> Vec<f32> {
    let mut out = vec![0.0; n];
    for k in 1..=partials.max(1) {
        let partial = sine(fundamental * k as f32, 1.0 / k as f32, sample_rate, n);
        for (acc, s) in out.iter_mut().zip(partial) {
            *acc += s;
        }
    }
    out
}

/// Gaussian-sum beat model; one beat every `60 / bpm` seconds.
pub fn ecg(bpm: f32, sample_rate: f32, n: usize) -> Vec<f32> {
    let period = 60.0 / bpm.clamp(20.0, 250.0);
    (0..n)
        .map(|i| {
            let phase = (i as f32 / sample_rate / period).fract();
            ECG_WAVES
                .iter()
                .map(|&(at, amp, width)| {
                    let d = (phase - at) / width;
                    amp * (-0.5 * d * d).exp()
                })
                .sum()
        })
        .collect()
}

pub fn eeg(rng: &mut Rng, sample_rate: f32, n: usize) -> Vec<f32> {
    let phases: Vec<f32> = EEG_BANDS.iter().map(|_| rng.bipolar() * TAU).collect();
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let rhythm: f32 = EEG_BANDS
                .iter()
                .zip(&phases)
                .map(|(&(f, a), &p)| a * (TAU * f * t + p).sin())
                .sum();
            rhythm + 0.2 * rng.bipolar()
        })
        .collect()
}

/// Linear frequency sweep from `start_hz` to `end_hz` over the buffer.
pub fn chirp(start_hz: f32, end_hz: f32, sample_rate: f32, n: usize) -> Vec<f32> {
    let total = (n as f32 / sample_rate).max(f32::EPSILON);
    let slope = (end_hz - start_hz) / total;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (TAU * (start_hz * t + 0.5 * slope * t * t)).sin()
        })
        .collect()
}
