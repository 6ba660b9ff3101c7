//! Sample source adapter.
//!
//! Decoded waveforms, uploaded channel arrays and synthetic generators all end
//! up as [`ChannelBuffer`]s: finite `f32` samples, a nominal rate and a name.

pub mod synth;

use crate::util::audio::{DEFAULT_SAMPLE_RATE, deinterleave, next_key};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use synth::SynthKind;
use tracing::debug;

/// Identity of one produced buffer; caches key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One named channel of samples. Immutable; cloning shares the samples.
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    id: BufferId,
    name: Arc<str>,
    sample_rate: f32,
    samples: Arc<[f32]>,
}

impl ChannelBuffer {
    /// Builds a buffer, dropping non-finite samples.
    pub fn new(
        name: impl Into<Arc<str>>,
        sample_rate: f32,
        samples: impl IntoIterator<Item = f32>,
    ) -> Self {
        let name = name.into();
        let mut dropped = 0usize;
        let samples: Arc<[f32]> = samples
            .into_iter()
            .filter(|s| {
                let keep = s.is_finite();
                dropped += usize::from(!keep);
                keep
            })
            .collect();
        if dropped > 0 {
            debug!("[source] '{name}': dropped {dropped} non-finite samples");
        }
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        Self {
            id: BufferId(next_key()),
            name,
            sample_rate,
            samples,
        }
    }

    pub fn from_f64(name: impl Into<Arc<str>>, sample_rate: f32, samples: &[f64]) -> Self {
        Self::new(name, sample_rate, samples.iter().map(|&s| s as f32))
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds at the nominal rate.
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }
}

/// Channels produced together from one source.
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    channels: Vec<ChannelBuffer>,
}

impl ChannelSet {
    pub fn new(channels: Vec<ChannelBuffer>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[ChannelBuffer] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<ChannelBuffer> {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Longest channel duration in seconds.
    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .map(ChannelBuffer::duration)
            .fold(0.0, f32::max)
    }

    /// Picks channels by index; an empty selection keeps all of them.
    pub fn select(&self, indices: &[usize]) -> Vec<ChannelBuffer> {
        if indices.is_empty() {
            return self.channels.clone();
        }
        indices
            .iter()
            .filter_map(|&i| self.channels.get(i).cloned())
            .collect()
    }
}

/// One uploaded channel as delivered by the file-parsing service.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedChannel {
    pub name: String,
    pub samples: Vec<f64>,
}

/// Uploaded multi-channel recording (`{"sample_rate": .., "channels": [..]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedRecording {
    pub sample_rate: f32,
    pub channels: Vec<UploadedChannel>,
}

/// Every kind of input the viewers accept.
#[derive(Debug, Clone)]
pub enum SampleSource<'a> {
    /// Interleaved output of the audio decoder at its native rate.
    Decoded {
        name: &'a str,
        samples: &'a [f32],
        channels: usize,
        sample_rate: f32,
    },
    Uploaded(UploadedRecording),
    Synthetic {
        kind: SynthKind,
        sample_rate: f32,
        duration: f32,
        seed: u64,
    },
}

impl SampleSource<'_> {
    pub fn into_channels(self) -> ChannelSet {
        match self {
            SampleSource::Decoded {
                name,
                samples,
                channels,
                sample_rate,
            } => {
                let split = deinterleave(samples, channels);
                let single = split.len() == 1;
                ChannelSet::new(
                    split
                        .into_iter()
                        .enumerate()
                        .map(|(i, data)| {
                            let label = if single {
                                name.to_string()
                            } else {
                                format!("{name} [{i}]")
                            };
                            ChannelBuffer::new(label, sample_rate, data)
                        })
                        .collect(),
                )
            }
            SampleSource::Uploaded(recording) => ChannelSet::new(
                recording
                    .channels
                    .iter()
                    .map(|c| {
                        ChannelBuffer::from_f64(c.name.as_str(), recording.sample_rate, &c.samples)
                    })
                    .collect(),
            ),
            SampleSource::Synthetic {
                kind,
                sample_rate,
                duration,
                seed,
            } => kind.generate(sample_rate, duration, seed),
        }
    }
}
