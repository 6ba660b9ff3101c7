use thiserror::Error;

/// Recoverable failures of the transform pipeline.
///
/// None of these are fatal: the renderer answers every one of them with a
/// placeholder frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("invalid decimation target {target_rate} Hz for a {source_rate} Hz buffer")]
    InvalidRate { target_rate: f32, source_rate: f32 },
    #[error("no samples to display")]
    EmptyBuffer,
    #[error("flat signal (range {range}); using the minimum display range")]
    DegenerateRange { range: f32 },
    #[error("select at least {required} channels ({selected} selected)")]
    ChannelMismatch { required: usize, selected: usize },
}
