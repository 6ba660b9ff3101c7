//! Signal-to-screen transform and rendering core.
//!
//! Turns channel buffers plus a playback cursor into frames: percentile
//! auto-scaling, sweep-window selection, linear/polar/density projections and
//! a frame renderer that redraws while playback advances.

pub mod dsp;
pub mod error;
pub mod playback;
pub mod render;
pub mod settings;
pub mod source;
pub mod util;

pub use error::SignalError;
pub use render::frame::{DisplayMetrics, FrameRenderer, PlaybackState};
pub use source::{BufferId, ChannelBuffer, ChannelSet, SampleSource};
