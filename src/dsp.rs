//! Pure signal transforms feeding the projectors.

pub mod decimate;
pub mod density;
pub mod scale;
pub mod spectrogram;
pub mod window;

pub use decimate::{decimate, stride};
pub use density::{DensityBinner, DensityBounds, DensityGrid, GridResolution, ProgressiveDensity};
pub use scale::{AutoScaler, ScaleCache, ScaleRange};
pub use window::{TimeCursor, Window, WindowSelector};
