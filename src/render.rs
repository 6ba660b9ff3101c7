//! Projection and frame drawing.

pub mod common;
pub mod frame;
pub mod geometry;
pub mod project;
pub mod surface;
pub mod theme;

pub use common::{ClipTransform, Rect, Vertex};
pub use project::{Project, Projected, ProjectedPoint, Projector};
pub use surface::{Layer, RecordingSurface, Surface};
pub use theme::RenderStyle;
