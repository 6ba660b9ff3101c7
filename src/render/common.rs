//! Common rendering utilities shared across frame primitives.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

/// Axis-aligned rectangle in logical pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Shrinks by `[top, right, bottom, left]`, never below zero size.
    pub fn inset(&self, [top, right, bottom, left]: [f32; 4]) -> Self {
        Self::new(
            self.x + left,
            self.y + top,
            self.width - left - right,
            self.height - top - bottom,
        )
    }

    /// Splits into `count` equal horizontal lanes, top to bottom.
    pub fn lanes(&self, count: usize) -> Vec<Rect> {
        let count = count.max(1);
        let h = self.height / count as f32;
        (0..count)
            .map(|i| Rect::new(self.x, self.y + i as f32 * h, self.width, h))
            .collect()
    }
}

/// Transforms logical screen coordinates to clip space coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ClipTransform(f32, f32);

impl ClipTransform {
    pub fn new(w: f32, h: f32) -> Self {
        Self(2.0 / w.max(1.0), 2.0 / h.max(1.0))
    }

    #[inline]
    pub fn to_clip(self, x: f32, y: f32) -> [f32; 2] {
        [x * self.0 - 1.0, 1.0 - y * self.1]
    }
}

/// Clip-space vertex with signed-distance parameters for antialiasing.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub params: [f32; 4],
}

impl Vertex {
    pub const SOLID_PARAMS: [f32; 4] = [0.0, 0.0, 1000.0, 1.0];

    #[inline]
    pub fn solid(pos: [f32; 2], color: [f32; 4]) -> Self {
        Self {
            position: pos,
            color,
            params: Self::SOLID_PARAMS,
        }
    }

    #[inline]
    pub fn antialiased(pos: [f32; 2], color: [f32; 4], dist: f32, half: f32, feather: f32) -> Self {
        Self {
            position: pos,
            color,
            params: [dist, 0.0, half, feather],
        }
    }
}

/// Six vertices forming a solid quad (two triangles).
#[inline]
pub fn quad_vertices(rect: Rect, clip: ClipTransform, color: [f32; 4]) -> [Vertex; 6] {
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
    let (tl, tr, bl, br) = (
        clip.to_clip(x0, y0),
        clip.to_clip(x1, y0),
        clip.to_clip(x0, y1),
        clip.to_clip(x1, y1),
    );
    [
        Vertex::solid(tl, color),
        Vertex::solid(bl, color),
        Vertex::solid(br, color),
        Vertex::solid(tl, color),
        Vertex::solid(br, color),
        Vertex::solid(tr, color),
    ]
}

/// Six vertices forming an antialiased dot.
#[inline]
pub fn dot_vertices(
    cx: f32,
    cy: f32,
    radius: f32,
    feather: f32,
    color: [f32; 4],
    clip: ClipTransform,
) -> [Vertex; 6] {
    let o = radius + feather;
    let v = |px, py, ox, oy| Vertex {
        position: clip.to_clip(px, py),
        color,
        params: [ox, oy, radius, feather],
    };
    [
        v(cx - o, cy - o, -o, -o),
        v(cx - o, cy + o, -o, o),
        v(cx + o, cy - o, o, -o),
        v(cx + o, cy - o, o, -o),
        v(cx - o, cy + o, -o, o),
        v(cx + o, cy + o, o, o),
    ]
}
