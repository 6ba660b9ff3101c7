// Geometry utilities for rendering.

use crate::render::common::{ClipTransform, Vertex};

// Default feather distance for antialiased lines.
pub const DEFAULT_FEATHER: f32 = 1.0;

// Builds an antialiased polyline for `TriangleList` topology.
pub fn build_aa_line_list(
    pts: &[(f32, f32)],
    stroke: f32,
    feather: f32,
    color: [f32; 4],
    clip: &ClipTransform,
) -> Vec<Vertex> {
    if pts.len() < 2 {
        return Vec::new();
    }
    let (half, outer) = (stroke.max(0.1) * 0.5, stroke.max(0.1) * 0.5 + feather);
    let mut verts = Vec::with_capacity((pts.len() - 1) * 6);
    for seg in pts.windows(2) {
        let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-4 {
            continue;
        }
        let inv = len.recip();
        let (ox, oy) = (-dy * inv * outer, dx * inv * outer);
        let mk = |px, py, d| Vertex::antialiased(clip.to_clip(px, py), color, d, half, feather);
        verts.extend([
            mk(x0 - ox, y0 - oy, -outer),
            mk(x0 + ox, y0 + oy, outer),
            mk(x1 + ox, y1 + oy, outer),
            mk(x0 - ox, y0 - oy, -outer),
            mk(x1 + ox, y1 + oy, outer),
            mk(x1 - ox, y1 - oy, -outer),
        ]);
    }
    verts
}

// Closed circle approximated by `segments` chords.
pub fn circle_points(cx: f32, cy: f32, radius: f32, segments: usize) -> Vec<(f32, f32)> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| {
            let a = std::f32::consts::TAU * i as f32 / segments as f32;
            (cx + radius * a.cos(), cy + radius * a.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_vertices_per_segment_skipping_degenerate_ones() {
        let clip = ClipTransform::new(100.0, 100.0);
        let pts = [(0.0, 0.0), (10.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let v = build_aa_line_list(&pts, 1.0, DEFAULT_FEATHER, [1.0; 4], &clip);
        assert_eq!(v.len(), 12);
        assert!(build_aa_line_list(&pts[..1], 1.0, 1.0, [1.0; 4], &clip).is_empty());
    }

    #[test]
    fn circle_closes_on_itself() {
        let pts = circle_points(5.0, 5.0, 2.0, 16);
        assert_eq!(pts.len(), 17);
        let (first, last) = (pts[0], pts[16]);
        assert!((first.0 - last.0).abs() < 1e-4 && (first.1 - last.1).abs() < 1e-4);
    }
}
