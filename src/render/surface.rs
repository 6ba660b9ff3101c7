//! Drawing targets.
//!
//! A frame is drawn as clear → layered vertex batches → labels → present.
//! Nothing drawn between `begin_frame` and `present` is visible until
//! `present`, so a reader never observes a half-drawn frame.

use crate::render::common::Vertex;
use std::mem;

/// Paint order inside one frame, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Grid,
    Axes,
    Data,
    Indicator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: [f32; 4],
}

pub trait Surface {
    /// Logical size in pixels.
    fn size(&self) -> (f32, f32);
    fn begin_frame(&mut self, clear: [f32; 4]);
    fn draw(&mut self, layer: Layer, vertices: &[Vertex]);
    fn label(&mut self, label: Label);
    fn present(&mut self);
}

/// Everything drawn for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub clear: [f32; 4],
    pub batches: Vec<(Layer, Vec<Vertex>)>,
    pub labels: Vec<Label>,
}

impl Scene {
    pub fn vertex_count(&self, layer: Layer) -> usize {
        self.batches
            .iter()
            .filter(|(l, _)| *l == layer)
            .map(|(_, v)| v.len())
            .sum()
    }

    pub fn has_label(&self, needle: &str) -> bool {
        self.labels.iter().any(|l| l.text.contains(needle))
    }

    /// Batches sorted back to front; ties keep submission order.
    pub fn ordered(&self) -> Vec<&(Layer, Vec<Vertex>)> {
        let mut out: Vec<_> = self.batches.iter().collect();
        out.sort_by_key(|(layer, _)| *layer);
        out
    }
}

/// Headless double-buffered surface.
///
/// Draw calls go to the back scene; `present` swaps it to the front.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    back: Scene,
    front: Scene,
    presented: u64,
    in_frame: bool,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            ..Self::default()
        }
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    /// Last presented frame.
    pub fn front(&self) -> &Scene {
        &self.front
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Serialized vertex stream of the front scene, back to front.
    pub fn front_bytes(&self) -> Vec<u8> {
        self.front
            .ordered()
            .into_iter()
            .flat_map(|(_, v)| bytemuck::cast_slice::<Vertex, u8>(v).iter().copied())
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self, clear: [f32; 4]) {
        self.back = Scene {
            clear,
            ..Scene::default()
        };
        self.in_frame = true;
    }

    fn draw(&mut self, layer: Layer, vertices: &[Vertex]) {
        if !self.in_frame || vertices.is_empty() {
            return;
        }
        self.back.batches.push((layer, vertices.to_vec()));
    }

    fn label(&mut self, label: Label) {
        if self.in_frame {
            self.back.labels.push(label);
        }
    }

    fn present(&mut self) {
        if !self.in_frame {
            return;
        }
        self.front = mem::take(&mut self.back);
        self.in_frame = false;
        self.presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str) -> Label {
        Label {
            text: text.into(),
            x: 0.0,
            y: 0.0,
            color: [1.0; 4],
        }
    }

    #[test]
    fn nothing_is_visible_until_present() {
        let mut s = RecordingSurface::new(100.0, 50.0);
        s.begin_frame([0.0; 4]);
        s.draw(Layer::Data, &[Vertex::solid([0.0, 0.0], [1.0; 4])]);
        s.label(label("first"));
        assert!(s.front().batches.is_empty());
        s.present();
        assert_eq!(s.front().vertex_count(Layer::Data), 1);
        assert!(s.front().has_label("first"));

        s.begin_frame([0.0; 4]);
        s.label(label("second"));
        assert!(s.front().has_label("first"));
        s.present();
        assert!(!s.front().has_label("first"));
        assert_eq!(s.presented(), 2);
    }

    #[test]
    fn draws_outside_a_frame_are_dropped() {
        let mut s = RecordingSurface::new(10.0, 10.0);
        s.draw(Layer::Grid, &[Vertex::solid([0.0, 0.0], [1.0; 4])]);
        s.present();
        assert_eq!(s.presented(), 0);
    }

    #[test]
    fn ordered_batches_go_back_to_front() {
        let mut s = RecordingSurface::new(10.0, 10.0);
        let v = [Vertex::solid([0.0, 0.0], [1.0; 4])];
        s.begin_frame([0.0; 4]);
        s.draw(Layer::Indicator, &v);
        s.draw(Layer::Grid, &v);
        s.draw(Layer::Data, &v);
        s.present();
        let layers: Vec<Layer> = s.front().ordered().iter().map(|(l, _)| *l).collect();
        assert_eq!(layers, vec![Layer::Grid, Layer::Data, Layer::Indicator]);
        assert_eq!(s.front_bytes().len(), 3 * std::mem::size_of::<Vertex>());
    }
}
