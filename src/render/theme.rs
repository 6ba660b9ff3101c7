//! Frame styling, passed explicitly to the renderer.
//!
//! Colors are sRGB `[r, g, b, a]`.

use crate::util::audio::lerp_rgba;

// Heat-map ramp: empty -> dense (5 stops).
const HEAT_RAMP: [[f32; 4]; 5] = [
    [0.000, 0.000, 0.000, 0.0],
    [0.218, 0.106, 0.332, 1.0],
    [0.609, 0.000, 0.000, 1.0],
    [1.000, 0.737, 0.353, 1.0],
    [1.000, 1.000, 1.000, 1.0],
];

const DARK_TRACES: [[f32; 4]; 4] = [
    [0.478, 0.800, 0.560, 1.0],
    [0.450, 0.650, 0.900, 1.0],
    [0.900, 0.600, 0.300, 1.0],
    [0.800, 0.450, 0.700, 1.0],
];

const LIGHT_TRACES: [[f32; 4]; 4] = [
    [0.100, 0.450, 0.250, 1.0],
    [0.150, 0.300, 0.700, 1.0],
    [0.700, 0.350, 0.050, 1.0],
    [0.550, 0.150, 0.450, 1.0],
];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub background: [f32; 4],
    pub grid: [f32; 4],
    pub axis: [f32; 4],
    pub text: [f32; 4],
    pub traces: Vec<[f32; 4]>,
    pub indicator: [f32; 4],
    pub placeholder: [f32; 4],
    pub heat_ramp: Vec<[f32; 4]>,
    pub line_width: f32,
    pub dot_radius: f32,
    /// Grid cells per axis.
    pub grid_divisions: usize,
    /// Plot margins `[top, right, bottom, left]`.
    pub padding: [f32; 4],
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::dark()
    }
}

impl RenderStyle {
    pub fn dark() -> Self {
        Self {
            background: [0.065, 0.065, 0.065, 1.0],
            grid: [0.280, 0.288, 0.304, 0.5],
            axis: [0.520, 0.536, 0.560, 1.0],
            text: [0.902, 0.910, 0.925, 1.0],
            traces: DARK_TRACES.to_vec(),
            indicator: [0.557, 0.478, 0.478, 0.9],
            placeholder: [0.557, 0.478, 0.478, 1.0],
            heat_ramp: HEAT_RAMP.to_vec(),
            line_width: 1.5,
            dot_radius: 2.5,
            grid_divisions: 10,
            padding: [12.0, 12.0, 24.0, 48.0],
        }
    }

    pub fn light() -> Self {
        Self {
            background: [0.970, 0.970, 0.965, 1.0],
            grid: [0.780, 0.780, 0.790, 0.6],
            axis: [0.300, 0.300, 0.320, 1.0],
            text: [0.100, 0.100, 0.100, 1.0],
            traces: LIGHT_TRACES.to_vec(),
            indicator: [0.700, 0.200, 0.200, 0.9],
            placeholder: [0.600, 0.250, 0.250, 1.0],
            heat_ramp: HEAT_RAMP.iter().rev().copied().collect(),
            ..Self::dark()
        }
    }

    /// Trace color for lane `index`, cycling through the palette.
    pub fn trace(&self, index: usize) -> [f32; 4] {
        if self.traces.is_empty() {
            return self.text;
        }
        self.traces[index % self.traces.len()]
    }

    /// Heat-map color for a level in `[0, 1]`.
    pub fn heat(&self, level: f32) -> [f32; 4] {
        match self.heat_ramp.len() {
            0 => self.text,
            1 => self.heat_ramp[0],
            n => {
                let pos = level.clamp(0.0, 1.0) * (n - 1) as f32;
                let i = (pos.floor() as usize).min(n - 2);
                lerp_rgba(self.heat_ramp[i], self.heat_ramp[i + 1], pos - i as f32)
            }
        }
    }
}
