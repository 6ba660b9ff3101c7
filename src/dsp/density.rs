//! Paired-channel 2-D histogram (recurrence / correlation heat map).

use crate::source::{BufferId, ChannelBuffer};
use serde::{Deserialize, Serialize};

pub const MIN_GRID_SIZE: usize = 8;
pub const MAX_GRID_SIZE: usize = 128;

/// How finely the value plane is divided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridResolution {
    /// Finer grids for larger point sets, capped at [`MAX_GRID_SIZE`].
    #[default]
    Auto,
    Fixed(usize),
}

impl GridResolution {
    pub fn grid_size(self, points: usize) -> usize {
        match self {
            GridResolution::Auto => {
                let size = ((points as f32).sqrt() * 0.5).round() as usize;
                size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE)
            }
            GridResolution::Fixed(size) => size.clamp(2, MAX_GRID_SIZE),
        }
    }
}

/// Memoization key of a histogram: both buffers plus the grid size.
pub type PairKey = (BufferId, BufferId, usize);

pub fn pair_key(x: &ChannelBuffer, y: &ChannelBuffer, resolution: GridResolution) -> PairKey {
    (x.id(), y.id(), resolution.grid_size(x.len().min(y.len())))
}

/// Value extents of the paired channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl DensityBounds {
    /// Extents over finite pairs; `None` when there are none.
    pub fn from_pairs(xs: &[f32], ys: &[f32]) -> Option<Self> {
        xs.iter()
            .zip(ys)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc, (&x, &y)| {
                Some(match acc {
                    None => Self {
                        x_min: x,
                        x_max: x,
                        y_min: y,
                        y_max: y,
                    },
                    Some(b) => Self {
                        x_min: b.x_min.min(x),
                        x_max: b.x_max.max(x),
                        y_min: b.y_min.min(y),
                        y_max: b.y_max.max(y),
                    },
                })
            })
    }

    pub fn x_range(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn y_range(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Cell `(col, row)` for a pair, or `None` for non-finite values.
    #[inline]
    pub fn cell(&self, size: usize, x: f32, y: f32) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() || size == 0 {
            return None;
        }
        Some((
            axis_bin(x, self.x_min, self.x_range(), size),
            axis_bin(y, self.y_min, self.y_range(), size),
        ))
    }
}

#[inline]
fn axis_bin(v: f32, min: f32, range: f32, size: usize) -> usize {
    let last = size - 1;
    if range <= 0.0 {
        return size / 2;
    }
    let pos = ((v - min) / range * last as f32).floor();
    (pos.max(0.0) as usize).min(last)
}

/// Square histogram; `counts[row * size + col]`, row 0 at `y_min`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGrid {
    pub size: usize,
    pub counts: Vec<u32>,
    pub bounds: DensityBounds,
    pub total: u64,
    pub max_density: u32,
    /// Smallest non-zero count (0 for an empty grid).
    pub min_density: u32,
}

impl DensityGrid {
    pub fn empty(size: usize, bounds: DensityBounds) -> Self {
        Self {
            size,
            counts: vec![0; size * size],
            bounds,
            total: 0,
            max_density: 0,
            min_density: 0,
        }
    }

    #[inline]
    pub fn count(&self, col: usize, row: usize) -> u32 {
        self.counts.get(row * self.size + col).copied().unwrap_or(0)
    }

    /// Non-empty cells as `(col, row, count)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, &c)| (i % self.size, i / self.size, c))
    }

    /// Count mapped into `[0, 1]` between the min and max non-zero density.
    pub fn level(&self, count: u32) -> f32 {
        if count == 0 || self.max_density == 0 {
            return 0.0;
        }
        let span = self.max_density.saturating_sub(self.min_density);
        if span == 0 {
            1.0
        } else {
            (count - self.min_density.min(count)) as f32 / span as f32
        }
    }

    fn refresh_extrema(&mut self) {
        let (lo, hi) = self
            .counts
            .iter()
            .filter(|c| **c > 0)
            .fold((u32::MAX, 0), |(lo, hi), &c| (lo.min(c), hi.max(c)));
        self.max_density = hi;
        self.min_density = if hi == 0 { 0 } else { lo };
    }
}

/// Full-recomputation binner.
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityBinner {
    pub resolution: GridResolution,
}

impl DensityBinner {
    pub fn new(resolution: GridResolution) -> Self {
        Self { resolution }
    }

    /// Bins every pair; lengths are truncated to the shorter channel.
    pub fn bin(&self, xs: &[f32], ys: &[f32]) -> Option<DensityGrid> {
        let n = xs.len().min(ys.len());
        let (xs, ys) = (&xs[..n], &ys[..n]);
        let bounds = DensityBounds::from_pairs(xs, ys)?;
        Some(bin_with_bounds(xs, ys, bounds, self.resolution.grid_size(n)))
    }

    /// Bins the first `floor(progress * n)` pairs, with axes taken over all pairs.
    pub fn bin_prefix(&self, xs: &[f32], ys: &[f32], progress: f32) -> Option<DensityGrid> {
        let n = xs.len().min(ys.len());
        let bounds = DensityBounds::from_pairs(&xs[..n], &ys[..n])?;
        let take = prefix_len(n, progress);
        Some(bin_with_bounds(
            &xs[..take],
            &ys[..take],
            bounds,
            self.resolution.grid_size(n),
        ))
    }
}

pub fn prefix_len(total: usize, progress: f32) -> usize {
    if progress.is_nan() {
        return 0;
    }
    ((progress.clamp(0.0, 1.0) * total as f32).floor() as usize).min(total)
}

pub fn bin_with_bounds(xs: &[f32], ys: &[f32], bounds: DensityBounds, size: usize) -> DensityGrid {
    let mut grid = DensityGrid::empty(size, bounds);
    for (&x, &y) in xs.iter().zip(ys) {
        if let Some((col, row)) = bounds.cell(size, x, y) {
            grid.counts[row * size + col] += 1;
            grid.total += 1;
        }
    }
    grid.refresh_extrema();
    grid
}

/// Running histogram over a growing or shrinking prefix of a channel pair.
///
/// Moving from prefix `a` to prefix `b` touches only the pairs in between,
/// and the result always equals [`DensityBinner::bin_prefix`] for `b`.
#[derive(Debug, Clone)]
pub struct ProgressiveDensity {
    key: PairKey,
    // Precomputed cell index per pair; `None` for invalid pairs.
    cells: Vec<Option<u32>>,
    binned: usize,
    grid: DensityGrid,
}

impl ProgressiveDensity {
    pub fn new(x: &ChannelBuffer, y: &ChannelBuffer, resolution: GridResolution) -> Option<Self> {
        let n = x.len().min(y.len());
        let (xs, ys) = (&x.samples()[..n], &y.samples()[..n]);
        let bounds = DensityBounds::from_pairs(xs, ys)?;
        let size = resolution.grid_size(n);
        let cells = xs
            .iter()
            .zip(ys)
            .map(|(&a, &b)| {
                bounds
                    .cell(size, a, b)
                    .map(|(col, row)| (row * size + col) as u32)
            })
            .collect();
        Some(Self {
            key: pair_key(x, y, resolution),
            cells,
            binned: 0,
            grid: DensityGrid::empty(size, bounds),
        })
    }

    /// Whether this histogram was built for the given pair and grid size.
    pub fn matches(
        &self,
        x: &ChannelBuffer,
        y: &ChannelBuffer,
        resolution: GridResolution,
    ) -> bool {
        self.key == pair_key(x, y, resolution)
    }

    pub fn total_points(&self) -> usize {
        self.cells.len()
    }

    pub fn binned(&self) -> usize {
        self.binned
    }

    pub fn grid(&self) -> &DensityGrid {
        &self.grid
    }

    /// Moves the histogram to the prefix for `progress` and returns it.
    pub fn advance(&mut self, progress: f32) -> &DensityGrid {
        let target = prefix_len(self.cells.len(), progress);
        if target == self.binned {
            return &self.grid;
        }
        if target > self.binned {
            for cell in self.cells[self.binned..target].iter().flatten() {
                self.grid.counts[*cell as usize] += 1;
                self.grid.total += 1;
            }
        } else {
            for cell in self.cells[target..self.binned].iter().flatten() {
                self.grid.counts[*cell as usize] -= 1;
                self.grid.total -= 1;
            }
        }
        self.binned = target;
        self.grid.refresh_extrema();
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::synth::{Rng, sine};

    #[test]
    fn correlated_channels_fill_only_the_diagonal() {
        let xs: Vec<f32> = (0..1_000).map(|i| (i as f32 * 0.37).sin()).collect();
        let grid = DensityBinner::new(GridResolution::Fixed(50))
            .bin(&xs, &xs)
            .expect("non-empty");
        assert_eq!(grid.size, 50);
        for (col, row, _) in grid.cells() {
            assert_eq!(col, row);
        }
        assert_eq!(grid.total, 1_000);
    }

    #[test]
    fn counts_sum_to_valid_pairs() {
        let mut rng = Rng::from_seed(3);
        let mut xs: Vec<f32> = (0..700).map(|_| rng.bipolar()).collect();
        let ys: Vec<f32> = (0..650).map(|_| rng.bipolar() * 4.0).collect();
        xs[5] = f32::NAN;
        xs[9] = f32::INFINITY;
        let grid = DensityBinner::default().bin(&xs, &ys).expect("non-empty");
        let sum: u64 = grid.counts.iter().map(|&c| u64::from(c)).sum();
        assert_eq!(sum, 648);
        assert_eq!(grid.total, 648);
        assert!(grid.min_density >= 1 && grid.min_density <= grid.max_density);
    }

    #[test]
    fn flat_channel_maps_to_center_cell() {
        let xs = vec![2.0; 40];
        let ys = vec![-1.0; 40];
        let grid = DensityBinner::new(GridResolution::Fixed(9))
            .bin(&xs, &ys)
            .expect("non-empty");
        assert_eq!(grid.count(4, 4), 40);
        assert_eq!(grid.max_density, 40);
        assert_eq!(grid.level(40), 1.0);
    }

    #[test]
    fn extremes_land_in_edge_cells() {
        let grid = DensityBinner::new(GridResolution::Fixed(10))
            .bin(&[0.0, 1.0], &[0.0, 1.0])
            .expect("non-empty");
        assert_eq!(grid.count(0, 0), 1);
        assert_eq!(grid.count(9, 9), 1);
    }

    #[test]
    fn auto_resolution_grows_with_points_and_is_capped() {
        let r = GridResolution::Auto;
        assert_eq!(r.grid_size(10), MIN_GRID_SIZE);
        assert!(r.grid_size(10_000) > r.grid_size(1_000));
        assert_eq!(r.grid_size(10_000_000), MAX_GRID_SIZE);
        assert_eq!(GridResolution::Fixed(1_000).grid_size(5), MAX_GRID_SIZE);
        assert_eq!(GridResolution::Fixed(50).grid_size(5), 50);
    }

    #[test]
    fn no_valid_pairs_means_no_grid() {
        assert!(DensityBinner::default().bin(&[], &[1.0]).is_none());
        assert!(DensityBinner::default().bin(&[f32::NAN], &[1.0]).is_none());
    }

    #[test]
    fn progressive_matches_full_recomputation() {
        let x = ChannelBuffer::new("x", 100.0, sine(3.0, 1.0, 100.0, 500));
        let y = ChannelBuffer::new("y", 100.0, sine(7.0, 0.5, 100.0, 480));
        let binner = DensityBinner::new(GridResolution::Auto);
        let mut progressive =
            ProgressiveDensity::new(&x, &y, GridResolution::Auto).expect("non-empty");
        assert!(progressive.matches(&x, &y, GridResolution::Auto));

        for progress in [0.1, 0.35, 0.9, 0.2, 1.0, 0.0, 0.55] {
            let expected = binner
                .bin_prefix(x.samples(), y.samples(), progress)
                .expect("non-empty");
            assert_eq!(progressive.advance(progress), &expected, "progress={progress}");
        }
        assert_eq!(progressive.total_points(), 480);
    }
}
