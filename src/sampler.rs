//! Synthetic elevation fields.
//!
//! A tile's pixels are sampled from one continuous noise surface spanning the
//! whole grid, so neighbouring tiles line up; the day offset shifts the sample
//! window along `y` to make the series change over time.

use noise::{NoiseFn, Perlin};

use crate::model::{ElevationField, GridCell};

/// Continuous scalar field evaluated at grid-normalized coordinates.
pub trait NoiseSource: Send + Sync {
    fn sample(&self, x: f64, y: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    /// Lattice coordinates wrap at this period on both axes.
    pub period: f64,
    pub seed: u32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            period: 1024.0,
            seed: 42,
        }
    }
}

/// Fractal Perlin noise: `octaves` layers, each at `lacunarity` times the
/// frequency and `persistence` times the amplitude of the previous one.
pub struct PerlinFbm {
    perlin: Perlin,
    params: NoiseParams,
}

impl PerlinFbm {
    pub fn new(params: NoiseParams) -> Self {
        Self {
            perlin: Perlin::new(params.seed),
            params,
        }
    }
}

impl Default for PerlinFbm {
    fn default() -> Self {
        Self::new(NoiseParams::default())
    }
}

impl NoiseSource for PerlinFbm {
    fn sample(&self, x: f64, y: f64) -> f64 {
        let NoiseParams {
            octaves,
            persistence,
            lacunarity,
            period,
            ..
        } = self.params;

        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for _ in 0..octaves {
            let px = (x * frequency).rem_euclid(period);
            let py = (y * frequency).rem_euclid(period);
            total += amplitude * self.perlin.get([px, py]);
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }

        if max_value > 0.0 {
            total / max_value
        } else {
            0.0
        }
    }
}

pub struct TileFieldSampler<S> {
    source: S,
    divisions: u32,
    tile_size: usize,
}

impl<S: NoiseSource> TileFieldSampler<S> {
    pub fn new(source: S, divisions: u32, tile_size: usize) -> Self {
        Self {
            source,
            divisions,
            tile_size,
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Samples and normalizes the field for one grid cell on one day.
    pub fn sample(&self, cell: GridCell, day_offset: i64) -> ElevationField {
        let size = self.tile_size;
        let scale = (self.divisions as usize * size) as f64;
        let x_offset = cell.column as usize * size;
        let y_offset = cell.row as usize * size;
        let t = day_offset as f64;

        let mut field = ElevationField::zeros(size);
        for i in 0..size {
            for j in 0..size {
                let x = (x_offset + i) as f64 / scale;
                let y = (y_offset + j) as f64 / scale + t;
                field.set(i, j, self.source.sample(x, y));
            }
        }

        normalize(&mut field);
        field
    }
}

/// Rescales the field in place to span exactly `[0, 1]`.
///
/// A flat field (or one whose range is not finite) has no meaningful
/// rescaling and becomes all zeros.
pub fn normalize(field: &mut ElevationField) {
    let (min, max) = field.min_max();
    let range = max - min;

    if !(range.is_finite() && range > 0.0) {
        field.values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    for value in field.values.iter_mut() {
        *value = (*value - min) / range;
    }
}
