use chrono::NaiveDate;

use crate::error::{DemTilesError, Result};

/// Geographic extent of the whole tiled area, in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        let finite = [lon_min, lon_max, lat_min, lat_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || lon_min >= lon_max || lat_min >= lat_max {
            return Err(DemTilesError::InvalidConfig(format!(
                "bounding box must satisfy lon_min < lon_max and lat_min < lat_max \
                 (got lon {}..{}, lat {}..{})",
                lon_min, lon_max, lat_min, lat_max
            )));
        }
        Ok(Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        })
    }

    /// Santa Cruz island, Galápagos.
    pub fn santa_cruz() -> Self {
        Self {
            lon_min: -90.386,
            lon_max: -90.199,
            lat_min: -0.744,
            lat_max: -0.508,
        }
    }

    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
}

impl GridCell {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

/// Extent of a single tile. `lat_max` is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl TileBounds {
    /// GDAL affine transform for a north-up raster of `size` x `size` pixels.
    pub fn geo_transform(&self, size: usize) -> [f64; 6] {
        self.geo_transform_for(size, size)
    }

    /// Same as [`TileBounds::geo_transform`] for a `width` x `height` raster.
    pub fn geo_transform_for(&self, width: usize, height: usize) -> [f64; 6] {
        [
            self.lon_min,
            (self.lon_max - self.lon_min) / width as f64,
            0.0,
            self.lat_max,
            0.0,
            -(self.lat_max - self.lat_min) / height as f64,
        ]
    }
}

impl From<BoundingBox> for TileBounds {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            lon_min: bbox.lon_min,
            lon_max: bbox.lon_max,
            lat_min: bbox.lat_min,
            lat_max: bbox.lat_max,
        }
    }
}

/// Inclusive range of calendar days driving the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DemTilesError::InvalidConfig(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of days in the range, both ends included. A reversed range is empty.
    pub fn day_count(&self) -> usize {
        if self.end < self.start {
            return 0;
        }
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Every day of the range paired with its offset from `start`.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, i64)> + '_ {
        self.start
            .iter_days()
            .take_while(move |day| *day <= self.end)
            .map(move |day| (day, (day - self.start).num_days()))
    }
}

pub fn format_date(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Square elevation raster stored row-major: `values[j * size + i]`
/// where `i` is the pixel column and `j` the pixel row.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationField {
    pub size: usize,
    pub values: Vec<f64>,
}

impl ElevationField {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.size + i]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[j * self.size + i] = value;
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.size, self.size)
    }

    pub fn min_max(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in &self.values {
            min = min.min(value);
            max = max.max(value);
        }
        (min, max)
    }
}
