use anyhow::{Context, Result};
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use std::fs;
use std::path::{Path, PathBuf};

use crate::grid::GridGeometry;
use crate::model::{BoundingBox, ElevationField, GridCell, TileBounds};

pub const TILE_EXTENSION: &str = "tif";
pub const TILE_EPSG: u32 = 4326;

/// Destination for finished elevation fields.
pub trait TileSink: Send + Sync {
    fn write(&self, field: &ElevationField, cell: GridCell, date: &str) -> Result<PathBuf>;
}

/// `{base_dir}/{date}/dem_tile_{column}_{row}_{date}.tif`
pub fn tile_path(base_dir: &Path, date: &str, cell: GridCell) -> PathBuf {
    base_dir.join(date).join(format!(
        "dem_tile_{}_{}_{}.{}",
        cell.column, cell.row, date, TILE_EXTENSION
    ))
}

/// Maps a normalized value to a byte, rounding to the nearest level.
pub fn quantize(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn wgs84_wkt() -> Result<String> {
    let srs = SpatialRef::from_epsg(TILE_EPSG)
        .context(format!("Failed to create SpatialRef from EPSG:{}", TILE_EPSG))?;
    srs.to_wkt().context("Failed to convert SpatialRef to WKT")
}

/// Copies any GDAL-readable raster to a GeoTIFF stretched over `bbox`.
///
/// The source's own georeferencing, if any, is replaced; band data is copied
/// unchanged.
pub fn georeference(input: &Path, output: &Path, bbox: BoundingBox) -> Result<()> {
    let source =
        Dataset::open(input).with_context(|| format!("Failed to open raster {:?}", input))?;
    let (width, height) = source.raster_size();

    // GTiffドライバーでそのままコピー
    let driver =
        DriverManager::get_driver_by_name("GTiff").context("Failed to get GTiff driver")?;
    let mut dataset = source
        .create_copy(&driver, output, &RasterCreationOptions::new())
        .with_context(|| format!("Failed to copy {:?} to {:?}", input, output))?;

    dataset
        .set_geo_transform(&TileBounds::from(bbox).geo_transform_for(width, height))
        .context("Failed to set geo transform")?;
    dataset
        .set_projection(&wgs84_wkt()?)
        .context("Failed to set projection")?;

    tracing::debug!("Georeferenced {:?} -> {:?}", input, output);
    Ok(())
}

/// Writes single-band 8-bit GeoTIFF tiles in EPSG:4326.
pub struct GeoTiffWriter {
    base_dir: PathBuf,
    grid: GridGeometry,
}

impl GeoTiffWriter {
    pub fn new(base_dir: impl Into<PathBuf>, grid: GridGeometry) -> Self {
        Self {
            base_dir: base_dir.into(),
            grid,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn write_geotiff(
        &self,
        field: &ElevationField,
        cell: GridCell,
        date: &str,
        output_path: &Path,
    ) -> Result<()> {
        let (rows, cols) = field.shape();

        // GTiffドライバーを取得
        let driver =
            DriverManager::get_driver_by_name("GTiff").context("Failed to get GTiff driver")?;

        let mut dataset = driver
            .create_with_band_type::<u8, _>(output_path, cols, rows, 1)
            .with_context(|| format!("Failed to create dataset {:?}", output_path))?;

        dataset
            .set_geo_transform(&self.grid.geo_transform(cell, cols))
            .context("Failed to set geo transform")?;

        dataset
            .set_projection(&wgs84_wkt()?)
            .context("Failed to set projection")?;

        let bytes: Vec<u8> = field.values.iter().map(|&v| quantize(v)).collect();
        let mut band = dataset.rasterband(1).context("Failed to get raster band")?;
        let mut buffer = Buffer::new((cols, rows), bytes);
        band.write((0, 0), (cols, rows), &mut buffer)
            .context("Failed to write raster data")?;

        dataset
            .set_metadata_item("DATE", date, "")
            .context("Failed to set date metadata")?;

        Ok(())
    }
}

impl TileSink for GeoTiffWriter {
    fn write(&self, field: &ElevationField, cell: GridCell, date: &str) -> Result<PathBuf> {
        let output_path = tile_path(&self.base_dir, date, cell);
        let date_dir = self.base_dir.join(date);

        // 既存ディレクトリはエラーにならない
        fs::create_dir_all(&date_dir)
            .with_context(|| format!("Failed to create date directory {:?}", date_dir))?;

        self.write_geotiff(field, cell, date, &output_path)?;
        tracing::debug!("Written GeoTIFF: {:?}", output_path);

        Ok(output_path)
    }
}
