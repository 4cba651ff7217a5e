//! Run parameters for the two pipelines, with the reference defaults.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{DemTilesError, Result};
use crate::grid::GridGeometry;
use crate::model::{BoundingBox, DateRange};

pub const DEFAULT_BASE_DIR: &str = "demtiles";
pub const DEFAULT_DIVISIONS: u32 = 10;
pub const DEFAULT_TILE_SIZE: usize = 256;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_UPLOAD_URL: &str = "http://localhost:3000/api/raster";
pub const DEFAULT_USER_ID: u64 = 11;
pub const DEFAULT_WORKSPACE_ID: u64 = 7;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub bbox: BoundingBox,
    pub divisions: u32,
    pub tile_size: usize,
    pub workers: usize,
    pub dates: DateRange,
    pub base_dir: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::santa_cruz(),
            divisions: DEFAULT_DIVISIONS,
            tile_size: DEFAULT_TILE_SIZE,
            workers: DEFAULT_WORKERS,
            dates: DateRange {
                start: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap_or_default(),
                end: NaiveDate::from_ymd_opt(2024, 8, 30).unwrap_or_default(),
            },
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
        }
    }
}

impl GenerationConfig {
    /// Checks every parameter before any worker is spawned.
    pub fn validate(&self) -> Result<GridGeometry> {
        let bbox = BoundingBox::new(
            self.bbox.lon_min,
            self.bbox.lon_max,
            self.bbox.lat_min,
            self.bbox.lat_max,
        )?;
        DateRange::new(self.dates.start, self.dates.end)?;
        if self.tile_size == 0 {
            return Err(DemTilesError::InvalidConfig(
                "tile size must be at least one pixel".to_string(),
            ));
        }
        check_workers(self.workers)?;
        GridGeometry::new(bbox, self.divisions)
    }

    /// Number of tiles a complete run produces.
    pub fn planned_tiles(&self) -> usize {
        self.dates.day_count() * (self.divisions as usize).pow(2)
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub base_dir: PathBuf,
    pub endpoint: String,
    pub user_id: u64,
    pub workspace_id: u64,
    pub workers: usize,
    pub timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            endpoint: DEFAULT_UPLOAD_URL.to_string(),
            user_id: DEFAULT_USER_ID,
            workspace_id: DEFAULT_WORKSPACE_ID,
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        check_workers(self.workers)?;
        if self.timeout.is_zero() {
            return Err(DemTilesError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(DemTilesError::InvalidConfig(
                "upload endpoint must not be empty".to_string(),
            ));
        }
        if !self.base_dir.is_dir() {
            return Err(DemTilesError::InvalidConfig(format!(
                "input directory {:?} does not exist or is not a directory",
                self.base_dir
            )));
        }
        Ok(())
    }
}

fn check_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(DemTilesError::InvalidConfig(
            "worker count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        DemTilesError::InvalidConfig(format!("invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reference_defaults() {
        let config = GenerationConfig::default();
        let grid = config.validate().unwrap();

        assert_eq!(grid.divisions, 10);
        assert_eq!(config.dates.day_count(), 30);
        assert_eq!(config.planned_tiles(), 3000);
        assert_eq!(config.base_dir, PathBuf::from("demtiles"));
    }

    #[test]
    fn test_generation_config_fails_fast() {
        let mut config = GenerationConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.tile_size = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.divisions = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.dates = DateRange {
            start: parse_date("2024-08-10").unwrap(),
            end: parse_date("2024-08-01").unwrap(),
        };
        assert!(matches!(
            config.validate(),
            Err(DemTilesError::InvalidConfig(_))
        ));

        let mut config = GenerationConfig::default();
        config.bbox.lat_min = config.bbox.lat_max;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_config_requires_input_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = UploadConfig {
            base_dir: temp_dir.path().to_path_buf(),
            ..UploadConfig::default()
        };
        assert!(config.validate().is_ok());

        config.base_dir = temp_dir.path().join("missing");
        assert!(config.validate().is_err());

        config.base_dir = temp_dir.path().to_path_buf();
        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = DEFAULT_WORKERS;
        config.timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(DemTilesError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-08-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
        );
        assert!(parse_date("2024/08/01").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }
}
