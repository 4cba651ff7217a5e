//! Upload of persisted tiles to the raster API.
//!
//! Date directories are dealt round-robin to the workers (directory `k` goes
//! to worker `k % workers`), each worker uploads its directories' tiles one
//! file at a time. A rejected or failed upload is logged with its date and
//! name and the worker moves on; nothing is retried.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use reqwest::blocking::{multipart, Client};
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::UploadConfig;
use crate::counter::SuccessCounter;
use crate::error::{DemTilesError, Result};
use crate::grid::round_robin;
use crate::report::{BatchReport, JobOutcome, TileFailure};
use crate::scanner::{discover_date_directories, list_tile_files};
use crate::writer::TILE_EXTENSION;

/// One tile file to upload. Everything but the path is recovered from the
/// file name `dem_tile_{column}_{row}_{date}.tif`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub path: PathBuf,
    pub date: String,
    pub logical_name: String,
}

impl UploadJob {
    pub fn from_path(path: &Path) -> Result<Self> {
        let logical_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemTilesError::InvalidTileName(path.display().to_string()))?;

        let date = match logical_name.rsplit_once('_') {
            Some((_, date)) if !date.is_empty() => date,
            _ => return Err(DemTilesError::InvalidTileName(logical_name.to_string())),
        };

        Ok(Self {
            path: path.to_path_buf(),
            date: date.to_string(),
            logical_name: logical_name.to_string(),
        })
    }
}

pub trait TileUploader: Send + Sync {
    fn upload(&self, job: &UploadJob) -> Result<()>;
}

/// Multipart `POST` of one tile per request; only `200 OK` is a success.
pub struct HttpUploader {
    client: Client,
    endpoint: String,
    user_id: u64,
    workspace_id: u64,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            user_id: config.user_id,
            workspace_id: config.workspace_id,
        })
    }
}

impl TileUploader for HttpUploader {
    fn upload(&self, job: &UploadJob) -> Result<()> {
        let bytes = fs::read(&job.path).map_err(|e| DemTilesError::io(&job.path, e))?;

        let file = multipart::Part::bytes(bytes)
            .file_name(format!("{}.{}", job.logical_name, TILE_EXTENSION))
            .mime_str("image/tiff")?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("user_id", self.user_id.to_string())
            .text("workspace_id", self.workspace_id.to_string())
            .text("file_name", job.logical_name.clone());

        let response = self.client.post(&self.endpoint).multipart(form).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(DemTilesError::UploadStatus {
                status: status.as_u16(),
                file_name: job.logical_name.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct DateDirectory {
    date: String,
    files: Vec<PathBuf>,
}

pub struct UploadOrchestrator<U> {
    config: UploadConfig,
    uploader: U,
    cancel: CancelToken,
}

impl UploadOrchestrator<HttpUploader> {
    pub fn http(config: UploadConfig, cancel: CancelToken) -> Result<Self> {
        let uploader = HttpUploader::new(&config)?;
        Self::new(config, uploader, cancel)
    }
}

impl<U: TileUploader> UploadOrchestrator<U> {
    pub fn new(config: UploadConfig, uploader: U, cancel: CancelToken) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            uploader,
            cancel,
        })
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    fn scan(&self) -> Result<Vec<DateDirectory>> {
        let base_dir = &self.config.base_dir;
        discover_date_directories(base_dir)?
            .into_iter()
            .map(|date| {
                let files = list_tile_files(&base_dir.join(&date))?;
                Ok(DateDirectory { date, files })
            })
            .collect()
    }

    pub fn run(&self) -> Result<BatchReport> {
        let directories = self.scan()?;
        let planned = directories.iter().map(|d| d.files.len()).sum();
        let chunks = round_robin(directories, self.config.workers);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("dem-upload-{}", i))
            .build()?;

        info!(
            "Uploading {} tiles to {} on {} workers",
            planned, self.config.endpoint, self.config.workers
        );

        let counter = SuccessCounter::new();
        let outcomes: Vec<JobOutcome> = pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| self.run_chunk(chunk, &counter))
                .collect()
        });

        let mut report = BatchReport {
            planned,
            ..Default::default()
        };
        for outcome in outcomes {
            report.merge(outcome);
        }
        report.succeeded = counter.get();
        report.cancelled = self.cancel.is_cancelled();

        if report.cancelled {
            warn!("Upload cancelled: {}", report);
        } else {
            info!("Upload finished: {}", report);
        }
        Ok(report)
    }

    fn run_chunk(&self, chunk: &[DateDirectory], counter: &SuccessCounter) -> JobOutcome {
        let mut outcome = JobOutcome::default();

        for directory in chunk {
            for path in &directory.files {
                if self.cancel.is_cancelled() {
                    return outcome;
                }

                let job = match UploadJob::from_path(path) {
                    Ok(job) => job,
                    Err(e) => {
                        error!("Skipping {:?} in {}: {}", path, directory.date, e);
                        outcome.failures.push(TileFailure {
                            date: directory.date.clone(),
                            name: path.display().to_string(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                outcome.attempted += 1;
                match self.uploader.upload(&job) {
                    Ok(()) => {
                        counter.increment();
                        debug!("Uploaded {}", job.logical_name);
                    }
                    Err(e) => {
                        error!("Error uploading {} on {}: {}", job.logical_name, job.date, e);
                        outcome.failures.push(TileFailure {
                            date: job.date,
                            name: job.logical_name,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        outcome
    }
}
