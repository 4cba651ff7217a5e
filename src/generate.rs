//! Concurrent generation of the daily tile series.
//!
//! Every day of the range is split into column chunks, one job per
//! (day, chunk). Jobs run on a dedicated pool of `workers` threads and share
//! nothing but the success counter and the cancellation token. A failing tile
//! is logged and recorded; it never aborts its siblings.

use std::ops::Range;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::GenerationConfig;
use crate::counter::SuccessCounter;
use crate::error::Result;
use crate::grid::{partition_columns, GridGeometry};
use crate::model::{format_date, GridCell};
use crate::report::{BatchReport, JobOutcome, TileFailure};
use crate::sampler::{NoiseSource, PerlinFbm, TileFieldSampler};
use crate::writer::{GeoTiffWriter, TileSink};

#[derive(Debug, Clone)]
struct GenerationJob {
    date: String,
    day_offset: i64,
    columns: Range<u32>,
}

pub struct GenerationOrchestrator<S, W> {
    config: GenerationConfig,
    grid: GridGeometry,
    sampler: TileFieldSampler<S>,
    sink: W,
    cancel: CancelToken,
}

impl GenerationOrchestrator<PerlinFbm, GeoTiffWriter> {
    /// Perlin terrain written as GeoTIFFs under `config.base_dir`.
    pub fn geotiff(config: GenerationConfig, cancel: CancelToken) -> Result<Self> {
        let grid = config.validate()?;
        let sink = GeoTiffWriter::new(config.base_dir.clone(), grid);
        Self::new(config, PerlinFbm::default(), sink, cancel)
    }
}

impl<S: NoiseSource, W: TileSink> GenerationOrchestrator<S, W> {
    pub fn new(config: GenerationConfig, source: S, sink: W, cancel: CancelToken) -> Result<Self> {
        let grid = config.validate()?;
        let sampler = TileFieldSampler::new(source, grid.divisions, config.tile_size);
        Ok(Self {
            config,
            grid,
            sampler,
            sink,
            cancel,
        })
    }

    fn plan(&self) -> Result<Vec<GenerationJob>> {
        let chunks = partition_columns(self.grid.divisions, self.config.workers)?;
        let mut jobs = Vec::with_capacity(self.config.dates.day_count() * chunks.len());

        for (day, day_offset) in self.config.dates.days() {
            let date = format_date(day);
            for columns in chunks.iter().filter(|c| !c.is_empty()) {
                jobs.push(GenerationJob {
                    date: date.clone(),
                    day_offset,
                    columns: columns.clone(),
                });
            }
        }
        Ok(jobs)
    }

    /// Runs every job to completion (or until cancelled) and reports.
    pub fn run(&self) -> Result<BatchReport> {
        let jobs = self.plan()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("dem-generate-{}", i))
            .build()?;

        info!(
            "Dispatching {} generation jobs ({} days, {}x{} grid) on {} workers",
            jobs.len(),
            self.config.dates.day_count(),
            self.grid.divisions,
            self.grid.divisions,
            self.config.workers
        );

        let counter = SuccessCounter::new();
        let outcomes: Vec<JobOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| self.run_job(job, &counter))
                .collect()
        });

        let mut report = BatchReport {
            planned: self.config.planned_tiles(),
            ..Default::default()
        };
        for outcome in outcomes {
            report.merge(outcome);
        }
        report.succeeded = counter.get();
        report.cancelled = self.cancel.is_cancelled();

        if report.cancelled {
            warn!("Generation cancelled: {}", report);
        } else {
            info!("Generation finished: {}", report);
        }
        Ok(report)
    }

    fn run_job(&self, job: &GenerationJob, counter: &SuccessCounter) -> JobOutcome {
        let mut outcome = JobOutcome::default();

        for column in job.columns.clone() {
            for row in 0..self.grid.divisions {
                if self.cancel.is_cancelled() {
                    debug!("Job for {} columns {:?} stopped by cancellation", job.date, job.columns);
                    return outcome;
                }

                let cell = GridCell::new(column, row);
                outcome.attempted += 1;

                let field = self.sampler.sample(cell, job.day_offset);
                match self.sink.write(&field, cell, &job.date) {
                    Ok(path) => {
                        counter.increment();
                        debug!("Generated {:?}", path);
                    }
                    Err(e) => {
                        error!(
                            "Failed to generate tile ({}, {}) for {}: {:#}",
                            column, row, job.date, e
                        );
                        outcome.failures.push(TileFailure {
                            date: job.date.clone(),
                            name: format!("dem_tile_{}_{}_{}", column, row, job.date),
                            error: format!("{:#}", e),
                        });
                    }
                }
            }
        }

        outcome
    }
}
