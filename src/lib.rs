pub mod cancel;
pub mod config;
pub mod counter;
pub mod error;
pub mod generate;
pub mod grid;
pub mod model;
pub mod report;
pub mod sampler;
pub mod scanner;
pub mod upload;
pub mod writer;

pub use cancel::CancelToken;
pub use config::{GenerationConfig, UploadConfig};
pub use error::{DemTilesError, Result};
pub use generate::GenerationOrchestrator;
pub use grid::GridGeometry;
pub use model::{BoundingBox, DateRange, ElevationField, GridCell, TileBounds};
pub use report::{BatchReport, TileFailure};
pub use sampler::{NoiseParams, NoiseSource, PerlinFbm, TileFieldSampler};
pub use upload::{HttpUploader, TileUploader, UploadJob, UploadOrchestrator};
pub use writer::{georeference, GeoTiffWriter, TileSink};
