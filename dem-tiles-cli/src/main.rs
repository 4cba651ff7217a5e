use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dem_tiles::config::{
    parse_date, DEFAULT_BASE_DIR, DEFAULT_DIVISIONS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TILE_SIZE,
    DEFAULT_UPLOAD_URL, DEFAULT_USER_ID, DEFAULT_WORKERS, DEFAULT_WORKSPACE_ID,
};
use dem_tiles::{
    BatchReport, BoundingBox, CancelToken, DateRange, GenerationConfig, GenerationOrchestrator,
    UploadConfig, UploadOrchestrator,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// 割り込み時の終了コード (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 日付範囲の各日について DEM タイル一式を生成する
    Generate(GenerateArgs),
    /// 生成済みタイルをラスター API にアップロードする
    Upload(UploadArgs),
    /// 既存のラスター画像を範囲全体に地理参照した GeoTIFF に変換する
    Georeference(GeoreferenceArgs),
}

#[derive(clap::Args, Debug)]
struct BboxArgs {
    /// 範囲の西端経度
    #[arg(long, default_value_t = BoundingBox::santa_cruz().lon_min, allow_negative_numbers = true)]
    lon_min: f64,

    /// 範囲の東端経度
    #[arg(long, default_value_t = BoundingBox::santa_cruz().lon_max, allow_negative_numbers = true)]
    lon_max: f64,

    /// 範囲の南端緯度
    #[arg(long, default_value_t = BoundingBox::santa_cruz().lat_min, allow_negative_numbers = true)]
    lat_min: f64,

    /// 範囲の北端緯度
    #[arg(long, default_value_t = BoundingBox::santa_cruz().lat_max, allow_negative_numbers = true)]
    lat_max: f64,
}

impl BboxArgs {
    fn to_bbox(&self) -> dem_tiles::Result<BoundingBox> {
        BoundingBox::new(self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// 出力ディレクトリ
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_BASE_DIR)]
    output: PathBuf,

    /// 開始日 (YYYY-MM-DD)
    #[arg(long, default_value = "2024-08-01", value_parser = parse_day)]
    start: NaiveDate,

    /// 終了日、この日を含む (YYYY-MM-DD)
    #[arg(long, default_value = "2024-08-30", value_parser = parse_day)]
    end: NaiveDate,

    /// 各軸の分割数
    #[arg(long, default_value_t = DEFAULT_DIVISIONS)]
    divisions: u32,

    /// タイルの一辺のピクセル数
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: usize,

    /// 並列処理スレッド数
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    #[command(flatten)]
    bbox: BboxArgs,
}

#[derive(clap::Args, Debug)]
struct UploadArgs {
    /// 入力ディレクトリ（日付ごとのサブディレクトリを含む）
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_BASE_DIR)]
    input: PathBuf,

    /// アップロード先 URL
    #[arg(long, default_value = DEFAULT_UPLOAD_URL)]
    endpoint: String,

    /// フォームに付与するユーザー ID
    #[arg(long, default_value_t = DEFAULT_USER_ID)]
    user_id: u64,

    /// フォームに付与するワークスペース ID
    #[arg(long, default_value_t = DEFAULT_WORKSPACE_ID)]
    workspace_id: u64,

    /// 並列処理スレッド数
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// リクエストごとのタイムアウト秒数
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[derive(clap::Args, Debug)]
struct GeoreferenceArgs {
    /// 入力ラスター（PNG など GDAL で読める形式）
    #[arg(short, long, value_name = "FILE", default_value = "in.png")]
    input: PathBuf,

    /// 出力 GeoTIFF
    #[arg(short, long, value_name = "FILE", default_value = "out.tif")]
    output: PathBuf,

    #[command(flatten)]
    bbox: BboxArgs,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    // CLI引数の解析
    let cli = Cli::parse();

    // 処理開始時間を記録
    let start_time = Instant::now();

    // Ctrl-C で新しいジョブの開始を止める
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Interrupt received. Cancelling remaining jobs...");
        handler_token.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let (verb, report) = match cli.command {
        Command::Generate(args) => ("generated", generate(args, cancel)?),
        Command::Upload(args) => ("uploaded", upload(args, cancel)?),
        Command::Georeference(args) => {
            let output = args.output.clone();
            georeference(args)?;
            info!("Total processing time: {:?}", start_time.elapsed());
            println!("Georeferenced raster written to {:?}", output);
            return Ok(());
        }
    };

    if !report.failures.is_empty() {
        error!("Failed to process {} tiles:", report.failed());
        for failure in &report.failures {
            error!("  {} ({}): {}", failure.name, failure.date, failure.error);
        }
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    println!(
        "Total .tif files {}: {} of {} attempted ({} planned)",
        verb, report.succeeded, report.attempted, report.planned
    );

    if report.cancelled {
        println!("Interrupted: pending jobs were cancelled.");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }

    Ok(())
}

fn generate(args: GenerateArgs, cancel: CancelToken) -> Result<BatchReport> {
    let config = GenerationConfig {
        bbox: args.bbox.to_bbox()?,
        divisions: args.divisions,
        tile_size: args.tile_size,
        workers: args.workers,
        dates: DateRange::new(args.start, args.end)?,
        base_dir: args.output,
    };

    info!(
        "Generating tiles into {:?} for {} to {}",
        config.base_dir, config.dates.start, config.dates.end
    );

    let orchestrator = GenerationOrchestrator::geotiff(config, cancel)?;
    Ok(orchestrator.run()?)
}

fn upload(args: UploadArgs, cancel: CancelToken) -> Result<BatchReport> {
    let config = UploadConfig {
        base_dir: args.input,
        endpoint: args.endpoint,
        user_id: args.user_id,
        workspace_id: args.workspace_id,
        workers: args.workers,
        timeout: Duration::from_secs(args.timeout_secs),
    };

    info!("Uploading tiles from {:?}", config.base_dir);

    let orchestrator = UploadOrchestrator::http(config, cancel)?;
    Ok(orchestrator.run()?)
}

fn georeference(args: GeoreferenceArgs) -> Result<()> {
    let bbox = args.bbox.to_bbox()?;
    info!("Georeferencing {:?} onto {:?}", args.input, bbox);
    dem_tiles::georeference(&args.input, &args.output, bbox)
}
