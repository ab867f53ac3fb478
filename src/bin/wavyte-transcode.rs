use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavyte_transcode::media::ffmpeg::{ensure_parent_dir, is_ffmpeg_on_path, is_ffprobe_on_path};
use wavyte_transcode::{
    ExportConfig, ExportRequest, ExportStatus, FfmpegAsset, FfmpegWriterFactory, FileType,
    TimeRangeConfig, TranscodeSession,
};

#[derive(Parser, Debug)]
#[command(name = "wavyte-transcode", version)]
struct Cli {
    /// Source video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Export configuration JSON; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width (requires --height).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height (requires --width).
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Start of the exported range, in seconds.
    #[arg(long)]
    start: Option<f64>,

    /// Length of the exported range, in seconds. Defaults to the rest of the source.
    #[arg(long)]
    duration: Option<f64>,

    /// Output container: mp4, mov or m4v.
    #[arg(long, default_value = "mp4")]
    file_type: FileType,

    /// Move the index to the front of the file for progressive download.
    #[arg(long, default_value_t = false)]
    network: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !is_ffmpeg_on_path() || !is_ffprobe_on_path() {
        anyhow::bail!("ffmpeg and ffprobe must be installed and on PATH");
    }

    let config = export_config(&cli)?;
    ensure_parent_dir(&cli.out)?;
    let asset = FfmpegAsset::open(&cli.in_path)
        .with_context(|| format!("open source '{}'", cli.in_path.display()))?;

    let request = ExportRequest::new(Arc::new(asset), cli.out.clone())
        .with_file_type(cli.file_type)
        .with_config(config);
    let session = TranscodeSession::new(request, Arc::new(FfmpegWriterFactory::new()));

    let handle = session.spawn(|status| tracing::debug!(%status, "export callback"));
    let mut last_percent = 0;
    while !handle.is_finished() {
        let percent = (handle.progress() * 100.0) as u32;
        if percent >= last_percent + 5 {
            eprintln!("{percent:3}%");
            last_percent = percent;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    let reason = handle.failure_reason();
    match handle.join() {
        ExportStatus::Completed => {
            eprintln!("wrote {}", cli.out.display());
            Ok(())
        }
        ExportStatus::Cancelled => anyhow::bail!("export cancelled"),
        ExportStatus::Failed => anyhow::bail!(
            "export failed: {}",
            reason.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn export_config(cli: &Cli) -> anyhow::Result<ExportConfig> {
    let mut config = match &cli.config {
        Some(path) => ExportConfig::from_path(path)?,
        None => ExportConfig::default(),
    };
    if cli.width.is_some() {
        config.width = cli.width;
        config.height = cli.height;
    }
    if cli.fps.is_some() {
        config.frame_rate = cli.fps;
    }
    if cli.start.is_some() || cli.duration.is_some() {
        config.time_range = Some(TimeRangeConfig {
            start_secs: cli.start.unwrap_or(0.0),
            duration_secs: cli.duration,
        });
    }
    config.optimize_for_network |= cli.network;
    config.validate()?;
    Ok(config)
}
