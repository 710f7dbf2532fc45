use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};

use lofi_cam::{
    config::Config,
    sink::{FfplayPreview, HeadlessPreview, Preview, V4l2Camera, VirtualCamera},
    stream::{SessionReport, StreamScheduler, StreamSession},
    video::open_source,
};

#[derive(Parser)]
#[command(
    name = "lofi-cam",
    version,
    about = "Publish a degraded copy of a video to a virtual camera",
    long_about = "lofi-cam plays a video through a low-resolution, noisy, heavily compressed pipeline with dropped frames and jittered delay, and publishes the result to a v4l2loopback virtual camera so other software can be tested against a bad webcam on a bad network."
)]
struct Cli {
    /// Video to stream (prompted for when omitted)
    input: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Downscale ratio, 0 < f <= 1
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Noise blend weight, 0..=1
    #[arg(long)]
    noise_level: Option<f64>,

    /// JPEG quality, 0..=100
    #[arg(long)]
    compression_quality: Option<u8>,

    /// Per-frame drop probability, 0..=1
    #[arg(long)]
    drop_rate: Option<f64>,

    /// Upper bound of injected delay in seconds
    #[arg(long)]
    max_delay: Option<f64>,

    /// Virtual camera device
    #[arg(short, long)]
    device: Option<String>,

    /// Seed for reproducible noise, drops and jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Run without the preview window
    #[arg(long)]
    no_preview: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        let params = &mut config.degradation;
        if let Some(value) = self.scale_factor {
            params.scale_factor = value;
        }
        if let Some(value) = self.noise_level {
            params.noise_level = value;
        }
        if let Some(value) = self.compression_quality {
            params.compression_quality = value;
        }
        if let Some(value) = self.drop_rate {
            params.drop_rate = value;
        }
        if let Some(value) = self.max_delay {
            params.max_delay = value;
        }
        if let Some(device) = &self.device {
            config.camera.device = device.clone();
        }
        if self.seed.is_some() {
            config.session.seed = self.seed;
        }
        if self.no_preview {
            config.preview.enabled = false;
        }
    }
}

fn prompt_for_input() -> Result<PathBuf> {
    print!("Enter mp4 path: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let path = line.trim().trim_matches('"');
    if path.is_empty() {
        anyhow::bail!("No video path given");
    }
    Ok(PathBuf::from(path))
}

fn run_session(input: &Path, config: &Config) -> lofi_cam::Result<SessionReport> {
    let source = open_source(input)?;

    let session = StreamSession::start(
        source,
        |info| {
            let camera = V4l2Camera::open(
                &config.camera.device,
                info.dimensions,
                info.fps,
                config.camera.channel_order,
            )?;
            Ok(Box::new(camera) as Box<dyn VirtualCamera>)
        },
        |info| {
            if config.preview.enabled {
                let preview = FfplayPreview::open(config.preview.window(), info.dimensions, info.fps)?;
                Ok(Box::new(preview) as Box<dyn Preview>)
            } else {
                Ok(Box::new(HeadlessPreview::new()) as Box<dyn Preview>)
            }
        },
    )?;

    let mut scheduler = StreamScheduler::with_params(config.degradation, config.session.seed);
    scheduler.run(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting lofi-cam v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    let params = &config.degradation;
    info!(
        "Degradation: scale {} noise {} quality {} drop {} max delay {}s",
        params.scale_factor,
        params.noise_level,
        params.compression_quality,
        params.drop_rate,
        params.max_delay
    );

    let input = match cli.input {
        Some(path) => path,
        None => prompt_for_input()?,
    };
    info!("Input: {:?}", input);

    // The session loop blocks; keep it off the runtime's workers.
    let outcome = tokio::task::spawn_blocking(move || run_session(&input, &config)).await?;

    match outcome {
        Ok(report) => {
            info!(
                "Done ({}): {} frames emitted in {:.1}s",
                report.reason,
                report.stats.frames_emitted,
                report
                    .stats
                    .finished_at
                    .map(|end| (end - report.stats.started_at).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or_default()
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e.user_message());
            Err(e.into())
        }
    }
}
