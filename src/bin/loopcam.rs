use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use loopcam::{OutputFormat, StaticCamera, StreamConfig};

#[derive(Parser, Debug)]
#[command(name = "loopcam", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the source and print the camera properties as JSON.
    Info(SourceArgs),
    /// Pull frames and write the payloads to disk.
    Pull(PullArgs),
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Stream config JSON. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clip or still image to loop. Replaces only the path from `--config`.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Frame width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Frame rate (integer fps).
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Parser, Debug)]
struct PullArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Format hint sent with every pull (`video/h264` or `image/jpeg`).
    #[arg(long, default_value = loopcam::MIME_TYPE_JPEG)]
    hint: String,

    /// Number of pulls.
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Pull(args) => cmd_pull(args),
    }
}

fn load_config(args: &SourceArgs) -> anyhow::Result<StreamConfig> {
    let mut cfg = match &args.config {
        Some(path) => StreamConfig::from_path(path)?,
        None => StreamConfig::default(),
    };
    if let Some(source) = &args.source {
        cfg.source.path = source.clone();
    }
    if let Some(width) = args.width {
        cfg.width = width;
    }
    if let Some(height) = args.height {
        cfg.height = height;
    }
    if let Some(fps) = args.fps {
        cfg.fps = loopcam::Fps::new(fps, 1)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_info(args: SourceArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let cam = StaticCamera::from_config(&cfg)?;
    let props = serde_json::to_string_pretty(&cam.properties())?;
    println!("{props}");
    cam.close();
    Ok(())
}

fn cmd_pull(args: PullArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.source)?;
    let cam = StaticCamera::from_config(&cfg)?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    // Access units are concatenated so the result is one playable Annex-B stream.
    let mut video_out: Option<std::fs::File> = None;
    for n in 0..args.count {
        let payload = cam.next_frame(&args.hint)?;
        match payload.format {
            OutputFormat::StillImage => {
                let path = args.out.join(format!("frame_{n:05}.jpg"));
                std::fs::write(&path, &payload.data)
                    .with_context(|| format!("write '{}'", path.display()))?;
            }
            OutputFormat::VideoCodec => {
                if video_out.is_none() {
                    let path = args.out.join("stream.h264");
                    let f = std::fs::File::create(&path)
                        .with_context(|| format!("create '{}'", path.display()))?;
                    video_out = Some(f);
                }
                if let Some(file) = video_out.as_mut() {
                    file.write_all(&payload.data)
                        .context("append access unit to stream.h264")?;
                }
            }
        }
    }

    let stats = cam.stream().stats();
    eprintln!(
        "pulled {} frame(s) into {} ({} video, {} still)",
        stats.pulls,
        args.out.display(),
        stats.video_payloads,
        stats.still_payloads
    );
    cam.close();
    Ok(())
}
