use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use sketchify::{
    App, EngineClient, EngineLoader, FfmpegLoader, FilterPreset, LogSink, ProcessingState,
    SketchConfig, TimestampMode, ViewOpts, session::log::format_line, session::view,
};

#[derive(Parser, Debug)]
#[command(name = "sketchify", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an image into a grayscale sketch (requires `ffmpeg`).
    Process(ProcessArgs),
    /// Load the engine and report its version without converting anything.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input image (any format the decoder understands).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also write the normalized PNG copy of the input here.
    #[arg(long)]
    original_out: Option<PathBuf>,

    /// JSON config file; command-line flags take precedence over it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Filter preset.
    #[arg(long, value_enum)]
    preset: Option<PresetChoice>,

    /// Abandon the run after this many milliseconds.
    #[arg(long, conflicts_with = "no_timeout")]
    timeout_ms: Option<u64>,

    /// Wait for the engine indefinitely, even for presets that carry a timeout.
    #[arg(long, default_value_t = false)]
    no_timeout: bool,

    /// Engine executable.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Keep at most this many log lines.
    #[arg(long)]
    log_capacity: Option<usize>,

    /// Timestamp shown next to each log line.
    #[arg(long, value_enum)]
    timestamps: Option<TimestampChoice>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Engine executable.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetChoice {
    Sketch,
    Gray,
}

impl From<PresetChoice> for FilterPreset {
    fn from(choice: PresetChoice) -> Self {
        match choice {
            PresetChoice::Sketch => FilterPreset::Sketch,
            PresetChoice::Gray => FilterPreset::Gray,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TimestampChoice {
    Rendered,
    Recorded,
}

impl From<TimestampChoice> for TimestampMode {
    fn from(choice: TimestampChoice) -> Self {
        match choice {
            TimestampChoice::Rendered => TimestampMode::Rendered,
            TimestampChoice::Recorded => TimestampMode::Recorded,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn resolve_config(args: &ProcessArgs) -> anyhow::Result<SketchConfig> {
    let mut cfg = match &args.config {
        Some(path) => SketchConfig::from_path(path)?,
        None => SketchConfig::default(),
    };
    if let Some(ffmpeg) = &args.ffmpeg {
        cfg.ffmpeg = ffmpeg.clone();
    }
    if let Some(preset) = args.preset {
        cfg.preset = preset.into();
    }
    if let Some(ms) = args.timeout_ms {
        cfg.timeout_ms = Some(ms);
        cfg.disable_timeout = false;
    }
    if args.no_timeout {
        cfg.disable_timeout = true;
    }
    if let Some(cap) = args.log_capacity {
        cfg.log_capacity = Some(cap);
    }
    if let Some(ts) = args.timestamps {
        cfg.timestamps = ts.into();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(&args)?;
    let file_bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input image '{}'", args.in_path.display()))?;

    let loader = FfmpegLoader::new(&cfg.ffmpeg);
    let client = EngineClient::new(loader, cfg.run_opts());
    let mut app = App::new(client, LogSink::with_capacity(cfg.log_capacity));
    let view_opts = ViewOpts {
        timestamps: cfg.timestamps,
    };

    app.start()?;
    if app.state() == ProcessingState::LoadingEngine {
        eprint!("{}", view::render(&app, &view_opts));
        anyhow::bail!(
            "engine failed to load: {}",
            app.last_error().unwrap_or("unknown error")
        );
    }

    app.begin_upload(&file_bytes)
        .with_context(|| format!("decode input image '{}'", args.in_path.display()))?;
    app.wait_with(|entry| eprintln!("{}", format_line(entry.recorded_at, &entry.message)));
    eprint!("{}", view::render(&app, &view_opts));

    let Some(output) = app.output() else {
        anyhow::bail!(
            "conversion failed: {}",
            app.last_error().unwrap_or("no output produced")
        );
    };
    write_file(&args.out, &output.bytes)?;
    if let (Some(path), Some(input)) = (&args.original_out, app.input()) {
        write_file(path, &input.bytes)?;
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let loader = FfmpegLoader::new(&args.ffmpeg);
    let engine = loader.load()?;
    println!("{}", engine.version());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))
}
