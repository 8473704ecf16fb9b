use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use scenebuild::{
    BuildConfig, BuildReport, BuildRequest, Orchestrator, OutputFormat, QualityCatalog,
    ToolCommand, ToolProbe, TranscodeOpts,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scenebuild", version, about = "Render a scene into a versioned workspace")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    tools: ToolArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene file (requires the engine on PATH).
    Build(BuildArgs),
    /// List the quality tiers.
    Qualities,
    /// Report whether the engine and ffmpeg are usable.
    Doctor,
}

#[derive(Parser, Debug)]
struct ToolArgs {
    /// Rendering engine executable.
    #[arg(long, global = true, env = "SCENEBUILD_ENGINE", default_value = "manim")]
    engine: PathBuf,

    /// Transcoder executable used for gif/png exports.
    #[arg(long, global = true, env = "SCENEBUILD_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Scene source file.
    file: PathBuf,

    /// Scene class name.
    #[arg(long, default_value = "Scene")]
    scene: String,

    /// Quality tier (low, medium, high, ultra/4k).
    #[arg(long, default_value = "high")]
    quality: String,

    /// Free-text description stored in the manifest.
    #[arg(long, default_value = "")]
    description: String,

    /// Output format. gif/png are derived from the rendered mp4.
    #[arg(long, value_enum, default_value_t = FormatChoice::Mp4)]
    format: FormatChoice,

    /// Use this directory as-is instead of creating a timestamped workspace.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Parent directory for timestamped workspaces.
    #[arg(long, env = "SCENEBUILD_BASE_DIR", default_value = scenebuild::config::DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Render timeout in seconds.
    #[arg(long, default_value_t = 300)]
    render_timeout: u64,

    /// gif frame rate.
    #[arg(long, default_value_t = 30)]
    gif_fps: u32,

    /// gif scale factor applied to width and height.
    #[arg(long, default_value_t = 1.0)]
    gif_scale: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Mp4,
    Gif,
    Png,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = BuildConfig::default()
        .with_engine(ToolCommand::new(&cli.tools.engine))
        .with_transcoder(ToolCommand::new(&cli.tools.ffmpeg));

    match cli.cmd {
        Command::Build(args) => cmd_build(config, args),
        Command::Qualities => cmd_qualities(&config.catalog),
        Command::Doctor => cmd_doctor(&config),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(config: BuildConfig, args: BuildArgs) -> ExitCode {
    let config = config
        .with_base_dir(&args.base_dir)
        .with_render_timeout(Duration::from_secs(args.render_timeout));

    let format = match args.format {
        FormatChoice::Mp4 => OutputFormat::Video,
        FormatChoice::Gif => OutputFormat::AnimatedImage(TranscodeOpts {
            fps: args.gif_fps,
            scale: args.gif_scale,
        }),
        FormatChoice::Png => OutputFormat::StillImage,
    };

    let mut request = BuildRequest::new(&args.file)
        .scene(&args.scene)
        .quality(&args.quality)
        .description(&args.description)
        .format(format);
    if let Some(dir) = &args.output {
        request = request.output_dir(dir);
    }

    if let Ok(profile) = config.catalog.resolve(&request.quality) {
        eprintln!(
            "building {} from {} at {} ({})",
            request.scene,
            request.scene_file.display(),
            profile.tier,
            profile.resolution
        );
    }

    let report = Orchestrator::new(&config).run(&request);
    print_report(&report);
    if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &BuildReport) {
    if let Some(err) = &report.failure {
        eprintln!("error: {err}");
        if let Some(hint) = err.remediation() {
            eprintln!("  hint: {hint}");
        }
        if let Some(ws) = &report.workspace {
            eprintln!("workspace kept for inspection: {}", ws.root().display());
        }
        return;
    }

    eprintln!("build succeeded");
    if let Some(ws) = &report.workspace {
        eprintln!("workspace: {}", ws.root().display());
    }
    if let Some(video) = &report.artifact {
        eprintln!("video:     {}", video.display());
    }
    if let Some(derived) = &report.derived {
        eprintln!("export:    {}", derived.display());
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
}

fn cmd_qualities(catalog: &QualityCatalog) -> ExitCode {
    println!("{:<8} {:<6} {:<7} {:<10} {:>4}", "tier", "flag", "label", "resolution", "fps");
    for p in catalog.iter() {
        println!(
            "{:<8} {:<6} {:<7} {:<10} {:>4}",
            p.tier, p.engine_flag, p.label, p.resolution, p.frame_rate
        );
    }
    ExitCode::SUCCESS
}

fn cmd_doctor(config: &BuildConfig) -> ExitCode {
    let engine = ToolProbe::engine(&config.engine, config.probe_timeout);
    let transcoder = ToolProbe::transcoder(&config.transcoder, config.probe_timeout);

    let engine_ok = match engine.version() {
        Ok(v) => {
            println!("engine:     {} ({v})", engine.program());
            true
        }
        Err(err) => {
            println!("engine:     unavailable: {err}");
            false
        }
    };
    match transcoder.version() {
        Ok(v) => {
            let first_line = v.0.lines().next().unwrap_or_default();
            println!("transcoder: {} ({first_line})", transcoder.program());
        }
        Err(err) => println!("transcoder: unavailable (gif/png exports disabled): {err}"),
    }

    if engine_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
