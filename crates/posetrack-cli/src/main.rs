//! posetrack CLI: replay image files through a tracker, or sample marker
//! hues into a calibration file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use posetrack::{
    Attached, CalibrationParameters, ChessboardTracker, ChessboardTrackerParams,
    ColorCrossTracker, ColorTracker, FrameSource, HueSampler, Marker, MotionTracker, PoseSolver,
};
use posetrack_core::HsvImage;
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "posetrack")]
#[command(about = "Track chessboards and colour-marker crosses in image sequences")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed images to a tracker as consecutive frames and print the pose.
    Track(TrackArgs),

    /// Sample the four marker hues from an image and write a calibration file.
    Calibrate(CalibrateArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TrackerKind {
    Chessboard,
    Color,
    Cross,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SolverArg {
    Direct,
    Posit,
}

impl From<SolverArg> for PoseSolver {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Direct => PoseSolver::DirectPerspective,
            SolverArg::Posit => PoseSolver::IterativeApproximate,
        }
    }
}

#[derive(Debug, Args)]
struct TrackArgs {
    #[arg(long, value_enum)]
    tracker: TrackerKind,

    /// Pose solver of the colour cross tracker.
    #[arg(long, value_enum, default_value_t = SolverArg::Direct)]
    solver: SolverArg,

    /// Calibration JSON (required by the chessboard and cross trackers).
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Target hue in degrees for the colour tracker.
    #[arg(long, default_value = "0")]
    hue: u16,

    /// Inner-corner rows of the chessboard.
    #[arg(long, default_value = "6")]
    rows: usize,

    /// Inner-corner columns of the chessboard.
    #[arg(long, default_value = "9")]
    cols: usize,

    /// Chessboard square size in scene units.
    #[arg(long, default_value = "25.0")]
    square_size: f64,

    /// Print one JSON object per frame instead of text.
    #[arg(long)]
    json: bool,

    /// Image files, delivered in order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct CalibrateArgs {
    /// Image showing all four markers.
    #[arg(long)]
    image: PathBuf,

    /// Pixel `X,Y` on a marker; give four, in the order green, red, blue, yellow.
    #[arg(long = "point", value_parser = parse_point, required = true, num_args = 1)]
    points: Vec<(u32, u32)>,

    /// Hue half-width in degrees for every marker.
    #[arg(long, default_value = "10")]
    hue_delta: u16,

    #[arg(long, default_value = "120")]
    satval_low: u8,

    #[arg(long, default_value = "255")]
    satval_high: u8,

    /// Output calibration JSON.
    #[arg(long)]
    out: PathBuf,

    /// Directory to write one threshold mask per marker for inspection.
    #[arg(long)]
    preview_dir: Option<PathBuf>,
}

fn parse_point(raw: &str) -> Result<(u32, u32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{raw}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid coordinate `{v}`: {e}"))
    };
    Ok((parse(x)?, parse(y)?))
}

#[derive(Serialize)]
struct FrameReport<'a> {
    frame: &'a str,
    updated: bool,
    position: [f64; 3],
    rotation: [f64; 3],
    fps: f64,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    #[cfg(feature = "tracing")]
    posetrack_core::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    posetrack_core::init_with_level(level_for(cli.verbose))?;

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
    }
}

// ── track ──────────────────────────────────────────────────────────────

fn load_calibration(path: Option<&Path>) -> CliResult<Arc<CalibrationParameters>> {
    let path = path.ok_or("this tracker needs --calibration")?;
    info!("loading calibration from {}", path.display());
    Ok(Arc::new(CalibrationParameters::load_json(path)?))
}

fn run_track(args: &TrackArgs) -> CliResult<()> {
    let source = FrameSource::new();
    match args.tracker {
        TrackerKind::Chessboard => {
            let params = ChessboardTrackerParams {
                rows: args.rows,
                cols: args.cols,
                square_size: args.square_size,
                ..Default::default()
            };
            let calibration = load_calibration(args.calibration.as_deref())?;
            let tracker = source.attach(ChessboardTracker::with_params(calibration, params)?);
            replay(&source, &tracker, args)
        }
        TrackerKind::Color => {
            let tracker = source.attach(ColorTracker::new(args.hue)?);
            replay(&source, &tracker, args)
        }
        TrackerKind::Cross => {
            let calibration = load_calibration(args.calibration.as_deref())?;
            let tracker = source.attach(ColorCrossTracker::new(calibration, args.solver.into()));
            replay(&source, &tracker, args)
        }
    }
}

fn replay<T: MotionTracker>(
    source: &FrameSource,
    tracker: &Attached<T>,
    args: &TrackArgs,
) -> CliResult<()> {
    for path in &args.images {
        let frame = image::open(path)?.to_rgb8();
        let before = tracker.pose_state().last_update();
        source.deliver(&frame)?;

        let pose = tracker.pose();
        let name = path.display().to_string();
        let report = FrameReport {
            frame: &name,
            updated: tracker.pose_state().last_update() != before,
            position: [pose.position.x, pose.position.y, pose.position.z],
            rotation: [pose.rotation.x, pose.rotation.y, pose.rotation.z],
            fps: tracker.frame_rate(),
        };

        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!(
                "{}: {} position [{:.3}, {:.3}, {:.3}] rotation [{:.4}, {:.4}, {:.4}] {:.1} fps",
                report.frame,
                if report.updated { "updated" } else { "kept" },
                report.position[0],
                report.position[1],
                report.position[2],
                report.rotation[0],
                report.rotation[1],
                report.rotation[2],
                report.fps,
            );
        }
    }
    Ok(())
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    if args.points.len() != Marker::ALL.len() {
        return Err(format!(
            "expected {} --point values (green, red, blue, yellow), got {}",
            Marker::ALL.len(),
            args.points.len()
        )
        .into());
    }

    info!("loading image: {}", args.image.display());
    let hsv = HsvImage::from_rgb(&image::open(&args.image)?.to_rgb8());

    let mut sampler = HueSampler::with_window(args.hue_delta, args.satval_low, args.satval_high);
    for (&(x, y), marker) in args.points.iter().zip(Marker::ALL) {
        let hue = sampler.sample(&hsv, x, y)?;
        println!("{}: hue {hue} at ({x}, {y})", marker.color_name());
    }

    if let Some(dir) = &args.preview_dir {
        std::fs::create_dir_all(dir)?;
        for marker in Marker::ALL {
            if let Some(mask) = sampler.preview(&hsv, marker) {
                let path = dir.join(format!("{}.png", marker.color_name()));
                mask.save(&path)?;
                info!("wrote {}", path.display());
            }
        }
    }

    sampler.finish()?.write_json(&args.out)?;
    println!("parameters written to {}", args.out.display());
    Ok(())
}
