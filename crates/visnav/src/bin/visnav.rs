//! visnav CLI: run the navigation loop, inspect frames, plan on a map, or
//! drive the robot by hand.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use visnav::core::{estimate_from_pair, MarkerDetection, PoseOffset};
use visnav::dispatch::{CommandDispatcher, DispatchPolicy, DispatchWorker};
use visnav::fiducial::{FiducialDetector, QrDecoder};
use visnav::grid::{find_path_with_stats, GridCell, OccupancyGrid, PlannerStats};
use visnav::{
    ConfigOverrides, ControlLoop, ControllerConfig, ImageSequenceSource, MotionCommand,
    MotionKind,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "visnav")]
#[command(about = "Vision-guided navigation: QR markers in, robot motion commands out")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop over a directory of frames.
    Track {
        /// Directory of image frames, replayed in file-name order.
        #[arg(long)]
        frames: PathBuf,

        /// JSON controller config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the run summary (JSON) here.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Stop after this many frames.
        #[arg(long)]
        max_frames: Option<u64>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print the markers found in one image as JSON.
    Detect {
        #[arg(long)]
        image: PathBuf,
    },

    /// Print the A* path between two cells of a map as JSON.
    Plan {
        /// Text (`0`/`1` rows) or JSON map file.
        #[arg(long)]
        map: PathBuf,

        /// Start cell as `row,col`.
        #[arg(long, value_parser = parse_cell)]
        start: GridCell,

        /// Goal cell as `row,col`.
        #[arg(long, value_parser = parse_cell)]
        goal: GridCell,
    },

    /// Read `<command> [speed]` lines from stdin and send them to the robot.
    Drive {
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
}

#[derive(Args, Clone, Debug, Default)]
struct OverrideArgs {
    /// Robot control URL, replacing the configured base.
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    min_distance: Option<f64>,

    #[arg(long)]
    max_distance: Option<f64>,

    #[arg(long)]
    max_speed: Option<u8>,

    /// Keep the last command instead of stopping when a marker is lost.
    #[arg(long)]
    hold_on_loss: bool,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        ConfigOverrides {
            endpoint: args.endpoint,
            min_distance: args.min_distance,
            max_distance: args.max_distance,
            max_speed: args.max_speed,
            hold_on_loss: args.hold_on_loss,
        }
    }
}

fn parse_cell(s: &str) -> Result<GridCell, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `row,col`, got `{s}`"))?;
    let row = row.trim().parse().map_err(|e| format!("row: {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("col: {e}"))?;
    Ok(GridCell::new(row, col))
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    visnav::core::init_tracing(cli.log_level, false);
    #[cfg(not(feature = "tracing"))]
    visnav::core::init_with_level(cli.log_level)?;

    match cli.command {
        Commands::Track {
            frames,
            config,
            report,
            max_frames,
            overrides,
        } => run_track(
            &frames,
            config.as_deref(),
            report.as_deref(),
            max_frames,
            overrides.into(),
        ),
        Commands::Detect { image } => run_detect(&image),
        Commands::Plan { map, start, goal } => run_plan(&map, start, goal),
        Commands::Drive { config, overrides } => run_drive(config.as_deref(), overrides.into()),
    }
}

fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> CliResult<ControllerConfig> {
    let mut config = match path {
        Some(path) => ControllerConfig::load_json(path)
            .map_err(|e| -> CliError { format!("{}: {e}", path.display()).into() })?,
        None => ControllerConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

fn run_track(
    frames: &Path,
    config: Option<&Path>,
    report: Option<&Path>,
    max_frames: Option<u64>,
    overrides: ConfigOverrides,
) -> CliResult<()> {
    let config = load_config(config, &overrides)?;
    let source = ImageSequenceSource::open(frames)?;
    let mut worker = DispatchWorker::spawn(config.dispatcher()?)?;

    let mut control = ControlLoop::from_config(
        &config,
        source,
        FiducialDetector::new(QrDecoder),
        &mut worker,
    )?;
    if let Some(n) = max_frames {
        control = control.with_max_frames(n);
    }
    let mut summary = control.run()?;
    drop(control);

    let superseded = worker.superseded();
    summary.merge_dispatch(worker.shutdown(None));
    if superseded > 0 {
        log::info!("{superseded} queued commands were superseded before sending");
    }

    if let Some(path) = report {
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        log::info!("run summary written to {}", path.display());
    }
    write_json(&summary)
}

// ── detect ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DetectOutput {
    markers: Vec<MarkerDetection>,
    pose: Option<PoseOffset>,
}

fn run_detect(path: &Path) -> CliResult<()> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open {}: {e}", path.display()).into() })?
        .to_luma8();
    log::info!("{}: {}x{}", path.display(), img.width(), img.height());

    let detector = FiducialDetector::new(QrDecoder);
    let markers = detector.detect_all(&img);
    let pair = visnav::fiducial::resolve_markers(markers.iter().cloned());
    write_json(&DetectOutput {
        pose: estimate_from_pair(&pair),
        markers,
    })
}

// ── plan ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PlanOutput {
    start: GridCell,
    goal: GridCell,
    found: bool,
    steps: usize,
    path: Vec<GridCell>,
    stats: PlannerStats,
}

fn run_plan(map: &Path, start: GridCell, goal: GridCell) -> CliResult<()> {
    let grid = OccupancyGrid::load(map)?;
    let (path, stats) = find_path_with_stats(&grid, start, goal)?;
    write_json(&PlanOutput {
        start,
        goal,
        found: !path.is_empty(),
        steps: path.len().saturating_sub(1),
        path,
        stats,
    })
}

// ── drive ──────────────────────────────────────────────────────────────

fn parse_drive_line(line: &str, default_speed: u8) -> Result<MotionCommand, String> {
    let mut parts = line.split_whitespace();
    let kind: MotionKind = parts
        .next()
        .ok_or("empty command")?
        .parse()
        .map_err(|e| format!("{e}"))?;
    let speed = match parts.next() {
        Some(s) => s.parse::<u8>().map_err(|e| format!("speed `{s}`: {e}"))?,
        None => default_speed,
    };
    Ok(MotionCommand::new(kind, speed))
}

fn run_drive(config: Option<&Path>, overrides: ConfigOverrides) -> CliResult<()> {
    let config = load_config(config, &overrides)?;
    let transport = visnav::dispatch::HttpTransport::new(config.timeout())?;
    let mut dispatcher =
        CommandDispatcher::new(config.endpoint.clone(), transport, DispatchPolicy::Deduplicated);

    let mut read_error = None;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                read_error = Some(err);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "q" | "quit" | "exit") {
            break;
        }
        match parse_drive_line(line, config.max_speed) {
            Ok(command) => {
                let outcome = dispatcher.dispatch(command);
                println!("{command} {outcome:?}");
            }
            Err(err) => log::warn!("ignoring `{line}`: {err}"),
        }
    }

    dispatcher.dispatch(MotionCommand::STOP);
    if let Some(err) = read_error {
        return Err(format!("reading stdin: {err}").into());
    }
    write_json(&dispatcher.stats())
}
