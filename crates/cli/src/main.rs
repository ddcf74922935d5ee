mod trace;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use facegate_core::pipeline::frame_pipeline::FramePipeline;
use facegate_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use facegate_core::session::guidance::Guidance;
use facegate_core::session::session_event::SessionEvent;
use facegate_core::shared::thresholds::{LivenessLevel, SessionConfig};

use crate::trace::TraceFrame;

/// Replays a recorded face detection trace through the capture pipeline
/// and prints the session events it produces as JSON lines.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// JSON-lines trace, one recorded frame per line.
    input: PathBuf,

    /// Session config file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Liveness check: off or blink.
    #[arg(long)]
    liveness: Option<String>,

    /// Anti-spoof acceptance level (0.0-1.0).
    #[arg(long)]
    spoof_level: Option<f64>,

    /// Spacing of frames that carry no timestamp, in milliseconds.
    #[arg(long, default_value = "100")]
    frame_interval_ms: u64,

    /// Start a new session after every capture instead of stopping.
    #[arg(long)]
    continuous: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = resolve_config(&cli)?;
    let frames = trace::read_trace(&cli.input)?;
    log::info!(
        "Replaying {} frames from {} (liveness {:?})",
        frames.len(),
        cli.input.display(),
        config.liveness_level
    );

    let (detector, scorer) = trace::replay_sources(&frames);
    let mut pipeline = FramePipeline::new(config, Box::new(detector), Box::new(scorer))?
        .with_logger(Box::new(SummaryPipelineLogger::new()));

    let stdout = std::io::stdout();
    let captures = replay(
        &mut pipeline,
        &frames,
        cli.frame_interval_ms,
        cli.continuous,
        &mut stdout.lock(),
    )?;

    pipeline.logger().summary();
    log::info!("{captures} capture(s)");
    Ok(())
}

/// Feeds the trace through the pipeline one frame at a time, writing every
/// current-generation event after the frame that produced it. With
/// `continuous`, a capture restarts the session before the next frame.
/// Returns the number of captures.
fn replay(
    pipeline: &mut FramePipeline,
    frames: &[TraceFrame],
    frame_interval_ms: u64,
    continuous: bool,
    out: &mut impl Write,
) -> Result<usize, Box<dyn std::error::Error>> {
    let events = pipeline.subscribe();
    let session = pipeline.handle();
    let level = pipeline.config().liveness_level;
    let required_blinks = pipeline.config().thresholds.required_blinks;
    let mut captures = 0;

    for trace_frame in frames {
        let now_ms = frame_time_ms(trace_frame, frame_interval_ms);
        pipeline.process_frame(trace_frame.to_frame(), now_ms);

        for event in events.try_iter() {
            if !session.is_current(event.generation()) {
                log::debug!("Ignoring stale event from generation {}", event.generation());
                continue;
            }
            writeln!(out, "{}", serde_json::to_string(&event)?)?;

            match &event {
                SessionEvent::Status(status) => {
                    log::info!("{}", Guidance::for_status(status, level, required_blinks));
                }
                SessionEvent::Captured(capture) => {
                    captures += 1;
                    log::info!(
                        "Captured face at ({:.0}, {:.0}) {:.0}x{:.0}",
                        capture.bounding_box.x,
                        capture.bounding_box.y,
                        capture.bounding_box.width,
                        capture.bounding_box.height
                    );
                    if continuous {
                        session.soft_reset();
                    }
                }
                _ => {}
            }
        }
    }
    Ok(captures)
}

/// The recorded timestamp, or the frame's position on a fixed grid.
fn frame_time_ms(frame: &TraceFrame, frame_interval_ms: u64) -> u64 {
    frame
        .timestamp_ms
        .unwrap_or(frame.index() as u64 * frame_interval_ms)
}

fn resolve_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path(cli.config.as_deref()) {
        Some(path) => {
            log::info!("Loading session config from {}", path.display());
            SessionConfig::load(&path)?
        }
        None => SessionConfig::default(),
    };

    if let Some(level) = cli.liveness.as_deref() {
        config = config.with_liveness_level(parse_liveness(level));
    }
    if let Some(level) = cli.spoof_level {
        config = config.with_spoof_acceptance_level(level);
    }
    Ok(config)
}

/// An explicit path always wins; otherwise the platform default is used
/// only when it exists.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    dirs::config_dir()
        .map(|dir| SessionConfig::default_path(&dir))
        .filter(|path| path.exists())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(level) = cli.liveness.as_deref() {
        if level != "off" && level != "blink" {
            return Err(format!("Liveness must be 'off' or 'blink', got '{level}'").into());
        }
    }
    if let Some(level) = cli.spoof_level {
        if !(0.0..1.0).contains(&level) {
            return Err(
                format!("Spoof level must be between 0.0 and 1.0, got {level}").into(),
            );
        }
    }
    Ok(())
}

fn parse_liveness(level: &str) -> LivenessLevel {
    if level == "blink" {
        LivenessLevel::BlinkChallenge
    } else {
        LivenessLevel::Off
    }
}
