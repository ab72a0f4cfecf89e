//! CLI that replays recorded landmark frames through the gesture counter.
//!
//! Usage:
//!   face-gestures frames.jsonl                   # Human-readable output
//!   face-gestures frames.jsonl --json            # One JSON report per frame
//!   face-gestures - --summary < frames.jsonl     # Final counts per session
//!
//! Each input line is one frame record:
//!
//! ```text
//! {"session_id": "s1", "points": [{"x": 1.0, "y": 2.0}, ...], "face_size": 180.0}
//! {"session_id": "s1", "normalized": [...], "width": 640, "height": 480}
//! {"session_id": "s1", "signals": {"ear": 0.3, "mouth_ratio": 0.01, "brow_left": 0.1, "brow_right": 0.1}}
//! {"session_id": "s1"}
//! ```
//!
//! A record with none of `points`, `normalized` or `signals` is a frame where
//! no face was found.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use face_gestures::{FrameReport, FrameSignals, GestureConfig, GestureCounter, LandmarkFrame, Point};
use serde::Deserialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "face-gestures")]
#[command(author, version, about = "Count blinks, mouth opens and brow raises from landmark frames", long_about = None)]
struct Args {
    /// JSON-lines frame file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Only print the final state of each session
    #[arg(short, long)]
    summary: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Detector configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One line of the input file.
#[derive(Deserialize, Debug)]
struct FrameRecord {
    session_id: String,
    #[serde(default)]
    points: Option<Vec<Point>>,
    #[serde(default)]
    face_size: Option<f64>,
    #[serde(default)]
    normalized: Option<Vec<Point>>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    signals: Option<FrameSignals>,
}

impl FrameRecord {
    fn landmark_frame(&self) -> Option<LandmarkFrame> {
        if let Some(points) = &self.points {
            let frame = match self.face_size {
                Some(size) => LandmarkFrame::new(points.clone(), size),
                None => LandmarkFrame::from_points(points.clone()),
            };
            return Some(frame);
        }
        match (&self.normalized, self.width, self.height) {
            (Some(points), Some(w), Some(h)) => Some(LandmarkFrame::from_normalized(points, w, h)),
            _ => None,
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "face_gestures=debug"
    } else {
        "face_gestures=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            GestureConfig::from_json_file(path)?
        }
        None => GestureConfig::default(),
    };
    let counter = GestureCounter::try_new(config)?;

    let reader: Box<dyn BufRead> = if args.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let mut reports = Vec::new();
    let mut sessions = BTreeSet::new();
    let mut frames = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        frames += 1;

        let report = match (&record.signals, record.landmark_frame()) {
            (Some(signals), _) => counter.process_signals(&record.session_id, signals, Vec::new()),
            (None, frame) => counter
                .process_frame(&record.session_id, frame.as_ref())
                .map_err(|e| format!("line {}: {}", line_no + 1, e))?,
        };

        sessions.insert(record.session_id);
        if !args.summary {
            reports.push(report);
        }
    }

    if args.summary {
        reports = sessions
            .iter()
            .map(|id| {
                counter
                    .snapshot(id)
                    .unwrap_or_else(|| FrameReport::no_face(id))
            })
            .collect();
    }

    info!(frames, sessions = sessions.len(), "replay finished");

    let output_str = if args.json {
        let mut s = String::new();
        for report in &reports {
            s.push_str(&serde_json::to_string(report)?);
            s.push('\n');
        }
        s
    } else {
        format_human_readable(&reports)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        info!(path = %path.display(), "output written");
    } else {
        print!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(reports: &[FrameReport]) -> String {
    let mut s = String::new();

    if reports.is_empty() {
        s.push_str("No frames.\n");
        return s;
    }

    for report in reports {
        s.push_str(&format!(
            "{:<12} blinks {:>4}  mouth {:>4}  brows {:>4}  | eye {:<7} mouth {:<7} brow {}\n",
            report.session_id,
            report.counts.blinks,
            report.counts.mouth_opens,
            report.counts.brow_raises,
            report.states.eye.as_str(),
            report.states.mouth.as_str(),
            report.states.brow.as_str(),
        ));
    }

    s
}
