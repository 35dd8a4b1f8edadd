//! CLI application for face-shape and eye-shape classification.
//!
//! Usage:
//!   percent-shape frame1.json frame2.json ...   # Human-readable output
//!   percent-shape frame*.json --json            # JSON output
//!   percent-shape frame.json -o result.json     # Save to file
//!
//! Each input file holds one frame of normalized landmarks, either as a bare
//! array of points or as `{"landmarks": [...]}`. All frames are aggregated
//! into one result.

use clap::Parser;
use percent_shape::{AggregateResult, Aggregator, ClassifierConfig, LandmarkSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "percent-shape")]
#[command(author, version, long_about = None)]
#[command(about = "Face and eye shape classification from landmarks")]
struct Args {
    /// Landmark JSON files, one frame each
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Threshold and extraction config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameFile {
    Bare(LandmarkSet),
    Wrapped { landmarks: LandmarkSet },
}

impl FrameFile {
    fn into_landmarks(self) -> LandmarkSet {
        match self {
            FrameFile::Bare(set) | FrameFile::Wrapped { landmarks: set } => set,
        }
    }
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output<'a> {
    inputs: Vec<String>,
    /// Combined face+eye lookup key
    recommendation_key: Option<String>,
    #[serde(flatten)]
    result: &'a AggregateResult,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            info!("loading config from {:?}", path);
            ClassifierConfig::load(path)?
        }
        None => ClassifierConfig::default(),
    };
    let aggregator = Aggregator::from_config(&config);

    let mut frames = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let frame = read_frame(path)?;
        debug!(path = %path.display(), points = frame.len(), "read frame");
        frames.push(frame);
    }

    let result = aggregator.aggregate_landmarks(&frames)?;
    let output = Output {
        inputs: args.inputs.iter().map(|p| p.display().to_string()).collect(),
        recommendation_key: result.recommendation_key(),
        result: &result,
    };

    // Generate output
    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    // Write output
    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        info!("output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn read_frame(path: &Path) -> percent_shape::Result<LandmarkSet> {
    let file = File::open(path)?;
    let frame: FrameFile = serde_json::from_reader(BufReader::new(file))?;
    Ok(frame.into_landmarks())
}

fn format_human_readable(output: &Output) -> String {
    let result = output.result;
    let face = &result.face;
    let mut s = String::new();

    s.push_str(&format!(
        "Frames: {} ({} with a usable face)\n",
        result.samples, result.face_samples
    ));

    s.push_str(&format!(
        "\nFace shape: {} [{}] ({}% confidence)\n",
        face.shape,
        face.shape.key(),
        face.confidence
    ));
    s.push_str(&format!("  Width/height:  {:.3}\n", face.width_height_ratio));
    s.push_str(&format!("  Jaw/forehead:  {:.3}\n", face.jaw_forehead_ratio));
    s.push_str(&format!("  Cheek/jaw:     {:.3}\n", face.cheek_jaw_ratio));

    s.push_str("\nScores:\n");
    for (shape, score) in face.scores.ranked() {
        let marker = if shape == face.shape { "*" } else { " " };
        s.push_str(&format!("  {} {:<8} {:>3}\n", marker, shape.name(), score));
    }

    match &result.eye {
        Some(eye) => {
            s.push_str(&format!(
                "\nEye shape: {} [{}] ({}% confidence)\n",
                eye.shape,
                eye.shape.key(),
                eye.confidence
            ));
            s.push_str(&format!("  Spacing:      {} [{}]\n", eye.spacing, eye.spacing.key()));
            s.push_str(&format!("  Aspect ratio: {:.3}\n", eye.features.ear));
            s.push_str(&format!("  Corner angle: {:.1} deg\n", eye.features.corner_angle));
            s.push_str(&format!("  Hood score:   {:.2}\n", eye.features.hood_score));
        }
        None => s.push_str("\nEye shape: not measured\n"),
    }

    if let Some(key) = &output.recommendation_key {
        s.push_str(&format!("\nRecommendation key: {}\n", key));
    }

    s
}
