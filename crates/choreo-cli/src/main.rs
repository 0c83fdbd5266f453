use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use choreo_signals::config::ChoreoConfig;
use choreo_signals::motion::segment_with_config;
use choreo_signals::pipeline::{compare_feature_sets, VideoSummary};
use choreo_signals::{
    analyze_sync, compare_rhythm, extract_features, phrase_match, phrase_match_by_peaks,
    AudioInput, CancelToken, FeatureSet, LandmarkStream, StabilityReport,
};

#[derive(Parser)]
#[command(name = "choreo", about = "Compare dance and exercise performances from pose landmarks")]
struct Cli {
    /// TOML configuration file (CHOREO_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract motion features from a landmark stream
    Extract {
        stream: PathBuf,
        /// Include per-frame feature rows
        #[arg(long)]
        rows: bool,
    },
    /// Align two performances
    Compare { a: PathBuf, b: PathBuf },
    /// Cut a performance into phrases
    Segment { stream: PathBuf },
    /// Match the phrases of A against B
    Phrases {
        a: PathBuf,
        b: PathBuf,
        /// Cut at motion-energy peaks instead of energy dips
        #[arg(long)]
        peaks: bool,
    },
    /// Audio vs. motion lag of one performance, or rhythm comparison of two
    Sync {
        stream: PathBuf,
        audio: PathBuf,
        /// Second performance as STREAM AUDIO
        #[arg(long, num_args = 2, value_names = ["STREAM", "AUDIO"])]
        against: Option<Vec<PathBuf>>,
    },
    /// Stability of a JSON array of similarity scores from repeated runs
    Stability { runs: PathBuf },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Serialize)]
struct ExtractOutput {
    #[serde(flatten)]
    summary: VideoSummary,
    timestamps_ms: Vec<i64>,
    motion_energy: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<Vec<Vec<f32>>>,
}

impl ExtractOutput {
    fn new(set: &FeatureSet, rows: bool) -> Self {
        Self {
            summary: VideoSummary::from(set),
            timestamps_ms: set.timestamps_ms.clone(),
            motion_energy: set.motion_energy.to_vec(),
            features: rows.then(|| set.feature_rows()),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ChoreoConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => ChoreoConfig::from_file_with_env(path)?,
        None => ChoreoConfig::load_layered(None, None)?,
    };
    Ok(config)
}

fn extract(
    path: &Path,
    config: &ChoreoConfig,
    cancel: &CancelToken,
) -> Result<FeatureSet, Box<dyn std::error::Error>> {
    let stream: LandmarkStream = read_json(path)?;
    tracing::info!("{}: {} frames at {} fps", path.display(), stream.len(), stream.sample_fps);
    Ok(extract_features(&stream, config, cancel)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("choreo_signals=info,choreo=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let cancel = CancelToken::new();

    match cli.cmd {
        Commands::Extract { stream, rows } => {
            let set = extract(&stream, &config, &cancel)?;
            print_json(&ExtractOutput::new(&set, rows))?;
        }
        Commands::Compare { a, b } => {
            let set_a = extract(&a, &config, &cancel)?;
            let set_b = extract(&b, &config, &cancel)?;
            let report = compare_feature_sets(&set_a, &set_b, &config, &cancel)?;
            print_json(&report)?;
        }
        Commands::Segment { stream } => {
            let set = extract(&stream, &config, &cancel)?;
            let segments =
                segment_with_config(&set.motion_energy.to_vec(), set.sample_fps, &config.segment);
            print_json(&segments)?;
        }
        Commands::Phrases { a, b, peaks } => {
            let set_a = extract(&a, &config, &cancel)?;
            let set_b = extract(&b, &config, &cancel)?;
            let phrases = if peaks {
                phrase_match_by_peaks(&set_a, &set_b, &config)
            } else {
                let energy_a = set_a.motion_energy.to_vec();
                let energy_b = set_b.motion_energy.to_vec();
                let segments_a = segment_with_config(&energy_a, set_a.sample_fps, &config.segment);
                let segments_b = segment_with_config(&energy_b, set_b.sample_fps, &config.segment);
                phrase_match(&set_a, &set_b, &segments_a, &segments_b, &config)
            };
            print_json(&phrases)?;
        }
        Commands::Sync { stream, audio, against } => {
            let stream_a: LandmarkStream = read_json(&stream)?;
            let audio_a: AudioInput = read_json(&audio)?;
            match against.as_deref() {
                Some([other_stream, other_audio]) => {
                    let stream_b: LandmarkStream = read_json(other_stream)?;
                    let audio_b: AudioInput = read_json(other_audio)?;
                    let result = compare_rhythm(
                        (&stream_a, &audio_a),
                        (&stream_b, &audio_b),
                        &config,
                        &cancel,
                    )?;
                    print_json(&result)?;
                }
                Some(_) => return Err("--against takes a stream and an audio file".into()),
                None => {
                    let report = analyze_sync(&stream_a, &audio_a, &config, &cancel)?;
                    print_json(&report)?;
                }
            }
        }
        Commands::Stability { runs } => {
            let runs: Vec<f32> = read_json(&runs)?;
            print_json(&StabilityReport::from_runs(&runs))?;
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
