use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::align::{DistanceMetric, LimbWeights};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level engine configuration.
///
/// Every section falls back to its defaults, so a TOML file only needs the
/// keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreoConfig {
    pub features: FeatureConfig,
    pub compare: CompareConfig,
    pub segment: SegmentConfig,
    pub sync: SyncConfig,
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Moving-average window for angles and deltas (frames)
    pub smoothing_window: usize,
    /// Multiplier applied to delta-angle features
    pub dangle_weight: f32,
    /// Motion energy below this is treated as silence when trimming
    pub trim_energy: f32,
    /// Rotate frames so the shoulder line is horizontal
    pub rotation_normalization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Exponential decay applied to normalized DTW distance
    pub alpha: f32,
    /// Sakoe-Chiba band radius (frames)
    pub band: usize,
    /// Sequence cap applied before DTW
    pub max_frames: usize,
    pub metric: DistanceMetric,
    /// Candidates kept per phrase
    pub top_k: usize,
    pub weights: LimbWeights,
}

impl CompareConfig {
    /// Reject decay, cap and weight values that would make scores meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(ConfigError::Validation(
                "compare.alpha must be positive".to_string(),
            ));
        }
        if self.max_frames == 0 {
            return Err(ConfigError::Validation(
                "compare.max_frames must be >= 1".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Validation(
                "compare.top_k must be >= 1".to_string(),
            ));
        }
        if !self.weights.is_valid() {
            return Err(ConfigError::Validation(
                "compare.weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Minimum phrase length in seconds
    pub min_segment_sec: f32,
    /// Cut when energy drops below `low_ratio * mean`
    pub low_ratio: f32,
    /// Peak candidates must exceed `high_ratio * mean`
    pub high_ratio: f32,
    /// Next sample must fall below `drop_ratio * peak`
    pub drop_ratio: f32,
    /// Midpoint distance (seconds) flagged as a timing mismatch
    pub timing_mismatch_sec: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Match tolerance for audio/motion peaks (ms)
    pub tolerance_ms: i64,
    /// Pairs further apart than this are ignored by the lag histogram (ms)
    pub max_lag_ms: i64,
    /// Lag histogram bin width (ms)
    pub bin_ms: i64,
    pub max_peaks: usize,
    pub audio_min_distance: usize,
    pub motion_min_distance: usize,
    /// RMS window length (ms)
    pub window_ms: f32,
    /// RMS hop length (ms)
    pub hop_ms: f32,
    /// Tolerance on duration-normalized audio peaks
    pub audio_pattern_tolerance: f32,
    /// Tolerance on duration-normalized motion peaks
    pub motion_pattern_tolerance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Valid frames required before a comparison is trusted
    pub min_frames: usize,
    /// Minimum fraction of frames with a detected pose
    pub min_pose_rate: f32,
    /// Turn quality warnings into errors
    pub hard_fail: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            dangle_weight: 1.5,
            trim_energy: 0.05,
            rotation_normalization: true,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            alpha: 0.8,
            band: 10,
            max_frames: 300,
            metric: DistanceMetric::default(),
            top_k: 3,
            weights: LimbWeights::default(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_segment_sec: 2.0,
            low_ratio: 0.5,
            high_ratio: 1.2,
            drop_ratio: 0.6,
            timing_mismatch_sec: 1.5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 150,
            max_lag_ms: 2000,
            bin_ms: 50,
            max_peaks: 200,
            audio_min_distance: 3,
            motion_min_distance: 2,
            window_ms: 50.0,
            hop_ms: 25.0,
            audio_pattern_tolerance: 0.02,
            motion_pattern_tolerance: 0.03,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_frames: 60,
            min_pose_rate: 0.6,
            hard_fail: false,
        }
    }
}

impl ChoreoConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ChoreoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    /// Environment variables are prefixed with CHOREO_
    /// Example: CHOREO_COMPARE_ALPHA=1.2
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    pub fn load_layered(
        default_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = ChoreoConfig::default();

        if let Some(path) = default_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        // User file replaces the default file wholesale; omitted keys take
        // built-in defaults through serde(default).
        if let Some(path) = user_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply CHOREO_* environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (used for env vars and tests)
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_value(&lookup, "CHOREO_FEATURES_SMOOTHING_WINDOW", &mut self.features.smoothing_window)?;
        override_value(&lookup, "CHOREO_FEATURES_DANGLE_WEIGHT", &mut self.features.dangle_weight)?;
        override_value(&lookup, "CHOREO_FEATURES_TRIM_ENERGY", &mut self.features.trim_energy)?;
        override_value(&lookup, "CHOREO_FEATURES_ROTATION", &mut self.features.rotation_normalization)?;

        override_value(&lookup, "CHOREO_COMPARE_ALPHA", &mut self.compare.alpha)?;
        override_value(&lookup, "CHOREO_COMPARE_BAND", &mut self.compare.band)?;
        override_value(&lookup, "CHOREO_COMPARE_MAX_FRAMES", &mut self.compare.max_frames)?;
        override_value(&lookup, "CHOREO_COMPARE_TOP_K", &mut self.compare.top_k)?;

        override_value(&lookup, "CHOREO_SYNC_TOLERANCE_MS", &mut self.sync.tolerance_ms)?;

        override_value(&lookup, "CHOREO_QUALITY_MIN_FRAMES", &mut self.quality.min_frames)?;
        override_value(&lookup, "CHOREO_QUALITY_MIN_POSE_RATE", &mut self.quality.min_pose_rate)?;
        override_value(&lookup, "CHOREO_QUALITY_HARD_FAIL", &mut self.quality.hard_fail)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.features;
        if f.smoothing_window == 0 {
            return Err(ConfigError::Validation(
                "features.smoothing_window must be >= 1".to_string(),
            ));
        }
        if !f.dangle_weight.is_finite() || f.dangle_weight < 0.0 {
            return Err(ConfigError::Validation(
                "features.dangle_weight must be finite and non-negative".to_string(),
            ));
        }
        if !f.trim_energy.is_finite() || f.trim_energy < 0.0 {
            return Err(ConfigError::Validation(
                "features.trim_energy must be finite and non-negative".to_string(),
            ));
        }

        self.compare.validate()?;

        let s = &self.segment;
        if !s.min_segment_sec.is_finite() || s.min_segment_sec < 0.0 {
            return Err(ConfigError::Validation(
                "segment.min_segment_sec must be non-negative".to_string(),
            ));
        }
        if s.low_ratio < 0.0 || s.high_ratio < s.low_ratio {
            return Err(ConfigError::Validation(
                "segment ratios must satisfy 0 <= low_ratio <= high_ratio".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.drop_ratio) {
            return Err(ConfigError::Validation(
                "segment.drop_ratio must be in [0, 1]".to_string(),
            ));
        }

        let y = &self.sync;
        if y.tolerance_ms < 0 || y.max_lag_ms < 0 {
            return Err(ConfigError::Validation(
                "sync tolerances must be non-negative".to_string(),
            ));
        }
        if y.bin_ms <= 0 {
            return Err(ConfigError::Validation(
                "sync.bin_ms must be positive".to_string(),
            ));
        }
        if y.window_ms <= 0.0 || y.hop_ms <= 0.0 {
            return Err(ConfigError::Validation(
                "sync.window_ms and sync.hop_ms must be positive".to_string(),
            ));
        }

        let q = &self.quality;
        if !(0.0..=1.0).contains(&q.min_pose_rate) {
            return Err(ConfigError::Validation(
                "quality.min_pose_rate must be in [0, 1]".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize configuration to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn override_value<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid {}", key)))?;
    }
    Ok(())
}
