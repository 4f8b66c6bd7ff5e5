// src/config.rs - Engine configuration with JSON loading
use crate::error::AnalysisError;
use crate::pose::{BATCH_CONFIDENCE_THRESHOLD, LIVE_CONFIDENCE_THRESHOLD};
use crate::sequence::MIN_POSED_FRAMES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub batch: BatchConfig,
    pub live: LiveConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Frames sampled evenly across the clip, both ends included.
    pub frame_count: usize,
    pub confidence_threshold: f32,
    /// Detector calls allowed in flight at once; 1 runs them one after another.
    pub max_concurrent_detections: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            frame_count: 24,
            confidence_threshold: BATCH_CONFIDENCE_THRESHOLD,
            max_concurrent_detections: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub confidence_threshold: f32,
    pub max_rate_hz: f64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: LIVE_CONFIDENCE_THRESHOLD,
            max_rate_hz: 12.0,
        }
    }
}

impl LiveConfig {
    /// Shortest spacing between accepted live frames. Fails for a rate that is
    /// not a positive finite number.
    pub fn min_interval(&self) -> Result<Duration, AnalysisError> {
        if !(self.max_rate_hz.is_finite() && self.max_rate_hz > 0.0) {
            return Err(AnalysisError::invalid_config(format!(
                "live.max_rate_hz must be positive, got {}",
                self.max_rate_hz
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.max_rate_hz).map_err(|err| {
            AnalysisError::invalid_config(format!(
                "live.max_rate_hz {} gives no usable interval: {err}",
                self.max_rate_hz
            ))
        })
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        check_threshold("live.confidence_threshold", self.confidence_threshold)?;
        self.min_interval().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("SwingTracker")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config, falling back to defaults when the file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!(?path, "loaded engine configuration");
                    config
                }
                Err(err) => {
                    warn!(?path, %err, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(err) => {
                warn!(?path, %err, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.batch.validate()?;
        self.live.validate()
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_count < 2 {
            return Err(AnalysisError::invalid_config("frame_count must be at least 2"));
        }
        if self.frame_count < MIN_POSED_FRAMES {
            return Err(AnalysisError::invalid_config(format!(
                "frame_count {} can never reach the {} posed frames required",
                self.frame_count, MIN_POSED_FRAMES
            )));
        }
        if self.max_concurrent_detections == 0 {
            return Err(AnalysisError::invalid_config(
                "max_concurrent_detections must be at least 1",
            ));
        }
        check_threshold("batch.confidence_threshold", self.confidence_threshold)
    }
}

fn check_threshold(name: &str, value: f32) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
