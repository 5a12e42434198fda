//! Configuration types for scanning.
//!
//! Loads settings from config.json next to the executable (or an explicit
//! path). Missing or malformed files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::extract::StrategyKind;

/// Which recognition engine to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Tesseract block mode with word boxes (fast)
    #[default]
    Primary,
    /// Tesseract sparse-text mode, plain text only (slower)
    Alternate,
}

/// Complete scanner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Recognition engine variant
    pub engine: EngineKind,
    /// Seconds before a Tesseract run is killed
    pub tesseract_timeout_secs: u64,
    pub preprocess: PreprocessConfig,
    pub extraction: ExtractionConfig,
    pub scanner: ContinuousScanConfig,
    pub gateway: GatewayConfig,
}

/// Image normalization applied before recognition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Luma weights for R, G, B
    pub luma_weights: [f32; 3],
    /// Gray values above this become white
    pub high_threshold: u8,
    /// Gray values below this become black
    pub low_threshold: u8,
    /// Stretch midtones linearly between the thresholds instead of keeping them
    pub stretch_midtones: bool,
    /// Integer upscaling factor (clamped to 1-4)
    pub upscale: u32,
}

/// Tuning for the number set extractor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Strategies to run, in priority order
    pub strategies: Vec<StrategyKind>,
    /// Vertical bucket size in pixels when grouping word boxes into rows
    pub row_bucket_px: u32,
    /// Minimum white-ball mean for an unstructured window to count
    pub fallback_min_average: f32,
    /// White balls of an unstructured window must span more than this
    pub fallback_min_spread: u8,
    /// Maximum number of sets the unstructured fallback may return
    pub fallback_max_results: usize,
}

/// Continuous scanning loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousScanConfig {
    /// Delay between frame polls (milliseconds)
    pub interval_ms: u64,
    /// Stop after this many processed frames
    pub max_attempts: u32,
    /// Stop after this many consecutive polls without a new frame
    pub max_idle_polls: u32,
    /// Frame files modified more recently than this are left for a later poll (milliseconds)
    pub frame_settle_ms: u64,
    /// Stop once this many unique sets were collected
    pub target_sets: usize,
    /// Stop when a frame with results reaches this recognition confidence
    pub stop_confidence: f32,
    /// Progress added per frame that yields numbers (percent)
    pub progress_step: u8,
}

/// Remote draw sources.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub primary_url: String,
    pub secondary_url: String,
    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            tesseract_timeout_secs: 20,
            preprocess: PreprocessConfig::default(),
            extraction: ExtractionConfig::default(),
            scanner: ContinuousScanConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            luma_weights: [0.299, 0.587, 0.114],
            high_threshold: 160,
            low_threshold: 100,
            stretch_midtones: false,
            upscale: 3,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::ALL.to_vec(),
            row_bucket_px: 20,
            fallback_min_average: 10.0,
            fallback_min_spread: 10,
            fallback_max_results: 5,
        }
    }
}

impl Default for ContinuousScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_attempts: 40,
            max_idle_polls: 120,
            frame_settle_ms: 500,
            target_sets: 5,
            stop_confidence: 0.9,
            progress_step: 5,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://api.lotteryresultsfeed.com/api/lottery/results".to_string(),
            secondary_url: "https://data.ny.gov/resource/d6yy-54nr.json".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ScannerConfig {
    /// Loads configuration from `path`, or returns defaults.
    pub fn load(path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", path.display()));

        if !path.exists() {
            crate::log("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScannerConfig>(&contents) {
                Ok(config) => {
                    crate::log(&format!("Config loaded from {}", path.display()));
                    config.sanitized()
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
                Self::default()
            }
        }
    }

    /// Clamps values that would break the pipeline.
    fn sanitized(mut self) -> Self {
        self.preprocess.upscale = self.preprocess.upscale.clamp(1, 4);
        if self.preprocess.low_threshold > self.preprocess.high_threshold {
            std::mem::swap(
                &mut self.preprocess.low_threshold,
                &mut self.preprocess.high_threshold,
            );
        }
        self.extraction.row_bucket_px = self.extraction.row_bucket_px.max(1);
        if self.extraction.strategies.is_empty() {
            self.extraction.strategies = StrategyKind::ALL.to_vec();
        }
        self.scanner.progress_step = self.scanner.progress_step.clamp(1, 100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = ScannerConfig::load(&dir.path().join("config.json"));
        assert_eq!(config.engine, EngineKind::Primary);
        assert_eq!(config.preprocess.upscale, 3);
        assert_eq!(config.extraction.strategies, StrategyKind::ALL.to_vec());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"engine": "alternate", "extraction": {"strategies": ["marker_lines", "fallback"]}}"#,
        )
        .unwrap();

        let config = ScannerConfig::load(&path);
        assert_eq!(config.engine, EngineKind::Alternate);
        assert_eq!(
            config.extraction.strategies,
            vec![StrategyKind::MarkerLines, StrategyKind::Fallback]
        );
        assert_eq!(config.extraction.row_bucket_px, 20);
        assert_eq!(config.scanner.interval_ms, 500);
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = ScannerConfig::load(&path);
        assert_eq!(config.tesseract_timeout_secs, 20);
    }

    #[test]
    fn test_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"preprocess": {"upscale": 9, "low_threshold": 200, "high_threshold": 50},
                "extraction": {"strategies": [], "row_bucket_px": 0}}"#,
        )
        .unwrap();

        let config = ScannerConfig::load(&path);
        assert_eq!(config.preprocess.upscale, 4);
        assert_eq!(config.preprocess.low_threshold, 50);
        assert_eq!(config.preprocess.high_threshold, 200);
        assert_eq!(config.extraction.row_bucket_px, 1);
        assert!(!config.extraction.strategies.is_empty());
    }
}
