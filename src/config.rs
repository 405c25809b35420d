use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "RUNOVA";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub gate: GateSettings,
    pub quality: QualityThresholds,
    pub analysis: AnalysisSettings,
    pub voice: VoiceSettings,
    pub source: SourceSettings,
    pub logging: LoggingSettings,
}

/// Timing of the polling loop and of the single-shot "analyze now" wait.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub poll_interval_ms: u64,
    pub stability_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
    pub crop_to_face: bool,
    pub crop_margin: f32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            stability_ms: 500,
            ready_timeout_ms: 5000,
            ready_poll_ms: 100,
            crop_to_face: true,
            crop_margin: 0.25,
        }
    }
}

impl GateSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stability(&self) -> Duration {
        Duration::from_millis(self.stability_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }
}

/// Pass bands for the three quality signals. Brightness values are
/// normalized to [0, 1]; face fractions are of the full frame area.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_brightness: f32,
    pub max_brightness: f32,
    pub min_contrast: f32,
    pub min_face_fraction: f32,
    pub max_face_fraction: f32,
    pub sample_step: u32,
    pub smoothing_window: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_brightness: 0.35,
            max_brightness: 0.75,
            min_contrast: 0.08,
            min_face_fraction: 0.08,
            max_face_fraction: 0.6,
            sample_step: 4,
            smoothing_window: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub endpoint: String,
    pub origin: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub throttle: bool,
    pub generate_audio: bool,
    pub jpeg_quality: u8,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5005/youcam/analyze".to_string(),
            origin: None,
            api_key: None,
            request_timeout_ms: 45_000,
            throttle: true,
            generate_audio: false,
            jpeg_quality: 85,
        }
    }
}

impl AnalysisSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub enabled: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Layers built-in defaults, an optional TOML file and `RUNOVA_*`
    /// environment variables (sections separated by `__`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let configuration: Configuration = builder.build()?.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.poll_interval_ms == 0 {
            return Err(invalid("gate.poll_interval_ms", "must be greater than zero"));
        }
        if self.gate.ready_poll_ms == 0 {
            return Err(invalid("gate.ready_poll_ms", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.gate.crop_margin) {
            return Err(invalid("gate.crop_margin", "must be within [0, 1]"));
        }
        let q = &self.quality;
        if q.min_brightness >= q.max_brightness {
            return Err(invalid(
                "quality.min_brightness",
                format!("{} is not below max_brightness {}", q.min_brightness, q.max_brightness),
            ));
        }
        if q.min_face_fraction >= q.max_face_fraction {
            return Err(invalid(
                "quality.min_face_fraction",
                format!(
                    "{} is not below max_face_fraction {}",
                    q.min_face_fraction, q.max_face_fraction
                ),
            ));
        }
        if q.sample_step == 0 {
            return Err(invalid("quality.sample_step", "must be greater than zero"));
        }
        if q.smoothing_window == 0 {
            return Err(invalid("quality.smoothing_window", "must be greater than zero"));
        }
        if self.analysis.endpoint.is_empty() {
            return Err(invalid("analysis.endpoint", "must not be empty"));
        }
        if self.analysis.request_timeout_ms == 0 {
            return Err(invalid("analysis.request_timeout_ms", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.analysis.jpeg_quality) {
            return Err(invalid("analysis.jpeg_quality", "must be within 1..=100"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
