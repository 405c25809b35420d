use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Analysis Error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Face Locator Error: {0}")]
    Face(#[from] FaceLocatorError),
    #[error("Voice Error: {0}")]
    Voice(#[from] VoiceError),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Gate Error: {0}")]
    Gate(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// Failures of a single submission to the analysis endpoint. None of these are
// retried by the client; the next gate tick is the retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server responded with status {status}: {body}")]
    Server { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Analysis request timed out")]
    Timeout,
    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaceLocatorError {
    #[error("Face locator unavailable: {0}")]
    Unavailable(String),
    #[error("Face location failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("Voice playback is blocked for this session")]
    Blocked,
    #[error("Audio backend error: {0}")]
    Backend(String),
}
