pub mod analysis;
pub mod common;
pub mod config;
pub mod error;
pub mod face;
pub mod gate;
pub mod quality;
pub mod session;
pub mod sink;
pub mod voice;

pub use error::{AnalysisError, AppError, ConfigError, FaceLocatorError, VoiceError};

pub use analysis::{AnalysisClient, AnalysisResult, HttpAnalysisClient};
pub use config::Configuration;
pub use gate::{CaptureGate, CaptureGateBuilder, TickOutcome};
pub use sink::{Advisory, ResultSink};
