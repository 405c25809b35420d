pub mod client;
pub mod request;
pub mod result;
pub mod service;

pub use client::{AnalysisClient, HttpAnalysisClient};
pub use request::{AnalysisRequest, ImagePayload};
pub use result::{AnalysisResult, Price, Recommendation};
pub use service::{analysis_stack, AnalysisService, AnalysisStack};
