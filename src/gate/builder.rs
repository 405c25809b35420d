use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::analysis::{analysis_stack, AnalysisClient};
use crate::common::FrameSource;
use crate::config::Configuration;
use crate::error::AppError;
use crate::face::{FaceLocator, SmoothedFaceLocator};
use crate::gate::capture_gate::{
    CaptureGate, GateInner, GateOptions, QualityCapability, QualityState,
};
use crate::gate::in_flight::SubmissionSlot;
use crate::quality::{QualityAssessor, SignalChangeTracker};
use crate::sink::{ResultSink, TracingResultSink};
use crate::voice::VoiceController;

pub struct CaptureGateBuilder {
    configuration: Configuration,
    source: Option<Arc<dyn FrameSource>>,
    locator: Option<Box<dyn FaceLocator>>,
    client: Option<Arc<dyn AnalysisClient>>,
    sink: Option<Arc<dyn ResultSink>>,
    voice: Option<Arc<VoiceController>>,
    quality_available: bool,
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

impl CaptureGateBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            source: None,
            locator: None,
            client: None,
            sink: None,
            voice: None,
            quality_available: true,
        }
    }

    pub fn frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    // Output is smoothed over `quality.smoothing_window` frames.
    pub fn face_locator(mut self, locator: Box<dyn FaceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn analysis_client(mut self, client: Arc<dyn AnalysisClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn voice(mut self, voice: Arc<VoiceController>) -> Self {
        self.voice = Some(voice);
        self
    }

    // Sets the polling interval, this will override the default configuration.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.configuration.gate.poll_interval_ms = millis(interval);
        self
    }

    // Sets the stability window, this will override the default configuration.
    pub fn stability(mut self, window: Duration) -> Self {
        self.configuration.gate.stability_ms = millis(window);
        self
    }

    // Sets the "analyze now" wait ceiling, this will override the default configuration.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.configuration.gate.ready_timeout_ms = millis(timeout);
        self
    }

    // Sets the caller-side request timeout, this will override the default configuration.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.configuration.analysis.request_timeout_ms = millis(timeout);
        self
    }

    pub fn generate_audio(mut self, generate_audio: bool) -> Self {
        self.configuration.analysis.generate_audio = generate_audio;
        self
    }

    pub fn crop_to_face(mut self, crop: bool) -> Self {
        self.configuration.gate.crop_to_face = crop;
        self
    }

    /// Marks quality gating as failed to initialise; every frame is submitted
    /// without checks.
    pub fn quality_unavailable(mut self) -> Self {
        self.quality_available = false;
        self
    }

    pub fn build(self) -> Result<CaptureGate, AppError> {
        self.configuration.validate()?;
        let source = self
            .source
            .ok_or(AppError::Gate("Frame source not set".to_string()))?;
        let client = self
            .client
            .ok_or(AppError::Gate("Analysis client not set".to_string()))?;

        let capability = if self.quality_available && self.locator.is_some() {
            QualityCapability::Available
        } else {
            QualityCapability::Unavailable
        };
        let window = self.configuration.quality.smoothing_window;
        let locator = self
            .locator
            .map(|inner| Box::new(SmoothedFaceLocator::new(inner, window)) as Box<dyn FaceLocator>);

        let request_timeout = self.configuration.analysis.request_timeout();
        let inner = GateInner {
            options: GateOptions::from_configuration(&self.configuration),
            source,
            locator: Mutex::new(locator),
            quality: Mutex::new(QualityState {
                assessor: QualityAssessor::new(
                    self.configuration.quality.clone(),
                    self.configuration.gate.stability(),
                ),
                changes: SignalChangeTracker::new(),
                capability,
            }),
            stack: Mutex::new(analysis_stack(client, Some(request_timeout))),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingResultSink)),
            voice: self.voice,
            slot: SubmissionSlot::new(),
            active: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        };

        Ok(CaptureGate::new(inner))
    }
}
