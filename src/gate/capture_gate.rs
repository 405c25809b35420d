use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, info, instrument, warn, Span};

use crate::analysis::{AnalysisRequest, AnalysisResult, AnalysisStack, ImagePayload};
use crate::common::{Frame, FrameSource, Landmarks};
use crate::config::Configuration;
use crate::error::{FaceLocatorError, VoiceError};
use crate::face::{crop_to_face, FaceLocator};
use crate::gate::builder::CaptureGateBuilder;
use crate::gate::in_flight::SubmissionSlot;
use crate::gate::state::{GatePhase, TickOutcome, Trigger};
use crate::quality::{GateState, QualityAssessor, SignalChangeTracker};
use crate::sink::{Advisory, ResultSink};
use crate::voice::VoiceController;

/// Whether quality gating can run at all. When the face locator cannot
/// initialise, frames go straight to submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCapability {
    Available,
    Unavailable,
}

#[derive(Debug, Clone)]
pub(crate) struct GateOptions {
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
    pub crop_to_face: bool,
    pub crop_margin: f32,
    pub throttle: bool,
    pub generate_audio: bool,
    pub jpeg_quality: u8,
}

impl GateOptions {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            poll_interval: configuration.gate.poll_interval(),
            ready_timeout: configuration.gate.ready_timeout(),
            ready_poll: configuration.gate.ready_poll(),
            crop_to_face: configuration.gate.crop_to_face,
            crop_margin: configuration.gate.crop_margin,
            throttle: configuration.analysis.throttle,
            generate_audio: configuration.analysis.generate_audio,
            jpeg_quality: configuration.analysis.jpeg_quality,
        }
    }
}

pub(crate) struct QualityState {
    pub assessor: QualityAssessor,
    pub changes: SignalChangeTracker,
    pub capability: QualityCapability,
}

enum Validation {
    Passed {
        landmarks: Option<Landmarks>,
        state: GateState,
    },
    Failed {
        reason: String,
        landmarks: Option<Landmarks>,
    },
    Bypassed,
}

pub(crate) struct GateInner {
    pub options: GateOptions,
    pub source: Arc<dyn FrameSource>,
    pub locator: Mutex<Option<Box<dyn FaceLocator>>>,
    pub quality: Mutex<QualityState>,
    pub stack: Mutex<AnalysisStack>,
    pub sink: Arc<dyn ResultSink>,
    pub voice: Option<Arc<VoiceController>>,
    pub slot: SubmissionSlot,
    pub active: AtomicBool,
    pub epoch: AtomicU64,
    pub sequence: AtomicU64,
}

// A panicking sink or locator must not wedge the gate behind a poisoned lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GateInner {
    fn ready_frame(&self) -> Option<Frame> {
        self.source.current_frame().filter(Frame::is_ready)
    }

    fn capability(&self) -> QualityCapability {
        lock(&self.quality).capability
    }

    fn locate(&self, frame: &Frame) -> Result<Option<Landmarks>, FaceLocatorError> {
        let mut locator = lock(&self.locator);
        match locator.as_mut() {
            Some(locator) => locator.locate(frame),
            None => Err(FaceLocatorError::Unavailable(
                "no face locator configured".to_string(),
            )),
        }
    }

    fn evaluate(&self, frame: &Frame) -> Validation {
        if self.capability() == QualityCapability::Unavailable {
            return Validation::Bypassed;
        }

        let landmarks = match self.locate(frame) {
            Ok(landmarks) => landmarks,
            Err(FaceLocatorError::Unavailable(reason)) => {
                warn!("Face locator unavailable ({}), bypassing quality gate", reason);
                lock(&self.quality).capability = QualityCapability::Unavailable;
                return Validation::Bypassed;
            }
            Err(FaceLocatorError::Failed(reason)) => {
                debug!("Face location failed on this frame: {}", reason);
                None
            }
        };

        let (report, changed) = {
            let mut quality = lock(&self.quality);
            let report = quality
                .assessor
                .assess(frame, landmarks.as_ref(), Instant::now());
            let changed = quality.changes.changed(&report);
            (report, changed)
        };
        if changed {
            self.sink.signals_changed(&report);
        }

        if report.all_green() {
            Validation::Passed {
                landmarks,
                state: report.state,
            }
        } else {
            let reason = report
                .failure_reason()
                .unwrap_or("Adjusting camera")
                .to_string();
            Validation::Failed { reason, landmarks }
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        // Read before `active` so a concurrent stop is always noticed.
        let epoch = self.epoch.load(Ordering::SeqCst);
        if !self.active.load(Ordering::SeqCst) {
            return TickOutcome::Inactive;
        }
        if self.slot.is_busy() {
            debug!("Submission in flight, skipping tick");
            return TickOutcome::Busy;
        }
        let Some(frame) = self.ready_frame() else {
            debug!("Camera not ready, skipping tick");
            return TickOutcome::NotReady;
        };

        self.slot.set_waiting(true);
        let landmarks = match self.evaluate(&frame) {
            Validation::Bypassed => None,
            Validation::Passed { landmarks, .. } => landmarks,
            Validation::Failed { reason, .. } => {
                self.slot.set_waiting(false);
                self.sink.show_advisory(&Advisory::hint(reason.clone()));
                return TickOutcome::Rejected { reason };
            }
        };

        self.submit(frame, landmarks, Trigger::Poll, epoch).await
    }

    pub async fn analyze_now(&self) -> TickOutcome {
        let epoch = self.epoch.load(Ordering::SeqCst);
        if self.slot.is_busy() {
            return TickOutcome::Busy;
        }

        let deadline = Instant::now() + self.options.ready_timeout;
        let mut latest: Option<(Frame, Option<Landmarks>)> = None;
        self.slot.set_waiting(true);

        loop {
            if let Some(frame) = self.ready_frame() {
                match self.evaluate(&frame) {
                    Validation::Bypassed => {
                        return self.submit(frame, None, Trigger::AnalyzeNow, epoch).await;
                    }
                    Validation::Passed { landmarks, state } if state.is_stable() => {
                        return self
                            .submit(frame, landmarks, Trigger::AnalyzeNow, epoch)
                            .await;
                    }
                    Validation::Passed { landmarks, .. } | Validation::Failed { landmarks, .. } => {
                        latest = Some((frame, landmarks));
                    }
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.options.ready_poll).await;
        }

        match latest {
            Some((frame, landmarks)) => {
                info!(
                    "Quality did not settle within {:?}, analyzing anyway",
                    self.options.ready_timeout
                );
                self.submit(frame, landmarks, Trigger::AnalyzeNow, epoch)
                    .await
            }
            None => {
                self.slot.set_waiting(false);
                TickOutcome::NotReady
            }
        }
    }

    #[instrument(
        skip_all,
        fields(trigger = trigger.as_str(), sequence = tracing::field::Empty)
    )]
    async fn submit(
        &self,
        frame: Frame,
        landmarks: Option<Landmarks>,
        trigger: Trigger,
        epoch: u64,
    ) -> TickOutcome {
        // Held until this function returns, whichever branch it takes.
        let Some(_guard) = self.slot.try_acquire() else {
            debug!("Lost the race for the submission slot");
            return TickOutcome::Busy;
        };

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Span::current().record("sequence", sequence);

        let frame_id = frame.frame_id();
        let frame = match (&landmarks, self.options.crop_to_face) {
            (Some(landmarks), true) => {
                crop_to_face(&frame, &landmarks.bounds, self.options.crop_margin)
            }
            _ => frame,
        };

        let payload = match ImagePayload::encode(&frame, self.options.jpeg_quality) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("Dropping frame #{}: {}", sequence, error);
                return TickOutcome::Failed { sequence, error };
            }
        };

        info!(
            "Submitting frame #{} ({}x{}, {} bytes)",
            sequence,
            frame.width(),
            frame.height(),
            payload.bytes().len()
        );
        let request = AnalysisRequest {
            frame_id,
            sequence,
            payload,
            throttle: self.options.throttle,
            generate_audio: self.options.generate_audio,
        };

        let service = lock(&self.stack).clone();
        match service.oneshot(request).await {
            Ok(result) => self.deliver(result, epoch),
            Err(error) => {
                warn!("Analysis #{} failed, dropping frame: {}", sequence, error);
                TickOutcome::Failed { sequence, error }
            }
        }
    }

    fn deliver(&self, result: AnalysisResult, epoch: u64) -> TickOutcome {
        let sequence = result.sequence;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            info!("Gate stopped while #{} was in flight, discarding result", sequence);
            return TickOutcome::Discarded { sequence };
        }

        self.sink.render(&result);

        if self.options.generate_audio && result.is_success() {
            if let (Some(voice), Some(url)) = (&self.voice, &result.audio_url) {
                match voice.play(url) {
                    Ok(()) => {}
                    Err(VoiceError::Blocked) => debug!("Voice blocked for #{}", sequence),
                    Err(e) => warn!("Voice playback for #{} failed: {}", sequence, e),
                }
            }
        }

        TickOutcome::Rendered { sequence }
    }
}

struct PollingLoop {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

/// Decides, once per polling tick or on an explicit request, whether to send
/// the current camera frame for analysis. At most one submission is ever in
/// flight.
pub struct CaptureGate {
    inner: Arc<GateInner>,
    polling: Mutex<Option<PollingLoop>>,
}

impl CaptureGate {
    pub(crate) fn new(inner: GateInner) -> Self {
        Self {
            inner: Arc::new(inner),
            polling: Mutex::new(None),
        }
    }

    pub fn builder(configuration: Configuration) -> CaptureGateBuilder {
        CaptureGateBuilder::new(configuration)
    }

    /// Starts the polling loop. Must be called from within a tokio runtime.
    /// Calling it while already running does nothing.
    pub fn start(&self) {
        let mut polling = lock(&self.polling);
        if polling.is_some() {
            debug!("Capture gate already running");
            return;
        }

        self.inner.active.store(true, Ordering::SeqCst);
        let cancel_token = CancellationToken::new();
        let task = Self::start_polling_task(self.inner.clone(), cancel_token.clone());
        *polling = Some(PollingLoop { cancel_token, task });
        info!(
            "Capture gate started, polling every {:?}",
            self.inner.options.poll_interval
        );
    }

    fn start_polling_task(
        inner: Arc<GateInner>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = inner.options.poll_interval;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = interval.tick() => {
                        // Ticks run detached so a slow response never delays the
                        // schedule; the submission slot keeps them from overlapping.
                        let inner = inner.clone();
                        tokio::spawn(async move {
                            let outcome = inner.tick().await;
                            debug!("Tick finished: {:?}", outcome);
                        });
                    }
                }
            }
            debug!("Polling task exited");
        })
    }

    /// Stops the loop. A submission already in flight completes, but its
    /// result is discarded. Calling it when not running does nothing.
    pub fn stop(&self) {
        if let Some(polling) = self.halt() {
            polling.task.abort();
        }
    }

    /// Like [`Self::stop`], but waits for the polling task to exit.
    pub async fn shutdown(&self) {
        if let Some(polling) = self.halt() {
            if let Err(e) = polling.task.await {
                if !e.is_cancelled() {
                    warn!("Polling task ended abnormally: {}", e);
                }
            }
        }
    }

    fn halt(&self) -> Option<PollingLoop> {
        let polling = lock(&self.polling).take()?;
        self.inner.active.store(false, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        polling.cancel_token.cancel();
        info!("Capture gate stopped");
        Some(polling)
    }

    /// Runs one polling tick by hand.
    pub async fn tick(&self) -> TickOutcome {
        self.inner.tick().await
    }

    /// Waits (bounded) for stable quality, then submits. Falls back to
    /// submitting the latest frame when the wait times out or quality gating
    /// is unavailable.
    pub async fn analyze_now(&self) -> TickOutcome {
        self.inner.analyze_now().await
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> bool {
        self.inner.slot.is_busy()
    }

    pub fn phase(&self) -> GatePhase {
        self.inner.slot.phase()
    }

    pub fn quality_capability(&self) -> QualityCapability {
        self.inner.capability()
    }

    pub fn quality_state(&self) -> GateState {
        lock(&self.inner.quality).assessor.state()
    }
}

impl Drop for CaptureGate {
    fn drop(&mut self) {
        self.stop();
    }
}
