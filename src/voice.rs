use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::VoiceError;
use crate::session::Session;

/// Device-specific audio output.
pub trait AudioBackend: Send {
    fn start(&mut self, url: &str) -> Result<(), VoiceError>;
    fn stop(&mut self);
}

/// Backend for headless runs: playback requests are only logged.
#[derive(Debug, Default)]
pub struct LoggingAudioBackend;

impl AudioBackend for LoggingAudioBackend {
    fn start(&mut self, url: &str) -> Result<(), VoiceError> {
        info!("Playing voice response {}", url);
        Ok(())
    }

    fn stop(&mut self) {
        debug!("Voice playback stopped");
    }
}

struct Slot {
    backend: Box<dyn AudioBackend>,
    current: Option<String>,
}

/// Single process-wide playback slot. Starting new audio always releases the
/// previous one first.
pub struct VoiceController {
    session: Arc<Session>,
    slot: Mutex<Slot>,
}

impl VoiceController {
    pub fn new(session: Arc<Session>, backend: Box<dyn AudioBackend>) -> Self {
        Self {
            session,
            slot: Mutex::new(Slot {
                backend,
                current: None,
            }),
        }
    }

    pub fn play(&self, url: &str) -> Result<(), VoiceError> {
        // Read at the moment of intent; the flag can change between results.
        if !self.session.voice_allowed() || self.session.is_recording() {
            debug!("Voice blocked, skipping {}", url);
            return Err(VoiceError::Blocked);
        }

        let mut slot = self
            .slot
            .lock()
            .map_err(|_| VoiceError::Backend("playback slot poisoned".to_string()))?;
        if slot.current.take().is_some() {
            slot.backend.stop();
        }
        match slot.backend.start(url) {
            Ok(()) => {
                slot.current = Some(url.to_string());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start voice playback: {}", e);
                Err(e)
            }
        }
    }

    pub fn stop(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.current.take().is_some() {
                slot.backend.stop();
            }
        }
    }

    pub fn now_playing(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.current.clone())
    }
}
