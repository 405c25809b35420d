use std::sync::atomic::{AtomicBool, Ordering};

/// Per-kiosk interaction state shared by the gate and voice playback.
#[derive(Debug)]
pub struct Session {
    voice_allowed: AtomicBool,
    recording: AtomicBool,
}

impl Session {
    pub fn new(voice_allowed: bool) -> Self {
        Self {
            voice_allowed: AtomicBool::new(voice_allowed),
            recording: AtomicBool::new(false),
        }
    }

    pub fn voice_allowed(&self) -> bool {
        self.voice_allowed.load(Ordering::SeqCst)
    }

    pub fn set_voice_allowed(&self, allowed: bool) {
        self.voice_allowed.store(allowed, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::SeqCst);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(true)
    }
}
