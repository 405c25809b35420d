use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::gate::state::GatePhase;

/// The single submission slot guarding the network channel, together with the
/// gate phase it implies.
#[derive(Debug)]
pub struct SubmissionSlot {
    busy: AtomicBool,
    phase: AtomicU8,
}

impl SubmissionSlot {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            phase: AtomicU8::new(GatePhase::Idle as u8),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> GatePhase {
        GatePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    // Phase changes outside a held guard only move between Idle and
    // WaitingQuality; Submitting is owned by the guard.
    pub(crate) fn set_waiting(&self, waiting: bool) {
        let target = if waiting {
            GatePhase::WaitingQuality
        } else {
            GatePhase::Idle
        };
        let _ = self
            .phase
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != GatePhase::Submitting as u8).then_some(target as u8)
            });
    }

    /// Claims the slot, or `None` when a submission is already in flight.
    pub fn try_acquire(&self) -> Option<SubmissionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.phase
            .store(GatePhase::Submitting as u8, Ordering::SeqCst);
        Some(SubmissionGuard { slot: self })
    }
}

impl Default for SubmissionSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the slot when dropped: on success, on error, on panic and when the
/// owning future is cancelled.
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    slot: &'a SubmissionSlot,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.slot
            .phase
            .store(GatePhase::Idle as u8, Ordering::SeqCst);
        self.slot.busy.store(false, Ordering::SeqCst);
    }
}
