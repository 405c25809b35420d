use crate::error::AnalysisError;

/// Where the gate is in its IDLE → WAITING_QUALITY → SUBMITTING cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatePhase {
    Idle = 0,
    WaitingQuality = 1,
    Submitting = 2,
}

impl GatePhase {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => GatePhase::WaitingQuality,
            2 => GatePhase::Submitting,
            _ => GatePhase::Idle,
        }
    }
}

/// What a single tick (or an "analyze now" request) ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The polling loop is stopped.
    Inactive,
    /// Another submission is still in flight.
    Busy,
    /// The camera has not produced a usable frame yet.
    NotReady,
    /// Quality gating failed; the reason was shown as an advisory.
    Rejected { reason: String },
    /// The result was handed to the sink.
    Rendered { sequence: u64 },
    /// The gate was stopped while the request was in flight.
    Discarded { sequence: u64 },
    /// The submission failed and the frame was dropped.
    Failed { sequence: u64, error: AnalysisError },
}

impl TickOutcome {
    pub fn submitted(&self) -> bool {
        matches!(
            self,
            TickOutcome::Rendered { .. }
                | TickOutcome::Discarded { .. }
                | TickOutcome::Failed { .. }
        )
    }
}

/// Which entry point asked for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Poll,
    AnalyzeNow,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Poll => "poll",
            Trigger::AnalyzeNow => "analyze_now",
        }
    }
}
