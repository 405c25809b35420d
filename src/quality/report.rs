use crate::quality::stability::GateState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Lighting,
    Pose,
    Distance,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Lighting => "lighting",
            SignalKind::Pose => "pose",
            SignalKind::Distance => "distance",
        }
    }
}

/// One measured pass/fail signal with an optional user-facing reason.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySignal {
    pub kind: SignalKind,
    pub passed: bool,
    pub reason: Option<String>,
}

impl QualitySignal {
    pub fn pass(kind: SignalKind) -> Self {
        Self {
            kind,
            passed: true,
            reason: None,
        }
    }

    pub fn fail(kind: SignalKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// The three signals measured on one tick plus the resulting gate state.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub lighting: QualitySignal,
    pub pose: QualitySignal,
    pub distance: QualitySignal,
    pub state: GateState,
}

impl QualityReport {
    pub fn all_green(&self) -> bool {
        self.lighting.passed && self.pose.passed && self.distance.passed
    }

    pub fn signals(&self) -> [&QualitySignal; 3] {
        [&self.lighting, &self.pose, &self.distance]
    }

    /// First failure reason, in lighting/pose/distance order.
    pub fn failure_reason(&self) -> Option<&str> {
        self.signals()
            .into_iter()
            .find(|s| !s.passed)
            .map(|s| s.reason.as_deref().unwrap_or(s.kind.as_str()))
    }

    pub fn flags(&self) -> SignalFlags {
        SignalFlags {
            lighting: self.lighting.passed,
            pose: self.pose.passed,
            distance: self.distance.passed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalFlags {
    pub lighting: bool,
    pub pose: bool,
    pub distance: bool,
}

/// Remembers the previous tick's booleans so UI updates only happen when a
/// signal actually flips.
#[derive(Debug, Default)]
pub struct SignalChangeTracker {
    previous: Option<SignalFlags>,
}

impl SignalChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(&mut self, report: &QualityReport) -> bool {
        let flags = report.flags();
        let changed = self.previous != Some(flags);
        self.previous = Some(flags);
        changed
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
