use std::time::Duration;
use tokio::time::Instant;

/// Readiness of the quality signals as seen by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// At least one signal is failing.
    AwaitingSignal,
    /// All signals pass but not yet for the full stability window.
    AllGreenPending,
    /// All signals have passed continuously for the stability window.
    AllGreenStable,
}

impl GateState {
    pub fn is_stable(self) -> bool {
        matches!(self, GateState::AllGreenStable)
    }
}

/// Hysteresis over the combined "all three signals pass" boolean.
#[derive(Debug)]
pub struct StabilityTracker {
    threshold: Duration,
    green_since: Option<Instant>,
    state: GateState,
}

impl StabilityTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            green_since: None,
            state: GateState::AwaitingSignal,
        }
    }

    pub fn update(&mut self, all_green: bool, now: Instant) -> GateState {
        self.state = if !all_green {
            self.green_since = None;
            GateState::AwaitingSignal
        } else {
            let since = *self.green_since.get_or_insert(now);
            if now.saturating_duration_since(since) >= self.threshold {
                GateState::AllGreenStable
            } else {
                GateState::AllGreenPending
            }
        };
        self.state
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn green_since(&self) -> Option<Instant> {
        self.green_since
    }

    pub fn reset(&mut self) {
        self.green_since = None;
        self.state = GateState::AwaitingSignal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn becomes_stable_only_after_threshold() {
        let start = Instant::now();
        let mut tracker = StabilityTracker::new(Duration::from_millis(500));

        assert_eq!(tracker.update(false, start), GateState::AwaitingSignal);
        let at = |ms| start + Duration::from_millis(ms);
        assert!(!tracker.update(true, at(100)).is_stable());
        assert!(!tracker.update(true, at(500)).is_stable());
        assert_eq!(tracker.update(true, at(700)), GateState::AllGreenStable);
    }

    #[test]
    fn observed_sequence_reaches_stable_at_600ms() {
        let t0 = Instant::now();
        let mut tracker = StabilityTracker::new(Duration::from_millis(500));

        let states = [
            tracker.update(false, t0 - Duration::from_millis(100)),
            tracker.update(true, t0),
            tracker.update(true, t0 + Duration::from_millis(400)),
            tracker.update(true, t0 + Duration::from_millis(600)),
        ];

        assert_eq!(states[0], GateState::AwaitingSignal);
        assert_eq!(states[1], GateState::AllGreenPending);
        assert_eq!(states[2], GateState::AllGreenPending);
        assert!(!states[2].is_stable());
        assert_eq!(states[3], GateState::AllGreenStable);
    }

    #[test]
    fn single_failure_restarts_the_window() {
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);
        let mut tracker = StabilityTracker::new(Duration::from_millis(500));

        tracker.update(true, at(0));
        tracker.update(true, at(400));
        assert_eq!(tracker.update(false, at(450)), GateState::AwaitingSignal);
        assert!(tracker.green_since().is_none());

        tracker.update(true, at(500));
        assert!(!tracker.update(true, at(900)).is_stable());
        assert!(tracker.update(true, at(1000)).is_stable());
    }
}
