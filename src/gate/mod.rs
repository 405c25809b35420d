pub mod builder;
pub mod capture_gate;
pub mod in_flight;
pub mod state;


pub use builder::CaptureGateBuilder;
pub use capture_gate::{CaptureGate, QualityCapability};
pub use in_flight::{SubmissionGuard, SubmissionSlot};
pub use state::{GatePhase, TickOutcome, Trigger};
