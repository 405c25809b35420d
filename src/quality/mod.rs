pub mod assessor;
pub mod lighting;
pub mod report;
pub mod stability;

pub use assessor::QualityAssessor;
pub use report::{QualityReport, QualitySignal, SignalChangeTracker, SignalFlags, SignalKind};
pub use stability::{GateState, StabilityTracker};
