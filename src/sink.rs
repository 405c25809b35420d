use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::analysis::AnalysisResult;
use crate::quality::QualityReport;

/// User-visible hint. Non-blocking advisories never halt the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub message: String,
    pub blocking: bool,
}

impl Advisory {
    pub fn hint(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            blocking: false,
        }
    }

    pub fn blocking(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            blocking: true,
        }
    }
}

/// Presentation boundary. The gate never knows how results are drawn.
pub trait ResultSink: Send + Sync {
    fn render(&self, result: &AnalysisResult);

    fn show_advisory(&self, advisory: &Advisory);

    /// Called only when at least one quality signal flipped since last tick.
    fn signals_changed(&self, _report: &QualityReport) {}
}

/// Writes everything to the log. Used by the headless binary.
#[derive(Debug, Default)]
pub struct TracingResultSink;

impl ResultSink for TracingResultSink {
    fn render(&self, result: &AnalysisResult) {
        if let Some(error) = &result.error {
            warn!("Analysis #{} reported: {}", result.sequence, error);
            return;
        }
        info!(
            "Analysis #{} ({} metrics, {} recommendations)",
            result.sequence,
            result.metrics.len(),
            result.recommendations.len()
        );
        for (name, value) in &result.metrics {
            info!("  {} = {:.2}", name, value);
        }
        for card in &result.recommendations {
            match &card.price {
                Some(price) => info!("  product: {} ({})", card.name, price),
                None => info!("  product: {}", card.name),
            }
        }
    }

    fn show_advisory(&self, advisory: &Advisory) {
        if advisory.blocking {
            error!("{}", advisory.message);
        } else {
            info!("{}", advisory.message);
        }
    }

    fn signals_changed(&self, report: &QualityReport) {
        let flags = report.flags();
        info!(
            "Quality: lighting={} pose={} distance={}",
            flags.lighting, flags.pose, flags.distance
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Rendered(AnalysisResult),
    Advisory(Advisory),
    SignalsChanged(QualityReport),
}

/// Forwards sink calls as events, for UI layers running on their own task.
#[derive(Debug, Clone)]
pub struct ChannelResultSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelResultSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropping sink event: {}", e);
        }
    }
}

impl ResultSink for ChannelResultSink {
    fn render(&self, result: &AnalysisResult) {
        self.send(SinkEvent::Rendered(result.clone()));
    }

    fn show_advisory(&self, advisory: &Advisory) {
        self.send(SinkEvent::Advisory(advisory.clone()));
    }

    fn signals_changed(&self, report: &QualityReport) {
        self.send(SinkEvent::SignalsChanged(report.clone()));
    }
}
