use std::sync::Arc;

use runova_capture::analysis::{AnalysisClient, HttpAnalysisClient};
use runova_capture::common::{FrameSource, LatestFrameSource, StillImageSource};
use runova_capture::config::Configuration;
use runova_capture::error::AppError;
use runova_capture::gate::CaptureGate;
use runova_capture::session::Session;
use runova_capture::voice::{LoggingAudioBackend, VoiceController};
use tracing::{info, warn, Level};

const CONFIG_ENV: &str = "RUNOVA_CONFIG";

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let mut once = false;
    let mut config_path = std::env::var(CONFIG_ENV).ok();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            _ => config_path = Some(arg),
        }
    }

    let configuration = Configuration::load(config_path.as_deref())?;
    init_logging(&configuration.logging.level);

    let source: Arc<dyn FrameSource> = match &configuration.source.image_path {
        Some(path) => {
            info!("Reading frames from {}", path.display());
            Arc::new(StillImageSource::open(path)?)
        }
        None => {
            warn!("No source.image_path configured, camera frames will never be ready");
            let (_publisher, source) = LatestFrameSource::channel();
            Arc::new(source)
        }
    };

    let client = Arc::new(HttpAnalysisClient::new(&configuration.analysis)?);
    match client.health().await {
        Ok(true) => info!("Analysis endpoint at {} is healthy", client.origin()),
        Ok(false) => warn!("Analysis endpoint at {} reports unhealthy", client.origin()),
        Err(e) => warn!("Analysis endpoint health check failed: {}", e),
    }

    let session = Arc::new(Session::new(configuration.voice.enabled));
    let voice = Arc::new(VoiceController::new(
        session,
        Box::new(LoggingAudioBackend),
    ));

    // No face locator ships with the headless build.
    warn!("No face locator available, quality gating is bypassed");
    let gate = CaptureGate::builder(configuration)
        .frame_source(source)
        .analysis_client(client)
        .voice(voice)
        .build()?;

    if once {
        let outcome = gate.analyze_now().await;
        info!("Analysis finished: {:?}", outcome);
        return Ok(());
    }

    gate.start();
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    gate.shutdown().await;
    Ok(())
}
