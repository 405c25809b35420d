use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{BoxError, Service, ServiceBuilder};

use crate::analysis::client::AnalysisClient;
use crate::analysis::request::AnalysisRequest;
use crate::analysis::result::AnalysisResult;
use crate::error::AnalysisError;

/// Submission stack the gate calls into: the client behind an optional
/// caller-side timeout, with every failure folded back into [`AnalysisError`].
pub type AnalysisStack = BoxCloneService<AnalysisRequest, AnalysisResult, AnalysisError>;

#[derive(Clone)]
pub struct AnalysisService {
    inner: Arc<dyn AnalysisClient>,
}

impl AnalysisService {
    pub fn new(inner: Arc<dyn AnalysisClient>) -> Self {
        Self { inner }
    }
}

impl Service<AnalysisRequest> for AnalysisService {
    type Response = AnalysisResult;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AnalysisRequest) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.submit(req).await.map_err(BoxError::from) })
    }
}

pub fn analysis_stack(client: Arc<dyn AnalysisClient>, timeout: Option<Duration>) -> AnalysisStack {
    let service = ServiceBuilder::new()
        .map_err(classify_error as fn(BoxError) -> AnalysisError)
        .option_layer(timeout.map(TimeoutLayer::new))
        .service(AnalysisService::new(client));
    BoxCloneService::new(service)
}

fn classify_error(error: BoxError) -> AnalysisError {
    if error.is::<Elapsed>() {
        return AnalysisError::Timeout;
    }
    match error.downcast::<AnalysisError>() {
        Ok(error) => *error,
        Err(other) => AnalysisError::Network(other.to_string()),
    }
}
