//! Mock generation services for testing
//!
//! These mocks let the responder, the HTTP layer and the chat client be
//! exercised without a real model.

use super::{
    LlmConfig, LlmError, LlmRequest, LlmResponse, LlmService, ModelDef, ModelRegistry,
    ServiceFactory, TextStream, Usage,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted fragment stream
#[derive(Debug, Clone, Default)]
pub struct MockStream {
    pub fragments: Vec<String>,
    /// Emitted after the fragments, ending the stream with a failure
    pub fail_with: Option<LlmError>,
    /// Pause before every item
    pub delay: Option<Duration>,
}

impl MockStream {
    pub fn fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    pub fn failing_after(mut self, error: LlmError) -> Self {
        self.fail_with = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_text_stream(self, dropped: Arc<AtomicUsize>) -> TextStream {
        let mut items: Vec<Result<String, LlmError>> =
            self.fragments.into_iter().map(Ok).collect();
        if let Some(error) = self.fail_with {
            items.push(Err(error));
        }
        let delay = self.delay;
        let guard = DropCounter(dropped);

        let items = stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });

        // The guard lives as long as the stream does
        Box::pin(items.map(move |item| {
            let _guard = &guard;
            item
        }))
    }
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock generation service that returns queued results
pub struct MockLlmService {
    model_id: String,
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    streams: Mutex<VecDeque<Result<MockStream, LlmError>>>,
    /// Record of all requests made, single-shot and streaming
    pub requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
    streams_dropped: Arc<AtomicUsize>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            streams_dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful single-shot answer
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(LlmResponse {
            text: text.into(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }));
    }

    /// Queue a single-shot answer serialized from JSON
    pub fn queue_json(&self, value: &serde_json::Value) {
        self.queue_text(value.to_string());
    }

    /// Queue a single-shot failure
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queue a fragment stream
    pub fn queue_stream(&self, stream: MockStream) {
        self.streams.lock().unwrap().push_back(Ok(stream));
    }

    /// Queue a failure to open a stream
    pub fn queue_stream_error(&self, error: LlmError) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    /// Number of `complete` + `stream` invocations
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of handed-out streams that have been dropped
    pub fn streams_dropped(&self) -> usize {
        self.streams_dropped.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock stream queued")));
        next.map(|s| s.into_text_stream(self.streams_dropped.clone()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Registry whose every resolved service is `mock`.
///
/// `server_key` configures a process-wide default credential. The returned
/// counter records how many services the factory built.
pub fn mock_registry(
    mock: &Arc<MockLlmService>,
    server_key: Option<&str>,
) -> (Arc<ModelRegistry>, Arc<AtomicUsize>) {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let shared = mock.clone();
    let factory: ServiceFactory = Arc::new(move |_key: &str, _model: &'static ModelDef| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(shared.clone() as Arc<dyn LlmService>)
    });

    let config = LlmConfig {
        api_key: server_key.map(ToString::to_string),
        ..Default::default()
    };
    (Arc::new(ModelRegistry::with_factory(&config, factory)), built)
}
