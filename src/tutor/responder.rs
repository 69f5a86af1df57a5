//! Tutor responder
//!
//! Validates a request, resolves the generation service for its credential,
//! and delivers the answer either single-shot or as a relayed stream.
//! Nothing here retries: a failed or partially streamed answer goes back to
//! the caller as is.

use super::prompt::{build_request, GenerationSettings};
use super::shaping::{shape, RawAnswer, TurnKind};
use super::{DeliveryMode, TutorAnswer, TutorError, TutorRequest};
use crate::llm::{ModelRegistry, TextStream};
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

/// Answers tutor requests. Holds no per-request state.
pub struct TutorResponder {
    registry: Arc<ModelRegistry>,
    settings: GenerationSettings,
}

impl TutorResponder {
    pub fn new(registry: Arc<ModelRegistry>, settings: GenerationSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Single-shot delivery: wait for the complete structured answer.
    ///
    /// Any failure is one error; partial output is never exposed.
    pub async fn answer(
        &self,
        request: &TutorRequest,
        credential: Option<&str>,
    ) -> Result<TutorAnswer, TutorError> {
        request.validate()?;
        let service = self.registry.resolve(credential)?;

        let kind = TurnKind::of(request.history.len());
        let llm_request = build_request(request, DeliveryMode::Single, self.settings);
        let response = service.complete(&llm_request).await?;

        let raw = RawAnswer::parse(&response.text)?;
        let answer = shape(kind, raw).inspect_err(|e| {
            tracing::warn!(turn = ?kind, error = %e, "Model answer violated shaping rules");
        })?;

        tracing::info!(
            turn = ?kind,
            difficulty = answer.difficulty.as_deref().unwrap_or("-"),
            explanation = answer.explanation.is_some(),
            "Tutor answer ready"
        );
        Ok(answer)
    }

    /// Streaming delivery: open the fragment sequence and relay it.
    ///
    /// Errors returned here happen before any fragment exists. Failures after
    /// that surface as the relay's final item.
    pub async fn stream(
        &self,
        request: &TutorRequest,
        credential: Option<&str>,
    ) -> Result<FragmentRelay, TutorError> {
        request.validate()?;
        let service = self.registry.resolve(credential)?;

        let llm_request = build_request(request, DeliveryMode::Stream, self.settings);
        let upstream = service.stream(&llm_request).await?;

        tracing::debug!(
            turn = ?TurnKind::of(request.history.len()),
            model = service.model_id(),
            "Tutor stream opened"
        );
        Ok(FragmentRelay::new(upstream))
    }
}

/// Relays upstream fragments in order, one item per non-empty fragment.
///
/// An upstream failure becomes the last item. Dropping the relay drops the
/// upstream sequence with it.
pub struct FragmentRelay {
    upstream: Option<TextStream>,
    fragments: usize,
    bytes: usize,
    started: Instant,
    span: tracing::Span,
}

impl FragmentRelay {
    pub fn new(upstream: TextStream) -> Self {
        Self {
            upstream: Some(upstream),
            fragments: 0,
            bytes: 0,
            started: Instant::now(),
            span: tracing::Span::current(),
        }
    }

    /// Number of fragments relayed so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }
}

impl Stream for FragmentRelay {
    type Item = Result<String, TutorError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _entered = this.span.enter();

        let Some(upstream) = this.upstream.as_mut() else {
            return Poll::Ready(None);
        };

        loop {
            match upstream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(fragment))) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    this.fragments += 1;
                    this.bytes += fragment.len();
                    return Poll::Ready(Some(Ok(fragment)));
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(
                        fragments = this.fragments,
                        duration_ms = %this.started.elapsed().as_millis(),
                        error = %e,
                        "Tutor stream failed"
                    );
                    this.upstream = None;
                    let err = if this.fragments == 0 {
                        TutorError::from(e)
                    } else {
                        TutorError::Transport(e.message)
                    };
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    tracing::info!(
                        fragments = this.fragments,
                        bytes = this.bytes,
                        duration_ms = %this.started.elapsed().as_millis(),
                        "Tutor stream completed"
                    );
                    this.upstream = None;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for FragmentRelay {
    fn drop(&mut self) {
        if self.upstream.is_some() {
            let _entered = self.span.enter();
            tracing::info!(
                fragments = self.fragments,
                "Caller went away mid-stream, releasing upstream"
            );
        }
    }
}
