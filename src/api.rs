//! HTTP API for the GyanMitra tutor

mod handlers;
mod stream;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::tutor::{DeliveryMode, TutorResponder};
use std::sync::Arc;

/// Header naming the delivery discipline of a `/api/chat` response
pub const DELIVERY_HEADER: &str = "x-tutor-delivery";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<TutorResponder>,
    /// Discipline of `POST /api/chat`
    pub delivery: DeliveryMode,
}

impl AppState {
    pub fn new(responder: Arc<TutorResponder>, delivery: DeliveryMode) -> Self {
        Self {
            responder,
            delivery,
        }
    }
}
