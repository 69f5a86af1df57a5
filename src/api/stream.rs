//! Chunked text streaming
//!
//! Each relayed fragment becomes one chunk of a `text/plain` body. A relay
//! error aborts the body without a terminating chunk, which is how clients
//! learn the answer is incomplete.

use super::DELIVERY_HEADER;
use crate::tutor::{DeliveryMode, FragmentRelay};
use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub fn text_response(relay: FragmentRelay) -> Response {
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE)),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ),
        (
            HeaderName::from_static(DELIVERY_HEADER),
            HeaderValue::from_static(DeliveryMode::Stream.as_str()),
        ),
    ];
    (headers, Body::from_stream(relay)).into_response()
}
