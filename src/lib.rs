//! GyanMitra - adaptive AI tutor
//!
//! A server-side responder that answers student questions through a Gemini
//! model, shaped by a lightweight student profile, plus the client-side
//! conversation state that consumes its answers.

pub mod api;
pub mod client;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod tutor;
