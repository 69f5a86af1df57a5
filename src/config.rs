//! Server configuration from environment variables

use crate::llm::LlmConfig;
use crate::tutor::{DeliveryMode, GenerationSettings};

const DEFAULT_PORT: u16 = 9002;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Discipline of `POST /api/chat`
    pub delivery: DeliveryMode,
    pub generation: GenerationSettings,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let port = var("GYANMITRA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let delivery = match var("GYANMITRA_DELIVERY") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Invalid GYANMITRA_DELIVERY, streaming answers");
                DeliveryMode::Stream
            }),
            None => DeliveryMode::Stream,
        };

        let max_tokens = var("GYANMITRA_MAX_OUTPUT_TOKENS")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        Self {
            port,
            delivery,
            generation: GenerationSettings {
                max_tokens: Some(max_tokens),
                ..GenerationSettings::default()
            },
            llm: LlmConfig::from_env(),
        }
    }
}
