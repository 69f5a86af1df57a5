//! Credential-aware access to generation services
//!
//! The process-wide default service is built once at startup and never
//! mutated. A credential supplied with a request always gets its own,
//! freshly built service that lives only as long as that request, so no
//! configuration is ever shared between concurrent requests.

use super::{
    all_models, find_model, GeminiService, LlmError, LlmService, LoggingService, ModelDef,
    DEFAULT_MODEL_ID,
};
use std::sync::Arc;

/// Builds a service for one credential
pub type ServiceFactory =
    Arc<dyn Fn(&str, &'static ModelDef) -> Result<Arc<dyn LlmService>, LlmError> + Send + Sync>;

/// Configuration for the generation capability
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Process-wide default credential
    pub api_key: Option<String>,
    /// Override of the Gemini API base URL (gateways, local fakes)
    pub base_url: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
        }
    }
}

/// Resolves which generation service answers a request
pub struct ModelRegistry {
    model: &'static ModelDef,
    default_service: Option<Arc<dyn LlmService>>,
    factory: ServiceFactory,
}

impl ModelRegistry {
    /// Registry backed by the real Gemini API
    pub fn new(config: &LlmConfig) -> Self {
        let base_url = config.base_url.clone();
        let factory: ServiceFactory = Arc::new(move |api_key: &str, model: &'static ModelDef| {
            let service = GeminiService::new(api_key.to_string(), model, base_url.as_deref())?;
            Ok(Arc::new(service) as Arc<dyn LlmService>)
        });
        Self::with_factory(config, factory)
    }

    /// Registry with a custom service factory
    pub fn with_factory(config: &LlmConfig, factory: ServiceFactory) -> Self {
        let model = config
            .default_model
            .as_deref()
            .and_then(|id| {
                let found = find_model(id);
                if found.is_none() {
                    tracing::warn!(model = %id, "Unknown DEFAULT_MODEL, using {DEFAULT_MODEL_ID}");
                }
                found
            })
            .or_else(|| find_model(DEFAULT_MODEL_ID))
            .unwrap_or(&all_models()[0]);

        let default_service = config.api_key.as_deref().and_then(|key| {
            match Self::build(&factory, key, model) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create default generation service");
                    None
                }
            }
        });

        Self {
            model,
            default_service,
            factory,
        }
    }

    fn build(
        factory: &ServiceFactory,
        api_key: &str,
        model: &'static ModelDef,
    ) -> Result<Arc<dyn LlmService>, LlmError> {
        let service = factory(api_key, model)?;
        Ok(Arc::new(LoggingService::new(service)))
    }

    /// Pick the service for one request.
    ///
    /// A non-blank request credential wins and gets an isolated instance;
    /// otherwise the process-wide default is used. With neither available
    /// this fails with an auth error before anything is generated.
    pub fn resolve(&self, credential: Option<&str>) -> Result<Arc<dyn LlmService>, LlmError> {
        match credential.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::build(&self.factory, key, self.model),
            None => self.default_service.clone().ok_or_else(|| {
                LlmError::auth(
                    "No API key configured. Provide `apiKey` in the request or set GOOGLE_API_KEY on the server.",
                )
            }),
        }
    }

    /// Whether a process-wide credential is available
    pub fn has_default_credential(&self) -> bool {
        self.default_service.is_some()
    }

    /// The model every service is built for
    pub fn model(&self) -> &'static ModelDef {
        self.model
    }
}
