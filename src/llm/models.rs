//! Gemini model catalogue
//!
//! All model definitions live here so adding a model is a one-line change.

/// Model definition with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-2.0-flash")
    pub id: &'static str,
    /// API name used in the request path
    pub api_name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Context window size in tokens
    pub context_window: usize,
}

/// Model used when `DEFAULT_MODEL` is unset or unknown
pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash";

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.0-flash",
            api_name: "gemini-2.0-flash",
            description: "Gemini 2.0 Flash (fast tutoring default)",
            context_window: 1_048_576,
        },
        ModelDef {
            id: "gemini-2.5-flash",
            api_name: "gemini-2.5-flash",
            description: "Gemini 2.5 Flash (newer, balanced)",
            context_window: 1_048_576,
        },
        ModelDef {
            id: "gemini-2.5-pro",
            api_name: "gemini-2.5-pro",
            description: "Gemini 2.5 Pro (deeper reasoning, slower)",
            context_window: 1_048_576,
        },
    ]
}

/// Look up a model by its user-facing ID
pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    all_models().iter().find(|m| m.id == id)
}
