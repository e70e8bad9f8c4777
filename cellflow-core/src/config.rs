//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Per-engine settings.
///
/// Every field has a default, so a partial document deserializes.
///
/// ```rust,ignore
/// let config: EngineConfig = serde_json::from_str(r#"{ "label": "editor" }"#)?;
/// let engine = Engine::with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name attached to the engine's tracing spans.
    pub label: String,

    /// Memoize execution plans per root set. Turning this off recomputes
    /// the plan on every publish, with identical results.
    pub cache_plans: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            label: String::from("engine"),
            cache_plans: true,
        }
    }
}
