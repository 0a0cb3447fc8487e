//! Persona: a fixed instruction string bound to a model identity.
//!
//! Constructed once at process start and shared read-only across all
//! concurrent requests; immutability is the whole thread-safety story.

use serde::{Deserialize, Serialize};

/// Immutable agent identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, used only for logging.
    pub name: String,

    /// System instructions prepended to every provider call.
    pub instructions: String,

    /// Provider-side model identifier.
    pub model: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
        }
    }
}
