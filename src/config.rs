//! Runtime configuration for agent-relay.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. The provider API key is never stored in the file;
//! it is resolved from the environment (optionally via `.env`).

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "agent-relay", about = "Stateless streaming LLM chat relay")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Run the terminal chat loop instead of the HTTP server.
    #[arg(long)]
    pub repl: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream provider configuration.
    pub provider: ProviderConfig,

    /// Agent persona.
    pub persona: PersonaConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Upper bound on total provider latency for one request, in seconds.
    pub request_timeout_secs: u64,

    /// Single allow-listed CORS origin. `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 300,
            cors_allow_origin: None,
        }
    }
}

/// Upstream language-model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Persona settings as they appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub instructions: String,
    pub model: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "sidra's Agent".to_string(),
            instructions: "You are a helpful and knowledgeable language learning assistant. \
                Your goal is to help users improve their language skills through clear explanations, \
                practice exercises, vocabulary guidance, grammar rules, and answering language-related questions. \
                Always stay focused on language learning topics and provide responses in a supportive and easy-to-understand way. \
                You can assist with all types of languages and provide information about what a word means in english, \
                including translations and context-based meanings across various languages."
                .to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Build the shared persona value from the persona section.
    pub fn persona(&self) -> Persona {
        Persona::new(
            &self.persona.name,
            &self.persona.instructions,
            &self.persona.model,
        )
    }

    /// Resolve the provider API key from the configured environment
    /// variable. A missing or empty key is a fatal configuration error.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        match std::env::var(&self.provider.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!(
                "{} is missing. Add it to your environment or .env file.",
                self.provider.api_key_env
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.server.request_timeout_secs, 300);
        assert_eq!(cfg.provider.api_key_env, "GEMINI_API_KEY");
        assert!(cfg.server.cors_allow_origin.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"server": {"listen": "127.0.0.1:9000"}}"#).unwrap();
        assert_eq!(cfg.server.listen, "127.0.0.1:9000");
        assert_eq!(cfg.server.request_timeout_secs, 300);
        assert_eq!(cfg.persona.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_persona_from_config() {
        let cfg = Config::default();
        let persona = cfg.persona();
        assert_eq!(persona.model, "gemini-2.0-flash");
        assert!(persona.instructions.contains("language learning"));
    }
}
