//! Upstream language-model provider boundary.
//!
//! - [`openai`]: streaming client for OpenAI-compatible chat APIs
//! - [`sse`]: incremental Server-Sent Events draining
//!
//! The rest of the system depends only on [`ProviderClient`]; tests
//! substitute a scripted implementation.

pub mod openai;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use thiserror::Error;

use crate::message::Message;
use crate::persona::Persona;

/// One tagged event from the provider's event sequence.
///
/// Only [`ProviderEvent::TextDelta`] carries reply text; every other
/// kind must be safely ignored by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// An incremental piece of generated text.
    TextDelta(String),

    /// First-chunk role announcement (no text).
    RoleAnnounce,

    /// A tool-call fragment; this relay does not execute tools.
    ToolCallDelta,

    /// Explicit end-of-generation marker.
    Done,

    /// Any event kind this relay does not model.
    Other,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider connection failed: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A lazy, finite sequence of provider events.
///
/// Pull-based: nothing is produced until polled, and dropping the
/// stream releases the upstream connection.
pub type ProviderEventStream =
    Pin<Box<dyn Stream<Item = Result<ProviderEvent, ProviderError>> + Send>>;

/// A client that can run one streamed chat completion.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Start a generation for `history` under `persona` and return the
    /// event stream. Errors returned here happened before any event was
    /// produced (connection refused, auth rejection, bad status).
    async fn stream_chat(
        &self,
        persona: &Persona,
        history: &[Message],
    ) -> Result<ProviderEventStream, ProviderError>;
}
