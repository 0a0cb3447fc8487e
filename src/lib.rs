//! agent-relay: stateless HTTP relay for streaming LLM chat.
//!
//! Forwards a caller-supplied conversation to an OpenAI-compatible
//! provider and returns the reply either buffered (`POST /chat`) or as
//! a live sequence of text fragments (`POST /chat/stream`). No
//! conversation state is held between requests.

pub mod config;
pub mod message;
pub mod persona;
pub mod provider;
pub mod relay;
pub mod repl;
pub mod server;
