//! Fragment relay core.
//!
//! - [`orchestrator`]: one provider run per request, exposed as an
//!   ordered fragment channel
//! - [`aggregate`]: reduce a fragment sequence to one string (buffered path)
//! - [`forward`]: push each fragment onward as it arrives (streamed path)

pub mod aggregate;
pub mod forward;
pub mod orchestrator;

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderError;

/// One event on a run's fragment channel.
///
/// `Done` and `Failed` are terminal; the channel closes after either.
#[derive(Debug)]
pub enum RunEvent {
    /// An incremental piece of the assistant's reply.
    Fragment(String),

    /// The provider sequence ended cleanly.
    Done,

    /// The provider sequence ended in failure. Fragments delivered
    /// before this event are not retracted.
    Failed(RunError),
}

/// Why a run did not complete.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("provider run exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("output sink closed: {0}")]
    Sink(#[from] std::io::Error),
}
