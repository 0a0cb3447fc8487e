//! Run orchestrator: one provider call per request, streamed out as an
//! ordered channel of text fragments.
//!
//! The orchestrator does no buffering of its own. Each text delta is
//! forwarded the moment the provider produces it; non-text events are
//! filtered out. If the receiving side goes away (client disconnect),
//! the send fails, the task returns, and dropping the provider stream
//! tears down the upstream connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::Message;
use crate::persona::Persona;
use crate::provider::{ProviderClient, ProviderEvent};
use crate::relay::{RunError, RunEvent};

/// Starts provider runs and hands their output to consumers.
pub struct Orchestrator {
    provider: Arc<dyn ProviderClient>,
    persona: Arc<Persona>,
    run_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        persona: Arc<Persona>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            persona,
            run_timeout,
        }
    }

    /// Run one generation over `history`, streaming fragments to the
    /// returned receiver.
    ///
    /// The receiver sees zero or more `Fragment`s followed by exactly
    /// one terminal event (`Done` or `Failed`). The whole run is
    /// bounded by the configured timeout.
    pub fn run(&self, history: Vec<Message>) -> mpsc::Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel(32);

        let provider = self.provider.clone();
        let persona = self.persona.clone();
        let run_timeout = self.run_timeout;

        tokio::spawn(async move {
            let run_id = Uuid::new_v4().to_string();
            debug!(run_id, turns = history.len(), "Starting run");

            let drive = drive_run(provider, persona, history, &tx, &run_id);
            if tokio::time::timeout(run_timeout, drive).await.is_err() {
                warn!(run_id, timeout_secs = run_timeout.as_secs(), "Run timed out");
                let _ = tx.send(RunEvent::Failed(RunError::Timeout(run_timeout))).await;
            }
        });

        rx
    }
}

/// Pull provider events and forward text deltas in arrival order.
async fn drive_run(
    provider: Arc<dyn ProviderClient>,
    persona: Arc<Persona>,
    history: Vec<Message>,
    tx: &mpsc::Sender<RunEvent>,
    run_id: &str,
) {
    let mut stream = match provider.stream_chat(&persona, &history).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(run_id, error = %e, "Provider call failed");
            let _ = tx.send(RunEvent::Failed(e.into())).await;
            return;
        }
    };

    let mut fragments = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(ProviderEvent::TextDelta(text)) => {
                if tx.send(RunEvent::Fragment(text)).await.is_err() {
                    // Receiver dropped: stop pulling. Dropping the
                    // stream releases the provider connection.
                    debug!(run_id, fragments, "Consumer gone, cancelling run");
                    return;
                }
                fragments += 1;
            }
            Ok(ProviderEvent::Done) => break,
            // Tool calls, role announcements and anything else carry
            // no reply text.
            Ok(_) => {}
            Err(e) => {
                warn!(run_id, fragments, error = %e, "Provider stream failed");
                let _ = tx.send(RunEvent::Failed(e.into())).await;
                return;
            }
        }
    }

    let _ = tx.send(RunEvent::Done).await;
    info!(run_id, fragments, "Run complete");
}
