//! Scripted provider stub shared by the integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use agent_relay::message::Message;
use agent_relay::persona::Persona;
use agent_relay::provider::{ProviderClient, ProviderError, ProviderEvent, ProviderEventStream};

/// One scripted step of a provider run.
#[derive(Debug, Clone)]
pub enum Step {
    Event(ProviderEvent),
    Fail(String),
    Stall(Duration),
}

/// A provider that replays a fixed script on every call and records
/// what the orchestrator actually did with the stream.
pub struct ScriptedProvider {
    script: Vec<Step>,
    connect_error: Option<String>,
    /// Set when a handed-out stream is dropped.
    pub stream_dropped: Arc<AtomicBool>,
    /// Number of events actually pulled from the stream.
    pub events_pulled: Arc<AtomicUsize>,
    /// History received on the most recent call.
    pub last_history: Arc<Mutex<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            connect_error: None,
            stream_dropped: Arc::new(AtomicBool::new(false)),
            events_pulled: Arc::new(AtomicUsize::new(0)),
            last_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Emit each part as a text delta, then finish cleanly.
    pub fn text(parts: &[&str]) -> Self {
        let mut script: Vec<Step> = parts
            .iter()
            .map(|p| Step::Event(ProviderEvent::TextDelta(p.to_string())))
            .collect();
        script.push(Step::Event(ProviderEvent::Done));
        Self::new(script)
    }

    /// Emit each part as a text delta, then fail mid-stream.
    pub fn failing_after(parts: &[&str], error: &str) -> Self {
        let mut script: Vec<Step> = parts
            .iter()
            .map(|p| Step::Event(ProviderEvent::TextDelta(p.to_string())))
            .collect();
        // Let already-sent fragments reach the consumer first.
        script.push(Step::Stall(Duration::from_millis(50)));
        script.push(Step::Fail(error.to_string()));
        Self::new(script)
    }

    /// Refuse every call before producing any event.
    pub fn unreachable(error: &str) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.connect_error = Some(error.to_string());
        provider
    }
}

/// Flags the owning stream's drop, however it happens.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn stream_chat(
        &self,
        _persona: &Persona,
        history: &[Message],
    ) -> Result<ProviderEventStream, ProviderError> {
        *self.last_history.lock().unwrap() = history.to_vec();

        if let Some(error) = &self.connect_error {
            return Err(ProviderError::Network(error.clone()));
        }

        let steps = VecDeque::from(self.script.clone());
        let pulled = self.events_pulled.clone();
        let guard = DropFlag(self.stream_dropped.clone());

        let stream = stream::unfold((steps, pulled, guard), |(mut steps, pulled, guard)| async move {
            loop {
                match steps.pop_front()? {
                    Step::Stall(duration) => tokio::time::sleep(duration).await,
                    Step::Event(event) => {
                        pulled.fetch_add(1, Ordering::SeqCst);
                        return Some((Ok(event), (steps, pulled, guard)));
                    }
                    Step::Fail(message) => {
                        return Some((Err(ProviderError::Network(message)), (steps, pulled, guard)));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
