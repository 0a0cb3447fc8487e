//! Streaming client for OpenAI-compatible chat completion APIs.
//!
//! Speaks the `/chat/completions` wire format with `stream: true`, so
//! it works against OpenAI itself as well as the Gemini compatibility
//! endpoint the default configuration points at.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::message::{Message, Role};
use crate::persona::Persona;
use crate::provider::sse::drain_sse_events;
use crate::provider::{ProviderClient, ProviderError, ProviderEvent, ProviderEventStream};

/// End-of-stream sentinel sent by OpenAI-compatible endpoints.
const DONE_SENTINEL: &str = "[DONE]";

/// Client for any OpenAI-compatible provider.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

// ─── Wire Types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChunkWire {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<serde_json::Value>,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Decode one SSE `data:` payload into a tagged provider event.
fn decode_chunk(payload: &str) -> Result<ProviderEvent, ProviderError> {
    let chunk: ChunkWire = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Malformed(format!("{e}: {payload}")))?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(ProviderEvent::Other);
    };

    if let Some(content) = choice.delta.content {
        return Ok(ProviderEvent::TextDelta(content));
    }
    if choice.delta.tool_calls.is_some() {
        return Ok(ProviderEvent::ToolCallDelta);
    }
    if choice.finish_reason.is_some() {
        return Ok(ProviderEvent::Done);
    }
    if choice.delta.role.is_some() {
        return Ok(ProviderEvent::RoleAnnounce);
    }
    Ok(ProviderEvent::Other)
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct DecodeState {
    bytes: ByteStream,
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence, awaiting the
    /// next chunk.
    carry: Vec<u8>,
    pending: VecDeque<Result<ProviderEvent, ProviderError>>,
    finished: bool,
}

/// Append `chunk` to `buffer` without mangling multi-byte characters
/// that a network chunk boundary split in half. An incomplete trailing
/// sequence is held in `carry`; truly invalid bytes are replaced.
fn push_utf8(buffer: &mut String, carry: &mut Vec<u8>, chunk: &[u8]) {
    carry.extend_from_slice(chunk);
    loop {
        match std::str::from_utf8(carry) {
            Ok(valid) => {
                buffer.push_str(valid);
                carry.clear();
                return;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                buffer.push_str(&String::from_utf8_lossy(&carry[..valid_up_to]));
                match e.error_len() {
                    None => {
                        carry.drain(..valid_up_to);
                        return;
                    }
                    Some(len) => {
                        buffer.push('\u{FFFD}');
                        carry.drain(..valid_up_to + len);
                    }
                }
            }
        }
    }
}

/// Turn the raw response byte stream into a lazy event stream.
///
/// Events are surfaced one at a time; the byte stream is only polled
/// when the pending queue is empty, so dropping the event stream drops
/// the HTTP connection without draining it.
fn decode_event_stream(bytes: ByteStream) -> ProviderEventStream {
    let state = DecodeState {
        bytes,
        buffer: String::new(),
        carry: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    push_utf8(&mut st.buffer, &mut st.carry, &chunk);
                    for payload in drain_sse_events(&mut st.buffer) {
                        if payload == DONE_SENTINEL {
                            st.pending.push_back(Ok(ProviderEvent::Done));
                            st.finished = true;
                            break;
                        }
                        st.pending.push_back(decode_chunk(&payload));
                    }
                }
                Some(Err(e)) => {
                    st.pending
                        .push_back(Err(ProviderError::Network(e.to_string())));
                    st.finished = true;
                }
                // Transport EOF without [DONE] still ends the sequence.
                None => st.finished = true,
            }
        }
    }))
}

#[async_trait]
impl ProviderClient for OpenAiCompatClient {
    async fn stream_chat(
        &self,
        persona: &Persona,
        history: &[Message],
    ) -> Result<ProviderEventStream, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &persona.instructions,
        });
        messages.extend(history.iter().map(|m| WireMessage {
            role: role_str(m.role),
            content: &m.content,
        }));

        let request = ChatCompletionRequest {
            model: &persona.model,
            messages,
            stream: true,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url, model = persona.model, turns = history.len(), "Provider call");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_event_stream(Box::pin(response.bytes_stream())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_delta() {
        let event =
            decode_chunk(r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#)
                .unwrap();
        assert_eq!(event, ProviderEvent::TextDelta("Hel".to_string()));
    }

    #[test]
    fn test_decode_role_announce() {
        let event =
            decode_chunk(r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#)
                .unwrap();
        assert_eq!(event, ProviderEvent::RoleAnnounce);
    }

    #[test]
    fn test_decode_finish_chunk() {
        let event =
            decode_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(event, ProviderEvent::Done);
    }

    #[test]
    fn test_decode_tool_call_delta() {
        let event = decode_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0}]},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(event, ProviderEvent::ToolCallDelta);
    }

    #[test]
    fn test_decode_empty_choices() {
        let event = decode_chunk(r#"{"choices":[]}"#).unwrap();
        assert_eq!(event, ProviderEvent::Other);
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = decode_chunk("not json").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_push_utf8_carries_split_character() {
        let accent = "é".as_bytes(); // two bytes
        let mut buffer = String::new();
        let mut carry = Vec::new();

        push_utf8(&mut buffer, &mut carry, b"caf");
        push_utf8(&mut buffer, &mut carry, &accent[..1]);
        assert_eq!(buffer, "caf");
        assert_eq!(carry, &accent[..1]);

        push_utf8(&mut buffer, &mut carry, &accent[1..]);
        assert_eq!(buffer, "café");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_push_utf8_replaces_invalid_bytes() {
        let mut buffer = String::new();
        let mut carry = Vec::new();

        push_utf8(&mut buffer, &mut carry, b"a\xffb");
        assert_eq!(buffer, "a\u{FFFD}b");
        assert!(carry.is_empty());
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_network_chunks() {
        let payload =
            "data: {\"choices\":[{\"delta\":{\"content\":\"café\"},\"finish_reason\":null}]}\n\n";
        let bytes = payload.as_bytes();
        // Split inside the two-byte 'é'.
        let split = payload.find('é').unwrap() + 1;

        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];
        let stream = decode_event_stream(Box::pin(futures::stream::iter(chunks)));

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], Ok(ProviderEvent::TextDelta(text)) if text == "café"),
            "got {events:?}"
        );
    }
}
