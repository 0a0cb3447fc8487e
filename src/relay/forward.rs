//! Streamed consumption: forward each fragment the moment it arrives.
//!
//! Two adapters over the same fragment channel: [`relay`] writes to any
//! async sink, [`relay_body`] produces the HTTP response body for the
//! streaming endpoint.

use std::io;

use axum::body::Body;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::relay::{RunError, RunEvent};

/// Write each fragment to `sink` in arrival order, flushing after every
/// write so the consumer sees data with minimal added latency.
///
/// This is the generic-sink form of [`relay_body`]: same forwarding
/// policy, usable with any `AsyncWrite` instead of an HTTP response.
/// Consumers that need the fragments themselves (the REPL keeps the
/// full reply for its history) drain the channel directly instead.
///
/// Fragment content is never transformed. A sink write failure stops
/// forwarding, which drops the receiver and cancels the run upstream.
pub async fn relay<W>(mut rx: mpsc::Receiver<RunEvent>, sink: &mut W) -> Result<(), RunError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Fragment(text) => {
                sink.write_all(text.as_bytes()).await?;
                sink.flush().await?;
            }
            RunEvent::Done => break,
            RunEvent::Failed(e) => return Err(e),
        }
    }

    Ok(())
}

/// Adapt a fragment channel into a streaming HTTP response body.
///
/// `Done` ends the body normally. `Failed` surfaces as a body error so
/// the transfer is aborted; no error marker is written into the payload
/// since clients have no framing to tell data from error.
pub fn relay_body(rx: mpsc::Receiver<RunEvent>) -> Body {
    let frames = ReceiverStream::new(rx).map_while(|event| match event {
        RunEvent::Fragment(text) => Some(Ok(Bytes::from(text))),
        RunEvent::Done => None,
        RunEvent::Failed(e) => Some(Err(io::Error::other(e.to_string()))),
    });

    Body::from_stream(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[tokio::test]
    async fn test_relay_preserves_order_and_content() {
        let (tx, rx) = mpsc::channel(8);
        for part in ["a", "", "bc", "déf"] {
            tx.send(RunEvent::Fragment(part.to_string())).await.unwrap();
        }
        tx.send(RunEvent::Done).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        relay(rx, &mut sink).await.unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "abcdéf");
    }

    #[tokio::test]
    async fn test_relay_forwards_prefix_then_fails() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(RunEvent::Fragment("Hel".to_string())).await.unwrap();
        tx.send(RunEvent::Fragment("lo".to_string())).await.unwrap();
        tx.send(RunEvent::Failed(RunError::Provider(ProviderError::Network(
            "reset".to_string(),
        ))))
        .await
        .unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let err = relay(rx, &mut sink).await.unwrap_err();
        // Everything received before the failure was already delivered.
        assert_eq!(String::from_utf8(sink).unwrap(), "Hello");
        assert!(matches!(err, RunError::Provider(_)));
    }

    #[tokio::test]
    async fn test_relay_empty_run_writes_nothing() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(RunEvent::Done).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        relay(rx, &mut sink).await.unwrap();
        assert!(sink.is_empty());
    }
}
