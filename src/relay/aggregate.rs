//! Buffered consumption: fold a fragment channel into one string.

use tokio::sync::mpsc;

use crate::relay::{RunError, RunEvent};

/// Concatenate every fragment in arrival order.
///
/// A run with zero fragments yields `Ok("")`. A failed run yields the
/// failure itself; the partial text accumulated before the failure is
/// discarded so a truncated answer is never presented as complete.
pub async fn aggregate(mut rx: mpsc::Receiver<RunEvent>) -> Result<String, RunError> {
    let mut reply = String::new();

    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Fragment(text) => reply.push_str(&text),
            RunEvent::Done => break,
            RunEvent::Failed(e) => return Err(e),
        }
    }

    Ok(reply)
}
