//! Incremental Server-Sent Events draining.
//!
//! Provider bytes arrive in arbitrary chunks; complete SSE events are
//! split out of a rolling buffer and incomplete tails are kept for the
//! next chunk. Line endings may be LF, CRLF, or lone CR.

const SSE_EVENT_SEPARATOR: &str = "\n\n";

/// Drain complete SSE events from `buffer` and return their `data:`
/// payloads. Incomplete events remain in the buffer for later calls.
pub fn drain_sse_events(buffer: &mut String) -> Vec<String> {
    normalize_line_endings(buffer);

    let mut events = Vec::new();

    loop {
        let Some(idx) = buffer.find(SSE_EVENT_SEPARATOR) else {
            break;
        };

        let raw_event = buffer[..idx].to_string();
        buffer.drain(..idx + SSE_EVENT_SEPARATOR.len());

        if raw_event.trim().is_empty() {
            continue;
        }

        if let Some(payload) = extract_event_payload(&raw_event) {
            if !payload.is_empty() {
                events.push(payload);
            }
        }
    }

    events
}

/// Collapse CRLF and lone-CR line endings to LF so the event boundary
/// is always a blank LF line.
///
/// A trailing `\r` may be the first half of a CRLF split across chunks;
/// it stays in the buffer until the next chunk resolves it.
fn normalize_line_endings(buffer: &mut String) {
    if !buffer.contains('\r') {
        return;
    }

    let held_cr = buffer.ends_with('\r');
    if held_cr {
        buffer.pop();
    }

    let mut normalized = buffer.replace("\r\n", "\n").replace('\r', "\n");
    if held_cr {
        normalized.push('\r');
    }
    *buffer = normalized;
}

fn extract_event_payload(event: &str) -> Option<String> {
    let mut data_lines = Vec::new();

    for line in event.lines() {
        let trimmed = line.trim_end();
        if let Some(data) = trimmed.strip_prefix("data:") {
            data_lines.push(data.trim_start());
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
