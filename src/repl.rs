//! Terminal chat loop.
//!
//! Keeps an in-process history across turns, unlike the HTTP API, which
//! is stateless and receives the history from the caller every time.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::message::{assemble, Message};
use crate::persona::Persona;
use crate::relay::orchestrator::Orchestrator;
use crate::relay::RunEvent;

/// Run the interactive loop until `exit`, `quit`, or EOF.
pub async fn run(orchestrator: &Orchestrator, persona: &Persona) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut history: Vec<Message> = Vec::new();

    stdout
        .write_all(format!("\nWelcome to {} (terminal mode). Type 'exit' to quit.\n\n", persona.name).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let mut rx = orchestrator.run(assemble(history.clone(), input));

        stdout.write_all(b"Assistant: ").await?;
        stdout.flush().await?;

        // Stream fragments to the terminal while keeping the full reply
        // for the next turn's history.
        let mut reply = String::new();
        let mut failed = false;
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Fragment(text) => {
                    stdout.write_all(text.as_bytes()).await?;
                    stdout.flush().await?;
                    reply.push_str(&text);
                }
                RunEvent::Done => break,
                RunEvent::Failed(e) => {
                    stdout.write_all(format!("\n[error] {e}\n").as_bytes()).await?;
                    failed = true;
                    break;
                }
            }
        }
        stdout.write_all(b"\n\n").await?;

        // A failed turn is not recorded; the next attempt resends the
        // same history.
        if !failed {
            history.push(Message::user(input));
            history.push(Message::assistant(reply));
        }
    }

    stdout.write_all(b"Exiting.\n").await?;
    Ok(())
}
