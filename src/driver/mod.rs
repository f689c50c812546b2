//! JSON-lines command loop.
//!
//! One command per input line, tagged by `op`, and one JSON result per output
//! line. Sends answer with a `SendResponse`; administrative commands answer
//! with `{"op", "result"}`. A line that is not valid UTF-8 or not a valid
//! command answers with `{"error"}` and the loop moves on. Only I/O errors on
//! the streams end it.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::dispatch::DispatchOrchestrator;
use crate::model::{SendRequest, SendResponse};

/// One line of input.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Command {
    Send(SendRequest),
    Block { destination: String },
    Unblock { destination: String },
    Size,
}

/// Run a single command against the pipeline.
pub async fn execute(orchestrator: &DispatchOrchestrator, command: Command) -> Value {
    match command {
        Command::Send(request) => {
            let outcome = orchestrator.send(&request).await;
            json!(SendResponse::from(outcome))
        }
        Command::Block { destination } => {
            let result = orchestrator.guard().add(&destination).await;
            json!({ "op": "block", "destination": destination, "result": result })
        }
        Command::Unblock { destination } => {
            let result = orchestrator.guard().remove(&destination).await;
            json!({ "op": "unblock", "destination": destination, "result": result })
        }
        Command::Size => {
            let result = orchestrator.guard().size().await;
            json!({ "op": "size", "result": result })
        }
    }
}

fn malformed(error: impl std::fmt::Display) -> Value {
    warn!(error = %error, "Ignoring malformed command");
    json!({ "error": format!("Malformed command: {}", error) })
}

/// Answer one raw input line, or `None` for a blank line.
async fn handle_line(orchestrator: &DispatchOrchestrator, raw: &[u8]) -> Option<Value> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => return Some(malformed(e)),
    };
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<Command>(line) {
        Ok(command) => execute(orchestrator, command).await,
        Err(e) => malformed(e),
    };
    Some(response)
}

/// Serve commands from `reader` until end of input.
pub async fn run<R, W>(
    orchestrator: &DispatchOrchestrator,
    mut reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let Some(response) = handle_line(orchestrator, &buf).await else {
            continue;
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}
