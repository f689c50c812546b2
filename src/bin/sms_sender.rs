//! sms-sender: block-list gated SMS dispatch
//!
//! Reads one JSON command per stdin line and writes one JSON result per
//! stdout line. Logs go to stderr.
//!
//! ## Commands
//! ```text
//! {"op":"send","phoneNumber":"+15551234567","message":"hello"}
//! {"op":"block","destination":"+15551234567"}
//! {"op":"unblock","destination":"+15551234567"}
//! {"op":"size"}
//! ```
//!
//! ## Configuration
//! - First argument: optional YAML config file
//! - SMS_SENDER_CONFIG: config file path
//! - SMS_SENDER__<SECTION>__<KEY>: overrides (e.g. SMS_SENDER__MESSAGING__TYPE=kafka)
//! - SMS_SENDER_LOG: tracing filter (default: info)

use tokio::io::BufReader;
use tracing::info;

use sms_sender::config::Config;
use sms_sender::driver;
use sms_sender::utils::bootstrap::{build_orchestrator, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    let orchestrator = build_orchestrator(&config).await?;

    info!("sms-sender started, reading commands from stdin");

    driver::run(
        &orchestrator,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    info!("stdin closed, shutting down");
    Ok(())
}
