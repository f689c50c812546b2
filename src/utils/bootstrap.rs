//! Bootstrap utilities for the sms-sender binary.
//!
//! Shared initialization code: tracing and pipeline assembly.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::blocklist::{init_block_store, BlockListGuard};
use crate::bus::{init_broker, EventPublisher};
use crate::config::{Config, LOG_ENV_VAR};
use crate::dispatch::DispatchOrchestrator;

/// Initialize tracing with the SMS_SENDER_LOG environment variable.
///
/// Defaults to "info" level if SMS_SENDER_LOG is not set. Logs go to stderr
/// so stdout stays reserved for command results.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the send pipeline from configuration and seed the block list.
///
/// Fails only on configuration problems (unknown backend, missing feature,
/// malformed URL). Store and broker outages do not fail startup.
pub async fn build_orchestrator(
    config: &Config,
) -> Result<DispatchOrchestrator, Box<dyn std::error::Error + Send + Sync>> {
    let store = init_block_store(&config.blocklist)?;
    let broker = init_broker(&config.messaging)?;

    let guard = BlockListGuard::new(store, config.blocklist.baseline.clone());
    guard.initialize().await;

    let publisher = EventPublisher::new(broker, &config.messaging.topic);

    info!(
        topic = %config.messaging.topic,
        blocklist_key = %config.blocklist.key,
        "Send pipeline ready"
    );

    Ok(DispatchOrchestrator::new(guard, publisher))
}
