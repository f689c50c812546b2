//! Destination block list.
//!
//! This module contains:
//! - `BlockStore` trait: set operations over one shared, externally-owned key
//! - `BlockListGuard`: the pipeline-facing view that never returns errors
//! - Block list configuration types
//! - Implementations: Memory, Redis, Mock

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

// Implementation modules
pub mod memory;
pub mod mock;
#[cfg(feature = "redis")]
pub mod redis;

// Re-exports
pub use memory::MemoryBlockStore;
pub use mock::MockBlockStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisBlockStore;

// ============================================================================
// Traits
// ============================================================================

/// Result type for block store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Block store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Set abstraction backing the block list.
///
/// Implementations own a single named set and must be safe for concurrent
/// readers and writers across processes; the guard adds no locking.
///
/// Implementations:
/// - `MemoryBlockStore`: in-process set for standalone mode
/// - `RedisBlockStore`: Redis SET shared by every sender instance
/// - `MockBlockStore`: outage injection for testing
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Number of members in the set.
    async fn size(&self) -> Result<u64>;

    /// Whether `destination` is a member.
    async fn is_member(&self, destination: &str) -> Result<bool>;

    /// Insert `destination`. Returns `true` if it was not already present.
    async fn add(&self, destination: &str) -> Result<bool>;

    /// Delete `destination`. Returns `true` if it was present.
    async fn remove(&self, destination: &str) -> Result<bool>;
}

// ============================================================================
// Guard
// ============================================================================

/// Destinations seeded into an empty block list at startup.
pub const DEFAULT_BASELINE: [&str; 5] = [
    "+1111111111",
    "+2222222222",
    "+3333333333",
    "+9999999999",
    "+5555555555",
];

/// Answers "is this destination disallowed?" for the send pipeline.
///
/// Every operation maps store errors to a permissive default and logs them:
/// lookups fail open, mutations report `false`, `size` reports `0`.
/// Fail-open is intentional: a block list outage lets traffic through
/// instead of rejecting every request.
#[derive(Clone)]
pub struct BlockListGuard {
    store: Arc<dyn BlockStore>,
    baseline: Vec<String>,
}

impl BlockListGuard {
    /// Create a guard over `store`, seeding `baseline` on `initialize`.
    pub fn new(store: Arc<dyn BlockStore>, baseline: Vec<String>) -> Self {
        Self { store, baseline }
    }

    /// Create a guard with the default baseline.
    pub fn with_default_baseline(store: Arc<dyn BlockStore>) -> Self {
        Self::new(store, DEFAULT_BASELINE.iter().map(|s| s.to_string()).collect())
    }

    /// Baseline destinations seeded into an empty set.
    pub fn baseline(&self) -> &[String] {
        &self.baseline
    }

    /// Seed the baseline if the set is empty.
    ///
    /// A non-empty set is left untouched. Store failures are logged and
    /// swallowed so the host process still starts.
    pub async fn initialize(&self) {
        info!("Initializing block list");

        let existing = match self.store.size().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "Failed to initialize block list, nothing will be blocked until the store recovers");
                return;
            }
        };

        if existing > 0 {
            info!(
                entries = existing,
                "Block list already populated, skipping initialization"
            );
            return;
        }

        let results =
            futures::future::join_all(self.baseline.iter().map(|d| self.store.add(d))).await;

        let mut seeded = 0usize;
        for (destination, result) in self.baseline.iter().zip(results) {
            match result {
                Ok(_) => seeded += 1,
                Err(e) => error!(
                    phone_number = %destination,
                    error = %e,
                    "Failed to seed block list entry"
                ),
            }
        }

        info!(
            seeded,
            baseline = ?self.baseline,
            "Initialized block list"
        );
    }

    /// Whether `destination` is blocked. Returns `false` on store failure.
    pub async fn is_blocked(&self, destination: &str) -> bool {
        match self.store.is_member(destination).await {
            Ok(true) => {
                warn!(phone_number = %destination, "Phone number is in the block list");
                true
            }
            Ok(false) => {
                debug!(phone_number = %destination, "Phone number is not blocked");
                false
            }
            Err(e) => {
                error!(
                    phone_number = %destination,
                    error = %e,
                    "Block list lookup failed, failing open"
                );
                false
            }
        }
    }

    /// Block `destination`. Returns whether it was newly added.
    pub async fn add(&self, destination: &str) -> bool {
        match self.store.add(destination).await {
            Ok(true) => {
                info!(phone_number = %destination, "Added phone number to block list");
                true
            }
            Ok(false) => {
                info!(phone_number = %destination, "Phone number was already in block list");
                false
            }
            Err(e) => {
                error!(phone_number = %destination, error = %e, "Failed to add phone number to block list");
                false
            }
        }
    }

    /// Unblock `destination`. Returns whether it was present.
    pub async fn remove(&self, destination: &str) -> bool {
        match self.store.remove(destination).await {
            Ok(true) => {
                info!(phone_number = %destination, "Removed phone number from block list");
                true
            }
            Ok(false) => {
                info!(phone_number = %destination, "Phone number was not in block list");
                false
            }
            Err(e) => {
                error!(phone_number = %destination, error = %e, "Failed to remove phone number from block list");
                false
            }
        }
    }

    /// Number of blocked destinations. Returns `0` on store failure.
    pub async fn size(&self) -> u64 {
        self.store.size().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to read block list size");
            0
        })
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Block list backend discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockListType {
    /// In-process set (standalone mode).
    #[default]
    Memory,
    /// Redis SET.
    Redis,
}

/// Block list configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockListConfig {
    /// Backend discriminator.
    #[serde(rename = "type")]
    pub store_type: BlockListType,
    /// Name of the set holding blocked destinations.
    pub key: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// Destinations seeded into an empty set at startup.
    pub baseline: Vec<String>,
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self {
            store_type: BlockListType::Memory,
            key: "sms:blocklist".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            baseline: DEFAULT_BASELINE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize the block store based on configuration.
///
/// Requires the corresponding feature for external backends:
/// - Redis: `--features redis`
///
/// Construction never touches the network, so an unreachable store does not
/// prevent startup.
pub fn init_block_store(
    config: &BlockListConfig,
) -> std::result::Result<Arc<dyn BlockStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.store_type {
        BlockListType::Memory => {
            info!(store_type = "memory", key = %config.key, "Block store initialized");
            Ok(Arc::new(MemoryBlockStore::new()))
        }
        BlockListType::Redis => {
            #[cfg(feature = "redis")]
            {
                let store = RedisBlockStore::new(&config.redis_url, &config.key)?;
                info!(store_type = "redis", key = %config.key, "Block store initialized");
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "redis"))]
            {
                Err("Redis support requires the 'redis' feature. Rebuild with --features redis".into())
            }
        }
    }
}
