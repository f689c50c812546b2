//! In-memory block store for standalone mode.
//!
//! State lives for the lifetime of the process, so the block list is not
//! shared between instances. Use Redis when more than one sender runs.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlockStore, Result};

/// In-process set of blocked destinations.
#[derive(Default)]
pub struct MemoryBlockStore {
    members: RwLock<HashSet<String>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `members`.
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: RwLock::new(members.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn size(&self) -> Result<u64> {
        Ok(self.members.read().await.len() as u64)
    }

    async fn is_member(&self, destination: &str) -> Result<bool> {
        Ok(self.members.read().await.contains(destination))
    }

    async fn add(&self, destination: &str) -> Result<bool> {
        Ok(self.members.write().await.insert(destination.to_string()))
    }

    async fn remove(&self, destination: &str) -> Result<bool> {
        Ok(self.members.write().await.remove(destination))
    }
}
