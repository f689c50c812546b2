//! Mock block store for testing.
//!
//! Wraps a `MemoryBlockStore` and can simulate a store outage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BlockStore, MemoryBlockStore, Result, StoreError};

/// Mock block store with outage injection and lookup counting.
#[derive(Default)]
pub struct MockBlockStore {
    inner: MemoryBlockStore,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl MockBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: MemoryBlockStore::with_members(members),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of membership lookups served or attempted.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock store outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockStore for MockBlockStore {
    async fn size(&self) -> Result<u64> {
        self.check_available()?;
        self.inner.size().await
    }

    async fn is_member(&self, destination: &str) -> Result<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.inner.is_member(destination).await
    }

    async fn add(&self, destination: &str) -> Result<bool> {
        self.check_available()?;
        self.inner.add(destination).await
    }

    async fn remove(&self, destination: &str) -> Result<bool> {
        self.check_available()?;
        self.inner.remove(destination).await
    }
}
