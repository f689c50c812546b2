//! In-memory partitioned broker for standalone mode.
//!
//! Assigns offsets per channel and partition the way a Kafka partition would.
//! Only the most recent records of each partition are retained; records are
//! also fanned out on a tokio broadcast channel so an in-process consumer can
//! tail them.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{AckPosition, BusError, EventBroker, Result, DEFAULT_CHANNEL_RETENTION};
use crate::model::DeliveryEvent;

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 1024;

/// A record accepted by the channel broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub channel: String,
    pub key: String,
    /// Serialized delivery event.
    pub value: Vec<u8>,
    pub position: AckPosition,
}

/// Offset counter and recent records of one partition.
#[derive(Debug, Clone, Default)]
struct PartitionLog {
    next_offset: i64,
    recent: VecDeque<ChannelRecord>,
}

/// In-memory broker with per-key partition ordering.
pub struct ChannelBroker {
    partitions: i32,
    retention: usize,
    logs: RwLock<HashMap<String, Vec<PartitionLog>>>,
    sender: broadcast::Sender<Arc<ChannelRecord>>,
}

impl ChannelBroker {
    /// Create a broker with `partitions` partitions per channel (at least one).
    pub fn new(partitions: i32) -> Self {
        Self::with_retention(partitions, DEFAULT_CHANNEL_RETENTION)
    }

    /// Create a broker keeping at most `retention` records per partition.
    ///
    /// Offsets keep increasing after old records are dropped.
    pub fn with_retention(partitions: i32, retention: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            partitions: partitions.max(1),
            retention,
            logs: RwLock::new(HashMap::new()),
            sender,
        }
    }

    /// Partition a key is routed to.
    pub fn partition_for(&self, key: &str) -> i32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as i32
    }

    /// Subscribe to records accepted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChannelRecord>> {
        self.sender.subscribe()
    }

    /// Retained records of `channel`, partition by partition, in offset order.
    pub async fn records(&self, channel: &str) -> Vec<ChannelRecord> {
        self.logs
            .read()
            .await
            .get(channel)
            .map(|partitions| {
                partitions
                    .iter()
                    .flat_map(|log| log.recent.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Retained records of one partition of `channel`, in offset order.
    pub async fn partition_records(&self, channel: &str, partition: i32) -> Vec<ChannelRecord> {
        self.logs
            .read()
            .await
            .get(channel)
            .and_then(|partitions| partitions.get(partition as usize))
            .map(|log| log.recent.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for ChannelBroker {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl EventBroker for ChannelBroker {
    async fn send(&self, channel: &str, key: &str, event: &DeliveryEvent) -> Result<AckPosition> {
        let value = event.to_json()?;
        let partition = self.partition_for(key);

        let record = {
            let mut logs = self.logs.write().await;
            let partitions = logs
                .entry(channel.to_string())
                .or_insert_with(|| vec![PartitionLog::default(); self.partitions as usize]);
            let log = partitions
                .get_mut(partition as usize)
                .ok_or_else(|| BusError::Publish(format!("No partition {partition}")))?;

            let record = ChannelRecord {
                channel: channel.to_string(),
                key: key.to_string(),
                value,
                position: AckPosition {
                    partition,
                    offset: log.next_offset,
                },
            };
            log.next_offset += 1;

            if self.retention > 0 {
                if log.recent.len() == self.retention {
                    log.recent.pop_front();
                }
                log.recent.push_back(record.clone());
            }
            record
        };

        debug!(
            topic = %channel,
            key = %key,
            position = %record.position,
            "Appended delivery event to channel log"
        );

        let position = record.position;
        // No receivers is fine.
        let _ = self.sender.send(Arc::new(record));

        Ok(position)
    }
}
