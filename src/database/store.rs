//! Entity storage abstraction + in-memory implementation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::RwLock;

use super::entities::{AccountRewardTotal, EventCursor, RewardRecord, StoreSnapshot};

/// Errors produced by entity storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend rejected the operation or is unreachable.
    Unavailable(String),
    SerializationError(String),
    ChecksumMismatch,
    Io(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
            StoreError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            StoreError::ChecksumMismatch => write!(f, "Snapshot checksum mismatch"),
            StoreError::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Storage API for entity backends. Handlers only ever go through this.
#[async_trait]
pub trait EntityStore: fmt::Debug + Send + Sync {
    async fn get_staking_reward(&self, id: &str) -> Result<Option<RewardRecord>, StoreError>;

    /// Insert or overwrite by `id`.
    async fn save_staking_reward(&self, record: RewardRecord) -> Result<(), StoreError>;

    async fn get_sum_reward(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountRewardTotal>, StoreError>;

    /// Insert or overwrite by `account_id`.
    async fn save_sum_reward(&self, total: AccountRewardTotal) -> Result<(), StoreError>;

    async fn staking_rewards(&self) -> Result<Vec<RewardRecord>, StoreError>;

    async fn sum_rewards(&self) -> Result<Vec<AccountRewardTotal>, StoreError>;

    /// Highest event position applied so far, if any.
    async fn cursor(&self) -> Result<Option<EventCursor>, StoreError>;

    async fn save_cursor(&self, cursor: EventCursor) -> Result<(), StoreError>;

    async fn export(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot {
            staking_rewards: self.staking_rewards().await?,
            sum_rewards: self.sum_rewards().await?,
            cursor: self.cursor().await?,
        })
    }

    /// Replace the full content with `snapshot`.
    async fn import(&self, snapshot: StoreSnapshot) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory store, useful for tests and replay runs.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    staking_rewards: RwLock<BTreeMap<String, RewardRecord>>,
    sum_rewards: RwLock<BTreeMap<String, AccountRewardTotal>>,
    cursor: RwLock<Option<EventCursor>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get_staking_reward(&self, id: &str) -> Result<Option<RewardRecord>, StoreError> {
        Ok(self.staking_rewards.read().await.get(id).cloned())
    }

    async fn save_staking_reward(&self, record: RewardRecord) -> Result<(), StoreError> {
        self.staking_rewards
            .write()
            .await
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_sum_reward(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountRewardTotal>, StoreError> {
        Ok(self.sum_rewards.read().await.get(account_id).cloned())
    }

    async fn save_sum_reward(&self, total: AccountRewardTotal) -> Result<(), StoreError> {
        self.sum_rewards
            .write()
            .await
            .insert(total.account_id.clone(), total);
        Ok(())
    }

    async fn staking_rewards(&self) -> Result<Vec<RewardRecord>, StoreError> {
        Ok(self.staking_rewards.read().await.values().cloned().collect())
    }

    async fn sum_rewards(&self) -> Result<Vec<AccountRewardTotal>, StoreError> {
        Ok(self.sum_rewards.read().await.values().cloned().collect())
    }

    async fn cursor(&self) -> Result<Option<EventCursor>, StoreError> {
        Ok(*self.cursor.read().await)
    }

    async fn save_cursor(&self, cursor: EventCursor) -> Result<(), StoreError> {
        *self.cursor.write().await = Some(cursor);
        Ok(())
    }

    async fn import(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        *self.cursor.write().await = snapshot.cursor;
        let mut rewards = self.staking_rewards.write().await;
        let mut sums = self.sum_rewards.write().await;
        *rewards = snapshot
            .staking_rewards
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        *sums = snapshot
            .sum_rewards
            .into_iter()
            .map(|t| (t.account_id.clone(), t))
            .collect();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.staking_rewards.write().await.clear();
        self.sum_rewards.write().await.clear();
        *self.cursor.write().await = None;
        Ok(())
    }
}
