//! Database layer: entity schemas plus a pluggable entity store.
//!
//! Notes:
//! - Storage is injected as `Arc<dyn EntityStore>`; `MemoryEntityStore` is the
//!   only backend shipped here. A host with its own persistence implements
//!   the trait.
//! - Snapshots carry the highest applied `EventCursor`, so a later run can
//!   skip events already folded into the totals.
//!   Format: `<u32:len><bincode payload><[u8;64]:sha512(payload)>`.

pub mod entities;
pub mod store;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha512};
use std::path::Path;
use std::sync::Arc;

use crate::config::DatabaseConfig;

pub use entities::{AccountRewardTotal, EventCursor, RewardRecord, StoreSnapshot};
pub use store::{EntityStore, MemoryEntityStore, StoreError};

/// High-level manager that owns a concrete entity store.
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    store: Arc<dyn EntityStore>,
    config: DatabaseConfig,
}

impl DatabaseManager {
    pub fn new(store: Arc<dyn EntityStore>, config: DatabaseConfig) -> Self {
        Self { store, config }
    }

    /// Manager over a fresh `MemoryEntityStore`.
    pub fn in_memory(config: DatabaseConfig) -> Self {
        Self::new(Arc::new(MemoryEntityStore::new()), config)
    }

    pub fn store(&self) -> &dyn EntityStore {
        &*self.store
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// All records of one account, in chain order.
    pub async fn rewards_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<RewardRecord>, StoreError> {
        let mut records: Vec<_> = self
            .store
            .staking_rewards()
            .await?
            .into_iter()
            .filter(|r| r.account_id == account_id)
            .collect();
        records.sort_by_key(RewardRecord::cursor);
        Ok(records)
    }

    /// Write the full store content to `path`.
    pub async fn write_snapshot(&self, path: &Path) -> Result<usize, StoreError> {
        let snapshot = self.store.export().await?;
        let blob = Self::serialize_with_checksum(&snapshot)?;
        tokio::fs::write(path, &blob)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        log::info!(
            "wrote snapshot {} ({} records, {} totals, {} bytes)",
            path.display(),
            snapshot.staking_rewards.len(),
            snapshot.sum_rewards.len(),
            blob.len()
        );
        Ok(blob.len())
    }

    /// Replace the store content with the snapshot at `path`.
    pub async fn read_snapshot(&self, path: &Path) -> Result<StoreSnapshot, StoreError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let payload = if self.config.verify_checksum {
            Self::verify_and_strip_checksum(&data)?
        } else {
            Self::strip_frame(&data)?
        };
        let snapshot: StoreSnapshot = Self::deserialize_payload(&payload)?;
        self.store.import(snapshot.clone()).await?;
        log::info!(
            "loaded snapshot {} ({} records, {} totals)",
            path.display(),
            snapshot.staking_rewards.len(),
            snapshot.sum_rewards.len()
        );
        Ok(snapshot)
    }

    pub fn deserialize_payload<T: DeserializeOwned>(data: &[u8]) -> Result<T, StoreError> {
        bincode::deserialize::<T>(data).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    pub fn serialize_with_checksum<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        let bytes = bincode::serialize(value)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| StoreError::SerializationError("snapshot exceeds 4 GiB".into()))?;
        let mut out = Vec::with_capacity(4 + bytes.len() + 64);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&bytes);
        out.extend_from_slice(&Sha512::digest(&bytes));
        Ok(out)
    }

    /// Verify a blob written by `serialize_with_checksum` and return the payload.
    pub fn verify_and_strip_checksum(data: &[u8]) -> Result<Vec<u8>, StoreError> {
        let payload = Self::strip_frame(data)?;
        let checksum = &data[4 + payload.len()..];
        let digest = Sha512::digest(&payload);
        if &digest[..] != checksum {
            return Err(StoreError::ChecksumMismatch);
        }
        Ok(payload)
    }

    fn strip_frame(data: &[u8]) -> Result<Vec<u8>, StoreError> {
        if data.len() < 4 + 64 {
            return Err(StoreError::SerializationError("blob too small".into()));
        }
        let mut len_le = [0u8; 4];
        len_le.copy_from_slice(&data[..4]);
        let len = u32::from_le_bytes(len_le) as usize;

        if data.len() != 4 + len + 64 {
            return Err(StoreError::SerializationError("length mismatch".into()));
        }
        Ok(data[4..4 + len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Amount;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample_record(account: &str, height: u64, idx: u32) -> RewardRecord {
        RewardRecord {
            id: RewardRecord::make_id(height, idx),
            account_id: account.to_string(),
            amount: Amount::from(100u64),
            timestamp: Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap(),
            block_height: height,
            event_index: idx,
        }
    }

    #[tokio::test]
    async fn snapshot_survives_a_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rewards.snapshot");

        let db = DatabaseManager::in_memory(DatabaseConfig::default());
        db.store()
            .save_staking_reward(sample_record("A1", 7, 1))
            .await
            .unwrap();
        db.store()
            .save_sum_reward(AccountRewardTotal {
                account_id: "A1".into(),
                total_amount: Amount::from(100u64),
                last_block_height: 7,
            })
            .await
            .unwrap();
        db.store().save_cursor(EventCursor::new(7, 1)).await.unwrap();
        db.write_snapshot(&path).await.unwrap();

        let restored = DatabaseManager::in_memory(DatabaseConfig::default());
        let snapshot = restored.read_snapshot(&path).await.unwrap();
        assert_eq!(snapshot, db.store().export().await.unwrap());
        assert_eq!(
            restored.store().get_sum_reward("A1").await.unwrap(),
            db.store().get_sum_reward("A1").await.unwrap()
        );
        assert_eq!(snapshot.cursor, Some(EventCursor::new(7, 1)));
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut blob = DatabaseManager::serialize_with_checksum(&StoreSnapshot::default()).unwrap();
        blob[4] ^= 0xFF;
        assert_eq!(
            DatabaseManager::verify_and_strip_checksum(&blob),
            Err(StoreError::ChecksumMismatch)
        );
        assert!(matches!(
            DatabaseManager::verify_and_strip_checksum(&blob[..10]),
            Err(StoreError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn rewards_for_account_filters_and_orders() {
        let db = DatabaseManager::in_memory(DatabaseConfig::default());
        for (account, height, idx) in [("A1", 9, 0), ("A1", 10, 3), ("B2", 8, 0)] {
            db.store()
                .save_staking_reward(sample_record(account, height, idx))
                .await
                .unwrap();
        }
        let heights: Vec<_> = db
            .rewards_for_account("A1")
            .await
            .unwrap()
            .iter()
            .map(|r| r.block_height)
            .collect();
        assert_eq!(heights, vec![9, 10]);
    }

    #[tokio::test]
    async fn rewards_within_one_block_follow_event_index() {
        let db = DatabaseManager::in_memory(DatabaseConfig::default());
        for idx in [10, 2] {
            db.store()
                .save_staking_reward(sample_record("A1", 5, idx))
                .await
                .unwrap();
        }

        let ids: Vec<_> = db
            .rewards_for_account("A1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["5-2", "5-10"]);
    }
}
