//! Entity schemas persisted by the mapping handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::Amount;

/// One staking reward event. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    /// `"<block_height>-<event_index>"`
    pub id: String,
    pub account_id: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub block_height: u64,
    /// Position of the event within its block.
    pub event_index: u32,
}

impl RewardRecord {
    pub const ENTITY: &'static str = "StakingReward";

    /// Builds the record key. Unique per event. The string does not sort by
    /// chain position (`"5-10" < "5-2"`); order by `cursor()` instead.
    pub fn make_id(block_height: u64, event_index: u32) -> String {
        format!("{block_height}-{event_index}")
    }

    pub fn cursor(&self) -> EventCursor {
        EventCursor::new(self.block_height, self.event_index)
    }
}

impl fmt::Display for RewardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} to {} at block {}",
            Self::ENTITY,
            self.id,
            self.amount,
            self.account_id,
            self.block_height
        )
    }
}

/// Running reward sum for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRewardTotal {
    pub account_id: String,
    pub total_amount: Amount,
    /// Height of the last event folded into `total_amount`.
    pub last_block_height: u64,
}

impl AccountRewardTotal {
    pub const ENTITY: &'static str = "SumReward";

    /// Fresh total for an account that has not been rewarded yet.
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            total_amount: Amount::zero(),
            last_block_height: 0,
        }
    }
}

impl fmt::Display for AccountRewardTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} (last block {})",
            Self::ENTITY,
            self.account_id,
            self.total_amount,
            self.last_block_height
        )
    }
}

/// Chain position of an event. Orders by height, then index in block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventCursor {
    pub block_height: u64,
    pub event_index: u32,
}

impl EventCursor {
    pub const fn new(block_height: u64, event_index: u32) -> Self {
        Self {
            block_height,
            event_index,
        }
    }
}

impl fmt::Display for EventCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.block_height, self.event_index)
    }
}

/// Full content of a store, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub staking_rewards: Vec<RewardRecord>,
    pub sum_rewards: Vec<AccountRewardTotal>,
    /// Highest event position already applied to this content.
    pub cursor: Option<EventCursor>,
}

impl StoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.staking_rewards.is_empty() && self.sum_rewards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_joins_height_and_index() {
        assert_eq!(RewardRecord::make_id(1000, 2), "1000-2");
        assert_eq!(RewardRecord::make_id(0, 0), "0-0");
    }

    #[test]
    fn cursor_orders_by_height_then_index() {
        let mut cursors = vec![
            EventCursor::new(5, 10),
            EventCursor::new(6, 0),
            EventCursor::new(5, 2),
        ];
        cursors.sort();
        assert_eq!(
            cursors,
            vec![EventCursor::new(5, 2), EventCursor::new(5, 10), EventCursor::new(6, 0)]
        );
        assert_eq!(EventCursor::new(5, 10).to_string(), RewardRecord::make_id(5, 10));
    }

    #[test]
    fn new_total_starts_at_zero() {
        let total = AccountRewardTotal::new("A1");
        assert_eq!(total.account_id, "A1");
        assert!(total.total_amount.is_zero());
        assert_eq!(total.to_string(), "SumReward A1: 0 (last block 0)");
    }
}
