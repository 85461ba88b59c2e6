//! Staking reward mappings.
//!
//! Two handlers per runtime era. `staking.Rewarded` is the current event name;
//! `staking.Reward` is what older runtimes (before ~6,500,000 on Polkadot)
//! emitted with the same `[account, amount]` payload. The old-era entry points
//! delegate to the new-era ones.

use crate::chain::{Amount, EventArg, SubstrateEvent};
use crate::database::{AccountRewardTotal, EntityStore, RewardRecord};
use crate::error::{IndexerError, Result};

/// `[account, amount]` pulled out of a reward event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardArgs<'a> {
    pub account_id: &'a str,
    pub amount: Amount,
}

impl<'a> TryFrom<&'a SubstrateEvent> for RewardArgs<'a> {
    type Error = IndexerError;

    fn try_from(event: &'a SubstrateEvent) -> Result<Self> {
        let account_id = match event.arg(0) {
            Some(EventArg::AccountId(id)) => id.as_str(),
            Some(other) => {
                return Err(IndexerError::MalformedEvent(format!(
                    "{event}: expected AccountId at position 0, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(IndexerError::MalformedEvent(format!(
                    "{event}: missing account argument"
                )))
            }
        };
        let amount = match event.arg(1) {
            Some(EventArg::Balance(balance)) => balance.to_amount(),
            Some(other) => {
                return Err(IndexerError::MalformedEvent(format!(
                    "{event}: expected Balance at position 1, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(IndexerError::MalformedEvent(format!(
                    "{event}: missing reward argument"
                )))
            }
        };
        Ok(Self { account_id, amount })
    }
}

/// Persist one `RewardRecord` for the event.
///
/// No existence check: a replayed event overwrites its record with the same
/// content.
pub async fn record_reward(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    let args = RewardArgs::try_from(event)?;

    let record = RewardRecord {
        id: RewardRecord::make_id(event.block.height, event.idx),
        account_id: args.account_id.to_string(),
        amount: args.amount,
        timestamp: event.block.timestamp,
        block_height: event.block.height,
        event_index: event.idx,
    };

    log::debug!("saving {record}");
    store.save_staking_reward(record).await?;
    Ok(())
}

/// Fold the event's reward into the account's running total.
///
/// Not idempotent: the same event applied twice is counted twice. Relies on
/// the caller delivering each event exactly once, in block order.
pub async fn aggregate_reward(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    let args = RewardArgs::try_from(event)?;

    let mut total = match store.get_sum_reward(args.account_id).await? {
        Some(existing) => existing,
        None => AccountRewardTotal::new(args.account_id),
    };

    total.total_amount += &args.amount;
    // Overwrite, not max. Equivalent only under in-order delivery.
    total.last_block_height = event.block.height;

    log::debug!("saving {total}");
    store.save_sum_reward(total).await?;
    Ok(())
}

/// `staking.Rewarded`
pub async fn handle_staking_rewarded(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    record_reward(store, event).await
}

/// `staking.Reward` (older runtimes)
pub async fn handle_staking_reward(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    handle_staking_rewarded(store, event).await
}

/// `staking.Rewarded`
pub async fn handle_sum_rewarded(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    aggregate_reward(store, event).await
}

/// `staking.Reward` (older runtimes)
pub async fn handle_sum_reward(store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
    handle_sum_rewarded(store, event).await
}
