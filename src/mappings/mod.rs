//! Event mappings and the name-based registry the host configuration uses to
//! bind them to event types.

pub mod staking;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::chain::SubstrateEvent;
use crate::config::HandlerMapping;
use crate::database::EntityStore;
use crate::error::{IndexerError, Result};

pub use staking::{
    aggregate_reward, handle_staking_reward, handle_staking_rewarded, handle_sum_reward,
    handle_sum_rewarded, record_reward, RewardArgs,
};

/// Every handler that can be named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    StakingRewarded,
    StakingReward,
    SumRewarded,
    SumReward,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 4] = [
        HandlerKind::StakingRewarded,
        HandlerKind::StakingReward,
        HandlerKind::SumRewarded,
        HandlerKind::SumReward,
    ];

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::StakingRewarded => "handleStakingRewarded",
            HandlerKind::StakingReward => "handleStakingReward",
            HandlerKind::SumRewarded => "handleSumRewarded",
            HandlerKind::SumReward => "handleSumReward",
        }
    }

    pub async fn invoke(&self, store: &dyn EntityStore, event: &SubstrateEvent) -> Result<()> {
        match self {
            HandlerKind::StakingRewarded => handle_staking_rewarded(store, event).await,
            HandlerKind::StakingReward => handle_staking_reward(store, event).await,
            HandlerKind::SumRewarded => handle_sum_rewarded(store, event).await,
            HandlerKind::SumReward => handle_sum_reward(store, event).await,
        }
    }
}

impl FromStr for HandlerKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        HandlerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| IndexerError::UnknownHandler(s.to_string()))
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event type (`section.method`) to handlers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, Vec<HandlerKind>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings(mappings: &[HandlerMapping]) -> Result<Self> {
        let mut registry = Self::new();
        for mapping in mappings {
            let kind = HandlerKind::from_str(&mapping.handler)?;
            registry.register(&mapping.event_type(), kind);
        }
        Ok(registry)
    }

    pub fn register(&mut self, event_type: &str, kind: HandlerKind) {
        self.routes
            .entry(event_type.to_string())
            .or_default()
            .push(kind);
    }

    pub fn handlers_for(&self, event_type: &str) -> &[HandlerKind] {
        self.routes
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}
