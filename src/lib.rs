//! Crate root.

pub mod chain;
pub mod config;
pub mod database;
pub mod error;
pub mod indexer;
pub mod mappings;

pub use chain::{Amount, SubstrateEvent};
pub use database::{AccountRewardTotal, DatabaseManager, EntityStore, RewardRecord};
pub use error::IndexerError;
pub use indexer::Indexer;
