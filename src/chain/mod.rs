//! Chain-side types: decoded events and reward amounts.

pub mod amount;
pub mod event;

pub use amount::Amount;
pub use event::{Balance, BlockContext, EventArg, SubstrateEvent};
