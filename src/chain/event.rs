//! Decoded chain events as handed over by the host runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Amount;

/// Chain-native balance value (u128 on Substrate chains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(pub u128);

impl Balance {
    /// Widen to an arbitrary-precision amount.
    pub fn to_amount(self) -> Amount {
        Amount::from(self.0)
    }
}

/// One decoded event argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventArg {
    AccountId(String),
    Balance(Balance),
    U32(u32),
    Bool(bool),
    Other(String),
}

impl EventArg {
    pub fn kind(&self) -> &'static str {
        match self {
            EventArg::AccountId(_) => "AccountId",
            EventArg::Balance(_) => "Balance",
            EventArg::U32(_) => "u32",
            EventArg::Bool(_) => "bool",
            EventArg::Other(_) => "other",
        }
    }
}

impl fmt::Display for EventArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventArg::AccountId(id) => write!(f, "{id}"),
            EventArg::Balance(b) => write!(f, "{}", b.0),
            EventArg::U32(v) => write!(f, "{v}"),
            EventArg::Bool(v) => write!(f, "{v}"),
            EventArg::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Header data of the block containing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

/// A decoded event plus its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstrateEvent {
    pub block: BlockContext,
    /// Position of the event within its block.
    pub idx: u32,
    /// Pallet name, e.g. `staking`.
    pub section: String,
    /// Event name, e.g. `Rewarded`.
    pub method: String,
    #[serde(default)]
    pub data: Vec<EventArg>,
}

impl SubstrateEvent {
    pub fn new(
        block: BlockContext,
        idx: u32,
        section: impl Into<String>,
        method: impl Into<String>,
        data: Vec<EventArg>,
    ) -> Self {
        Self {
            block,
            idx,
            section: section.into(),
            method: method.into(),
            data,
        }
    }

    /// `section.method`, the key handlers are registered under.
    pub fn event_type(&self) -> String {
        format!("{}.{}", self.section, self.method)
    }

    pub fn arg(&self, position: usize) -> Option<&EventArg> {
        self.data.get(position)
    }
}

impl fmt::Display for SubstrateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} at {}-{}",
            self.section, self.method, self.block.height, self.idx
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_json_line() {
        let line = r#"{"block":{"height":1000,"timestamp":"2021-06-01T12:00:00Z"},"idx":2,"section":"staking","method":"Rewarded","data":[{"AccountId":"A1"},{"Balance":500}]}"#;
        let event: SubstrateEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.block.height, 1000);
        assert_eq!(
            event.block.timestamp,
            Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(event.event_type(), "staking.Rewarded");
        assert_eq!(event.arg(0), Some(&EventArg::AccountId("A1".into())));
        assert_eq!(event.arg(1), Some(&EventArg::Balance(Balance(500))));
        assert_eq!(event.to_string(), "staking.Rewarded at 1000-2");
    }

    #[test]
    fn balance_widens_beyond_u64() {
        let b = Balance(u128::from(u64::MAX) + 1);
        assert_eq!(b.to_amount().to_string(), "18446744073709551616");
    }
}
