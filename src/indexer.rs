//! Sequential event dispatcher.
//!
//! Hands each event to the handlers registered for its type, one at a time,
//! awaiting each before the next. Block ordering is the caller's job: an event
//! below the last seen height is logged, counted and processed anyway.
//!
//! The store's cursor marks the highest event already applied. Events at or
//! below the cursor found when the run starts are not handed to the handlers
//! again, so replaying a file over a loaded snapshot leaves totals unchanged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chain::SubstrateEvent;
use crate::config::Config;
use crate::database::{DatabaseManager, EventCursor};
use crate::error::Result;
use crate::mappings::HandlerRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerState {
    pub events_processed: u64,
    /// Events with no registered handler.
    pub events_skipped: u64,
    /// Events at or below the cursor the run resumed from.
    pub events_already_applied: u64,
    /// Events whose height is below one processed earlier in this run.
    pub out_of_order_events: u64,
    pub handler_invocations: u64,
    pub last_block_height: Option<u64>,
}

#[derive(Debug)]
pub struct Indexer {
    registry: HandlerRegistry,
    db: Arc<DatabaseManager>,
    state: IndexerState,
    log_handlers: bool,
    /// `None` until the store cursor has been read.
    resume_after: Option<Option<EventCursor>>,
    high_water: Option<EventCursor>,
}

impl Indexer {
    pub fn new(registry: HandlerRegistry, db: Arc<DatabaseManager>) -> Self {
        Self {
            registry,
            db,
            state: IndexerState::default(),
            log_handlers: false,
            resume_after: None,
            high_water: None,
        }
    }

    pub fn from_config(config: &Config, db: Arc<DatabaseManager>) -> Result<Self> {
        let registry = HandlerRegistry::from_mappings(&config.handlers)?;
        let mut event_types: Vec<_> = registry.event_types().collect();
        event_types.sort_unstable();
        log::info!("handlers registered for {}", event_types.join(", "));

        let mut indexer = Self::new(registry, db);
        indexer.log_handlers = config.logging.log_handlers;
        Ok(indexer)
    }

    pub fn state(&self) -> &IndexerState {
        &self.state
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    /// Cursor this run resumes from; read from the store on first use.
    async fn resume_cursor(&mut self) -> Result<Option<EventCursor>> {
        if let Some(cursor) = self.resume_after {
            return Ok(cursor);
        }
        let cursor = self.db.store().cursor().await?;
        if let Some(c) = cursor {
            log::info!("resuming after event {c}");
        }
        self.resume_after = Some(cursor);
        self.high_water = cursor;
        Ok(cursor)
    }

    /// Run every handler bound to the event's type. The first failure is
    /// returned as is; handlers already run for this event are not undone
    /// and the cursor does not move past it.
    pub async fn process_event(&mut self, event: &SubstrateEvent) -> Result<()> {
        let event_type = event.event_type();
        if self.registry.handlers_for(&event_type).is_empty() {
            log::trace!("no handler for {event}");
            self.state.events_skipped += 1;
            return Ok(());
        }

        let position = EventCursor::new(event.block.height, event.idx);
        if let Some(done) = self.resume_cursor().await? {
            if position <= done {
                log::debug!("{event} already applied (cursor {done})");
                self.state.events_already_applied += 1;
                return Ok(());
            }
        }

        if let Some(last) = self.state.last_block_height {
            if event.block.height < last {
                log::warn!(
                    "{event} arrived after block {last}; running totals assume in-order delivery"
                );
                self.state.out_of_order_events += 1;
            }
        }

        for kind in self.registry.handlers_for(&event_type) {
            if self.log_handlers {
                log::debug!("{kind} <- {event}");
            }
            kind.invoke(self.db.store(), event).await?;
            self.state.handler_invocations += 1;
        }

        if self.high_water.map_or(true, |high| position > high) {
            self.db.store().save_cursor(position).await?;
            self.high_water = Some(position);
        }

        self.state.events_processed += 1;
        self.state.last_block_height = Some(event.block.height);
        Ok(())
    }

    /// Process events in the order given, stopping at the first error.
    pub async fn process_events<'a, I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a SubstrateEvent>,
    {
        for event in events {
            self.process_event(event).await?;
        }
        log::info!(
            "processed {} events ({} skipped, {} already applied, {} handler calls)",
            self.state.events_processed,
            self.state.events_skipped,
            self.state.events_already_applied,
            self.state.handler_invocations
        );
        Ok(())
    }
}
