//! Every player who appeared in the sample.

use std::any::Any;
use std::collections::BTreeSet;

use crate::handler::{Dispatch, Handler};
use crate::record::EventRecord;

/// Collects the ID of every player named in a `start` or `sub` record.
///
/// The set spans all games, so `reset` leaves it alone; use [`clear`](Self::clear)
/// to empty it.
#[derive(Debug, Clone, Default)]
pub struct ActivePlayers {
    player_ids: BTreeSet<String>,
}

impl ActivePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_ids(&self) -> &BTreeSet<String> {
        &self.player_ids
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.player_ids.contains(player_id)
    }

    pub fn clear(&mut self) {
        self.player_ids.clear();
    }
}

impl Handler for ActivePlayers {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        if let EventRecord::Starter(app) | EventRecord::Substitution(app) = record {
            self.player_ids.insert(app.player_id.clone());
        }
        Ok(None)
    }

    fn reset(&mut self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
