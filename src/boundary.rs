//! Game boundary handlers.
//!
//! Event files have no end-of-game record: a game ends when the next `id`
//! record starts another one, or when the input runs out.

use std::any::Any;

use crate::error::HandlerError;
use crate::handler::{Dispatch, Handler};
use crate::record::EventRecord;

/// Fires a named trigger each time a game ends.
///
/// With `fire_on_first`, the first `id` record fires too (useful when a
/// callback should also run before the first game).
#[derive(Debug, Clone)]
pub struct GameTrigger {
    trigger: String,
    fire_on_first: bool,
    current: Option<String>,
    finished: Option<String>,
    games: usize,
}

impl GameTrigger {
    pub fn new(trigger: &str) -> Self {
        GameTrigger {
            trigger: trigger.to_string(),
            fire_on_first: false,
            current: None,
            finished: None,
            games: 0,
        }
    }

    pub fn fire_on_first(mut self, fire: bool) -> Self {
        self.fire_on_first = fire;
        self
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// The game that just ended, while its trigger is being handled.
    pub fn finished_game(&self) -> Option<&str> {
        self.finished.as_deref()
    }

    /// The game now in progress.
    pub fn current_game(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// `id` records seen so far.
    pub fn games_seen(&self) -> usize {
        self.games
    }
}

impl Handler for GameTrigger {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        let EventRecord::GameStart { game_id } = record else {
            return Ok(None);
        };
        self.games += 1;
        self.finished = self.current.replace(game_id.clone());
        if self.finished.is_some() || self.fire_on_first {
            Ok(Some(self.trigger.clone()))
        } else {
            Ok(None)
        }
    }

    fn finish(&mut self) -> Dispatch {
        // End of input closes the game in progress.
        self.finished = self.current.take();
        Ok(self.finished.as_ref().map(|_| self.trigger.clone()))
    }

    /// Boundary tracking spans the whole stream; nothing is per-game.
    fn reset(&mut self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Requests a graceful stop once `max_games` games have been read.
///
/// The stop is raised on the `id` record of the first game past the
/// limit, so the last allowed game is complete.
#[derive(Debug, Clone)]
pub struct GameLimit {
    max_games: usize,
    games: usize,
}

impl GameLimit {
    pub fn new(max_games: usize) -> Self {
        GameLimit {
            max_games,
            games: 0,
        }
    }
}

impl Handler for GameLimit {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        if let EventRecord::GameStart { .. } = record {
            self.games += 1;
            if self.games > self.max_games {
                return Err(HandlerError::Stop);
            }
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
