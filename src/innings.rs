//! Innings played per player.
//!
//! Builds on [`GameTracker`]: each side keeps a [`LineupCard`] of ten
//! batting slots (slot 0 holds the pitcher when a designated hitter bats
//! in the pitcher's place, and is empty otherwise) plus the fractional
//! inning each active player entered. A player's innings played is written
//! once per game, on leaving the game or when the game ends.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{HandlerError, LineupError};
use crate::game_state::{AmbiguousPlay, GameTracker, InconsistencyPolicy};
use crate::handler::{Dispatch, Handler};
use crate::record::{Appearance, EventRecord, Side};

pub const LINEUP_SLOTS: usize = 10;

/// One side's lineup for the current game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineupCard {
    slots: [Option<String>; LINEUP_SLOTS],
    entered: HashMap<String, f64>,
    /// Players who left the current game.
    departed: HashSet<String>,
    innings_played: BTreeMap<String, f64>,
}

impl LineupCard {
    pub fn slot(&self, batting_order: usize) -> Option<&str> {
        self.slots.get(batting_order)?.as_deref()
    }

    /// Fractional inning the player entered, while still in the game.
    pub fn entered_at(&self, player_id: &str) -> Option<f64> {
        self.entered.get(player_id).copied()
    }

    pub fn active_players(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    /// Innings played by every player who has left the game (or all of
    /// them, once the game is finalized).
    pub fn innings_played(&self) -> &BTreeMap<String, f64> {
        &self.innings_played
    }

    fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none) && self.innings_played.is_empty()
    }

    fn slot_of(&self, player_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_deref() == Some(player_id))
    }

    fn start(&mut self, side: Side, app: &Appearance, now: f64) -> Result<(), LineupError> {
        let slot = usize::from(app.batting_order);
        if let Some(occupant) = &self.slots[slot]
            && *occupant != app.player_id
        {
            return Err(LineupError::SlotOccupied {
                side,
                slot: app.batting_order,
                occupant: occupant.clone(),
                player: app.player_id.clone(),
            });
        }
        if let Some(previous) = self.slot_of(&app.player_id) {
            self.slots[previous] = None;
        }
        self.slots[slot] = Some(app.player_id.clone());
        self.entered.entry(app.player_id.clone()).or_insert(now);
        Ok(())
    }

    fn substitute(&mut self, side: Side, app: &Appearance, now: f64) -> Result<(), LineupError> {
        let slot = usize::from(app.batting_order);
        let incoming = &app.player_id;

        // Same player, same slot: a defensive position change.
        if self.slots[slot].as_ref() == Some(incoming) {
            return Ok(());
        }
        if self.departed.contains(incoming) {
            return Err(LineupError::Reentry {
                side,
                player: incoming.clone(),
            });
        }

        // A player moving slots (pitcher taking a batting slot when the DH
        // is lost) keeps the original entry time.
        if let Some(previous) = self.slot_of(incoming) {
            self.slots[previous] = None;
        } else {
            self.entered.insert(incoming.clone(), now);
        }

        if let Some(outgoing) = self.slots[slot].replace(incoming.clone()) {
            self.write_innings(outgoing, now);
        }
        Ok(())
    }

    /// Close out every active player at `now` and empty the lineup.
    fn finalize(&mut self, now: f64) {
        for slot in 0..LINEUP_SLOTS {
            if let Some(player) = self.slots[slot].take() {
                self.write_innings(player, now);
            }
        }
        self.entered.clear();
        self.departed.clear();
    }

    fn write_innings(&mut self, player: String, now: f64) {
        let entered = self.entered.remove(&player).unwrap_or(now);
        // Fractional innings restart each half, so a same-inning exit can
        // read earlier than the entry.
        let played = (now - entered).max(0.0);
        log::debug!("{player}: {played:.3} innings ({entered:.3} -> {now:.3})");
        self.departed.insert(player.clone());
        self.innings_played.insert(player, played);
    }
}

/// A closed game: everything the end-of-game trigger needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameInnings {
    pub game_id: Option<String>,
    /// Per side, indexed by [`Side::index`].
    pub innings_played: [BTreeMap<String, f64>; 2],
    pub ambiguous: Vec<AmbiguousPlay>,
}

/// Tracks lineups and innings played for both sides.
///
/// Each `id` record closes the game in progress into
/// [`finished_game`](Self::finished_game) before the new game starts, so a
/// trigger fired on that record still sees the game that just ended.
#[derive(Debug, Clone, Default)]
pub struct InningsPlayed {
    game: GameTracker,
    cards: [LineupCard; 2],
    finished: Option<GameInnings>,
}

impl InningsPlayed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InconsistencyPolicy) -> Self {
        InningsPlayed {
            game: GameTracker::with_policy(policy),
            ..Self::default()
        }
    }

    pub fn tracker(&self) -> &GameTracker {
        &self.game
    }

    pub fn card(&self, side: Side) -> &LineupCard {
        &self.cards[side.index()]
    }

    pub fn innings_played(&self, side: Side) -> &BTreeMap<String, f64> {
        self.card(side).innings_played()
    }

    pub fn fractional_inning(&self) -> f64 {
        self.game.fractional_inning()
    }

    /// The most recently closed game.
    pub fn finished_game(&self) -> Option<&GameInnings> {
        self.finished.as_ref()
    }

    /// Close out all active players at the current fractional inning.
    pub fn finalize(&mut self) {
        let now = self.game.fractional_inning();
        for card in &mut self.cards {
            card.finalize(now);
        }
    }

    fn in_progress(&self) -> bool {
        self.game.game_id().is_some() || self.cards.iter().any(|c| !c.is_empty())
    }

    /// Finalize the game in progress and move it to `finished`.
    fn close_game(&mut self) {
        self.finalize();
        let [visiting, home] = std::mem::take(&mut self.cards);
        self.finished = Some(GameInnings {
            game_id: self.game.game_id().map(str::to_string),
            innings_played: [visiting.innings_played, home.innings_played],
            ambiguous: self.game.take_ambiguous(),
        });
    }
}

impl Handler for InningsPlayed {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        match record {
            EventRecord::GameStart { .. } => {
                // Close the previous game on its final clock before the
                // counter goes back to zero.
                if self.in_progress() {
                    self.close_game();
                }
                self.game.handle(record)?;
            }
            EventRecord::Starter(app) => {
                let now = self.game.fractional_inning();
                self.cards[app.side.index()]
                    .start(app.side, app, now)
                    .map_err(HandlerError::from)?;
            }
            EventRecord::Substitution(app) => {
                let now = self.game.fractional_inning();
                self.cards[app.side.index()]
                    .substitute(app.side, app, now)
                    .map_err(HandlerError::from)?;
            }
            _ => {
                self.game.handle(record)?;
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Dispatch {
        if self.in_progress() {
            self.close_game();
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.game.reset();
        self.cards = Default::default();
        self.finished = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
