//! Winning side resolution.
//!
//! Event files name the winning pitcher (`info,wp,<player>`) but not the
//! winning team. The resolver collects every pitcher who appears for each
//! side and looks the winning pitcher up in those rosters.

use std::any::Any;
use std::collections::HashSet;

use crate::error::WinnerError;
use crate::handler::{Dispatch, Handler};
use crate::record::{Appearance, EventRecord, Side};

/// Pitchers and game metadata for one game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRosters {
    pitchers: [HashSet<String>; 2],
    visiting_team: Option<String>,
    home_team: Option<String>,
    winning_pitcher: Option<String>,
}

impl GameRosters {
    pub fn pitchers(&self, side: Side) -> &HashSet<String> {
        &self.pitchers[side.index()]
    }

    pub fn team(&self, side: Side) -> Option<&str> {
        match side {
            Side::Visiting => self.visiting_team.as_deref(),
            Side::Home => self.home_team.as_deref(),
        }
    }

    pub fn winning_pitcher(&self) -> Option<&str> {
        self.winning_pitcher.as_deref()
    }

    /// The side whose roster holds the winning pitcher, and its team code.
    pub fn winning_team(&self) -> Result<(Side, &str), WinnerError> {
        let visiting = self
            .visiting_team
            .as_deref()
            .ok_or(WinnerError::MissingInfo("visteam"))?;
        let home = self
            .home_team
            .as_deref()
            .ok_or(WinnerError::MissingInfo("hometeam"))?;
        let wp = self
            .winning_pitcher
            .as_deref()
            .ok_or(WinnerError::MissingInfo("wp"))?;

        let on_home = self.pitchers(Side::Home).contains(wp);
        let on_visiting = self.pitchers(Side::Visiting).contains(wp);
        match (on_visiting, on_home) {
            (true, false) => Ok((Side::Visiting, visiting)),
            (false, true) => Ok((Side::Home, home)),
            (true, true) => Err(WinnerError::PitcherOnBothRosters(wp.to_string())),
            (false, false) => Err(WinnerError::PitcherNotOnRoster(wp.to_string())),
        }
    }

    fn note_appearance(&mut self, app: &Appearance) {
        if app.is_pitcher() {
            self.pitchers[app.side.index()].insert(app.player_id.clone());
        }
    }

    fn note_info(&mut self, key: &str, value: &str) {
        // Empty values (e.g. `info,wp,` for a tie) count as not seen.
        let value = Some(value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        match key {
            "visteam" => self.visiting_team = value,
            "hometeam" => self.home_team = value,
            "wp" => self.winning_pitcher = value,
            _ => {}
        }
    }
}

/// Resolves the winning side of each game.
///
/// An `id` record (or the end of input) moves the game in progress to
/// [`finished`](Self::finished) and starts an empty one, so rosters never
/// leak from one game into the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Winner {
    current: GameRosters,
    finished: Option<GameRosters>,
    in_game: bool,
}

impl Winner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The game in progress.
    pub fn current(&self) -> &GameRosters {
        &self.current
    }

    /// The most recently ended game.
    pub fn finished(&self) -> Option<&GameRosters> {
        self.finished.as_ref()
    }

    /// The ended game if there is one, otherwise the game in progress.
    pub fn last_game(&self) -> &GameRosters {
        self.finished.as_ref().unwrap_or(&self.current)
    }

    /// Winning side of the game in progress.
    pub fn winning_team(&self) -> Result<(Side, &str), WinnerError> {
        self.current.winning_team()
    }

    fn close_game(&mut self) {
        if self.in_game {
            self.finished = Some(std::mem::take(&mut self.current));
        }
    }
}

impl Handler for Winner {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        match record {
            EventRecord::GameStart { .. } => {
                self.close_game();
                self.current = GameRosters::default();
                self.in_game = true;
            }
            EventRecord::Starter(app) | EventRecord::Substitution(app) => {
                self.current.note_appearance(app)
            }
            EventRecord::InfoField { key, value } => self.current.note_info(key, value),
            _ => {}
        }
        Ok(None)
    }

    fn finish(&mut self) -> Dispatch {
        self.close_game();
        self.in_game = false;
        Ok(None)
    }

    fn reset(&mut self) {
        *self = Winner::default();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
