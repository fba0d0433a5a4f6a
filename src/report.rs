//! Per-game aggregates read out of the handler registry at trigger time.

use std::collections::BTreeMap;
use std::fmt;

use crate::boundary::GameTrigger;
use crate::error::HandlerError;
use crate::game_state::AmbiguousPlay;
use crate::handler::HandlerRegistry;
use crate::innings::InningsPlayed;
use crate::player_index::PlayerIndex;
use crate::record::Side;
use crate::winner::Winner;

/// One finished game: who won and how long everyone played.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub game_id: Option<String>,
    pub winning_side: Side,
    pub winning_team: String,
    pub innings_played: [BTreeMap<String, f64>; 2],
    /// Descriptors that counted no outs and need manual review.
    pub ambiguous: Vec<AmbiguousPlay>,
}

/// A sparse feature row: `(column, signed innings)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub entries: Vec<(usize, f64)>,
    /// Players missing from the index.
    pub unknown_players: usize,
}

impl GameSummary {
    /// Collect the game that just ended from the named handlers.
    ///
    /// `None` when no game has ended yet (a trigger fired on the first
    /// game). The game id comes from the trigger, which is the authority
    /// on game boundaries.
    ///
    /// Fails with a fatal error when a handler is missing or of the wrong
    /// type, and with the winner's own (non-fatal) error when the game has
    /// no resolvable winner.
    pub fn collect(
        registry: &HandlerRegistry,
        trigger_name: &str,
        innings_name: &str,
        winner_name: &str,
    ) -> Result<Option<Self>, HandlerError> {
        let trigger = registry
            .get::<GameTrigger>(trigger_name)
            .ok_or_else(|| missing(trigger_name))?;
        let innings = registry
            .get::<InningsPlayed>(innings_name)
            .ok_or_else(|| missing(innings_name))?;
        let winner = registry
            .get::<Winner>(winner_name)
            .ok_or_else(|| missing(winner_name))?;

        let Some(game) = innings.finished_game() else {
            return Ok(None);
        };
        let (winning_side, winning_team) = winner.last_game().winning_team()?;
        Ok(Some(GameSummary {
            game_id: trigger
                .finished_game()
                .map(str::to_string)
                .or_else(|| game.game_id.clone()),
            winning_side,
            winning_team: winning_team.to_string(),
            innings_played: game.innings_played.clone(),
            ambiguous: game.ambiguous.clone(),
        }))
    }

    /// `+1` for the winning side, `-1` for the other.
    pub fn label(&self, side: Side) -> i8 {
        if side == self.winning_side { 1 } else { -1 }
    }

    pub fn feature_row(&self, index: &PlayerIndex) -> FeatureRow {
        let mut row = FeatureRow::default();
        for side in Side::ALL {
            let sign = f64::from(self.label(side));
            for (player, innings) in &self.innings_played[side.index()] {
                match index.index_of(player) {
                    Some(column) => row.entries.push((column, sign * innings)),
                    None => {
                        log::debug!("player '{player}' is not in the index");
                        row.unknown_players += 1;
                    }
                }
            }
        }
        row.entries.sort_by_key(|(column, _)| *column);
        row
    }
}

fn missing(name: &str) -> HandlerError {
    HandlerError::Fatal(format!("no handler '{name}' of the expected type"))
}

/// Tab-separated: game id, winning team, winning side, then
/// `player=innings` pairs for each side, losers negated.
impl fmt::Display for GameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.game_id.as_deref().unwrap_or("-"),
            self.winning_team,
            self.winning_side
        )?;
        for side in Side::ALL {
            let sign = f64::from(self.label(side));
            for (player, innings) in &self.innings_played[side.index()] {
                write!(f, "\t{player}={:.3}", sign * innings)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::record::EventRecord;
    use pretty_assertions::assert_eq;

    fn feed(registry: &mut HandlerRegistry, lines: &[&str]) {
        for line in lines {
            let record = EventRecord::from_line(line).unwrap();
            registry.get_mut::<InningsPlayed>("inn").unwrap().handle(&record).unwrap();
            registry.get_mut::<Winner>("winner").unwrap().handle(&record).unwrap();
            registry.get_mut::<GameTrigger>("trigger").unwrap().handle(&record).unwrap();
        }
    }

    fn summary() -> GameSummary {
        GameSummary {
            game_id: Some("SDN202104010".into()),
            winning_side: Side::Home,
            winning_team: "SDN".into(),
            innings_played: [
                BTreeMap::from([("webbl001".to_string(), 6.0), ("roget001".to_string(), 2.0)]),
                BTreeMap::from([("lampd001".to_string(), 5.0)]),
            ],
            ambiguous: Vec::new(),
        }
    }

    #[test]
    fn test_labels() {
        let s = summary();
        assert_eq!(s.label(Side::Home), 1);
        assert_eq!(s.label(Side::Visiting), -1);
    }

    #[test]
    fn test_feature_row_signs_and_unknowns() {
        let index = PlayerIndex::from_ids(["lampd001", "webbl001"]);
        let row = summary().feature_row(&index);
        assert_eq!(row.entries, vec![(0, 5.0), (1, -6.0)]);
        assert_eq!(row.unknown_players, 1);
    }

    #[test]
    fn test_display_is_tab_separated() {
        let mut s = summary();
        s.innings_played[0].clear();
        assert_eq!(s.to_string(), "SDN202104010\tSDN\thome\tlampd001=5.000");
    }

    #[test]
    fn test_collect_from_registry() {
        let mut registry = HandlerRegistry::new();
        registry.register("inn", InningsPlayed::new());
        registry.register("winner", Winner::new());
        registry.register("trigger", GameTrigger::new("eog"));
        let lines = [
            "id,G1",
            "info,visteam,AAA",
            "info,hometeam,BBB",
            "info,wp,p2",
            "start,p1,x,0,0,1",
            "start,p2,y,1,0,1",
            "id,G2",
        ];
        feed(&mut registry, &lines);
        let s = GameSummary::collect(&registry, "trigger", "inn", "winner")
            .unwrap()
            .unwrap();
        assert_eq!(s.game_id.as_deref(), Some("G1"));
        assert_eq!(s.winning_side, Side::Home);
        assert_eq!(s.winning_team, "BBB");
        assert_eq!(s.innings_played[Side::Home.index()]["p2"], 0.0);

        let err = GameSummary::collect(&registry, "trigger", "winner", "inn").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_collect_before_any_game_ended() {
        let mut registry = HandlerRegistry::new();
        registry.register("inn", InningsPlayed::new());
        registry.register("winner", Winner::new());
        registry.register("trigger", GameTrigger::new("eog"));
        assert_eq!(
            GameSummary::collect(&registry, "trigger", "inn", "winner").unwrap(),
            None
        );
    }

    #[test]
    fn test_collect_carries_ambiguous_plays() {
        let mut registry = HandlerRegistry::new();
        registry.register("inn", InningsPlayed::new());
        registry.register("winner", Winner::new());
        registry.register("trigger", GameTrigger::new("eog"));
        let lines = [
            "id,G1",
            "info,visteam,AAA",
            "info,hometeam,BBB",
            "info,wp,p1",
            "start,p1,x,0,0,1",
            "play,1,0,x,??,,ZZ",
            "id,G2",
        ];
        feed(&mut registry, &lines);
        let s = GameSummary::collect(&registry, "trigger", "inn", "winner")
            .unwrap()
            .unwrap();
        assert_eq!(s.winning_side, Side::Visiting);
        assert_eq!(s.ambiguous.len(), 1);
        assert_eq!(s.ambiguous[0].game_id.as_deref(), Some("G1"));
    }

    #[test]
    fn test_collect_without_winner_is_non_fatal() {
        let mut registry = HandlerRegistry::new();
        registry.register("inn", InningsPlayed::new());
        registry.register("winner", Winner::new());
        registry.register("trigger", GameTrigger::new("eog"));
        feed(&mut registry, &["id,G1", "start,p1,x,0,0,1", "id,G2"]);
        let err = GameSummary::collect(&registry, "trigger", "inn", "winner").unwrap_err();
        assert_eq!(err, HandlerError::Winner(crate::error::WinnerError::MissingInfo("visteam")));
        assert!(!err.is_fatal());
    }
}
