//! Outs counter for the current game.
//!
//! The tracker keeps a single running total of outs recorded since the
//! game started and derives everything else from it:
//!
//! | query            | derivation            |
//! |------------------|-----------------------|
//! | inning           | `total / 6 + 1`       |
//! | outs in the half | `total % 3`           |
//! | side at bat      | `(total % 6) / 3`     |
//!
//! Every `play` record declares the inning and side at bat. The tracker
//! checks its derived values against them *before* adding the play's outs;
//! a mismatch means an out was lost or double counted somewhere.

use std::any::Any;

use crate::error::{HandlerError, PlayError};
use crate::handler::{Dispatch, Handler};
use crate::play::parse_play;
use crate::record::{EventRecord, Play, Side};

/// What to do when the derived inning/side disagrees with a play record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InconsistencyPolicy {
    /// Report a non-fatal condition; the handler is parked for the rest
    /// of the game.
    #[default]
    AbandonGame,
    /// Log, count, and keep counting outs.
    BestEffort,
}

/// A descriptor the parser could not classify, kept for manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousPlay {
    pub game_id: Option<String>,
    pub error: PlayError,
}

/// Running outs counter for one game.
#[derive(Debug, Clone, Default)]
pub struct GameTracker {
    policy: InconsistencyPolicy,
    game_id: Option<String>,
    total_outs: u32,
    inconsistencies: usize,
    ambiguous: Vec<AmbiguousPlay>,
}

impl GameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InconsistencyPolicy) -> Self {
        GameTracker {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> InconsistencyPolicy {
        self.policy
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn total_outs(&self) -> u32 {
        self.total_outs
    }

    pub fn inning(&self) -> u32 {
        self.total_outs / 6 + 1
    }

    /// Outs in the current half-inning, 0-2.
    pub fn outs(&self) -> u32 {
        self.total_outs % 3
    }

    pub fn batting_side(&self) -> Side {
        if (self.total_outs % 6) / 3 == 0 {
            Side::Visiting
        } else {
            Side::Home
        }
    }

    /// Inning plus outs/3, a continuous clock for lineup tracking.
    pub fn fractional_inning(&self) -> f64 {
        self.inning() as f64 + self.outs() as f64 / 3.0
    }

    /// Mismatches tolerated under [`InconsistencyPolicy::BestEffort`].
    pub fn inconsistencies(&self) -> usize {
        self.inconsistencies
    }

    /// Descriptors of the current game that need manual review.
    pub fn ambiguous_plays(&self) -> &[AmbiguousPlay] {
        &self.ambiguous
    }

    /// Hand over the current game's review list, leaving it empty.
    pub fn take_ambiguous(&mut self) -> Vec<AmbiguousPlay> {
        std::mem::take(&mut self.ambiguous)
    }

    /// Begin a new game: the counter and the review list start over.
    pub fn start_game(&mut self, game_id: &str) {
        self.game_id = Some(game_id.to_string());
        self.total_outs = 0;
        self.ambiguous.clear();
    }

    /// Validate the play against the derived state, then count its outs.
    ///
    /// Returns the outs added.
    pub fn record_play(&mut self, play: &Play) -> Result<u32, HandlerError> {
        let (inning, side) = (self.inning(), self.batting_side());
        if inning != play.inning || side != play.side {
            let err = HandlerError::Inconsistent {
                derived_inning: inning,
                derived_side: side,
                declared_inning: play.inning,
                declared_side: play.side,
                descriptor: play.descriptor.clone(),
            };
            match self.policy {
                InconsistencyPolicy::AbandonGame => return Err(err),
                InconsistencyPolicy::BestEffort => {
                    log::warn!("{}: {err}", self.game_label());
                    self.inconsistencies += 1;
                }
            }
        }

        let outs = match parse_play(&play.descriptor) {
            Ok(outcome) => u32::from(outcome.out_count),
            Err(error) => {
                log::warn!("{}: {error}", self.game_label());
                self.ambiguous.push(AmbiguousPlay {
                    game_id: self.game_id.clone(),
                    error,
                });
                0
            }
        };
        self.total_outs += outs;
        Ok(outs)
    }

    fn game_label(&self) -> &str {
        self.game_id.as_deref().unwrap_or("<no game>")
    }
}

impl Handler for GameTracker {
    fn handle(&mut self, record: &EventRecord) -> Dispatch {
        match record {
            EventRecord::GameStart { game_id } => self.start_game(game_id),
            EventRecord::PlayByPlay(play) => {
                self.record_play(play)?;
            }
            _ => {}
        }
        Ok(None)
    }

    fn reset(&mut self) {
        *self = GameTracker::with_policy(self.policy);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn play(inning: u32, side: Side, descriptor: &str) -> Play {
        Play {
            inning,
            side,
            batter_id: "b".to_string(),
            count: "??".to_string(),
            pitches: String::new(),
            descriptor: descriptor.to_string(),
        }
    }

    #[test]
    fn test_fresh_state() {
        let tracker = GameTracker::new();
        assert_eq!(tracker.inning(), 1);
        assert_eq!(tracker.outs(), 0);
        assert_eq!(tracker.batting_side(), Side::Visiting);
        assert_eq!(tracker.fractional_inning(), 1.0);
    }

    #[test]
    fn test_half_innings_advance() {
        let mut tracker = GameTracker::new();
        tracker.start_game("G1");
        tracker.record_play(&play(1, Side::Visiting, "63/G")).unwrap();
        assert_eq!(tracker.outs(), 1);
        assert!((tracker.fractional_inning() - 4.0 / 3.0).abs() < 1e-9);
        tracker.record_play(&play(1, Side::Visiting, "54(1)3/GDP")).unwrap();
        assert_eq!(tracker.outs(), 0);
        assert_eq!(tracker.batting_side(), Side::Home);
        assert_eq!(tracker.inning(), 1);

        tracker.record_play(&play(1, Side::Home, "K")).unwrap();
        tracker.record_play(&play(1, Side::Home, "8/F")).unwrap();
        tracker.record_play(&play(1, Side::Home, "S7")).unwrap();
        tracker.record_play(&play(1, Side::Home, "9/F")).unwrap();
        assert_eq!(tracker.inning(), 2);
        assert_eq!(tracker.batting_side(), Side::Visiting);
        assert_eq!(tracker.total_outs(), 6);
    }

    #[test]
    fn test_mismatch_abandons_by_default() {
        let mut tracker = GameTracker::new();
        tracker.start_game("G1");
        let err = tracker.record_play(&play(2, Side::Visiting, "S7")).unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Inconsistent {
                derived_inning: 1,
                declared_inning: 2,
                ..
            }
        ));
        assert!(!err.is_fatal());
        assert_eq!(tracker.total_outs(), 0);
    }

    #[test]
    fn test_mismatch_best_effort_keeps_counting() {
        let mut tracker = GameTracker::with_policy(InconsistencyPolicy::BestEffort);
        tracker.start_game("G1");
        assert_eq!(tracker.record_play(&play(1, Side::Home, "K")).unwrap(), 1);
        assert_eq!(tracker.inconsistencies(), 1);
        assert_eq!(tracker.total_outs(), 1);
    }

    #[test]
    fn test_ambiguous_play_is_kept_for_review() {
        let mut tracker = GameTracker::new();
        tracker.start_game("G1");
        assert_eq!(tracker.record_play(&play(1, Side::Visiting, "ZZ9")).unwrap(), 0);
        assert_eq!(tracker.ambiguous_plays().len(), 1);
        assert_eq!(tracker.ambiguous_plays()[0].game_id.as_deref(), Some("G1"));
    }

    #[test]
    fn test_game_start_resets_counter() {
        let mut tracker = GameTracker::new();
        tracker
            .handle(&EventRecord::GameStart {
                game_id: "G1".into(),
            })
            .unwrap();
        tracker
            .handle(&EventRecord::PlayByPlay(play(1, Side::Visiting, "K")))
            .unwrap();
        tracker
            .handle(&EventRecord::GameStart {
                game_id: "G2".into(),
            })
            .unwrap();
        assert_eq!(tracker.total_outs(), 0);
        assert_eq!(tracker.fractional_inning(), 1.0);
        assert_eq!(tracker.game_id(), Some("G2"));
    }

    #[test]
    fn test_game_boundaries_keep_game_identity() {
        let mut tracker = GameTracker::new();
        for line in ["id,G1", "play,1,0,x,??,,ZZ", "id,G2", "version,2", "play,1,0,x,??,,ZZ"] {
            tracker.handle(&EventRecord::from_line(line).unwrap()).unwrap();
        }
        assert_eq!(tracker.game_id(), Some("G2"));
        let ambiguous = tracker.take_ambiguous();
        assert_eq!(ambiguous.len(), 1);
        assert_eq!(ambiguous[0].game_id.as_deref(), Some("G2"));
        assert!(tracker.ambiguous_plays().is_empty());
    }

    #[test]
    fn test_reset_keeps_policy() {
        let mut tracker = GameTracker::with_policy(InconsistencyPolicy::BestEffort);
        tracker.start_game("G1");
        tracker.record_play(&play(1, Side::Visiting, "K")).unwrap();
        tracker.reset();
        assert_eq!(tracker.total_outs(), 0);
        assert_eq!(tracker.game_id(), None);
        assert_eq!(tracker.policy(), InconsistencyPolicy::BestEffort);
    }

    proptest! {
        #[test]
        fn prop_counter_never_decreases_within_a_game(
            plays in prop::collection::vec(
                prop::sample::select(vec!["S7", "K", "63/G", "54(1)3/GDP", "W", "CS2(E4)", "PO1"]),
                0..40,
            )
        ) {
            let mut tracker = GameTracker::with_policy(InconsistencyPolicy::BestEffort);
            tracker.start_game("G");
            let mut last = 0;
            for descriptor in plays {
                let p = play(tracker.inning(), tracker.batting_side(), descriptor);
                tracker.record_play(&p).unwrap();
                prop_assert!(tracker.total_outs() >= last);
                last = tracker.total_outs();
            }
            prop_assert_eq!(tracker.inconsistencies(), 0);
            tracker.start_game("H");
            prop_assert_eq!(tracker.total_outs(), 0);
            prop_assert_eq!(tracker.fractional_inning(), 1.0);
        }
    }
}
