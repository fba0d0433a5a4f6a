//! Error types for decoding, game tracking, and the analysis pipeline.
//!
//! Errors fall into two groups. Decode diagnostics ([`DecodeError`],
//! [`PlayError`]) are reported and the offending input is skipped.
//! [`HandlerError`] is what a handler returns from dispatch; it is either
//! handler-local (the handler is parked until resolved) or fatal to the
//! whole pass, see [`HandlerError::is_fatal`].

use std::path::PathBuf;

use thiserror::Error;

use crate::record::Side;

/// A raw record that could not be turned into an [`EventRecord`](crate::EventRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty record")]
    Empty,

    #[error("unrecognized record tag '{0}'")]
    UnknownTag(String),

    #[error("'{tag}' record expects {expected} fields, found {found}")]
    FieldCount {
        tag: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("field '{field}' is not a valid integer: '{value}'")]
    InvalidInteger { field: &'static str, value: String },

    #[error("invalid side '{0}' (expected 0 or 1)")]
    InvalidSide(String),

    #[error("batting order {0} out of range 0-9")]
    InvalidBattingOrder(u8),

    #[error("invalid hand '{0}' (expected L or R)")]
    InvalidHand(String),
}

/// A play descriptor that no grammar rule recognises.
///
/// This is a diagnostic for manual review, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("empty play descriptor")]
    Empty,

    #[error("unrecognized play descriptor '{descriptor}': {reason}")]
    Ambiguous {
        descriptor: String,
        reason: &'static str,
    },
}

impl PlayError {
    pub(crate) fn ambiguous(descriptor: &str, reason: &'static str) -> Self {
        PlayError::Ambiguous {
            descriptor: descriptor.to_string(),
            reason,
        }
    }
}

/// Failure reading the raw input. Always fatal to the pass.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error in {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin} has no '{column}' column")]
    MissingColumn {
        origin: String,
        column: &'static str,
    },
}

/// Winner query failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WinnerError {
    /// A required info field has not been seen yet this game.
    #[error("info '{0}' must be seen before computing the winning team")]
    MissingInfo(&'static str),

    #[error("winning pitcher '{0}' is on neither roster")]
    PitcherNotOnRoster(String),

    #[error("winning pitcher '{0}' is on both rosters")]
    PitcherOnBothRosters(String),
}

/// Lineup bookkeeping violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupError {
    #[error("{side} batting slot {slot} already holds '{occupant}', cannot start '{player}'")]
    SlotOccupied {
        side: Side,
        slot: u8,
        occupant: String,
        player: String,
    },

    #[error("{side} player '{player}' re-entered after leaving the game")]
    Reentry { side: Side, player: String },
}

/// Condition raised by a handler or a trigger callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// Derived inning/half disagrees with the declared one.
    #[error(
        "lost track of outs: derived inning {derived_inning} ({derived_side}) \
         but play declares inning {declared_inning} ({declared_side}): {descriptor}"
    )]
    Inconsistent {
        derived_inning: u32,
        derived_side: Side,
        declared_inning: u32,
        declared_side: Side,
        descriptor: String,
    },

    #[error(transparent)]
    Lineup(#[from] LineupError),

    #[error(transparent)]
    Winner(#[from] WinnerError),

    /// Graceful stop request. Fatal, but not an error.
    #[error("stop requested")]
    Stop,

    #[error("fatal: {0}")]
    Fatal(String),
}

impl HandlerError {
    /// Fatal conditions end the whole pass; the rest park one handler.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Stop | HandlerError::Fatal(_))
    }
}

/// Why a pass was aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("handler '{handler}' aborted the pass: {error}")]
    Handler {
        handler: String,
        error: HandlerError,
    },

    #[error("trigger '{trigger}' aborted the pass: {error}")]
    Trigger {
        trigger: String,
        error: HandlerError,
    },

    #[error("handler '{handler}' fired unregistered trigger '{trigger}'")]
    UnknownTrigger { handler: String, trigger: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(HandlerError::Stop.is_fatal());
        assert!(HandlerError::Fatal("x".into()).is_fatal());
        assert!(!HandlerError::Winner(WinnerError::MissingInfo("wp")).is_fatal());
        assert!(
            !HandlerError::Lineup(LineupError::Reentry {
                side: Side::Home,
                player: "p".into()
            })
            .is_fatal()
        );
    }

    #[test]
    fn test_display_messages() {
        let err = DecodeError::UnknownTag("foo".into());
        assert_eq!(err.to_string(), "unrecognized record tag 'foo'");

        let err = WinnerError::PitcherOnBothRosters("smitj001".into());
        assert_eq!(err.to_string(), "winning pitcher 'smitj001' is on both rosters");
    }
}
