//! # retrosheet-rs
//!
//! A single-pass analyzer for Retrosheet play-by-play event files.
//!
//! Event files are line-oriented CSV: one `id` record opens each game,
//! followed by `info`, `start`, `play`, `sub` and other records. This
//! library decodes them one at a time and pushes each record through a set
//! of named handlers that track game state, lineups, innings played and
//! the winning side.
//!
//! ## Overview
//!
//! - **Records**: [`EventRecord`] decoded from a line by its leading tag
//! - **Plays**: [`parse_play`] classifies a descriptor and counts its outs
//! - **Handlers**: stateful [`Handler`]s in a [`HandlerRegistry`]
//! - **Triggers**: a handler can ask for a named callback, which runs at
//!   once with access to every handler
//!
//! ## Example
//!
//! ```
//! use retrosheet_rs::{Analysis, EventRecord, InningsPlayed, Side};
//!
//! let lines = [
//!     "id,TEST01",
//!     "start,P1,\"Player One\",0,1,1",
//!     "play,1,0,P1,00,,K",
//!     "play,1,0,P1,00,,63/G",
//! ];
//! let records = lines.iter().map(|l| EventRecord::from_line(l).unwrap());
//!
//! let mut analysis = Analysis::new();
//! analysis.register_handler("inn_played", InningsPlayed::new());
//! let summary = analysis.run_records(records).unwrap();
//! assert_eq!(summary.records, 4);
//!
//! // The end of input closes the game; two outs into the top of the first.
//! let innings = analysis.handlers().get::<InningsPlayed>("inn_played").unwrap();
//! let game = innings.finished_game().unwrap();
//! assert_eq!(game.game_id.as_deref(), Some("TEST01"));
//! let played = game.innings_played[Side::Visiting.index()]["P1"];
//! assert!((played - 2.0 / 3.0).abs() < 1e-9);
//! ```

pub mod boundary;
pub mod error;
pub mod executor;
pub mod game_state;
pub mod handler;
pub mod innings;
pub mod play;
pub mod player_index;
pub mod record;
pub mod report;
pub mod roster;
pub mod source;
pub mod winner;

pub use boundary::{GameLimit, GameTrigger};
pub use error::{
    DecodeError, HandlerError, LineupError, PipelineError, PlayError, SourceError, WinnerError,
};
pub use executor::{Analysis, RunOutcome, RunSummary};
pub use game_state::{AmbiguousPlay, GameTracker, InconsistencyPolicy};
pub use handler::{Dispatch, Handler, HandlerRegistry};
pub use innings::{GameInnings, InningsPlayed, LineupCard};
pub use play::{Base, PlayCategory, PlayOutcome, RunnerAdvance, parse_play};
pub use player_index::PlayerIndex;
pub use record::{Appearance, EventRecord, Hand, Play, Side};
pub use report::{FeatureRow, GameSummary};
pub use roster::ActivePlayers;
pub use source::{DecodeStats, RecordStream, Source};
pub use winner::{GameRosters, Winner};
