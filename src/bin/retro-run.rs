//! CLI tool to analyze Retrosheet event files.
//!
//! Prints one tab-separated line per game: game id, winning team, winning
//! side, then each player's innings played (negated for the losing side).
//! With `--players`, prints sparse feature columns instead.

use clap::{Parser, ValueEnum};
use retrosheet_rs::{
    ActivePlayers, Analysis, GameLimit, GameSummary, GameTrigger, HandlerError, HandlerRegistry,
    InconsistencyPolicy, InningsPlayed, PlayerIndex, RunOutcome, Source, Winner,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

const INNINGS: &str = "inn_played";
const WINNER: &str = "winner";
const BOUNDARY: &str = "trigger";
const PLAYERS: &str = "players";
const LIMIT: &str = "limit";
const END_OF_GAME: &str = "endofgame";

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Put the game's handler in error state until the next game
    Abandon,
    /// Log the mismatch and keep counting
    BestEffort,
}

impl From<Policy> for InconsistencyPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Abandon => InconsistencyPolicy::AbandonGame,
            Policy::BestEffort => InconsistencyPolicy::BestEffort,
        }
    }
}

/// Compute winners and innings played for every game in the input.
#[derive(Parser)]
#[command(name = "retro-run")]
struct Cli {
    /// Event files, read in order (stdin when none are given)
    inputs: Vec<PathBuf>,

    /// What to do when a play's inning or side disagrees with the out count
    #[arg(long, value_enum, default_value = "abandon")]
    policy: Policy,

    /// Also fire the end-of-game trigger when the first game starts
    #[arg(long)]
    fire_on_first: bool,

    /// Stop after this many games
    #[arg(long)]
    max_games: Option<usize>,

    /// Player register (CSV with `ID` and `Play debut` columns)
    #[arg(long)]
    players: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let index = match &cli.players {
        Some(path) => match PlayerIndex::from_path(path) {
            Ok(index) => Some(index),
            Err(e) => {
                eprintln!("Error reading player register: {e}");
                process::exit(1);
            }
        },
        None => None,
    };

    let mut analysis = Analysis::new();
    if let Some(max) = cli.max_games {
        analysis.register_handler(LIMIT, GameLimit::new(max));
    }
    analysis.register_handler(INNINGS, InningsPlayed::with_policy(cli.policy.into()));
    analysis.register_handler(WINNER, Winner::new());
    analysis.register_handler(PLAYERS, ActivePlayers::new());
    analysis.register_handler(
        BOUNDARY,
        GameTrigger::new(END_OF_GAME).fire_on_first(cli.fire_on_first),
    );
    analysis.register_trigger(END_OF_GAME, move |registry| {
        let result = emit_game(registry, index.as_ref());
        let revived = registry.reset_faulted();
        if revived > 0 {
            log::debug!("{revived} handlers revived for the next game");
        }
        result
    });

    let verbose = cli.verbose;
    analysis.on_finish(move |registry, summary| {
        if !verbose {
            return;
        }
        let players = registry
            .get::<ActivePlayers>(PLAYERS)
            .map_or(0, |p| p.player_ids().len());
        eprintln!("Outcome:  {:?}", summary.outcome);
        eprintln!(
            "Records:  {} dispatched, {} triggers, {} players",
            summary.records, summary.triggers_fired, players
        );
        eprintln!(
            "Faults:   {} handler, {} callback",
            summary.handler_faults, summary.callback_faults
        );
    });

    let mut records = Source::from_paths(cli.inputs).records();

    match analysis.run(&mut records) {
        Ok(summary) => {
            let stats = records.stats();
            if verbose {
                eprintln!(
                    "Decoded:  {} of {} lines ({} dropped)",
                    stats.decoded, stats.lines, stats.dropped
                );
            }
            if summary.outcome == RunOutcome::Stopped {
                log::info!("stopped before the end of input");
            }
        }
        Err(e) => {
            eprintln!("Analysis error: {e}");
            process::exit(1);
        }
    }
}

/// Print the game that just ended. Nothing to print when the trigger fired
/// on the first game. Plays that need manual review go to stderr.
fn emit_game(registry: &HandlerRegistry, index: Option<&PlayerIndex>) -> Result<(), HandlerError> {
    if let Some(fault) = registry.fault(INNINGS) {
        log::warn!("skipping game, innings tracker faulted: {fault}");
        return Ok(());
    }
    let Some(summary) = GameSummary::collect(registry, BOUNDARY, INNINGS, WINNER)? else {
        return Ok(());
    };

    let game_id = summary.game_id.as_deref().unwrap_or("-");
    for play in &summary.ambiguous {
        eprintln!("review\t{game_id}\t{}", play.error);
    }
    let line = match index {
        Some(index) => index_line(&summary, index),
        None => summary.to_string(),
    };
    writeln!(io::stdout(), "{line}").map_err(|e| HandlerError::Fatal(e.to_string()))
}

fn index_line(summary: &GameSummary, index: &PlayerIndex) -> String {
    let row = summary.feature_row(index);
    if row.unknown_players > 0 {
        log::warn!(
            "{}: {} players not in the register",
            summary.game_id.as_deref().unwrap_or("-"),
            row.unknown_players
        );
    }
    let mut line = summary.game_id.clone().unwrap_or_else(|| "-".to_string());
    for (column, innings) in row.entries {
        line.push_str(&format!("\t{column}:{innings:.3}"));
    }
    line
}
