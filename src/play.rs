//! Play descriptor parser.
//!
//! A play descriptor is the last field of a `play` record:
//!
//! ```text
//! 54(1)3/GDP.3-H;2-3
//! ^^^^^^ ^^^ ^^^^^^^
//! basic  mod advance clause
//! ```
//!
//! - **basic play**: what the batter (or a runner event) did. Fielded outs
//!   are fielder digit sequences where `(B)`/`(1)`/`(2)`/`(3)` marks a
//!   runner put out at the end of a throw sequence.
//! - **modifiers**: `/`-separated annotations (`GDP`, `F7`, `TH`, ...).
//! - **advance clause**: `;`-separated runner moves after the `.`,
//!   `1-3` for an advance, `2X3(56)` for a runner thrown out. A fielding
//!   error in the parentheses (`1X3(E5)`) means the runner was safe.
//!
//! Strikeouts and walks can be combined with a runner event:
//! `K+SB2`, `W+WP.2-3`.
//!
//! [`parse_play`] is pure: the same descriptor always gives the same
//! [`PlayOutcome`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PlayError;

/// What the basic play was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayCategory {
    FieldedOut,
    Strikeout,
    CaughtStealing,
    Pickoff,
    PickoffCaughtStealing,
    Single,
    Double,
    GroundRuleDouble,
    Triple,
    HomeRun,
    Walk,
    IntentionalWalk,
    HitByPitch,
    Error,
    FoulError,
    FieldersChoice,
    CatcherInterference,
    StolenBase,
    DefensiveIndifference,
    WildPitch,
    PassedBall,
    Balk,
    OtherAdvance,
    NoPlay,
}

/// A base a runner starts from or reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Batter,
    First,
    Second,
    Third,
    Home,
}

impl Base {
    fn from_char(c: char) -> Option<Base> {
        match c {
            'B' => Some(Base::Batter),
            '1' => Some(Base::First),
            '2' => Some(Base::Second),
            '3' => Some(Base::Third),
            'H' => Some(Base::Home),
            _ => None,
        }
    }
}

/// One runner move from the advance clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerAdvance {
    pub from: Base,
    pub to: Base,
    /// Put out on the way (an `X` not cancelled by an error).
    pub out: bool,
    /// Parenthesised annotations, without the parentheses.
    pub annotations: Vec<String>,
}

/// Structured result of parsing one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub primary_category: PlayCategory,
    /// The strikeout or walk in a combined `K+...` / `W+...` event.
    pub leading: Option<PlayCategory>,
    /// Outs recorded on the play, 0-3.
    pub out_count: u8,
    pub modifiers: Vec<String>,
    pub advances: Vec<RunnerAdvance>,
}

/// Fielder sequence: throws ending in marked outs, then an optional
/// unmarked putout and an optional error.
static FIELDED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?:\d+\([B123]\))*)(\d*)(E\d)?$").unwrap());

static OUT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([B123]\)").unwrap());

static ADVANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([B123])([-X])([123H])((?:\([^()]*\))*)$").unwrap());

static GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]*)\)").unwrap());

static ERROR_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"E\d").unwrap());

static LEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:K\d*|W|IW|I)$").unwrap());

/// Non-fielded basic plays. Patterns are anchored so order is irrelevant.
static RULES: Lazy<Vec<(Regex, PlayCategory)>> = Lazy::new(|| {
    use PlayCategory::*;
    [
        (r"^K\d*$", Strikeout),
        (r"^CS[23H](?:\([^()]*\))*$", CaughtStealing),
        (r"^POCS[23H](?:\([^()]*\))*$", PickoffCaughtStealing),
        (r"^PO[123](?:\([^()]*\))*$", Pickoff),
        (r"^SB[23H](?:\([^()]*\))*$", StolenBase),
        (r"^S\d*$", Single),
        (r"^DGR\d*$", GroundRuleDouble),
        (r"^D\d*$", Double),
        (r"^T\d*$", Triple),
        (r"^HR?\d*$", HomeRun),
        (r"^HP$", HitByPitch),
        (r"^W$", Walk),
        (r"^IW?$", IntentionalWalk),
        (r"^E\d$", Error),
        (r"^FLE\d$", FoulError),
        (r"^FC\d?$", FieldersChoice),
        (r"^C$", CatcherInterference),
        (r"^DI$", DefensiveIndifference),
        (r"^WP$", WildPitch),
        (r"^PB$", PassedBall),
        (r"^BK$", Balk),
        (r"^OA$", OtherAdvance),
        (r"^NP$", NoPlay),
    ]
    .into_iter()
    .map(|(pattern, category)| (Regex::new(pattern).unwrap(), category))
    .collect()
});

/// Parse a play descriptor into its outcome.
///
/// Descriptors no rule recognises are returned as [`PlayError::Ambiguous`]
/// so they can be reviewed instead of silently counted as zero outs.
pub fn parse_play(descriptor: &str) -> Result<PlayOutcome, PlayError> {
    // `!` exceptional play, `?`/`#` uncertain play: no effect on the outcome.
    let cleaned: String = descriptor
        .chars()
        .filter(|c| !matches!(c, '!' | '?' | '#') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Err(PlayError::Empty);
    }

    let (event, advance_clause) = match cleaned.split_once('.') {
        Some((event, advance)) => (event, Some(advance)),
        None => (cleaned.as_str(), None),
    };

    let mut segments = split_top_level(event, '/').into_iter();
    let basic = segments.next().unwrap_or_default();
    if basic.is_empty() {
        return Err(PlayError::ambiguous(descriptor, "missing basic play"));
    }
    let modifiers: Vec<String> = segments
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();

    let advances = match advance_clause {
        Some(clause) => parse_advances(descriptor, clause)?,
        None => Vec::new(),
    };
    let batter_accounted = advances.iter().any(|a| a.from == Base::Batter);

    let mut out_count: u32 = 0;

    let (leading, primary) = match basic.split_once('+') {
        Some((lead, rest)) => {
            if !LEADING.is_match(lead) {
                return Err(PlayError::ambiguous(
                    descriptor,
                    "combined event must start with a strikeout or walk",
                ));
            }
            let category = classify_simple(lead)
                .ok_or_else(|| PlayError::ambiguous(descriptor, "unknown leading event"))?;
            out_count += strikeout_outs(category, batter_accounted);
            (Some(category), rest)
        }
        None => (None, basic),
    };
    if primary.is_empty() {
        return Err(PlayError::ambiguous(descriptor, "missing event after '+'"));
    }

    let mut primary_category = None;
    for piece in split_top_level(primary, ';') {
        let (category, outs) = classify_piece(descriptor, piece, batter_accounted)?;
        if primary_category.is_none() {
            primary_category = Some(category);
        }
        out_count += outs;
    }
    let primary_category =
        primary_category.ok_or_else(|| PlayError::ambiguous(descriptor, "missing basic play"))?;

    out_count += advances.iter().filter(|a| a.out).count() as u32;

    if out_count > 3 {
        return Err(PlayError::ambiguous(descriptor, "more than three outs"));
    }

    Ok(PlayOutcome {
        primary_category,
        leading,
        out_count: out_count as u8,
        modifiers,
        advances,
    })
}

/// Outs contributed by one `;`-separated piece of the basic play.
fn classify_piece(
    descriptor: &str,
    piece: &str,
    batter_accounted: bool,
) -> Result<(PlayCategory, u32), PlayError> {
    if piece.starts_with(|c: char| c.is_ascii_digit()) {
        return fielded_outs(descriptor, piece).map(|outs| (PlayCategory::FieldedOut, outs));
    }

    let category = classify_simple(piece)
        .ok_or_else(|| PlayError::ambiguous(descriptor, "unrecognized basic play"))?;
    let outs = match category {
        PlayCategory::Strikeout => strikeout_outs(category, batter_accounted),
        PlayCategory::CaughtStealing
        | PlayCategory::Pickoff
        | PlayCategory::PickoffCaughtStealing => {
            if has_error(piece) {
                0
            } else {
                1
            }
        }
        _ => 0,
    };
    Ok((category, outs))
}

fn classify_simple(piece: &str) -> Option<PlayCategory> {
    RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(piece))
        .map(|(_, category)| *category)
}

/// A strikeout is an out unless the advance clause moves the batter.
fn strikeout_outs(category: PlayCategory, batter_accounted: bool) -> u32 {
    match category {
        PlayCategory::Strikeout if !batter_accounted => 1,
        _ => 0,
    }
}

/// `54(1)3` = 2, `5(2)4(1)3` = 3, `8` = 1, `64(1)E3` = 1, `5E3` = 0.
fn fielded_outs(descriptor: &str, piece: &str) -> Result<u32, PlayError> {
    let caps = FIELDED
        .captures(piece)
        .ok_or_else(|| PlayError::ambiguous(descriptor, "malformed fielder sequence"))?;
    let marked = OUT_MARKER.find_iter(&caps[1]).count() as u32;
    let trailing = !caps[2].is_empty();
    let error = caps.get(3).is_some();

    // The error cancels the unmarked putout; runners marked before it are out.
    let outs = if trailing && !error {
        marked + 1
    } else {
        marked
    };
    Ok(outs)
}

fn has_error(text: &str) -> bool {
    GROUP
        .captures_iter(text)
        .any(|caps| ERROR_MARK.is_match(&caps[1]))
}

fn parse_advances(descriptor: &str, clause: &str) -> Result<Vec<RunnerAdvance>, PlayError> {
    split_top_level(clause, ';')
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(|item| {
            let caps = ADVANCE
                .captures(item)
                .ok_or_else(|| PlayError::ambiguous(descriptor, "malformed runner advance"))?;
            let base = |i: usize| {
                caps[i]
                    .chars()
                    .next()
                    .and_then(Base::from_char)
                    .ok_or_else(|| PlayError::ambiguous(descriptor, "unknown base"))
            };
            let annotations: Vec<String> = GROUP
                .captures_iter(&caps[4])
                .map(|g| g[1].to_string())
                .collect();
            let thrown_out = &caps[2] == "X";
            let error = annotations.iter().any(|a| ERROR_MARK.is_match(a));
            Ok(RunnerAdvance {
                from: base(1)?,
                to: base(3)?,
                out: thrown_out && !error,
                annotations,
            })
        })
        .collect()
}

/// Split on `sep` outside parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
