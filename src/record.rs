//! Typed event records.
//!
//! An event file is a sequence of comma-delimited lines whose first field
//! is a tag naming the record kind:
//!
//! ```text
//! id,SDN202004010
//! version,2
//! info,visteam,SFN
//! start,yastm001,"Mike Yastrzemski",0,1,9
//! play,1,0,yastm001,12,CBX,63/G
//! sub,pomeb001,"Brandon Pomeranz",1,0,1
//! com,"rain delay"
//! data,er,gallz001,2
//! ```
//!
//! [`EventRecord`] is the closed set of record kinds. Records are built
//! once by [`EventRecord::from_fields`] and never mutated afterwards.

use std::fmt;

use crate::error::DecodeError;

/// Which team a record refers to. Encoded `0` (visiting) / `1` (home).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Visiting,
    Home,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Visiting, Side::Home];

    /// Array index for per-side storage.
    pub fn index(self) -> usize {
        match self {
            Side::Visiting => 0,
            Side::Home => 1,
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Visiting => Side::Home,
            Side::Home => Side::Visiting,
        }
    }

    fn from_field(value: &str) -> Result<Side, DecodeError> {
        match value.trim() {
            "0" => Ok(Side::Visiting),
            "1" => Ok(Side::Home),
            other => Err(DecodeError::InvalidSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Visiting => write!(f, "visiting"),
            Side::Home => write!(f, "home"),
        }
    }
}

/// Batting or throwing hand from `padj` / `badj` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    fn from_field(value: &str) -> Result<Hand, DecodeError> {
        match value.trim() {
            "L" => Ok(Hand::Left),
            "R" => Ok(Hand::Right),
            other => Err(DecodeError::InvalidHand(other.to_string())),
        }
    }
}

/// Fielding position number used for pitchers.
pub const PITCHER_POSITION: u8 = 1;

/// Player appearance from a `start` or `sub` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    pub player_id: String,
    pub name: String,
    pub side: Side,
    /// Batting order slot, 0 for a pitcher not batting under the DH rule.
    pub batting_order: u8,
    /// Fielding position (1-9, 10 = DH, 11 = pinch hitter, 12 = pinch runner).
    pub position: u8,
}

impl Appearance {
    pub fn is_pitcher(&self) -> bool {
        self.position == PITCHER_POSITION
    }
}

/// A `play` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    pub inning: u32,
    pub side: Side,
    pub batter_id: String,
    /// Ball/strike count, `??` when unknown.
    pub count: String,
    pub pitches: String,
    /// Play descriptor, see [`crate::play`].
    pub descriptor: String,
}

/// One decoded line of an event file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRecord {
    /// `id` - starts a new game.
    GameStart { game_id: String },
    Version { version: u32 },
    Starter(Appearance),
    Substitution(Appearance),
    PlayByPlay(Play),
    InfoField { key: String, value: String },
    /// `data` - currently only earned runs per pitcher (`data,er,<player>,<n>`).
    DataField {
        kind: String,
        player_id: String,
        value: u32,
    },
    Comment { text: String },
    PitcherHandAdjustment { player_id: String, hand: Hand },
    BatterHandAdjustment { player_id: String, hand: Hand },
    /// Runner placed on base before the half-inning starts.
    RunnerAdjustment { player_id: String, base: u8 },
}

impl EventRecord {
    /// The tag this record is written with.
    pub fn tag(&self) -> &'static str {
        match self {
            EventRecord::GameStart { .. } => "id",
            EventRecord::Version { .. } => "version",
            EventRecord::Starter(_) => "start",
            EventRecord::Substitution(_) => "sub",
            EventRecord::PlayByPlay(_) => "play",
            EventRecord::InfoField { .. } => "info",
            EventRecord::DataField { .. } => "data",
            EventRecord::Comment { .. } => "com",
            EventRecord::PitcherHandAdjustment { .. } => "padj",
            EventRecord::BatterHandAdjustment { .. } => "badj",
            EventRecord::RunnerAdjustment { .. } => "radj",
        }
    }

    /// Decode one record from its fields. The first field selects the kind.
    pub fn from_fields(fields: &[&str]) -> Result<EventRecord, DecodeError> {
        let (tag, rest) = fields.split_first().ok_or(DecodeError::Empty)?;

        match tag.trim() {
            "id" => {
                let [game_id] = expect_fields::<1>("id", rest)?;
                Ok(EventRecord::GameStart {
                    game_id: game_id.to_string(),
                })
            }
            "version" => {
                let [version] = expect_fields::<1>("version", rest)?;
                Ok(EventRecord::Version {
                    version: parse_int("version", version)?,
                })
            }
            "start" => Ok(EventRecord::Starter(parse_appearance("start", rest)?)),
            "sub" => Ok(EventRecord::Substitution(parse_appearance("sub", rest)?)),
            "play" => {
                let [inning, side, batter, count, pitches, descriptor] =
                    expect_fields::<6>("play", rest)?;
                Ok(EventRecord::PlayByPlay(Play {
                    inning: parse_int("inning", inning)?,
                    side: Side::from_field(side)?,
                    batter_id: batter.to_string(),
                    count: count.to_string(),
                    pitches: pitches.to_string(),
                    descriptor: descriptor.trim().to_string(),
                }))
            }
            "info" => {
                // Some info values are legitimately empty and dropped by writers.
                let (key, value) = match rest {
                    [key] => (*key, ""),
                    [key, value] => (*key, *value),
                    _ => {
                        return Err(DecodeError::FieldCount {
                            tag: "info",
                            expected: 2,
                            found: rest.len(),
                        });
                    }
                };
                Ok(EventRecord::InfoField {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            "data" => {
                let [kind, player, value] = expect_fields::<3>("data", rest)?;
                Ok(EventRecord::DataField {
                    kind: kind.to_string(),
                    player_id: player.to_string(),
                    value: parse_int("data value", value)?,
                })
            }
            "com" => {
                // An unquoted comment may have been split on its commas.
                Ok(EventRecord::Comment {
                    text: rest.join(","),
                })
            }
            "padj" => {
                let [player, hand] = expect_fields::<2>("padj", rest)?;
                Ok(EventRecord::PitcherHandAdjustment {
                    player_id: player.to_string(),
                    hand: Hand::from_field(hand)?,
                })
            }
            "badj" => {
                let [player, hand] = expect_fields::<2>("badj", rest)?;
                Ok(EventRecord::BatterHandAdjustment {
                    player_id: player.to_string(),
                    hand: Hand::from_field(hand)?,
                })
            }
            "radj" => {
                let [player, base] = expect_fields::<2>("radj", rest)?;
                Ok(EventRecord::RunnerAdjustment {
                    player_id: player.to_string(),
                    base: parse_int("base", base)?,
                })
            }
            other => Err(DecodeError::UnknownTag(other.to_string())),
        }
    }

    /// Decode a single raw line, honouring quoted fields.
    pub fn from_line(line: &str) -> Result<EventRecord, DecodeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());
        match reader.records().next() {
            Some(Ok(record)) => {
                let fields: Vec<&str> = record.iter().collect();
                EventRecord::from_fields(&fields)
            }
            _ => Err(DecodeError::Empty),
        }
    }
}

fn expect_fields<'a, const N: usize>(
    tag: &'static str,
    rest: &[&'a str],
) -> Result<[&'a str; N], DecodeError> {
    <[&str; N]>::try_from(rest).map_err(|_| DecodeError::FieldCount {
        tag,
        expected: N,
        found: rest.len(),
    })
}

fn parse_int<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DecodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

fn parse_appearance(tag: &'static str, rest: &[&str]) -> Result<Appearance, DecodeError> {
    let [player, name, side, order, position] = expect_fields::<5>(tag, rest)?;
    let batting_order: u8 = parse_int("batting order", order)?;
    if batting_order > 9 {
        return Err(DecodeError::InvalidBattingOrder(batting_order));
    }
    Ok(Appearance {
        player_id: player.to_string(),
        name: name.to_string(),
        side: Side::from_field(side)?,
        batting_order,
        position: parse_int("position", position)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_game_start() {
        let rec = EventRecord::from_fields(&["id", "TEST01"]).unwrap();
        assert_eq!(
            rec,
            EventRecord::GameStart {
                game_id: "TEST01".to_string()
            }
        );
        assert_eq!(rec.tag(), "id");
    }

    #[test]
    fn test_decode_starter() {
        let rec = EventRecord::from_fields(&["start", "P1", "Player One", "0", "1", "1"]).unwrap();
        match rec {
            EventRecord::Starter(app) => {
                assert_eq!(app.player_id, "P1");
                assert_eq!(app.side, Side::Visiting);
                assert_eq!(app.batting_order, 1);
                assert!(app.is_pitcher());
            }
            other => panic!("expected starter, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_play() {
        let rec = EventRecord::from_line("play,1,0,P1,00,,S7").unwrap();
        match rec {
            EventRecord::PlayByPlay(play) => {
                assert_eq!(play.inning, 1);
                assert_eq!(play.side, Side::Visiting);
                assert_eq!(play.pitches, "");
                assert_eq!(play.descriptor, "S7");
            }
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_quoted_name_with_comma() {
        let rec = EventRecord::from_line(r#"sub,smitj001,"Smith, John",1,9,1"#).unwrap();
        match rec {
            EventRecord::Substitution(app) => {
                assert_eq!(app.name, "Smith, John");
                assert_eq!(app.side, Side::Home);
            }
            other => panic!("expected sub, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_tag() {
        let err = EventRecord::from_fields(&["bogus", "x"]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag("bogus".to_string()));
    }

    #[test]
    fn test_decode_strict_integers() {
        let err = EventRecord::from_fields(&["play", "1x", "0", "P1", "00", "", "S7"]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInteger { field: "inning", .. }));

        let err = EventRecord::from_fields(&["start", "P1", "n", "2", "1", "1"]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidSide("2".to_string()));

        let err = EventRecord::from_fields(&["start", "P1", "n", "0", "10", "1"]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidBattingOrder(10));
    }

    #[test]
    fn test_decode_field_count() {
        let err = EventRecord::from_fields(&["play", "1", "0"]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldCount {
                tag: "play",
                expected: 6,
                found: 2
            }
        );
    }

    #[test]
    fn test_decode_misc_records() {
        assert_eq!(
            EventRecord::from_line("info,wp,").unwrap(),
            EventRecord::InfoField {
                key: "wp".into(),
                value: "".into()
            }
        );
        assert_eq!(
            EventRecord::from_line("data,er,gallz001,2").unwrap(),
            EventRecord::DataField {
                kind: "er".into(),
                player_id: "gallz001".into(),
                value: 2
            }
        );
        assert_eq!(
            EventRecord::from_line("badj,bonib001,R").unwrap(),
            EventRecord::BatterHandAdjustment {
                player_id: "bonib001".into(),
                hand: Hand::Right
            }
        );
        assert_eq!(
            EventRecord::from_line("radj,tatif002,2").unwrap(),
            EventRecord::RunnerAdjustment {
                player_id: "tatif002".into(),
                base: 2
            }
        );
        assert_eq!(
            EventRecord::from_line("com,rain,then sun").unwrap(),
            EventRecord::Comment {
                text: "rain,then sun".into()
            }
        );
    }

    #[test]
    fn test_side_helpers() {
        assert_eq!(Side::Visiting.opponent(), Side::Home);
        assert_eq!(Side::Home.index(), 1);
        assert_eq!(Side::Home.to_string(), "home");
    }
}
