//! Player ID to feature column mapping.
//!
//! Built once before a run and read-only afterwards. Column indices are
//! assigned in input order, starting at zero.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::SourceError;

const ID_COLUMN: &str = "ID";
const DEBUT_COLUMN: &str = "Play debut";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerIndex {
    columns: HashMap<String, usize>,
}

impl PlayerIndex {
    /// Index the IDs in order. A repeated ID keeps its first column.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = HashMap::new();
        for id in ids {
            let next = columns.len();
            columns.entry(id.into()).or_insert(next);
        }
        PlayerIndex { columns }
    }

    /// Read a player register with a header row naming `ID` and
    /// `Play debut` columns. Players who never debuted are skipped.
    pub fn from_reader<R: Read>(origin: &str, reader: R) -> Result<Self, SourceError> {
        let read_err = |source| SourceError::Read {
            origin: origin.to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers().map_err(read_err)?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(SourceError::MissingColumn {
                    origin: origin.to_string(),
                    column: name,
                })
        };
        let id_col = column(ID_COLUMN)?;
        let debut_col = column(DEBUT_COLUMN)?;

        let mut ids = Vec::new();
        for row in reader.records() {
            let row = row.map_err(read_err)?;
            let debut = row.get(debut_col).unwrap_or("").trim();
            let id = row.get(id_col).unwrap_or("").trim();
            if debut.is_empty() || id.is_empty() {
                continue;
            }
            ids.push(id.to_string());
        }
        log::debug!("{origin}: indexed {} players", ids.len());
        Ok(Self::from_ids(ids))
    }

    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn index_of(&self, player_id: &str) -> Option<usize> {
        self.columns.get(player_id).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_from_ids_in_order() {
        let index = PlayerIndex::from_ids(["a", "b", "a", "c"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.index_of("a"), Some(0));
        assert_eq!(index.index_of("b"), Some(1));
        assert_eq!(index.index_of("c"), Some(2));
        assert_eq!(index.index_of("zzz"), None);
    }

    #[test]
    fn test_from_reader_skips_players_without_debut() {
        let register = indoc! {r#"
            ID,Last,First,Play debut
            aardd001,Aardsma,David,04/06/2004
            aaroh101,Aaron,Hank,04/13/1954
            nodeb001,Never,"Played, Not",
            abada001,Abad,Andy,09/17/2001
        "#};
        let index = PlayerIndex::from_reader("register", register.as_bytes()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.index_of("aardd001"), Some(0));
        assert_eq!(index.index_of("abada001"), Some(2));
        assert_eq!(index.index_of("nodeb001"), None);
    }

    #[test]
    fn test_missing_column() {
        let err = PlayerIndex::from_reader("register", "ID,Last\nx,y\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingColumn {
                column: "Play debut",
                ..
            }
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.csv");
        std::fs::write(&path, "ID,Play debut\np1,1990\n").unwrap();
        let index = PlayerIndex::from_path(&path).unwrap();
        assert_eq!(index.index_of("p1"), Some(0));

        let err = PlayerIndex::from_path(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }
}
