/// Offline ECDICT dictionary backed by a local `stardict` SQLite file.
use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

use super::markup::{Style, encode_line};
use super::{Dict, DictError, Endpoint, WordDefine, WordItem};
use crate::config::DictConfig;

pub struct DictEcdict {
    path: PathBuf,
}

impl DictEcdict {
    pub fn new(config: &DictConfig) -> Self {
        Self {
            path: PathBuf::from(&config.ecdict_path),
        }
    }
}

pub fn factory(config: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
    Ok(Box::new(DictEcdict::new(config)))
}

struct StardictRow {
    word: String,
    phonetic: Option<String>,
    definition: Option<String>,
    translation: Option<String>,
}

fn local_err(source: rusqlite::Error) -> DictError {
    DictError::LocalStore {
        endpoint: Endpoint::Ecdict,
        source,
    }
}

/// ECDICT stores line breaks either raw or as a literal `\n`.
fn split_field(field: Option<&str>) -> Vec<String> {
    field
        .unwrap_or_default()
        .replace("\\n", "\n")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl Dict for DictEcdict {
    fn search(&self, word: &str) -> Result<WordItem, DictError> {
        debug!("ecdict lookup: {word} in {}", self.path.display());
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(local_err)?;

        let row = conn
            .query_row(
                "SELECT word, phonetic, definition, translation FROM stardict WHERE word = ? COLLATE NOCASE LIMIT 1",
                params![word],
                |row| {
                    Ok(StardictRow {
                        word: row.get(0)?,
                        phonetic: row.get(1)?,
                        definition: row.get(2)?,
                        translation: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(local_err)?;

        let Some(row) = row else {
            return Ok(WordItem::not_found(word));
        };

        let mut lines = split_field(row.translation.as_deref());
        lines.extend(
            split_field(row.definition.as_deref())
                .iter()
                .map(|l| encode_line(Style::Quote, l)),
        );
        if lines.is_empty() {
            return Ok(WordItem::not_found(word));
        }

        let phonetics = row
            .phonetic
            .filter(|p| !p.trim().is_empty())
            .map(|p| vec![format!("[{}]", p.trim())])
            .unwrap_or_default();

        debug!("ecdict matched headword {}", row.word);
        Ok(WordItem::new(
            word,
            vec![WordDefine {
                phonetics,
                definition: lines.join("\n"),
            }],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("stardict.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE stardict (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word VARCHAR(64) NOT NULL UNIQUE,
                phonetic VARCHAR(64),
                definition TEXT,
                translation TEXT
            );
            "#,
        )
        .unwrap();
        conn.execute(
            "INSERT INTO stardict (word, phonetic, definition, translation) VALUES (?, ?, ?, ?)",
            params![
                "hello",
                "hә'lәu",
                "n. an expression of greeting\\nint. used to attract attention",
                "interj. 喂, 嘿\nn. 表示问候",
            ],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO stardict (word, phonetic, definition, translation) VALUES (?, NULL, '', NULL)",
            params!["blank"],
        )
        .unwrap();
        path
    }

    fn dict_for(path: &std::path::Path) -> DictEcdict {
        let config = DictConfig {
            ecdict_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        DictEcdict::new(&config)
    }

    #[test]
    fn test_lookup_found() {
        let temp = tempfile::tempdir().unwrap();
        let dict = dict_for(&setup_db(temp.path()));

        let item = dict.search("Hello").unwrap();
        assert_eq!(item.word, "Hello");
        assert_eq!(item.defines[0].phonetics, vec!["[hә'lәu]"]);
        assert_eq!(
            item.defines[0].definition,
            "interj. 喂, 嘿\nn. 表示问候\n----n. an expression of greeting\n----int. used to attract attention"
        );
    }

    #[test]
    fn test_lookup_missing_and_blank() {
        let temp = tempfile::tempdir().unwrap();
        let dict = dict_for(&setup_db(temp.path()));

        assert!(!dict.search("qwxzv").unwrap().is_found());
        assert!(!dict.search("blank").unwrap().is_found());
    }

    #[test]
    fn test_missing_database_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let dict = dict_for(&temp.path().join("absent.db"));
        let err = dict.search("hello").unwrap_err();
        assert!(matches!(err, DictError::LocalStore { .. }));
    }
}
