//! SQLite-backed notebook.
//!
//! All chapters share one table. Every mark is a single statement, so
//! concurrent writers to the same row never lose an increment.
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{Action, Notebook, NotebookError, Ranking, WordNote, validate_chapter};

const TABLE: &str = "word_notes";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS word_notes (
    word_id TEXT NOT NULL,
    chapter TEXT NOT NULL,
    word TEXT NOT NULL,
    lookup_times INTEGER NOT NULL DEFAULT 0,
    create_time INTEGER NOT NULL,
    last_lookup_time INTEGER NOT NULL,
    PRIMARY KEY (word_id, chapter)
);

CREATE INDEX IF NOT EXISTS idx_word_notes_chapter ON word_notes(chapter);
"#;

const UPSERT_SQL: &str = r#"
INSERT INTO word_notes (word_id, chapter, word, lookup_times, create_time, last_lookup_time)
VALUES (?1, ?2, ?3, ?4, ?5, ?5)
ON CONFLICT(word_id, chapter) DO UPDATE SET
    lookup_times = lookup_times + excluded.lookup_times,
    last_lookup_time = excluded.last_lookup_time
RETURNING word, lookup_times, create_time, last_lookup_time
"#;

const DELETE_SQL: &str = r#"
DELETE FROM word_notes WHERE word_id = ?1 AND chapter = ?2
RETURNING word, lookup_times, create_time, last_lookup_time
"#;

/// Stable row key for a word: lowercase hex SHA-256 of its UTF-8 bytes.
pub fn word_id(word: &str) -> String {
    Sha256::digest(word.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<WordNote> {
    Ok(WordNote {
        word: row.get(0)?,
        lookup_times: row.get(1)?,
        create_time: row.get(2)?,
        last_lookup_time: row.get(3)?,
    })
}

pub struct SqlNotebook {
    conn: Connection,
    chapter: String,
    ranking: Ranking,
}

impl SqlNotebook {
    /// Open (or create) the database at `path` bound to `chapter`.
    pub fn open<P: AsRef<Path>>(path: P, chapter: &str, ranking: Ranking) -> Result<Self, NotebookError> {
        validate_chapter(chapter)?;
        let path = path.as_ref();
        info!("Opening notebook database: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NotebookError::write(parent.display(), e))?;
        }

        let conn = Connection::open(path).map_err(|e| NotebookError::read(path.display(), e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| NotebookError::read(path.display(), e))?;
        // journal_mode returns a row, so it cannot go through execute_batch.
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| NotebookError::read(path.display(), e))?;
        debug!("notebook journal mode: {mode}");

        Self::init(conn, chapter, ranking)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory(chapter: &str, ranking: Ranking) -> Result<Self, NotebookError> {
        validate_chapter(chapter)?;
        let conn = Connection::open_in_memory().map_err(|e| NotebookError::read(":memory:", e))?;
        Self::init(conn, chapter, ranking)
    }

    fn init(conn: Connection, chapter: &str, ranking: Ranking) -> Result<Self, NotebookError> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| NotebookError::write(TABLE, e))?;
        Ok(Self {
            conn,
            chapter: chapter.to_string(),
            ranking,
        })
    }
}

impl Notebook for SqlNotebook {
    fn chapter(&self) -> &str {
        &self.chapter
    }

    fn mark_at(&self, word: &str, action: Action, now: i64) -> Result<Option<WordNote>, NotebookError> {
        let id = word_id(word);

        let Some(delta) = action.delta() else {
            let removed = self
                .conn
                .query_row(DELETE_SQL, params![id, self.chapter], note_from_row)
                .optional()
                .map_err(|e| NotebookError::write(TABLE, e))?;
            debug!("deleted {word:?} from {}: {}", self.chapter, removed.is_some());
            return Ok(removed);
        };

        let note = self
            .conn
            .query_row(
                UPSERT_SQL,
                params![id, self.chapter, word, delta, now],
                note_from_row,
            )
            .map_err(|e| NotebookError::write(TABLE, e))?;
        Ok(Some(note))
    }

    fn list_notes(&self) -> Result<Vec<WordNote>, NotebookError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT word, lookup_times, create_time, last_lookup_time FROM word_notes \
                 WHERE chapter = ?1",
            )
            .map_err(|e| NotebookError::read(TABLE, e))?;
        let rows = stmt
            .query_map(params![self.chapter], note_from_row)
            .map_err(|e| NotebookError::read(TABLE, e))?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row.map_err(|e| NotebookError::read(TABLE, e))?);
        }
        self.ranking.sort(&mut notes);
        Ok(notes)
    }

    fn list_chapter(&self) -> Result<BTreeSet<String>, NotebookError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT chapter FROM word_notes")
            .map_err(|e| NotebookError::read(TABLE, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| NotebookError::read(TABLE, e))?;

        let mut chapters = BTreeSet::new();
        for row in rows {
            chapters.insert(row.map_err(|e| NotebookError::read(TABLE, e))?);
        }
        Ok(chapters)
    }
}
