//! Word notebook: persisted per-chapter review records.
//!
//! Two interchangeable backends implement [`Notebook`]:
//!
//! - [`file::FileNotebook`]: one YAML file per chapter, rewritten whole
//!   through a sibling temp file and an atomic rename
//! - [`sql::SqlNotebook`]: one SQLite table, one row per `(chapter, word)`,
//!   mutated with a single upsert statement
//!
//! Exactly one backend is active per run, picked by [`open_notebook`].
pub mod file;
pub mod sql;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{NotebookBackend, NotebookConfig};

pub const DEFAULT_CHAPTER: &str = "default";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ── Model ────────────────────────────────────────────────────────────

/// One review record, unique per `(chapter, word)`.
///
/// `lookup_times` is not clamped: repeated `Learned` marks can push it
/// below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordNote {
    pub word: String,
    pub lookup_times: i64,
    /// Seconds since epoch, set at first mark.
    pub create_time: i64,
    /// Seconds since epoch, refreshed on every non-delete mark.
    pub last_lookup_time: i64,
}

impl WordNote {
    fn new(word: &str, now: i64) -> Self {
        Self {
            word: word.to_string(),
            lookup_times: 0,
            create_time: now,
            last_lookup_time: now,
        }
    }
}

/// The mutation applied by [`Notebook::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create the note or bump its counter.
    Learning,
    /// Decrement the counter (creating the note at -1 if absent).
    Learned,
    /// Remove the note; absent notes are not an error.
    Delete,
}

impl Action {
    /// Counter delta, or `None` for [`Action::Delete`].
    pub fn delta(self) -> Option<i64> {
        match self {
            Action::Learning => Some(1),
            Action::Learned => Some(-1),
            Action::Delete => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Learning => "learning",
            Action::Learned => "learned",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = NotebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "learning" => Ok(Action::Learning),
            "learned" => Ok(Action::Learned),
            "delete" => Ok(Action::Delete),
            other => Err(NotebookError::InvalidAction(other.to_string())),
        }
    }
}

// ── Ranking ──────────────────────────────────────────────────────────

/// Read-time ordering of a chapter, i.e. which word to review next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ranking {
    /// Most recently first-learned word first.
    #[default]
    #[serde(rename = "create_time")]
    CreateTimeDesc,
    /// Most looked-up word first, ties broken by the latest lookup.
    #[serde(rename = "lookup_times")]
    LookupTimesDesc,
}

impl Ranking {
    /// Comparator applied by every backend after loading. Equal keys fall
    /// back to the word.
    pub fn compare(self, a: &WordNote, b: &WordNote) -> Ordering {
        let primary = match self {
            Ranking::CreateTimeDesc => b.create_time.cmp(&a.create_time),
            Ranking::LookupTimesDesc => b
                .lookup_times
                .cmp(&a.lookup_times)
                .then(b.last_lookup_time.cmp(&a.last_lookup_time)),
        };
        primary.then_with(|| a.word.cmp(&b.word))
    }

    pub fn sort(self, notes: &mut [WordNote]) {
        notes.sort_by(|a, b| self.compare(a, b));
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Notebook failures. Storage variants name the file or table they hit.
#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid chapter name: {0:?}")]
    InvalidChapter(String),

    #[error("read notebook failed: {target}: {source}")]
    ReadFailed {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("write notebook failed: {target}: {source}")]
    WriteFailed {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("(un)marshal notebook failed: {target}: {source}")]
    MarshalFailed {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl NotebookError {
    pub(crate) fn read(target: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::ReadFailed {
            target: target.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn write(target: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::WriteFailed {
            target: target.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn marshal(target: impl fmt::Display, source: impl Into<BoxError>) -> Self {
        Self::MarshalFailed {
            target: target.to_string(),
            source: source.into(),
        }
    }
}

/// Chapter names double as file stems, so keep them path-free.
pub fn validate_chapter(name: &str) -> Result<(), NotebookError> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(NotebookError::InvalidChapter(name.to_string()));
    }
    Ok(())
}

// ── Notebook trait ───────────────────────────────────────────────────

/// Capability set shared by every backend. An instance is bound to one
/// chapter for its whole lifetime.
pub trait Notebook: Send {
    /// The chapter this instance reads and writes.
    fn chapter(&self) -> &str;

    /// Apply `action` to `word` as of `now` (seconds since epoch).
    ///
    /// Returns the note after the change, the removed note for
    /// [`Action::Delete`], or `None` when a delete matched nothing.
    fn mark_at(&self, word: &str, action: Action, now: i64) -> Result<Option<WordNote>, NotebookError>;

    /// Notes of the current chapter in ranking order.
    fn list_notes(&self) -> Result<Vec<WordNote>, NotebookError>;

    /// Chapters currently holding at least one note.
    fn list_chapter(&self) -> Result<BTreeSet<String>, NotebookError>;

    /// [`Notebook::mark_at`] with the wall clock.
    fn mark(&self, word: &str, action: Action) -> Result<Option<WordNote>, NotebookError> {
        self.mark_at(word, action, chrono::Utc::now().timestamp())
    }

    /// The top-ranked note, i.e. the next word to review.
    fn review(&self) -> Result<Option<WordNote>, NotebookError> {
        Ok(self.list_notes()?.into_iter().next())
    }
}

/// Open the configured backend for the configured chapter.
pub fn open_notebook(config: &NotebookConfig) -> Result<Box<dyn Notebook>, NotebookError> {
    match config.backend {
        NotebookBackend::File => Ok(Box::new(file::FileNotebook::open(
            &config.dir,
            &config.chapter,
            config.ranking,
        )?)),
        NotebookBackend::Sqlite => Ok(Box::new(sql::SqlNotebook::open(
            &config.db_path,
            &config.chapter,
            config.ranking,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(word: &str, lookup_times: i64, create_time: i64, last_lookup_time: i64) -> WordNote {
        WordNote {
            word: word.into(),
            lookup_times,
            create_time,
            last_lookup_time,
        }
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("learning".parse::<Action>().unwrap(), Action::Learning);
        assert_eq!("learned".parse::<Action>().unwrap(), Action::Learned);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        let err = "forget".parse::<Action>().unwrap_err();
        assert!(matches!(err, NotebookError::InvalidAction(ref a) if a == "forget"));
    }

    #[test]
    fn test_action_delta() {
        assert_eq!(Action::Learning.delta(), Some(1));
        assert_eq!(Action::Learned.delta(), Some(-1));
        assert_eq!(Action::Delete.delta(), None);
    }

    #[test]
    fn test_rank_by_create_time() {
        let mut notes = vec![
            note("old", 9, 100, 900),
            note("new", 1, 300, 300),
            note("mid", 5, 200, 800),
        ];
        Ranking::CreateTimeDesc.sort(&mut notes);
        let words: Vec<_> = notes.iter().map(|n| n.word.as_str()).collect();
        assert_eq!(words, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_rank_by_lookup_times() {
        let mut notes = vec![
            note("a", 2, 100, 500),
            note("b", 5, 200, 200),
            note("c", 2, 300, 700),
            note("d", -1, 400, 400),
        ];
        Ranking::LookupTimesDesc.sort(&mut notes);
        let words: Vec<_> = notes.iter().map(|n| n.word.as_str()).collect();
        assert_eq!(words, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_rank_ties_by_word() {
        let mut notes = vec![note("zeta", 1, 100, 100), note("alpha", 1, 100, 100)];
        Ranking::CreateTimeDesc.sort(&mut notes);
        assert_eq!(notes[0].word, "alpha");
    }

    #[test]
    fn test_validate_chapter() {
        assert!(validate_chapter("default").is_ok());
        assert!(validate_chapter("travel 2024").is_ok());
        assert!(validate_chapter("").is_err());
        assert!(validate_chapter("  ").is_err());
        assert!(validate_chapter(".hidden").is_err());
        assert!(validate_chapter("a/b").is_err());
        assert!(validate_chapter("a\\b").is_err());
    }

    #[test]
    fn test_ranking_serde_names() {
        assert_eq!(
            serde_json::to_string(&Ranking::CreateTimeDesc).unwrap(),
            "\"create_time\""
        );
        let r: Ranking = serde_json::from_str("\"lookup_times\"").unwrap();
        assert_eq!(r, Ranking::LookupTimesDesc);
    }
}
