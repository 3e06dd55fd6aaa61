/// File-backed notebook: one YAML file per chapter.
///
/// Every mark is load-everything, patch one record, rewrite-everything.
/// The rewrite goes to a temp file in the same directory which is then
/// renamed over the chapter file, so readers see either the old or the
/// new content and never a partial write. There is no locking: two
/// concurrent writers to one chapter race and the last rename wins.
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{Action, Notebook, NotebookError, Ranking, WordNote, validate_chapter};

/// Extension of chapter files.
pub const CHAPTER_EXT: &str = "yml";

pub struct FileNotebook {
    dir: PathBuf,
    chapter: String,
    ranking: Ranking,
}

impl FileNotebook {
    /// Bind to `chapter` inside `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P, chapter: &str, ranking: Ranking) -> Result<Self, NotebookError> {
        validate_chapter(chapter)?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| NotebookError::write(dir.display(), e))?;
        debug!("file notebook at {} (chapter {chapter})", dir.display());
        Ok(Self {
            dir,
            chapter: chapter.to_string(),
            ranking,
        })
    }

    /// Path of the current chapter's file.
    pub fn chapter_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{CHAPTER_EXT}", self.chapter))
    }

    fn read_notes(&self) -> Result<Vec<WordNote>, NotebookError> {
        read_chapter_file(&self.chapter_path())
    }

    /// Serialize `notes` into a temp file next to the chapter file.
    ///
    /// The temp file is removed on drop unless it is persisted.
    fn stage_notes(&self, notes: &[WordNote]) -> Result<NamedTempFile, NotebookError> {
        let target = self.chapter_path();
        let data = serde_yaml::to_string(notes).map_err(|e| NotebookError::marshal(target.display(), e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| NotebookError::write(target.display(), e))?;
        // The temp file starts owner-only; keep whatever mode the chapter had.
        if let Ok(meta) = fs::metadata(&target) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| NotebookError::write(target.display(), e))?;
        }
        tmp.write_all(data.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| NotebookError::write(target.display(), e))?;
        Ok(tmp)
    }

    fn write_notes(&self, notes: &[WordNote]) -> Result<(), NotebookError> {
        let target = self.chapter_path();
        let staged = self.stage_notes(notes)?;
        staged
            .persist(&target)
            .map_err(|e| NotebookError::write(target.display(), e.error))?;
        debug!("rewrote {} ({} notes)", target.display(), notes.len());
        Ok(())
    }
}

/// Load one chapter file. A missing or blank file is an empty chapter.
fn read_chapter_file(path: &Path) -> Result<Vec<WordNote>, NotebookError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(NotebookError::read(path.display(), e)),
    };
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&data).map_err(|e| NotebookError::marshal(path.display(), e))
}

impl Notebook for FileNotebook {
    fn chapter(&self) -> &str {
        &self.chapter
    }

    fn mark_at(&self, word: &str, action: Action, now: i64) -> Result<Option<WordNote>, NotebookError> {
        let mut notes = self.read_notes()?;
        let idx = notes.iter().position(|n| n.word == word);

        let Some(delta) = action.delta() else {
            let Some(idx) = idx else {
                return Ok(None);
            };
            let removed = notes.remove(idx);
            self.write_notes(&notes)?;
            return Ok(Some(removed));
        };

        let idx = match idx {
            Some(idx) => idx,
            None => {
                notes.push(WordNote::new(word, now));
                notes.len() - 1
            }
        };
        let note = &mut notes[idx];
        note.lookup_times += delta;
        note.last_lookup_time = now;
        let updated = note.clone();

        self.write_notes(&notes)?;
        Ok(Some(updated))
    }

    fn list_notes(&self) -> Result<Vec<WordNote>, NotebookError> {
        let mut notes = self.read_notes()?;
        self.ranking.sort(&mut notes);
        Ok(notes)
    }

    fn list_chapter(&self) -> Result<BTreeSet<String>, NotebookError> {
        let mut chapters = BTreeSet::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(chapters),
            Err(e) => return Err(NotebookError::read(self.dir.display(), e)),
        };

        for entry in entries {
            let path = entry
                .map_err(|e| NotebookError::read(self.dir.display(), e))?
                .path();
            if path.is_dir() {
                continue;
            }

            let is_chapter_file = path.extension().and_then(|e| e.to_str()) == Some(CHAPTER_EXT);
            let stem = path.file_stem().and_then(|s| s.to_str());
            let chapter = match stem {
                Some(stem) if is_chapter_file && validate_chapter(stem).is_ok() => stem,
                _ => {
                    warn!("Skipping non-chapter file in notebook: {}", path.display());
                    continue;
                }
            };

            if read_chapter_file(&path)?.is_empty() {
                debug!("Skipping empty chapter file: {}", path.display());
                continue;
            }
            chapters.insert(chapter.to_string());
        }

        Ok(chapters)
    }
}
