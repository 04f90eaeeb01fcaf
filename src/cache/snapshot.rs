//! Snapshot persistence for the score tree and the candidate set.
//!
//! - Snapshots live next to the config file, distinguished by suffix
//! - Writes are atomic: backup the old file if it decodes, write a temp file, rename
//! - A missing snapshot means "start empty"; a corrupt one falls back to its backup
//! - Any write failure is fatal, results must not be lost silently

use crate::cache::ScoreTree;
use crate::models::{NamerError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Suffix appended to the config path for the score tree snapshot.
pub const SCORE_SUFFIX: &str = ".data";

/// Suffix appended to the config path for the candidate snapshot.
pub const CANDIDATE_SUFFIX: &str = ".candidate.data";

const BACKUP_SUFFIX: &str = ".bak";
const TEMP_SUFFIX: &str = ".tmp";

/// Accepted names and their scores.
pub type Candidates = BTreeMap<String, i64>;

/// Reads and writes the snapshot files belonging to one config file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    score_path: PathBuf,
    candidate_path: PathBuf,
}

impl SnapshotStore {
    /// Snapshot locations derived from the config file path.
    pub fn for_config(config_path: &Path) -> Self {
        Self {
            score_path: with_suffix(config_path, SCORE_SUFFIX),
            candidate_path: with_suffix(config_path, CANDIDATE_SUFFIX),
        }
    }

    pub fn score_path(&self) -> &Path {
        &self.score_path
    }

    pub fn candidate_path(&self) -> &Path {
        &self.candidate_path
    }

    /// Load the score tree, or an empty tree if none was saved yet.
    pub fn load_tree(&self) -> Result<ScoreTree> {
        let tree: ScoreTree = load_or_default(&self.score_path)?;
        info!(
            path = %self.score_path.display(),
            scored = tree.len(),
            "Loaded score snapshot"
        );
        Ok(tree)
    }

    /// Save the score tree.
    pub fn save_tree(&self, tree: &ScoreTree) -> Result<()> {
        write_snapshot(&self.score_path, tree)?;
        debug!(path = %self.score_path.display(), "Score snapshot saved");
        Ok(())
    }

    /// Load the candidate set, or an empty set if none was saved yet.
    pub fn load_candidates(&self) -> Result<Candidates> {
        let candidates: Candidates = load_or_default(&self.candidate_path)?;
        info!(
            path = %self.candidate_path.display(),
            candidates = candidates.len(),
            "Loaded candidate snapshot"
        );
        Ok(candidates)
    }

    /// Save the candidate set.
    pub fn save_candidates(&self, candidates: &Candidates) -> Result<()> {
        write_snapshot(&self.candidate_path, candidates)?;
        debug!(path = %self.candidate_path.display(), "Candidate snapshot saved");
        Ok(())
    }
}

/// Owns the score tree while it is being mutated and guarantees it reaches disk.
///
/// [`TreeFlush::commit`] saves and hands the tree back, propagating write
/// errors. If the guard is dropped without a commit (early return, panic,
/// cancelled future), `Drop` saves the tree and logs the outcome.
pub struct TreeFlush<'a> {
    store: &'a SnapshotStore,
    tree: ScoreTree,
    committed: bool,
}

impl<'a> TreeFlush<'a> {
    pub fn new(store: &'a SnapshotStore, tree: ScoreTree) -> Self {
        Self {
            store,
            tree,
            committed: false,
        }
    }

    pub fn tree(&self) -> &ScoreTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ScoreTree {
        &mut self.tree
    }

    /// Save the tree and return it.
    pub fn commit(mut self) -> Result<ScoreTree> {
        self.store.save_tree(&self.tree)?;
        self.committed = true;
        Ok(std::mem::take(&mut self.tree))
    }
}

impl Drop for TreeFlush<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.store.save_tree(&self.tree) {
            Ok(()) => warn!(
                scored = self.tree.len(),
                "Score tree flushed without commit"
            ),
            Err(e) => error!(error = %e, "Failed to flush score tree"),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a snapshot, falling back to its backup if the primary is corrupt.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match read_snapshot(path) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(T::default()),
        Err(primary) => {
            let backup = with_suffix(path, BACKUP_SUFFIX);
            warn!(
                path = %path.display(),
                error = %primary,
                "Snapshot is corrupt, trying backup"
            );
            match read_snapshot(&backup) {
                Ok(Some(value)) => {
                    warn!(path = %backup.display(), "Recovered snapshot from backup");
                    Ok(value)
                }
                _ => Err(primary),
            }
        }
    }
}

/// `Ok(None)` when the file cannot be opened; parse failures are errors.
fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            if e.kind() == io::ErrorKind::NotFound {
                debug!(path = %path.display(), "No snapshot, starting empty");
            } else {
                warn!(path = %path.display(), error = %e, "Unreadable snapshot, starting empty");
            }
            return Ok(None);
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| NamerError::ParseError(format!("Invalid snapshot {}: {e}", path.display())))
}

/// Whether the file at `path` decodes as a `T`.
fn decodes<T: DeserializeOwned>(path: &Path) -> bool {
    File::open(path)
        .ok()
        .and_then(|file| serde_json::from_reader::<_, T>(BufReader::new(file)).ok())
        .is_some()
}

fn write_snapshot<T: Serialize + DeserializeOwned>(path: &Path, value: &T) -> Result<()> {
    if path.exists() {
        // A corrupt primary must not replace the backup it was recovered from.
        if decodes::<T>(path) {
            fs::copy(path, with_suffix(path, BACKUP_SUFFIX))
                .map_err(|e| NamerError::io("backing up snapshot", e))?;
        } else {
            warn!(path = %path.display(), "Corrupt snapshot not backed up");
        }
    }

    let temp_path = with_suffix(path, TEMP_SUFFIX);
    {
        let file =
            File::create(&temp_path).map_err(|e| NamerError::io("creating temp snapshot", e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| NamerError::Internal(format!("Serializing snapshot: {e}")))?;
        writer
            .flush()
            .map_err(|e| NamerError::io("flushing temp snapshot", e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| NamerError::io("syncing temp snapshot", e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| NamerError::io("renaming snapshot", e))?;
    Ok(())
}
