//! Run context for one namer invocation.
//!
//! The session owns the config, the snapshot store, the score tree and the
//! candidate set, and lends them to one pass at a time. Each pass is raced
//! against a shutdown future; whichever finishes first wins, and whatever was
//! recorded up to that point is written to disk before the session moves on.

use crate::cache::{Candidates, ScoreTree, SnapshotStore, TreeFlush};
use crate::client::ScoreSource;
use crate::models::{Config, FetchError, NamerError, Result};
use crate::pipeline::{
    CurationStats, Curator, Prompter, ScoreStats, ScoringDriver, ScoringStats, write_candidates,
};
use indicatif::ProgressBar;
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info, warn};

/// How a scoring pass ended.
#[derive(Debug)]
pub enum ScoreOutcome {
    /// Every lookup finished
    Completed(ScoringStats),
    /// A fetch failed; earlier results are kept
    Failed(FetchError),
    /// The shutdown signal arrived first; the in-flight fetch was abandoned
    Interrupted,
}

impl ScoreOutcome {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Everything one run reads and mutates.
pub struct Session {
    config: Config,
    alphabet: Vec<char>,
    store: SnapshotStore,
    tree: ScoreTree,
    candidates: Candidates,
}

impl Session {
    /// Load the config at `config_path` and the snapshots next to it.
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        Self::with_config(config, SnapshotStore::for_config(config_path))
    }

    /// Build a session from an already-loaded config.
    pub fn with_config(config: Config, store: SnapshotStore) -> Result<Self> {
        config.validate()?;
        let tree = store.load_tree()?;
        let candidates = store.load_candidates()?;
        let alphabet = config.alphabet();

        info!(
            last_name = %config.last_name,
            alphabet = alphabet.len(),
            scored = tree.len(),
            candidates = candidates.len(),
            "Session ready"
        );

        Ok(Self {
            config,
            alphabet,
            store,
            tree,
            candidates,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn tree(&self) -> &ScoreTree {
        &self.tree
    }

    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run the scoring pass until it completes, fails, or `shutdown` resolves.
    ///
    /// The tree is written to disk in every case. Only a failed write is an
    /// error; a failed fetch is reported through [`ScoreOutcome::Failed`].
    pub async fn score<S, F>(
        &mut self,
        source: &S,
        shutdown: F,
        progress: ProgressBar,
    ) -> Result<ScoreOutcome>
    where
        S: ScoreSource + ?Sized,
        F: Future<Output = ()>,
    {
        let mut flush = TreeFlush::new(&self.store, std::mem::take(&mut self.tree));
        let driver =
            ScoringDriver::new(source, &self.alphabet, self.config.pair_rule).with_progress(progress);

        let outcome = tokio::select! {
            result = driver.run(flush.tree_mut()) => match result {
                Ok(stats) => ScoreOutcome::Completed(stats),
                Err(e) => {
                    error!(error = %e, "Scoring aborted");
                    ScoreOutcome::Failed(e)
                }
            },
            () = shutdown => {
                warn!("Stop signal received, abandoning scoring");
                ScoreOutcome::Interrupted
            }
        };

        self.tree = flush.commit()?;
        info!(scored = self.tree.len(), "Score snapshot written");
        Ok(outcome)
    }

    /// Score buckets for the current tree.
    pub fn stats(&self) -> ScoreStats {
        ScoreStats::from_tree(&self.tree, &self.config.last_name)
    }

    /// Print the `top` best score buckets.
    pub fn report(&self, top: usize) -> Result<()> {
        self.stats()
            .print_top(top)
            .map_err(|e| NamerError::io("printing report", e))
    }

    /// Run the curation pass until it completes or `shutdown` resolves, then
    /// save the tree and the candidate set.
    ///
    /// Returns `None` if interrupted.
    pub async fn curate<P, F>(
        &mut self,
        prompter: &mut P,
        shutdown: F,
    ) -> Result<Option<CurationStats>>
    where
        P: Prompter + ?Sized,
        F: Future<Output = ()>,
    {
        let curator = Curator::new(&self.config.last_name, self.config.min_candidate_score);

        let outcome = tokio::select! {
            stats = curator.run(&mut self.tree, &mut self.candidates, prompter) => Some(stats),
            () = shutdown => {
                warn!("Stop signal received, abandoning curation");
                None
            }
        };

        self.save()?;
        Ok(outcome)
    }

    /// Write both snapshots.
    pub fn save(&self) -> Result<()> {
        self.store.save_tree(&self.tree)?;
        self.store.save_candidates(&self.candidates)
    }

    /// Print the candidate list, highest score first.
    pub fn print_candidates(&self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_candidates(&self.candidates, &mut out)
            .and_then(|()| out.flush())
            .map_err(|e| NamerError::io("printing candidates", e))
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PairRule;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn config(words: &str) -> Config {
        serde_json::from_value(serde_json::json!({
            "last_name": "王",
            "year": 2019, "month": 3, "day": 7, "hour": 8, "minute": 5,
            "first_name_key_words": words,
            "min_candidate_score": 85
        }))
        .unwrap()
    }

    fn session_in(dir: &TempDir, words: &str) -> Session {
        let store = SnapshotStore::for_config(&dir.path().join("wang.json"));
        Session::with_config(config(words), store).unwrap()
    }

    /// Answers the first `answered` lookups, then signals and hangs.
    struct StallingSource {
        answered: usize,
        calls: Mutex<usize>,
        stalled: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl ScoreSource for StallingSource {
        async fn score(&self, _fragment: &str) -> std::result::Result<i64, FetchError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call > self.answered {
                if let Some(tx) = self.stalled.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                std::future::pending::<()>().await;
            }
            Ok(60 + call as i64)
        }
    }

    struct Constant(i64);

    #[async_trait]
    impl ScoreSource for Constant {
        async fn score(&self, _fragment: &str) -> std::result::Result<i64, FetchError> {
            Ok(self.0)
        }
    }

    struct Failing;

    #[async_trait]
    impl ScoreSource for Failing {
        async fn score(&self, fragment: &str) -> std::result::Result<i64, FetchError> {
            Err(FetchError::UnparsableResponse {
                fragment: fragment.to_string(),
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_interrupted_scoring_persists_completed_fetches() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir, "明,华,强,美,丽");
        let (tx, rx) = oneshot::channel();
        let source = StallingSource {
            answered: 3,
            calls: Mutex::new(0),
            stalled: Mutex::new(Some(tx)),
        };

        let outcome = session
            .score(&source, async { rx.await.unwrap_or(()) }, ProgressBar::hidden())
            .await
            .unwrap();

        assert!(outcome.is_interrupted());
        let saved = session.store().load_tree().unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved.has(&['明']) && saved.has(&['华']) && saved.has(&['强']));
        assert!(!saved.has(&['美']));
        assert_eq!(&saved, session.tree());
    }

    #[tokio::test]
    async fn test_failed_scoring_still_persists() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir, "明,华");

        let outcome = session
            .score(&Failing, std::future::pending(), ProgressBar::hidden())
            .await
            .unwrap();

        assert!(matches!(outcome, ScoreOutcome::Failed(FetchError::UnparsableResponse { .. })));
        assert!(session.store().score_path().exists());
        assert!(session.tree().is_empty());
    }

    #[tokio::test]
    async fn test_completed_scoring_then_resume_from_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir, "明,华");

        let outcome = session
            .score(&Constant(88), std::future::pending(), ProgressBar::hidden())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ScoreOutcome::Completed(ScoringStats { fetched: 6, cached: 0 })
        ));

        let mut resumed = session_in(&dir, "明,华");
        assert_eq!(resumed.config().pair_rule, PairRule::Full);
        let outcome = resumed
            .score(&Failing, std::future::pending(), ProgressBar::hidden())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ScoreOutcome::Completed(ScoringStats { fetched: 0, cached: 6 })
        ));
    }

    struct Yes;

    #[async_trait]
    impl Prompter for Yes {
        async fn ask(&mut self, _question: &str) -> Option<String> {
            Some("y".to_string())
        }
    }

    struct Silent;

    #[async_trait]
    impl Prompter for Silent {
        async fn ask(&mut self, _question: &str) -> Option<String> {
            std::future::pending::<()>().await;
            None
        }
    }

    #[tokio::test]
    async fn test_curation_saves_candidates_and_visited() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir, "明,华");
        session
            .score(&Constant(90), std::future::pending(), ProgressBar::hidden())
            .await
            .unwrap();

        let stats = session
            .curate(&mut Yes, std::future::pending())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.accepted, 6);

        let reopened = session_in(&dir, "明,华");
        assert_eq!(reopened.candidates().len(), 6);
        assert!(reopened.tree().entries("王").all(|e| e.visited));
    }

    #[tokio::test]
    async fn test_interrupted_curation_still_saves() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir, "明");
        session
            .score(&Constant(90), std::future::pending(), ProgressBar::hidden())
            .await
            .unwrap();

        let outcome = session.curate(&mut Silent, async {}).await.unwrap();

        assert!(outcome.is_none());
        assert!(session.store().candidate_path().exists());
    }
}
