//! Scoring pass over the candidate alphabet.
//!
//! Pipeline flow:
//! Alphabet → single characters (phase A) → character pairs (phase B) → ScoreTree
//!
//! Anything already in the tree is skipped, so a rerun against a saved
//! snapshot only fetches what is missing. The first fetch error ends the pass;
//! everything inserted before it stays in the tree.

use crate::cache::ScoreTree;
use crate::client::ScoreSource;
use crate::models::{FetchError, PairRule};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Counts from one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringStats {
    /// Lookups answered by the scoring service
    pub fetched: usize,
    /// Lookups already present in the tree
    pub cached: usize,
}

/// Drives single-character then two-character scoring through the tree.
pub struct ScoringDriver<'a, S: ScoreSource + ?Sized> {
    source: &'a S,
    alphabet: &'a [char],
    pair_rule: PairRule,
    progress: ProgressBar,
}

impl<'a, S: ScoreSource + ?Sized> ScoringDriver<'a, S> {
    pub fn new(source: &'a S, alphabet: &'a [char], pair_rule: PairRule) -> Self {
        Self {
            source,
            alphabet,
            pair_rule,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Number of lookups a full pass performs.
    pub fn total_lookups(&self) -> usize {
        self.alphabet.len() + self.pair_rule.pairs(self.alphabet.len()).count()
    }

    /// Run phase A to completion, then phase B.
    pub async fn run(&self, tree: &mut ScoreTree) -> Result<ScoringStats, FetchError> {
        let mut stats = ScoringStats::default();

        info!(
            alphabet = self.alphabet.len(),
            lookups = self.total_lookups(),
            already_scored = tree.len(),
            "Starting scoring pass"
        );

        let phases = match self.score_singles(tree, &mut stats).await {
            Ok(()) => self.score_pairs(tree, &mut stats).await,
            Err(e) => Err(e),
        };
        if let Err(e) = phases {
            self.progress
                .abandon_with_message(format!("Aborted after {} fetched", stats.fetched));
            return Err(e);
        }

        self.progress.finish_with_message(format!(
            "Done! {} fetched, {} cached",
            stats.fetched, stats.cached
        ));
        info!(
            fetched = stats.fetched,
            cached = stats.cached,
            "Scoring pass complete"
        );
        Ok(stats)
    }

    /// Phase A: every alphabet character on its own, in alphabet order.
    pub async fn score_singles(
        &self,
        tree: &mut ScoreTree,
        stats: &mut ScoringStats,
    ) -> Result<(), FetchError> {
        for &c in self.alphabet {
            let path = [c];
            if tree.has(&path) {
                stats.cached += 1;
            } else {
                let score = self.source.score(&c.to_string()).await?;
                tree.insert(&path, score);
                stats.fetched += 1;
            }
            self.tick(stats);
        }
        Ok(())
    }

    /// Phase B: ordered character pairs chosen by the pair rule.
    ///
    /// Requires the first character of every pair to be scored already.
    pub async fn score_pairs(
        &self,
        tree: &mut ScoreTree,
        stats: &mut ScoringStats,
    ) -> Result<(), FetchError> {
        for (i, j) in self.pair_rule.pairs(self.alphabet.len()) {
            let (first, second) = (self.alphabet[i], self.alphabet[j]);
            if !tree.has(&[first]) {
                return Err(FetchError::MissingParent(first));
            }

            let path = [first, second];
            if tree.has(&path) {
                stats.cached += 1;
            } else {
                let fragment: String = path.iter().collect();
                let score = self.source.score(&fragment).await?;
                tree.insert(&path, score);
                stats.fetched += 1;
            }
            self.tick(stats);
        }
        Ok(())
    }

    fn tick(&self, stats: &ScoringStats) {
        self.progress.inc(1);
        self.progress.set_message(format!(
            "fetched: {}, cached: {}",
            stats.fetched, stats.cached
        ));
        debug!(fetched = stats.fetched, cached = stats.cached, "Lookup done");
    }
}

impl<S: ScoreSource + ?Sized> Drop for ScoringDriver<'_, S> {
    fn drop(&mut self) {
        // Cancelled mid-pass.
        if !self.progress.is_finished() {
            self.progress.abandon();
        }
    }
}

/// Progress bar for a scoring pass of `total` lookups.
pub fn scoring_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}
