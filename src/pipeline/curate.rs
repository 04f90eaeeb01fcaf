//! Interactive curation of high-scoring names.
//!
//! - Names are offered best first, down to the configured threshold
//! - Names already accepted or already decided (visited) are never offered again
//! - A decision is applied to the tree and candidate set the moment it is made

use crate::cache::{Candidates, NameEntry, ScoreTree};
use crate::models::{NamerError, Result};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Source of operator answers.
#[async_trait]
pub trait Prompter: Send {
    /// Show `question` and wait for one line of input.
    ///
    /// `None` at end of input or when the answer could not be read.
    async fn ask(&mut self, question: &str) -> Option<String>;
}

/// Prompts on stdout and reads answers from stdin.
///
/// Stdin is read on a dedicated thread and forwarded over a channel so a
/// pending prompt can be abandoned when the process is shutting down.
pub struct StdinPrompter {
    lines: mpsc::UnboundedReceiver<Option<String>>,
}

impl StdinPrompter {
    /// Start the stdin reader thread.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || forward_lines(io::stdin().lock(), &tx))
            .map_err(|e| NamerError::io("spawning stdin reader", e))?;
        Ok(Self { lines: rx })
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn ask(&mut self, question: &str) -> Option<String> {
        let mut stdout = io::stdout();
        // A prompt that fails to print can still be answered.
        let _ = write!(stdout, "{question}").and_then(|()| stdout.flush());
        self.lines.recv().await.flatten()
    }
}

/// Send each line of `reader` to `tx` until end of input.
///
/// A line that is not valid UTF-8 is sent as `None` and reading continues.
/// Any other read error ends the stream.
fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::UnboundedSender<Option<String>>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => Some(line),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %e, "Unreadable answer, skipping prompt");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Operator decision for one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    /// Parse an answer consisting of the single token `y` or `n`.
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim() {
            "y" => Some(Self::Accept),
            "n" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Counts from one curation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurationStats {
    pub accepted: usize,
    pub rejected: usize,
    /// Prompts left unanswered: input ended or was unreadable
    pub skipped: usize,
}

/// Walks high-scoring names and records operator decisions.
pub struct Curator<'a> {
    surname: &'a str,
    min_score: i64,
}

impl<'a> Curator<'a> {
    pub fn new(surname: &'a str, min_score: i64) -> Self {
        Self { surname, min_score }
    }

    /// Names still awaiting a decision, highest score first, tree order within a score.
    pub fn pending(&self, tree: &ScoreTree, candidates: &Candidates) -> Vec<NameEntry> {
        let mut pending: Vec<NameEntry> = tree
            .entries(self.surname)
            .filter(|e| e.score >= self.min_score)
            .filter(|e| !e.visited && !candidates.contains_key(&e.name))
            .collect();
        pending.sort_by_key(|e| Reverse(e.score));
        pending
    }

    /// Prompt for every pending name.
    pub async fn run<P: Prompter + ?Sized>(
        &self,
        tree: &mut ScoreTree,
        candidates: &mut Candidates,
        prompter: &mut P,
    ) -> CurationStats {
        let pending = self.pending(tree, candidates);
        let mut stats = CurationStats::default();

        info!(
            pending = pending.len(),
            min_score = self.min_score,
            "Starting curation"
        );

        for entry in pending {
            let question = format!(
                "是否加入候选: {}, 分数: {}  --> (y/n): ",
                entry.name, entry.score
            );
            let path: Vec<char> = entry.given.chars().collect();

            loop {
                let Some(answer) = prompter.ask(&question).await else {
                    stats.skipped += 1;
                    break;
                };
                match Decision::parse(&answer) {
                    Some(Decision::Accept) => {
                        tree.mark_visited(&path);
                        candidates.insert(entry.name.clone(), entry.score);
                        stats.accepted += 1;
                        break;
                    }
                    Some(Decision::Reject) => {
                        tree.mark_visited(&path);
                        stats.rejected += 1;
                        break;
                    }
                    None => debug!(answer = %answer, "Unrecognized answer"),
                }
            }
        }

        info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            skipped = stats.skipped,
            "Curation complete"
        );
        stats
    }
}

/// Write the candidate list, highest score first.
pub fn write_candidates<W: Write>(candidates: &Candidates, out: &mut W) -> io::Result<()> {
    let mut sorted: Vec<(&String, &i64)> = candidates.iter().collect();
    sorted.sort_by_key(|(_, score)| Reverse(**score));

    writeln!(out, "----------候选名单-------------")?;
    for (name, score) in sorted {
        writeln!(out, "{name} : {score}")?;
    }
    Ok(())
}
