//! Score buckets derived from the tree, and the top-N report.

use crate::cache::ScoreTree;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Full names grouped by score. Rebuilt from the tree for every report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreStats {
    buckets: BTreeMap<i64, Vec<String>>,
}

impl ScoreStats {
    /// Bucket every scored name in `tree`, prefixing `surname`.
    pub fn from_tree(tree: &ScoreTree, surname: &str) -> Self {
        let mut buckets: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for entry in tree.entries(surname) {
            buckets.entry(entry.score).or_default().push(entry.name);
        }
        Self { buckets }
    }

    /// Names scoring exactly `score`.
    pub fn bucket(&self, score: i64) -> Option<&[String]> {
        self.buckets.get(&score).map(Vec::as_slice)
    }

    /// Number of distinct scores.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Highest score seen, if any.
    pub fn max_score(&self) -> Option<i64> {
        self.buckets.keys().next_back().copied()
    }

    /// The `n` highest-scoring buckets, best first.
    pub fn top(&self, n: usize) -> impl Iterator<Item = (i64, &[String])> + '_ {
        self.descending_from(i64::MIN).take(n)
    }

    /// Buckets scoring at least `min`, best first.
    pub fn descending_from(&self, min: i64) -> impl Iterator<Item = (i64, &[String])> + '_ {
        self.buckets
            .range(min..)
            .rev()
            .map(|(score, names)| (*score, names.as_slice()))
    }

    /// Write the top-`n` report.
    pub fn write_top<W: Write>(&self, n: usize, out: &mut W) -> io::Result<()> {
        for (score, names) in self.top(n) {
            writeln!(out, "score: {}, names: [{}]\n", score, names.join(" "))?;
        }
        Ok(())
    }

    /// Print the top-`n` report to stdout.
    pub fn print_top(&self, n: usize) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_top(n, &mut out)?;
        out.flush()
    }
}
