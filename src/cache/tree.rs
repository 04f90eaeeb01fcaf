//! Score tree: fetched scores keyed by the characters of a given name.
//!
//! - The root stands for the bare surname and never carries a score
//! - A node at depth `n` holds the score of an `n`-character given name
//! - Fetched scores are never overwritten, so re-scoring is idempotent
//! - Intermediate nodes created only to reach a deeper path are placeholders

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the score tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameScore {
    /// Fetched score; `None` for placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<i64>,

    /// One more appended character → child node
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<char, NameScore>,

    /// Whether an operator already accepted or rejected this name
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    visited: bool,
}

impl NameScore {
    /// Fetched score, or `None` for a placeholder.
    pub fn score(&self) -> Option<i64> {
        self.score
    }

    /// True if this node was created structurally and never fetched.
    pub fn is_placeholder(&self) -> bool {
        self.score.is_none()
    }

    pub fn visited(&self) -> bool {
        self.visited
    }

    pub fn children(&self) -> &BTreeMap<char, NameScore> {
        &self.children
    }
}

/// Score tree rooted at the surname.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTree {
    root: NameScore,
}

impl ScoreTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a node (fetched or placeholder) exists at `path`.
    pub fn has(&self, path: &[char]) -> bool {
        self.get(path).is_some()
    }

    /// Node at `path`. The empty path (the root) is never returned.
    pub fn get(&self, path: &[char]) -> Option<&NameScore> {
        if path.is_empty() {
            return None;
        }
        path.iter()
            .try_fold(&self.root, |node, c| node.children.get(c))
    }

    fn get_mut(&mut self, path: &[char]) -> Option<&mut NameScore> {
        if path.is_empty() {
            return None;
        }
        path.iter()
            .try_fold(&mut self.root, |node, c| node.children.get_mut(c))
    }

    /// Record `score` for the name at `path`.
    ///
    /// Missing intermediate nodes are created as placeholders. Returns
    /// `false` without touching the tree when the terminal node already holds
    /// a fetched score, or when `path` is empty.
    pub fn insert(&mut self, path: &[char], score: i64) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        for c in parents {
            node = node.children.entry(*c).or_default();
        }

        let terminal = node.children.entry(*last).or_default();
        if terminal.score.is_some() {
            return false;
        }
        terminal.score = Some(score);
        true
    }

    /// Mark the name at `path` as decided. Returns `false` if no node exists.
    pub fn mark_visited(&mut self, path: &[char]) -> bool {
        match self.get_mut(path) {
            Some(node) => {
                node.visited = true;
                true
            }
            None => false,
        }
    }

    /// Number of fetched (non-placeholder) nodes.
    pub fn len(&self) -> usize {
        self.entries("").count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Lazy pre-order walk over every fetched node, in key order.
    ///
    /// Each entry's full name is `surname` followed by the node's path.
    pub fn entries<'a>(&'a self, surname: &'a str) -> Entries<'a> {
        let mut stack = Vec::with_capacity(self.root.children.len());
        push_children(&mut stack, "", &self.root);
        Entries { surname, stack }
    }
}

/// A fetched name produced by [`ScoreTree::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// Surname followed by the given name
    pub name: String,
    /// Given-name characters (the tree path)
    pub given: String,
    pub score: i64,
    pub visited: bool,
}

/// Iterator returned by [`ScoreTree::entries`].
pub struct Entries<'a> {
    surname: &'a str,
    stack: Vec<(String, &'a NameScore)>,
}

fn push_children<'a>(stack: &mut Vec<(String, &'a NameScore)>, prefix: &str, node: &'a NameScore) {
    // Reversed so the smallest key is popped first.
    for (c, child) in node.children.iter().rev() {
        let mut given = String::with_capacity(prefix.len() + c.len_utf8());
        given.push_str(prefix);
        given.push(*c);
        stack.push((given, child));
    }
}

impl Iterator for Entries<'_> {
    type Item = NameEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((given, node)) = self.stack.pop() {
            push_children(&mut self.stack, &given, node);
            if let Some(score) = node.score {
                return Some(NameEntry {
                    name: format!("{}{}", self.surname, given),
                    given,
                    score,
                    visited: node.visited,
                });
            }
        }
        None
    }
}
