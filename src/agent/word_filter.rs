//! Sensitive Word Filter
//!
//! Prefix-tree membership test over a banned-term vocabulary. The scanner
//! sits in front of the agent loop entirely: a positive match short-circuits
//! before any model call, so blocked input never costs inference.
//!
//! No failure links are built; a scan walks the tree from every start offset
//! (worst case O(n*m) for input length n and longest term m). Banned-term
//! lists are short relative to message length, so the simple walk wins over
//! an Aho-Corasick automaton here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::AgentError;
use crate::types::{AgentStatus, RunOutcome};

/// Reply returned to the caller when the gate blocks a goal.
pub const BLOCKED_MESSAGE: &str =
    "[safety notice] Your input contains disallowed content and was not processed.";

#[derive(Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal: bool,
}

/// Read-only banned-term scanner. Built once at startup; concurrent reads
/// need no synchronization because the tree is never mutated afterwards.
pub struct SensitiveWordScanner {
    root: TrieNode,
    term_count: usize,
}

impl SensitiveWordScanner {
    /// Build a scanner from a newline-delimited vocabulary file, one term per
    /// line. Blank lines are skipped. A missing or unreadable file is fatal:
    /// the runtime must not start without its content gate.
    pub fn from_file(path: &str) -> Result<Self, AgentError> {
        let contents = fs::read_to_string(Path::new(path)).map_err(|source| {
            AgentError::VocabularyLoad {
                path: path.to_string(),
                source,
            }
        })?;

        let scanner = Self::from_terms(contents.lines());
        info!(
            terms = scanner.term_count,
            path, "sensitive-word vocabulary loaded"
        );
        Ok(scanner)
    }

    /// Build a scanner from an iterator of terms. Used directly by tests and
    /// by `from_file` after reading the vocabulary.
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let mut root = TrieNode::default();
        let mut term_count = 0;

        for term in terms {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            let mut node = &mut root;
            for ch in term.chars() {
                node = node.children.entry(ch).or_default();
            }
            node.terminal = true;
            term_count += 1;
        }

        Self { root, term_count }
    }

    /// Number of terms loaded into the tree.
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// True iff some contiguous substring of `text` equals a vocabulary term
    /// exactly. No partial or fuzzy matches.
    pub fn contains(&self, text: &str) -> bool {
        if text.is_empty() || self.term_count == 0 {
            return false;
        }

        let chars: Vec<char> = text.chars().collect();
        for start in 0..chars.len() {
            let mut node = &self.root;
            for &ch in &chars[start..] {
                match node.children.get(&ch) {
                    Some(child) => {
                        if child.terminal {
                            return true;
                        }
                        node = child;
                    }
                    None => break,
                }
            }
        }
        false
    }
}

/// Build the outcome returned when the gate blocks a goal. One fixed
/// constructor; callers never assemble a blocked reply by hand.
pub fn blocked_outcome() -> RunOutcome {
    RunOutcome {
        status: AgentStatus::Finished,
        answer: BLOCKED_MESSAGE.to_string(),
        blocked: true,
        steps: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_inside_sentence() {
        let scanner = SensitiveWordScanner::from_terms(["badword"]);
        assert!(scanner.contains("this is a badword here"));
        assert!(!scanner.contains("this is fine"));
    }

    #[test]
    fn test_exact_substring_only() {
        let scanner = SensitiveWordScanner::from_terms(["bomb"]);
        // Prefix of a term is not a match
        assert!(!scanner.contains("bom"));
        // Term embedded in a longer word still matches (contiguous substring)
        assert!(scanner.contains("bombast"));
    }

    #[test]
    fn test_shared_prefix_terms() {
        let scanner = SensitiveWordScanner::from_terms(["scam", "scandal"]);
        assert!(scanner.contains("what a scandal"));
        assert!(scanner.contains("a scam artist"));
        assert!(!scanner.contains("scanner"));
    }

    #[test]
    fn test_match_at_boundaries() {
        let scanner = SensitiveWordScanner::from_terms(["evil"]);
        assert!(scanner.contains("evil plan"));
        assert!(scanner.contains("plan evil"));
        assert!(scanner.contains("evil"));
    }

    #[test]
    fn test_empty_input_and_empty_vocabulary() {
        let scanner = SensitiveWordScanner::from_terms(["x"]);
        assert!(!scanner.contains(""));

        let empty = SensitiveWordScanner::from_terms(Vec::<&str>::new());
        assert!(!empty.contains("anything"));
        assert_eq!(empty.term_count(), 0);
    }

    #[test]
    fn test_multibyte_terms() {
        let scanner = SensitiveWordScanner::from_terms(["敏感词"]);
        assert!(scanner.contains("这里有敏感词出现"));
        assert!(!scanner.contains("这里没有"));
    }

    #[test]
    fn test_build_is_idempotent() {
        let terms = ["alpha", "beta", "betamax"];
        let a = SensitiveWordScanner::from_terms(terms);
        let b = SensitiveWordScanner::from_terms(terms);

        let probes = ["alpha", "beta", "betamax", "bet", "gamma", "xbetax", ""];
        for probe in probes {
            assert_eq!(a.contains(probe), b.contains(probe), "probe: {probe}");
        }
        assert_eq!(a.term_count(), b.term_count());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let scanner = SensitiveWordScanner::from_terms(["", "  ", "real"]);
        assert_eq!(scanner.term_count(), 1);
        assert!(scanner.contains("real"));
    }

    #[test]
    fn test_missing_vocabulary_file_is_fatal() {
        let result = SensitiveWordScanner::from_file("/nonexistent/words.txt");
        assert!(result.is_err());
    }

    #[test]
    fn test_blocked_outcome_shape() {
        let outcome = blocked_outcome();
        assert!(outcome.blocked);
        assert_eq!(outcome.status, AgentStatus::Finished);
        assert_eq!(outcome.answer, BLOCKED_MESSAGE);
        assert!(outcome.steps.is_empty());
    }
}
