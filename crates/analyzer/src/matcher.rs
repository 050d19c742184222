//! Cross-venue asset matching.
//!
//! Venues describe the same underlying event with different wording, so
//! pairing is done on keyword overlap: descriptions are tokenized into
//! lowercase alphanumeric keywords, stop-words and short tokens are
//! dropped, and candidate pairs are scored by Jaccard similarity over
//! the keyword sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tokens carrying no signal about the underlying event.
const STOP_WORDS: &[&str] = &[
    "the", "will", "a", "an", "of", "in", "on", "at", "to", "by", "be", "is", "are", "was", "and",
    "or", "for", "with", "than", "that", "this", "yes", "no",
];

// =============================================================================
// Configuration
// =============================================================================

/// Matching thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum Jaccard similarity for a pair to be reported.
    pub min_similarity: f64,

    /// Cap on reported matches per run.
    pub max_results: usize,

    /// Minimum keyword length, in characters.
    pub min_token_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.3,
            max_results: 25,
            min_token_len: 3,
        }
    }
}

impl MatchConfig {
    /// High-precision preset: fewer, stronger matches.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            min_similarity: 0.5,
            max_results: 10,
            min_token_len: 4,
        }
    }

    /// High-recall preset for exploratory scans.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            min_similarity: 0.2,
            max_results: 50,
            min_token_len: 3,
        }
    }

    /// Overrides the similarity threshold.
    ///
    /// # Panics
    ///
    /// Panics when the threshold is outside [0, 1].
    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&min_similarity),
            "similarity threshold {min_similarity} outside [0, 1]"
        );
        self.min_similarity = min_similarity;
        self
    }

    /// Overrides the result cap.
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

// =============================================================================
// Matching
// =============================================================================

/// A market as seen by the matcher: an id and its event description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub id: String,
    pub description: String,
}

impl MarketDescriptor {
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// A scored pairing between one market on each venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMatch {
    pub primary_id: String,
    pub counter_id: String,
    pub similarity: f64,
}

/// Pairs markets across two venues by description similarity.
#[derive(Debug, Clone, Default)]
pub struct AssetMatcher {
    config: MatchConfig,
}

impl AssetMatcher {
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Extracts the keyword set from a description.
    ///
    /// Tokens are lowercased, split on non-alphanumeric boundaries, and
    /// kept only when long enough and not a stop-word.
    #[must_use]
    pub fn keywords(&self, description: &str) -> BTreeSet<String> {
        description
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() >= self.config.min_token_len)
            .filter(|token| !STOP_WORDS.contains(token))
            .map(str::to_string)
            .collect()
    }

    /// Jaccard similarity between two descriptions' keyword sets.
    ///
    /// Two empty sets score 0.0: no evidence either way is treated as
    /// no match.
    #[must_use]
    pub fn similarity(&self, primary: &str, counter: &str) -> f64 {
        let a = self.keywords(primary);
        let b = self.keywords(counter);

        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        let intersection = a.intersection(&b).count();
        intersection as f64 / union as f64
    }

    /// Scores every cross-venue pair and returns matches above the
    /// threshold, strongest first, capped at `max_results`.
    ///
    /// Ties are broken by (primary, counter) id so the ordering is
    /// deterministic across runs.
    #[must_use]
    pub fn find_matches(
        &self,
        primaries: &[MarketDescriptor],
        counters: &[MarketDescriptor],
    ) -> Vec<AssetMatch> {
        let mut matches = Vec::new();
        for primary in primaries {
            for counter in counters {
                let similarity = self.similarity(&primary.description, &counter.description);
                if similarity >= self.config.min_similarity {
                    matches.push(AssetMatch {
                        primary_id: primary.id.clone(),
                        counter_id: counter.id.clone(),
                        similarity,
                    });
                }
            }
        }

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.primary_id.cmp(&b.primary_id))
                .then_with(|| a.counter_id.cmp(&b.counter_id))
        });
        matches.truncate(self.config.max_results);

        debug!(
            primaries = primaries.len(),
            counters = counters.len(),
            matched = matches.len(),
            "asset matching complete"
        );
        matches
    }
}

// =============================================================================
// Tests
// =============================================================================
