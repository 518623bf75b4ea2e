//! Lightweight text analysis: tokenisation, suffix stemming, sparse term vectors.
//!
//! Everything here is deterministic: vectors are `BTreeMap`s so that sums
//! and dot products always run in the same order and produce bit-identical
//! floats across runs.

use std::collections::BTreeMap;

/// Words that carry no signal for similarity.
///
/// Includes generic data-protection vocabulary ("data", "personal", ...) that
/// appears in nearly every clause and requirement.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "by", "can", "could", "data", "do", "does", "each", "for", "from", "has", "have",
    "how", "i", "if", "in", "information", "into", "is", "it", "its", "may", "me", "more", "must",
    "my", "of", "on", "or", "other", "our", "ours", "personal", "shall", "should", "so", "such",
    "that", "the", "their", "them", "there", "these", "they", "this", "those", "to", "under",
    "upon", "us", "was", "we", "were", "what", "when", "where", "which", "who", "will", "with",
    "would", "you", "your",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Strip common English inflections so that "collecting", "collected" and
/// "collects" compare equal. Both sides of every comparison go through this,
/// so consistency matters more than linguistic accuracy.
pub fn stem(word: &str) -> String {
    let w = word;
    let base = if w.len() > 4 && w.ends_with("ies") {
        format!("{}y", &w[..w.len() - 3])
    } else if w.len() > 5 && w.ends_with("ing") {
        w[..w.len() - 3].to_string()
    } else if w.len() > 4 && w.ends_with("ed") {
        w[..w.len() - 2].to_string()
    } else if w.len() > 4 && w.ends_with("es") {
        w[..w.len() - 2].to_string()
    } else if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
        w[..w.len() - 1].to_string()
    } else {
        w.to_string()
    };
    if base.len() > 4 && base.ends_with('e') {
        base[..base.len() - 1].to_string()
    } else {
        base
    }
}

/// Lowercase alphanumeric words of `text`, in order.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Stemmed tokens in document order, stop words included.
///
/// Used for phrase matching, where word order and function words matter.
pub fn tokens(text: &str) -> Vec<String> {
    words(text)
        .filter(|w| w.len() > 1 || w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| stem(&w))
        .collect()
}

/// Whether `phrase` occurs as a contiguous run inside `haystack`.
pub fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > haystack.len() {
        return false;
    }
    haystack.windows(phrase.len()).any(|w| w == phrase)
}

/// A sparse, L2-normalised bag-of-stems vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
}

impl TermVector {
    /// Term-frequency vector of the content words of `text`, normalised.
    pub fn from_text(text: &str) -> Self {
        let mut weights = BTreeMap::new();
        for w in words(text) {
            if w.len() < 2 || is_stop_word(&w) {
                continue;
            }
            *weights.entry(stem(&w)).or_insert(0.0) += 1.0;
        }
        let mut v = Self { weights };
        v.normalize();
        v
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    /// Accumulate `other` into `self` (un-normalised until [`normalize`](Self::normalize)).
    pub fn add(&mut self, other: &TermVector) {
        for (term, w) in &other.weights {
            *self.weights.entry(term.clone()).or_insert(0.0) += w;
        }
    }

    /// L2-normalise in place.
    pub fn normalize(&mut self) {
        let norm: f64 = self.weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in self.weights.values_mut() {
                *w /= norm;
            }
        }
    }

    /// Cosine similarity, assuming both vectors are normalised.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|v| w * v))
            .sum();
        dot.clamp(0.0, 1.0)
    }
}
