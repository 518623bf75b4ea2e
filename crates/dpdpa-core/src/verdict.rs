//! Per-requirement match verdicts.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Category, ClauseId};

/// Outcome of matching one requirement against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Missing,
    PartiallyMatched,
    Matched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::PartiallyMatched => "partially_matched",
            Self::Matched => "matched",
        }
    }

    /// Contribution to the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Matched => 1.0,
            Self::PartiallyMatched => 0.5,
            Self::Missing => 0.0,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The matcher's decision for a single requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchVerdict {
    pub requirement_id: String,
    pub section_ref: String,
    pub category: Category,
    /// Supporting clauses, in document order.
    pub matched_clause_ids: BTreeSet<ClauseId>,
    pub status: MatchStatus,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Element names not found in the supporting clauses.
    pub missing_elements: Vec<String>,
    pub note: String,
}
