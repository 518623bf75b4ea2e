//! Compliance reports and run-over-run comparison.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::section_ref::section_key;
use crate::{Category, Industry, MatchStatus, MatchVerdict, MatchingConfiguration};

/// A mandatory requirement that is not fully met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub requirement_id: String,
    pub section_ref: String,
    pub category: Category,
    pub status: MatchStatus,
    pub description: String,
    pub missing_elements: Vec<String>,
}

/// Verdict counts for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub category: Category,
    pub matched: usize,
    pub partially_matched: usize,
    pub missing: usize,
}

/// The result of one matching run.
///
/// Built once by the aggregator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    run_id: Uuid,
    timestamp: DateTime<Utc>,
    corpus_version: String,
    overall_score: f64,
    verdicts: Vec<MatchVerdict>,
    gaps: Vec<Gap>,
    category_breakdown: Vec<CategoryTally>,
    scope_config: MatchingConfiguration,
    industry_context: Industry,
}

/// Inputs for [`ComplianceReport::new`], grouped to keep the constructor readable.
pub struct ReportParts {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub corpus_version: String,
    pub overall_score: f64,
    pub verdicts: Vec<MatchVerdict>,
    pub gaps: Vec<Gap>,
    pub scope_config: MatchingConfiguration,
}

impl ComplianceReport {
    pub fn new(parts: ReportParts) -> Self {
        let category_breakdown = tally_categories(&parts.verdicts);
        let industry_context = parts.scope_config.industry.clone();
        Self {
            run_id: parts.run_id,
            timestamp: parts.timestamp,
            corpus_version: parts.corpus_version,
            overall_score: parts.overall_score,
            verdicts: parts.verdicts,
            gaps: parts.gaps,
            category_breakdown,
            scope_config: parts.scope_config,
            industry_context,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn corpus_version(&self) -> &str {
        &self.corpus_version
    }

    /// Weighted fraction of mandatory requirements met, in `[0, 1]`.
    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    /// Verdicts in scoped requirement order.
    pub fn verdicts(&self) -> &[MatchVerdict] {
        &self.verdicts
    }

    /// Gaps ordered by section reference.
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn category_breakdown(&self) -> &[CategoryTally] {
        &self.category_breakdown
    }

    pub fn scope_config(&self) -> &MatchingConfiguration {
        &self.scope_config
    }

    pub fn industry_context(&self) -> &Industry {
        &self.industry_context
    }

    pub fn verdict(&self, requirement_id: &str) -> Option<&MatchVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.requirement_id == requirement_id)
    }

    /// Equal in everything except run id and timestamp.
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.corpus_version == other.corpus_version
            && self.overall_score.to_bits() == other.overall_score.to_bits()
            && self.verdicts == other.verdicts
            && self.gaps == other.gaps
            && self.category_breakdown == other.category_breakdown
            && self.scope_config == other.scope_config
            && self.industry_context == other.industry_context
    }
}

fn tally_categories(verdicts: &[MatchVerdict]) -> Vec<CategoryTally> {
    let mut by_category: BTreeMap<Category, CategoryTally> = BTreeMap::new();
    for v in verdicts {
        let tally = by_category.entry(v.category).or_insert(CategoryTally {
            category: v.category,
            matched: 0,
            partially_matched: 0,
            missing: 0,
        });
        match v.status {
            MatchStatus::Matched => tally.matched += 1,
            MatchStatus::PartiallyMatched => tally.partially_matched += 1,
            MatchStatus::Missing => tally.missing += 1,
        }
    }
    by_category.into_values().collect()
}

/// A requirement whose status differs between two reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub requirement_id: String,
    pub section_ref: String,
    /// `None` when the requirement was not in the earlier report's scope.
    pub before: Option<MatchStatus>,
    /// `None` when the requirement is not in the later report's scope.
    pub after: Option<MatchStatus>,
}

impl StatusChange {
    pub fn is_improvement(&self) -> bool {
        matches!((self.before, self.after), (Some(b), Some(a)) if a > b)
    }

    pub fn is_regression(&self) -> bool {
        matches!((self.before, self.after), (Some(b), Some(a)) if a < b)
    }
}

/// Comparison of two reports keyed by requirement id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDiff {
    pub previous_run: Uuid,
    pub current_run: Uuid,
    pub score_delta: f64,
    /// Ordered by section reference, then requirement id.
    pub changes: Vec<StatusChange>,
}

impl ReportDiff {
    pub fn between(previous: &ComplianceReport, current: &ComplianceReport) -> Self {
        let before: BTreeMap<&str, &MatchVerdict> = previous
            .verdicts
            .iter()
            .map(|v| (v.requirement_id.as_str(), v))
            .collect();
        let after: BTreeMap<&str, &MatchVerdict> = current
            .verdicts
            .iter()
            .map(|v| (v.requirement_id.as_str(), v))
            .collect();

        let mut changes: Vec<StatusChange> = Vec::new();
        for (id, prev) in &before {
            let next = after.get(id).map(|v| v.status);
            if next != Some(prev.status) {
                changes.push(StatusChange {
                    requirement_id: id.to_string(),
                    section_ref: prev.section_ref.clone(),
                    before: Some(prev.status),
                    after: next,
                });
            }
        }
        for (id, next) in &after {
            if !before.contains_key(id) {
                changes.push(StatusChange {
                    requirement_id: id.to_string(),
                    section_ref: next.section_ref.clone(),
                    before: None,
                    after: Some(next.status),
                });
            }
        }
        changes.sort_by(|a, b| {
            section_key(&a.section_ref)
                .cmp(&section_key(&b.section_ref))
                .then_with(|| a.requirement_id.cmp(&b.requirement_id))
        });

        Self {
            previous_run: previous.run_id,
            current_run: current.run_id,
            score_delta: current.overall_score - previous.overall_score,
            changes,
        }
    }

    pub fn improvements(&self) -> usize {
        self.changes.iter().filter(|c| c.is_improvement()).count()
    }

    pub fn regressions(&self) -> usize {
        self.changes.iter().filter(|c| c.is_regression()).count()
    }
}
