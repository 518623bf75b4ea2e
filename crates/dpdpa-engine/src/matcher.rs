//! Clause-to-requirement matching.
//!
//! Every requirement is scored against every clause independently, so a
//! verdict depends only on the clauses, that one requirement and the
//! configuration. This is what makes scoped runs agree with full runs.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use dpdpa_core::{
    Category, Clause, ClauseId, MatchStatus, MatchVerdict, MatchingConfiguration,
    RegulationRequirement, Strictness, ThresholdBand,
};

use crate::classifier::{CategoryClassifier, requirement_vector};
use crate::error::PipelineError;
use crate::text::{TermVector, contains_phrase, tokens};

const W_COVERAGE: f64 = 0.5;
const W_SIMILARITY: f64 = 0.3;
const W_CATEGORY: f64 = 0.2;

const W_RELAXED_KEYWORDS: f64 = 0.6;
const W_RELAXED_COVERAGE: f64 = 0.4;

/// Per-clause analysis, computed once per run and shared by all requirements.
#[derive(Debug, Clone)]
pub struct ClauseFeatures {
    pub id: ClauseId,
    pub category: Option<Category>,
    pub tokens: Vec<String>,
    pub vector: TermVector,
}

impl ClauseFeatures {
    pub fn from_clause(clause: &Clause) -> Self {
        Self {
            id: clause.id(),
            category: clause.inferred_category(),
            tokens: tokens(clause.text()),
            vector: TermVector::from_text(clause.text()),
        }
    }
}

/// Analyse every clause once.
pub fn clause_features(clauses: &[Clause]) -> Vec<ClauseFeatures> {
    clauses.iter().map(ClauseFeatures::from_clause).collect()
}

/// Stemmed element phrases and term vector of one requirement.
struct RequirementFeatures<'r> {
    req: &'r RegulationRequirement,
    /// One entry per element; each holds the element's stemmed term phrases.
    elements: Vec<Vec<Vec<String>>>,
    vector: TermVector,
}

impl<'r> RequirementFeatures<'r> {
    fn new(req: &'r RegulationRequirement) -> Self {
        let elements = req
            .elements
            .iter()
            .map(|e| e.terms.iter().map(|t| tokens(t)).collect())
            .collect();
        Self {
            req,
            elements,
            vector: requirement_vector(req),
        }
    }

    /// Which elements have at least one term phrase in `clause`.
    fn elements_present(&self, clause: &ClauseFeatures) -> Vec<bool> {
        self.elements
            .iter()
            .map(|phrases| phrases.iter().any(|p| contains_phrase(&clause.tokens, p)))
            .collect()
    }
}

/// How one clause scores against one requirement.
#[derive(Debug, Clone)]
struct ClauseScore<'c> {
    clause: &'c ClauseFeatures,
    present: Vec<bool>,
    similarity: f64,
    agrees: bool,
    keywords: bool,
    score: f64,
}

impl ClauseScore<'_> {
    fn is_candidate(&self, strictness: Strictness) -> bool {
        let base = self.present.iter().any(|&p| p) || self.agrees;
        match strictness {
            Strictness::Relaxed => base || self.keywords,
            Strictness::Strict | Strictness::Moderate => base,
        }
    }
}

/// Fraction of `present` that is true. Requirements without elements are
/// covered by category keywords instead.
fn coverage(present: &[bool], keywords: bool) -> f64 {
    if present.is_empty() {
        return if keywords { 1.0 } else { 0.0 };
    }
    present.iter().filter(|&&p| p).count() as f64 / present.len() as f64
}

/// Scores requirements against a fixed set of analysed clauses.
pub struct Matcher<'a> {
    classifier: &'a CategoryClassifier,
    config: &'a MatchingConfiguration,
}

impl<'a> Matcher<'a> {
    pub fn new(classifier: &'a CategoryClassifier, config: &'a MatchingConfiguration) -> Self {
        Self { classifier, config }
    }

    /// Verdicts for `requirements`, in the same order.
    pub fn match_all<'r>(
        &self,
        requirements: impl IntoIterator<Item = &'r RegulationRequirement>,
        clauses: &[ClauseFeatures],
        cancel: &CancellationToken,
    ) -> Result<Vec<MatchVerdict>, PipelineError> {
        let mut verdicts = Vec::new();
        for req in requirements {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            verdicts.push(self.match_requirement(req, clauses));
        }
        Ok(verdicts)
    }

    pub fn match_requirement(
        &self,
        req: &RegulationRequirement,
        clauses: &[ClauseFeatures],
    ) -> MatchVerdict {
        let features = RequirementFeatures::new(req);
        let strictness = self.config.strictness;
        let band = self.config.band();

        let mut seen: Vec<&[String]> = Vec::new();
        let mut candidates: Vec<ClauseScore<'_>> = Vec::new();
        for clause in clauses {
            let scored = self.score_clause(&features, clause);
            if !scored.is_candidate(strictness) {
                continue;
            }
            // Repeated text adds no evidence; keep the earliest copy.
            if seen.contains(&clause.tokens.as_slice()) {
                continue;
            }
            seen.push(&clause.tokens);
            candidates.push(scored);
        }

        let verdict = if candidates.is_empty() {
            MatchVerdict {
                requirement_id: req.id.clone(),
                section_ref: req.section_ref.clone(),
                category: req.category,
                matched_clause_ids: BTreeSet::new(),
                status: MatchStatus::Missing,
                confidence: 0.0,
                missing_elements: req.element_names().map(String::from).collect(),
                note: "no clause addresses this requirement".into(),
            }
        } else {
            match strictness {
                Strictness::Strict => self.strict(&features, &candidates, band),
                Strictness::Moderate | Strictness::Relaxed => {
                    self.aggregate(&features, &candidates, band, strictness)
                }
            }
        };

        debug!(
            requirement = %verdict.requirement_id,
            status = %verdict.status,
            confidence = verdict.confidence,
            clauses = verdict.matched_clause_ids.len(),
            "requirement scored"
        );
        verdict
    }

    fn score_clause<'c>(
        &self,
        features: &RequirementFeatures<'_>,
        clause: &'c ClauseFeatures,
    ) -> ClauseScore<'c> {
        let present = features.elements_present(clause);
        let keywords = self
            .classifier
            .has_keywords(features.req.category, &clause.tokens);
        let coverage = coverage(&present, keywords);
        let similarity = clause.vector.cosine(&features.vector);
        let agrees = clause.category == Some(features.req.category);
        let score = W_COVERAGE * coverage
            + W_SIMILARITY * similarity
            + W_CATEGORY * f64::from(u8::from(agrees));
        ClauseScore {
            clause,
            present,
            similarity,
            agrees,
            keywords,
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Best single clause. Ties keep the earliest clause.
    fn strict(
        &self,
        features: &RequirementFeatures<'_>,
        candidates: &[ClauseScore<'_>],
        band: ThresholdBand,
    ) -> MatchVerdict {
        let mut best = &candidates[0];
        for c in &candidates[1..] {
            if c.score > best.score {
                best = c;
            }
        }

        let all_present = best.present.iter().all(|&p| p);
        let status = classify(best.score, band, all_present);
        let missing = missing_elements(features.req, &best.present);
        let note = format!(
            "best clause {} covers {}/{} elements (score {:.2})",
            best.clause.id,
            best.present.iter().filter(|&&p| p).count(),
            best.present.len(),
            best.score
        );

        verdict(features.req, [best.clause.id].into(), status, best.score, missing, note)
    }

    /// Evidence pooled across all candidate clauses.
    fn aggregate(
        &self,
        features: &RequirementFeatures<'_>,
        candidates: &[ClauseScore<'_>],
        band: ThresholdBand,
        strictness: Strictness,
    ) -> MatchVerdict {
        let n = features.elements.len();
        let mut union = vec![false; n];
        let mut max_similarity: f64 = 0.0;
        let mut any_agrees = false;
        let mut any_keywords = false;
        for c in candidates {
            for (u, &p) in union.iter_mut().zip(&c.present) {
                *u |= p;
            }
            max_similarity = max_similarity.max(c.similarity);
            any_agrees |= c.agrees;
            any_keywords |= c.keywords;
        }

        let union_coverage = coverage(&union, any_keywords);
        let pooled = W_COVERAGE * union_coverage
            + W_SIMILARITY * max_similarity
            + W_CATEGORY * f64::from(u8::from(any_agrees));

        let (confidence, element_rule, note) = match strictness {
            Strictness::Relaxed => {
                let keyword_score = W_RELAXED_KEYWORDS * f64::from(u8::from(any_keywords))
                    + W_RELAXED_COVERAGE * union_coverage;
                let note = if any_keywords {
                    format!("category keywords present; {} clause(s) considered", candidates.len())
                } else {
                    format!("{} clause(s) considered", candidates.len())
                };
                (pooled.max(keyword_score), true, note)
            }
            Strictness::Strict | Strictness::Moderate => {
                let covered = union.iter().filter(|&&p| p).count();
                let note = format!(
                    "{} clause(s) cover {}/{} elements",
                    candidates.len(),
                    covered,
                    n
                );
                (pooled, union.iter().all(|&p| p), note)
            }
        };
        let confidence = confidence.clamp(0.0, 1.0);

        let status = classify(confidence, band, element_rule);
        let ids = candidates.iter().map(|c| c.clause.id).collect();
        let missing = missing_elements(features.req, &union);
        verdict(features.req, ids, status, confidence, missing, note)
    }
}

/// Map a confidence onto a status. A failed element rule caps the result
/// at `PartiallyMatched`.
fn classify(confidence: f64, band: ThresholdBand, elements_hold: bool) -> MatchStatus {
    if confidence >= band.high && elements_hold {
        MatchStatus::Matched
    } else if confidence >= band.low {
        MatchStatus::PartiallyMatched
    } else {
        MatchStatus::Missing
    }
}

fn missing_elements(req: &RegulationRequirement, present: &[bool]) -> Vec<String> {
    req.elements
        .iter()
        .zip(present)
        .filter(|(_, p)| !**p)
        .map(|(e, _)| e.name.clone())
        .collect()
}

fn verdict(
    req: &RegulationRequirement,
    matched_clause_ids: BTreeSet<ClauseId>,
    status: MatchStatus,
    confidence: f64,
    missing_elements: Vec<String>,
    note: String,
) -> MatchVerdict {
    let matched_clause_ids = if status == MatchStatus::Missing {
        BTreeSet::new()
    } else {
        matched_clause_ids
    };
    MatchVerdict {
        requirement_id: req.id.clone(),
        section_ref: req.section_ref.clone(),
        category: req.category,
        matched_clause_ids,
        status,
        confidence,
        missing_elements,
        note,
    }
}
