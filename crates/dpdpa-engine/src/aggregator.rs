//! Turning a complete verdict set into a [`ComplianceReport`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use dpdpa_core::{
    ComplianceReport, Gap, Industry, MatchStatus, MatchVerdict, MatchingConfiguration,
    RegulationRequirement, ReportParts, section_key,
};

use crate::error::PipelineError;

/// Identity stamped onto a report.
#[derive(Debug, Clone, Copy)]
pub struct RunIdentity {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl RunIdentity {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Mandatory for scoring: mandatory in the regulation, or in a category the
/// industry treats as sector-critical.
pub fn is_effectively_mandatory(req: &RegulationRequirement, industry: &Industry) -> bool {
    req.mandatory || industry.elevated_categories().contains(&req.category)
}

/// `(matched + 0.5 * partial) / mandatory`, or 1.0 when nothing in scope is mandatory.
pub fn overall_score(
    requirements: &[&RegulationRequirement],
    verdicts: &[MatchVerdict],
    industry: &Industry,
) -> f64 {
    let status: HashMap<&str, MatchStatus> = verdicts
        .iter()
        .map(|v| (v.requirement_id.as_str(), v.status))
        .collect();

    let mut mandatory = 0usize;
    let mut earned = 0.0;
    for req in requirements {
        if !is_effectively_mandatory(req, industry) {
            continue;
        }
        mandatory += 1;
        earned += status.get(req.id.as_str()).map_or(0.0, MatchStatus::weight);
    }

    if mandatory == 0 {
        1.0
    } else {
        earned / mandatory as f64
    }
}

/// Every in-scope requirement has exactly one verdict and nothing else does.
fn check_coverage(
    requirements: &[&RegulationRequirement],
    verdicts: &[MatchVerdict],
) -> Result<(), PipelineError> {
    let mut seen = HashSet::with_capacity(verdicts.len());
    for v in verdicts {
        if !seen.insert(v.requirement_id.as_str()) {
            return Err(PipelineError::InvariantViolation(format!(
                "requirement {} has more than one verdict",
                v.requirement_id
            )));
        }
    }

    let in_scope: HashSet<&str> = requirements.iter().map(|r| r.id.as_str()).collect();
    if let Some(extra) = seen.difference(&in_scope).next() {
        return Err(PipelineError::InvariantViolation(format!(
            "verdict for out-of-scope requirement {extra}"
        )));
    }
    if let Some(r) = requirements.iter().find(|r| !seen.contains(r.id.as_str())) {
        return Err(PipelineError::InvariantViolation(format!(
            "requirement {} has no verdict",
            r.id
        )));
    }
    Ok(())
}

/// Assemble the report once every in-scope requirement has a verdict.
///
/// Verdicts are reordered to follow `requirements`, which is corpus order.
pub fn build_report(
    requirements: &[&RegulationRequirement],
    verdicts: Vec<MatchVerdict>,
    config: &MatchingConfiguration,
    corpus_version: &str,
    run: RunIdentity,
) -> Result<ComplianceReport, PipelineError> {
    check_coverage(requirements, &verdicts)?;

    let position: HashMap<&str, usize> = requirements
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.as_str(), i))
        .collect();
    let mut verdicts = verdicts;
    verdicts.sort_by_key(|v| position.get(v.requirement_id.as_str()).copied());

    let overall_score = overall_score(requirements, &verdicts, &config.industry);

    let mut gaps: Vec<Gap> = requirements
        .iter()
        .zip(&verdicts)
        .filter(|(req, v)| {
            v.status != MatchStatus::Matched && is_effectively_mandatory(req, &config.industry)
        })
        .map(|(req, v)| Gap {
            requirement_id: req.id.clone(),
            section_ref: req.section_ref.clone(),
            category: req.category,
            status: v.status,
            description: req.description.clone(),
            missing_elements: v.missing_elements.clone(),
        })
        .collect();
    gaps.sort_by(|a, b| {
        section_key(&a.section_ref)
            .cmp(&section_key(&b.section_ref))
            .then_with(|| a.requirement_id.cmp(&b.requirement_id))
    });

    info!(
        run_id = %run.run_id,
        score = overall_score,
        verdicts = verdicts.len(),
        gaps = gaps.len(),
        "report built"
    );

    Ok(ComplianceReport::new(ReportParts {
        run_id: run.run_id,
        timestamp: run.timestamp,
        corpus_version: corpus_version.to_string(),
        overall_score,
        verdicts,
        gaps,
        scope_config: config.clone(),
    }))
}
