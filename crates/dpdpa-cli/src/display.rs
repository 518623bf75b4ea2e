//! Human-readable cards for reports, sections, the glossary and report diffs.
//!
//! Cards are grouped into titled sections of `label  value` rows; the verdict
//! listing underneath a report card is Arrow's pretty-printed table.

use std::io::Write;

use arrow::util::pretty::pretty_format_batches;
use dpdpa_core::{
    ComplianceReport, MatchStatus, RegulationRequirement, ReportDiff, RequirementSource, Scope,
    verdicts,
};
use dpdpa_corpus::{GlossaryEntry, RegulationCorpus, Section};

const MAX_LIST_ITEMS: usize = 10;
const MAX_VALUE_CHARS: usize = 72;

// ── Report ──

/// Write a report as a vertical card followed by the verdict table.
pub fn write_report_card(out: &mut impl Write, report: &ComplianceReport) -> anyhow::Result<()> {
    let config = report.scope_config();
    writeln!(out, "=== DPDPA compliance report ===")?;
    writeln!(out)?;

    writeln!(out, "Run")?;
    row(out, "run_id", report.run_id())?;
    row(out, "timestamp", report.timestamp().to_rfc3339())?;
    row(out, "corpus_version", report.corpus_version())?;
    writeln!(out)?;

    writeln!(out, "Configuration")?;
    row(out, "strictness", config.strictness)?;
    row(out, "scope", config.scope.label())?;
    row(out, "industry", report.industry_context())?;
    writeln!(out)?;

    writeln!(out, "Score")?;
    row(out, "overall_score", format!("{:.1}%", report.overall_score() * 100.0))?;
    let count = |s: MatchStatus| report.verdicts().iter().filter(|v| v.status == s).count();
    row(out, "matched", count(MatchStatus::Matched))?;
    row(out, "partially_matched", count(MatchStatus::PartiallyMatched))?;
    row(out, "missing", count(MatchStatus::Missing))?;
    writeln!(out)?;

    writeln!(out, "Categories")?;
    for tally in report.category_breakdown() {
        row(
            out,
            tally.category.label(),
            format!(
                "{} matched, {} partial, {} missing",
                tally.matched, tally.partially_matched, tally.missing
            ),
        )?;
    }
    writeln!(out)?;

    if !report.gaps().is_empty() {
        writeln!(out, "Gaps ({})", report.gaps().len())?;
        for gap in report.gaps().iter().take(MAX_LIST_ITEMS) {
            row(
                out,
                &gap.requirement_id,
                format!("[{}] {}", gap.status, truncate(&gap.description, MAX_VALUE_CHARS)),
            )?;
            if !gap.missing_elements.is_empty() {
                row(out, "", format!("missing: {}", gap.missing_elements.join(", ")))?;
            }
        }
        more(out, report.gaps().len())?;
        writeln!(out)?;
    }

    let batch = verdicts::verdict_batch(report)?;
    writeln!(out, "{}", pretty_format_batches(&[batch])?)?;
    Ok(())
}

// ── Corpus ──

/// A section with every requirement that cites it.
pub fn write_section_card(
    out: &mut impl Write,
    section: &Section,
    requirements: &[&RegulationRequirement],
) -> anyhow::Result<()> {
    writeln!(out, "=== {} ===", heading(section))?;
    writeln!(out, "{}", section.title)?;
    writeln!(out)?;
    writeln!(out, "{}", section.summary)?;
    writeln!(out)?;

    for req in requirements {
        writeln!(out, "{}", req.id)?;
        row(out, "category", req.category.label())?;
        row(out, "mandatory", if req.mandatory { "yes" } else { "no" })?;
        row(out, "default_strictness", req.default_strictness)?;
        row(out, "description", &req.description)?;
        let names: Vec<&str> = req.element_names().collect();
        if !names.is_empty() {
            row(out, "elements", names.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Every section in statute order, marked with the fixed scopes that include it.
pub fn write_sections(out: &mut impl Write, corpus: &RegulationCorpus) -> anyhow::Result<()> {
    writeln!(out, "=== {} ({}) ===", corpus.title(), corpus.version())?;
    writeln!(out)?;
    let fixed = [Scope::FullAct, Scope::RulesOnly, Scope::ActAndRules];
    for section in corpus.sections() {
        let requirements = corpus.requirements_in_section(&section.section_ref);
        let scopes: Vec<String> = fixed
            .iter()
            .filter(|scope| requirements.iter().any(|r| scope.includes(r)))
            .map(Scope::label)
            .collect();
        row(
            out,
            &section.section_ref,
            format!(
                "{} ({} requirement(s); {})",
                truncate(&section.title, MAX_VALUE_CHARS),
                requirements.len(),
                if scopes.is_empty() { "no requirements".to_string() } else { scopes.join(", ") }
            ),
        )?;
    }
    Ok(())
}

pub fn write_glossary(out: &mut impl Write, entries: &[&GlossaryEntry]) -> anyhow::Result<()> {
    for entry in entries {
        writeln!(out, "{}", entry.term)?;
        writeln!(out, "  {}", entry.definition)?;
        writeln!(out)?;
    }
    Ok(())
}

// ── Diff ──

pub fn write_diff(out: &mut impl Write, diff: &ReportDiff) -> anyhow::Result<()> {
    writeln!(out, "=== {} -> {} ===", diff.previous_run, diff.current_run)?;
    writeln!(out)?;
    row(out, "score_delta", format!("{:+.1}%", diff.score_delta * 100.0))?;
    row(out, "improvements", diff.improvements())?;
    row(out, "regressions", diff.regressions())?;
    writeln!(out)?;

    if diff.changes.is_empty() {
        writeln!(out, "No status changes.")?;
        return Ok(());
    }
    writeln!(out, "Changes")?;
    let status = |s: Option<MatchStatus>| s.map_or("out of scope".to_string(), |s| s.to_string());
    for change in &diff.changes {
        row(
            out,
            &change.requirement_id,
            format!("{} -> {}", status(change.before), status(change.after)),
        )?;
    }
    Ok(())
}

// ── Helpers ──

fn row(out: &mut impl Write, label: &str, value: impl std::fmt::Display) -> std::io::Result<()> {
    writeln!(out, "  {:<26} {}", label, value)
}

fn more(out: &mut impl Write, total: usize) -> std::io::Result<()> {
    if total > MAX_LIST_ITEMS {
        writeln!(out, "  {:<26} ... and {} more", "", total - MAX_LIST_ITEMS)?;
    }
    Ok(())
}

fn heading(section: &Section) -> String {
    match section.source {
        RequirementSource::Act => format!("Section {}", section.section_ref),
        RequirementSource::Rules => section.section_ref.clone(),
    }
}

/// Cut `s` to at most `max` characters, ending in `...` when shortened.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
