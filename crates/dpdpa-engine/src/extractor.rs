//! Splitting policy text into clauses.
//!
//! Strategies are tried from finest to coarsest: structural markers
//! (numbered sections, markdown headings, heading-like lines), then
//! blank-line paragraphs, then the whole document as a single clause.

use std::fmt;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dpdpa_core::{Clause, ClauseId, ExtractionError, Span};

use crate::classifier::CategoryClassifier;
use crate::error::PipelineError;

/// Structural markers needed before the structural strategy is trusted.
const MIN_MARKERS: usize = 2;

/// Share of control or replacement characters above which text is rejected.
const MAX_GARBAGE_RATIO: f64 = 0.10;

/// Longest line still treated as a heading rather than body text.
const MAX_HEADING_CHARS: usize = 80;

/// Which segmentation strategy produced the clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Structural,
    Paragraph,
    WholeDocument,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Paragraph => "paragraph",
            Self::WholeDocument => "whole_document",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clauses plus the strategy that found them.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub strategy: Strategy,
    pub clauses: Vec<Clause>,
}

/// A line that opens a new structural section.
#[derive(Debug, Clone, PartialEq)]
struct Marker {
    /// Byte offset of the start of the line.
    start: usize,
    number: Option<String>,
    heading: Option<String>,
}

/// A candidate clause before classification.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    span: Span,
    number: Option<String>,
    heading: Option<String>,
}

#[derive(Clone)]
pub struct ClauseExtractor {
    numbered: Regex,
    markdown: Regex,
    paragraph_break: Regex,
}

impl ClauseExtractor {
    pub fn new() -> Self {
        Self {
            numbered: Regex::new(
                r"(?i)^[ \t]*(section|clause|article|part)?[ \t]*(\d{1,3}(?:\.\d{1,3})*)([.):])?[ \t]+(\S.*)$",
            )
            .expect("static regex"),
            markdown: Regex::new(r"^[ \t]*#{1,6}[ \t]+(\S.*?)[ \t#]*$").expect("static regex"),
            paragraph_break: Regex::new(r"\n[ \t]*\r?\n").expect("static regex"),
        }
    }

    /// Extract clauses from `text`, tagging each with an inferred category.
    pub fn extract(
        &self,
        text: &str,
        classifier: &CategoryClassifier,
        cancel: &CancellationToken,
    ) -> Result<Vec<Clause>, PipelineError> {
        self.extract_with_strategy(text, classifier, cancel)
            .map(|e| e.clauses)
    }

    pub fn extract_with_strategy(
        &self,
        text: &str,
        classifier: &CategoryClassifier,
        cancel: &CancellationToken,
    ) -> Result<Extraction, PipelineError> {
        check_document(text)?;

        let (strategy, segments) = self.segment(text);
        if strategy != Strategy::Structural {
            warn!(strategy = %strategy, "no structural markers found, falling back");
        }

        let mut clauses = Vec::with_capacity(segments.len());
        for (i, seg) in segments.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let body = &text[seg.span.start..seg.span.end];
            let category = classifier.classify(body).map(|(c, _)| c);
            let id = ClauseId(i as u32 + 1);
            debug!(clause = %id, category = ?category, bytes = seg.span.len(), "clause extracted");
            clauses.push(
                Clause::new(id, seg.span, body)
                    .with_number(seg.number)
                    .with_heading(seg.heading)
                    .with_inferred_category(category),
            );
        }

        Ok(Extraction { strategy, clauses })
    }

    /// Choose a strategy and produce non-empty, ordered, non-overlapping segments.
    fn segment(&self, text: &str) -> (Strategy, Vec<Segment>) {
        let markers = self.markers(text);
        if markers.len() >= MIN_MARKERS {
            return (Strategy::Structural, structural_segments(text, &markers));
        }

        let paragraphs = self.paragraphs(text);
        if paragraphs.len() >= 2 {
            return (Strategy::Paragraph, paragraphs);
        }

        // check_document guarantees non-blank text, so this span is never empty.
        let whole = trimmed_span(text, 0, text.len()).unwrap_or(Span::new(0, text.len()));
        (
            Strategy::WholeDocument,
            vec![Segment {
                span: whole,
                number: None,
                heading: None,
            }],
        )
    }

    fn markers(&self, text: &str) -> Vec<Marker> {
        let mut markers = Vec::new();
        let mut offset = 0;
        for raw in text.split_inclusive('\n') {
            let line = raw.trim_end_matches(['\n', '\r']);
            if let Some(marker) = self.marker_for_line(line, offset) {
                markers.push(marker);
            }
            offset += raw.len();
        }
        markers
    }

    fn marker_for_line(&self, line: &str, start: usize) -> Option<Marker> {
        if let Some(caps) = self.markdown.captures(line) {
            return Some(Marker {
                start,
                number: None,
                heading: caps.get(1).map(|m| m.as_str().to_string()),
            });
        }

        if let Some(caps) = self.numbered.captures(line) {
            let keyword = caps.get(1).is_some();
            let number = caps.get(2).map_or("", |m| m.as_str());
            let delimited = caps.get(3).is_some();
            // A bare "30 days ..." is prose, not a section number.
            if keyword || delimited || number.contains('.') {
                let rest = caps.get(4).map_or("", |m| m.as_str()).trim();
                return Some(Marker {
                    start,
                    number: Some(number.to_string()),
                    heading: looks_like_title(rest).then(|| rest.trim_end_matches(':').to_string()),
                });
            }
        }

        let trimmed = line.trim();
        if is_heading_line(trimmed) {
            return Some(Marker {
                start,
                number: None,
                heading: Some(trimmed.trim_end_matches(':').to_string()),
            });
        }

        None
    }

    fn paragraphs(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut start = 0;
        for m in self.paragraph_break.find_iter(text) {
            if let Some(span) = trimmed_span(text, start, m.start()) {
                segments.push(Segment {
                    span,
                    number: None,
                    heading: None,
                });
            }
            start = m.end();
        }
        if let Some(span) = trimmed_span(text, start, text.len()) {
            segments.push(Segment {
                span,
                number: None,
                heading: None,
            });
        }
        segments
    }
}

impl Default for ClauseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn structural_segments(text: &str, markers: &[Marker]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(markers.len() + 1);

    if let Some(first) = markers.first()
        && let Some(span) = trimmed_span(text, 0, first.start)
    {
        segments.push(Segment {
            span,
            number: None,
            heading: None,
        });
    }

    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |next| next.start);
        if let Some(span) = trimmed_span(text, marker.start, end) {
            segments.push(Segment {
                span,
                number: marker.number.clone(),
                heading: marker.heading.clone(),
            });
        }
    }

    segments
}

/// Span of `text[start..end]` with surrounding whitespace removed, or `None` if blank.
fn trimmed_span(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return None;
    }
    Some(Span::new(start + lead, end - trail))
}

/// Short line that reads like a title rather than a sentence.
fn looks_like_title(s: &str) -> bool {
    !s.is_empty()
        && s.chars().count() <= MAX_HEADING_CHARS
        && !s.ends_with(['.', ';', ','])
}

/// ALL CAPS line, or a short Title Case line ending in ':'.
fn is_heading_line(line: &str) -> bool {
    if line.is_empty() || line.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return false;
    }

    if letters.iter().all(|c| c.is_uppercase()) {
        return !line.ends_with('.');
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    line.ends_with(':')
        && words.len() <= 8
        && words
            .first()
            .and_then(|w| w.chars().next())
            .is_some_and(char::is_uppercase)
}

/// Reject input that cannot be a policy document.
fn check_document(text: &str) -> Result<(), ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    if text.contains('\0') {
        return Err(ExtractionError::Unparseable {
            reason: "contains NUL bytes".into(),
        });
    }

    let mut total = 0usize;
    let mut garbage = 0usize;
    let mut alphabetic = 0usize;
    for c in text.chars() {
        total += 1;
        if c == char::REPLACEMENT_CHARACTER || (c.is_control() && !c.is_whitespace()) {
            garbage += 1;
        } else if c.is_alphabetic() {
            alphabetic += 1;
        }
    }

    let ratio = garbage as f64 / total as f64;
    if ratio > MAX_GARBAGE_RATIO {
        return Err(ExtractionError::Unparseable {
            reason: format!("{:.0}% control or replacement characters", ratio * 100.0),
        });
    }
    if alphabetic == 0 {
        return Err(ExtractionError::Unparseable {
            reason: "no alphabetic text".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpdpa_core::Category;

    fn extract(text: &str) -> Extraction {
        let clf = CategoryClassifier::build(&[]);
        ClauseExtractor::new()
            .extract_with_strategy(text, &clf, &CancellationToken::new())
            .unwrap()
    }

    const NUMBERED: &str = "\
Acme Privacy Policy
Effective 1 April 2025

1. Information We Collect
We collect your name and email address when you sign up.

2. Security
We encrypt all records and apply strict access control.

2.1 Breaches
If a breach occurs we notify affected users.
";

    #[test]
    fn numbered_sections_become_clauses_with_preamble() {
        let ex = extract(NUMBERED);
        assert_eq!(ex.strategy, Strategy::Structural);
        assert_eq!(ex.clauses.len(), 4);

        let preamble = &ex.clauses[0];
        assert_eq!(preamble.id(), ClauseId(1));
        assert_eq!(preamble.number(), None);
        assert!(preamble.text().starts_with("Acme Privacy Policy"));

        let security = &ex.clauses[2];
        assert_eq!(security.number(), Some("2"));
        assert_eq!(security.heading(), Some("Security"));
        assert_eq!(security.inferred_category(), Some(Category::SecuritySafeguards));

        assert_eq!(ex.clauses[3].number(), Some("2.1"));
    }

    #[test]
    fn spans_point_back_into_the_source() {
        let ex = extract(NUMBERED);
        for clause in &ex.clauses {
            let span = clause.span();
            assert_eq!(&NUMBERED[span.start..span.end], clause.text());
        }
        assert!(ex.clauses.windows(2).all(|w| w[0].span().end <= w[1].span().start));
    }

    #[test]
    fn markdown_and_caps_headings() {
        let text = "# Our Policy\nIntro text.\n\n## Your Rights\nYou may request access.\n\nCHILDREN\nWe do not serve minors.\n";
        let ex = extract(text);
        assert_eq!(ex.strategy, Strategy::Structural);
        let headings: Vec<_> = ex.clauses.iter().map(|c| c.heading()).collect();
        assert_eq!(headings, vec![Some("Our Policy"), Some("Your Rights"), Some("CHILDREN")]);
    }

    #[test]
    fn section_keyword_and_colon_headings() {
        let text = "Section 4 Consent\nWe ask before processing.\nHow To Contact Us:\nWrite to the grievance officer.\n";
        let ex = extract(text);
        assert_eq!(ex.clauses.len(), 2);
        assert_eq!(ex.clauses[0].number(), Some("4"));
        assert_eq!(ex.clauses[1].heading(), Some("How To Contact Us"));
    }

    #[test]
    fn prose_numbers_are_not_markers() {
        let text = "We keep logs.\n30 days after closure we delete them.\n";
        let ex = extract(text);
        assert_eq!(ex.strategy, Strategy::WholeDocument);
        assert_eq!(ex.clauses.len(), 1);
    }

    #[test]
    fn falls_back_to_paragraphs() {
        let text = "We collect your email.\n\n   \nWe never sell it.\n\nYou can ask us to delete it.";
        let ex = extract(text);
        assert_eq!(ex.strategy, Strategy::Paragraph);
        let texts: Vec<_> = ex.clauses.iter().map(|c| c.text()).collect();
        assert_eq!(
            texts,
            vec!["We collect your email.", "We never sell it.", "You can ask us to delete it."]
        );
    }

    #[test]
    fn single_sentence_is_whole_document() {
        let ex = extract("  we inform users before collecting data  ");
        assert_eq!(ex.strategy, Strategy::WholeDocument);
        assert_eq!(ex.clauses.len(), 1);
        assert_eq!(ex.clauses[0].text(), "we inform users before collecting data");
        assert_eq!(ex.clauses[0].span(), Span::new(2, 40));
    }

    #[test]
    fn extraction_is_idempotent() {
        assert_eq!(extract(NUMBERED).clauses, extract(NUMBERED).clauses);
    }

    #[test]
    fn empty_and_garbage_input_fail() {
        let clf = CategoryClassifier::build(&[]);
        let ex = ClauseExtractor::new();
        let token = CancellationToken::new();

        let err = ex.extract(" \n\t ", &clf, &token).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Empty)));

        let err = ex.extract("abc\0def", &clf, &token).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Unparseable { .. })));

        let binary: String = "\u{1}\u{2}\u{3}ab".into();
        let err = ex.extract(&binary, &clf, &token).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Unparseable { .. })));

        let err = ex.extract("1234 5678 -- 42", &clf, &token).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Unparseable { .. })));
    }

    #[test]
    fn cancelled_token_stops_extraction() {
        let clf = CategoryClassifier::build(&[]);
        let token = CancellationToken::new();
        token.cancel();
        let err = ClauseExtractor::new().extract(NUMBERED, &clf, &token).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }
}
