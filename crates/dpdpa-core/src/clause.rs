//! Policy clauses produced by the extractor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Category;

/// Ordinal identifier of a clause within one document (1-based, document order).
///
/// Ordering by id is ordering by position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseId(pub u32);

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{:03}", self.0)
    }
}

/// Byte range `[start, end)` of a clause in the extracted document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A discrete section of a privacy policy.
///
/// Immutable once built; fields are read through accessors so the matcher
/// can only ever observe a clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    id: ClauseId,
    span: Span,
    text: String,
    heading: Option<String>,
    number: Option<String>,
    inferred_category: Option<Category>,
}

impl Clause {
    pub fn new(id: ClauseId, span: Span, text: impl Into<String>) -> Self {
        Self {
            id,
            span,
            text: text.into(),
            heading: None,
            number: None,
            inferred_category: None,
        }
    }

    /// Attach the heading line that introduced this clause.
    pub fn with_heading(mut self, heading: Option<String>) -> Self {
        self.heading = heading;
        self
    }

    /// Attach the section number as written in the policy (e.g. `"4.2"`).
    pub fn with_number(mut self, number: Option<String>) -> Self {
        self.number = number;
        self
    }

    pub fn with_inferred_category(mut self, category: Option<Category>) -> Self {
        self.inferred_category = category;
        self
    }

    pub fn id(&self) -> ClauseId {
        self.id
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn inferred_category(&self) -> Option<Category> {
        self.inferred_category
    }
}
