//! Regulation requirements loaded from the corpus.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Category, Strictness};

/// Which instrument a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementSource {
    /// The Digital Personal Data Protection Act, 2023.
    Act,
    /// The Digital Personal Data Protection Rules made under the Act.
    Rules,
}

impl RequirementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Rules => "rules",
        }
    }
}

impl fmt::Display for RequirementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required sub-part of a requirement.
///
/// Present in a clause when any of its `terms` occurs as a stemmed phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub terms: Vec<String>,
}

/// One obligation from the regulation, keyed by a stable `section_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationRequirement {
    pub id: String,
    /// Section reference as cited, e.g. `"5(1)"` or `"Rule 3"`.
    pub section_ref: String,
    pub source: RequirementSource,
    pub category: Category,
    pub description: String,
    pub mandatory: bool,
    pub default_strictness: Strictness,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl RegulationRequirement {
    /// Names of all elements, in declaration order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }
}
