//! Loading, validating and querying the regulation corpus.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use dpdpa_core::{
    ConfigurationError, RegulationRequirement, RequirementSource, Scope, section_contains,
    section_key,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::CorpusLoadError;

const BUILTIN_CORPUS: &str = include_str!("../data/dpdpa.json");

/// A citable section of the Act or the Rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "ref")]
    pub section_ref: String,
    pub source: RequirementSource,
    pub title: String,
    pub summary: String,
}

/// A defined term, shown by the knowledge assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
}

#[derive(Deserialize)]
struct RawCorpus {
    version: String,
    title: String,
    sections: Vec<Section>,
    requirements: Vec<RegulationRequirement>,
    #[serde(default)]
    glossary: Vec<GlossaryEntry>,
}

/// The versioned set of regulation requirements.
///
/// Read-only after loading and `Send + Sync`, so one instance can be shared
/// through an `Arc` by any number of concurrent matching runs.
#[derive(Debug, Clone)]
pub struct RegulationCorpus {
    version: String,
    title: String,
    sections: Vec<Section>,
    requirements: Vec<RegulationRequirement>,
    glossary: Vec<GlossaryEntry>,
    /// section sort key → index into `sections`
    section_index: HashMap<String, usize>,
}

impl RegulationCorpus {
    /// The DPDPA 2023 + Rules corpus compiled into the binary.
    pub fn builtin() -> Result<Self, CorpusLoadError> {
        Self::from_json_str(BUILTIN_CORPUS)
    }

    /// Load a corpus from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, CorpusLoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| CorpusLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Parse and validate a corpus. Any defect rejects the whole corpus.
    pub fn from_json_str(json: &str) -> Result<Self, CorpusLoadError> {
        let raw: RawCorpus = serde_json::from_str(json)?;
        let corpus = Self::validate(raw)?;
        info!(
            version = %corpus.version,
            sections = corpus.sections.len(),
            requirements = corpus.requirements.len(),
            "loaded regulation corpus"
        );
        Ok(corpus)
    }

    fn validate(raw: RawCorpus) -> Result<Self, CorpusLoadError> {
        if raw.requirements.is_empty() {
            return Err(CorpusLoadError::Empty(raw.version));
        }

        let mut section_index = HashMap::with_capacity(raw.sections.len());
        for (i, section) in raw.sections.iter().enumerate() {
            if section_index
                .insert(section_key(&section.section_ref), i)
                .is_some()
            {
                return Err(CorpusLoadError::DuplicateSection(
                    section.section_ref.clone(),
                ));
            }
        }

        let mut seen_ids = HashSet::with_capacity(raw.requirements.len());
        for req in &raw.requirements {
            if !seen_ids.insert(req.id.as_str()) {
                return Err(CorpusLoadError::DuplicateRequirement(req.id.clone()));
            }

            let Some(&idx) = section_index.get(&section_key(&req.section_ref)) else {
                return Err(CorpusLoadError::MissingSection {
                    requirement: req.id.clone(),
                    section_ref: req.section_ref.clone(),
                });
            };
            let section = &raw.sections[idx];
            if section.source != req.source {
                return Err(CorpusLoadError::SourceMismatch {
                    requirement: req.id.clone(),
                    section_ref: req.section_ref.clone(),
                    requirement_source: req.source.to_string(),
                    section_source: section.source.to_string(),
                });
            }

            if let Some(element) = req
                .elements
                .iter()
                .find(|e| !e.terms.iter().any(|t| has_matchable_word(t)))
            {
                return Err(CorpusLoadError::EmptyElement {
                    requirement: req.id.clone(),
                    element: element.name.clone(),
                });
            }
        }

        Ok(Self {
            version: raw.version,
            title: raw.title,
            sections: raw.sections,
            requirements: raw.requirements,
            glossary: raw.glossary,
            section_index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of requirements.
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// All requirements in corpus order.
    pub fn requirements(&self) -> &[RegulationRequirement] {
        &self.requirements
    }

    /// Requirements selected by `scope`, in corpus order.
    ///
    /// Deterministic and side-effect-free; the same scope always yields the
    /// same sequence.
    pub fn requirements_for_scope(&self, scope: &Scope) -> Vec<&RegulationRequirement> {
        self.requirements
            .iter()
            .filter(|r| scope.includes(r))
            .collect()
    }

    /// Reject custom scopes that are empty or name sections this corpus lacks.
    ///
    /// A bare section such as `"8"` is known when the corpus declares it or
    /// any of its sub-sections.
    pub fn validate_scope(&self, scope: &Scope) -> Result<(), ConfigurationError> {
        let Scope::CustomSections(sections) = scope else {
            return Ok(());
        };
        let named: BTreeSet<&str> = sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if named.is_empty() {
            return Err(ConfigurationError::EmptyCustomScope);
        }
        for s in named {
            let known = self
                .sections
                .iter()
                .any(|declared| section_contains(s, &declared.section_ref));
            if !known {
                return Err(ConfigurationError::UnknownSection(s.to_string()));
            }
        }
        Ok(())
    }

    /// Look up a section by reference, accepting any citation style (`"s.5(1)"`, `"R.3"`).
    pub fn section(&self, section_ref: &str) -> Option<&Section> {
        self.section_index
            .get(&section_key(section_ref))
            .map(|&i| &self.sections[i])
    }

    /// Sections ordered by statute position.
    pub fn sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().collect();
        sections.sort_by_cached_key(|s| section_key(&s.section_ref));
        sections
    }

    pub fn requirement(&self, id: &str) -> Option<&RegulationRequirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    /// Requirements citing the given section.
    pub fn requirements_in_section(&self, section_ref: &str) -> Vec<&RegulationRequirement> {
        let key = section_key(section_ref);
        self.requirements
            .iter()
            .filter(|r| section_key(&r.section_ref) == key)
            .collect()
    }

    pub fn glossary(&self) -> &[GlossaryEntry] {
        &self.glossary
    }

    /// Case-insensitive glossary lookup.
    pub fn define(&self, term: &str) -> Option<&GlossaryEntry> {
        let term = term.trim();
        self.glossary
            .iter()
            .find(|g| g.term.eq_ignore_ascii_case(term))
    }
}

/// Whether `term` holds a word the matcher can look for: two or more
/// alphanumeric characters, or a number.
fn has_matchable_word(term: &str) -> bool {
    term.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.len() > 1 || (!w.is_empty() && w.chars().all(|c| c.is_ascii_digit())))
}
