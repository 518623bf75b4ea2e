//! Centroid-based category classification for policy clauses.
//!
//! Each [`Category`] gets one centroid built by mean-pooling a seed lexicon
//! with the descriptions and element terms of every corpus requirement in
//! that category. A clause is assigned the category whose centroid it is
//! most similar to, provided the similarity clears a floor.

use std::collections::BTreeMap;

use dpdpa_core::{Category, RegulationRequirement};

use crate::text::{TermVector, contains_phrase, tokens};

/// Minimum cosine similarity for a clause to be assigned a category.
pub const DEFAULT_FLOOR: f64 = 0.12;

/// Seed vocabulary per category. Phrases are stemmed when the classifier is built.
fn lexicon(category: Category) -> &'static [&'static str] {
    match category {
        Category::Notice => &[
            "notice",
            "privacy notice",
            "inform",
            "we collect",
            "information we collect",
            "categories of data",
            "tell you",
        ],
        Category::Consent => &["consent", "agree", "opt in", "permission", "affirmative action"],
        Category::ConsentWithdrawal => &["withdraw", "withdrawal", "revoke", "opt out", "unsubscribe"],
        Category::ConsentManager => &["consent manager", "consent management platform"],
        Category::LegitimateUse => &[
            "legitimate use",
            "without consent",
            "required by law",
            "employment",
            "medical emergency",
        ],
        Category::PurposeLimitation => &[
            "specified purpose",
            "only for",
            "processor",
            "service provider",
            "third party",
        ],
        Category::DataAccuracy => &["accurate", "accuracy", "up to date", "complete", "consistent"],
        Category::SecuritySafeguards => &[
            "security",
            "safeguard",
            "encryption",
            "encrypt",
            "access control",
            "protect",
        ],
        Category::BreachNotification => &["breach", "incident", "notify", "intimate", "72 hours"],
        Category::DataRetention => &["retain", "retention", "delete", "erase", "as long as"],
        Category::DataPrincipalRights => &[
            "right to",
            "access",
            "correction",
            "erasure",
            "nominate",
            "nominee",
        ],
        Category::GrievanceRedressal => &[
            "grievance",
            "complaint",
            "grievance officer",
            "data protection officer",
            "contact us",
            "data protection board",
        ],
        Category::ChildrensData => &["child", "children", "minor", "parent", "guardian", "age"],
        Category::CrossBorderTransfer => &[
            "outside india",
            "transfer",
            "international",
            "abroad",
            "cross border",
        ],
        Category::SignificantDataFiduciary => &[
            "significant data fiduciary",
            "impact assessment",
            "audit",
            "data auditor",
        ],
    }
}

/// Centroid-based classifier over the fixed category set.
pub struct CategoryClassifier {
    centroids: BTreeMap<Category, TermVector>,
    keywords: BTreeMap<Category, Vec<Vec<String>>>,
}

/// Summary of centroid computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentroidSummary {
    pub category_count: usize,
    pub requirements_used: usize,
}

impl CategoryClassifier {
    /// Build centroids from the seed lexicon plus the given requirements.
    ///
    /// Build from the whole corpus, not a scoped subset, so that clause
    /// categories never depend on which sections a run selects.
    pub fn build(requirements: &[RegulationRequirement]) -> Self {
        let mut accum: BTreeMap<Category, (TermVector, usize)> = BTreeMap::new();

        for category in Category::ALL {
            let seed = TermVector::from_text(&lexicon(category).join(" "));
            accum.insert(category, (seed, 1));
        }

        for req in requirements {
            let entry = accum
                .entry(req.category)
                .or_insert_with(|| (TermVector::default(), 0));
            entry.0.add(&requirement_vector(req));
            entry.1 += 1;
        }

        let keywords = Category::ALL
            .iter()
            .map(|&c| (c, lexicon(c).iter().map(|p| tokens(p)).collect()))
            .collect();

        Self {
            centroids: finalize_centroids(accum),
            keywords,
        }
    }

    pub fn summary(&self, requirements_used: usize) -> CentroidSummary {
        CentroidSummary {
            category_count: self.centroids.len(),
            requirements_used,
        }
    }

    /// Best-matching category for `text`, or `None` below the floor.
    pub fn classify(&self, text: &str) -> Option<(Category, f64)> {
        self.classify_vector(&TermVector::from_text(text))
    }

    pub fn classify_vector(&self, vector: &TermVector) -> Option<(Category, f64)> {
        best_match(&self.centroids, vector).filter(|&(_, sim)| sim >= DEFAULT_FLOOR)
    }

    /// Whether any seed phrase for `category` occurs in the stemmed `tokens`.
    pub fn has_keywords(&self, category: Category, tokens: &[String]) -> bool {
        self.keywords
            .get(&category)
            .is_some_and(|phrases| phrases.iter().any(|p| contains_phrase(tokens, p)))
    }

    pub fn category_count(&self) -> usize {
        self.centroids.len()
    }
}

/// Term vector representing a requirement: its description plus all element terms.
pub fn requirement_vector(req: &RegulationRequirement) -> TermVector {
    let mut text = req.description.clone();
    for element in &req.elements {
        text.push(' ');
        text.push_str(&element.name);
        for term in &element.terms {
            text.push(' ');
            text.push_str(term);
        }
    }
    TermVector::from_text(&text)
}

// ── Centroid computation ──

fn finalize_centroids(
    accum: BTreeMap<Category, (TermVector, usize)>,
) -> BTreeMap<Category, TermVector> {
    let mut result = BTreeMap::new();
    for (category, (mut sum, count)) in accum {
        if count > 0 && !sum.is_empty() {
            sum.normalize();
            result.insert(category, sum);
        }
    }
    result
}

// ── Classification helpers ──

/// Centroid with the highest cosine similarity. Ties keep the category
/// declared first, since the map iterates in declaration order.
fn best_match(
    centroids: &BTreeMap<Category, TermVector>,
    vector: &TermVector,
) -> Option<(Category, f64)> {
    let mut best: Option<(Category, f64)> = None;
    for (&category, centroid) in centroids {
        let sim = vector.cosine(centroid);
        if best.is_none_or(|(_, b)| sim > b) {
            best = Some((category, sim));
        }
    }
    best
}
