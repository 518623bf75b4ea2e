//! Per-run matching configuration: strictness, scope, industry, thresholds.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::section_ref::section_contains;
use crate::{Category, RegulationRequirement, RequirementSource};

/// How much evidence the matcher demands before accepting a requirement.
///
/// Declaration order runs from strictest to loosest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// High-confidence coverage by a single clause.
    Strict,
    /// Coverage may be assembled from several clauses.
    Moderate,
    /// Category-level keyword presence is enough.
    Relaxed,
}

impl Strictness {
    pub const ALL: [Strictness; 3] = [Self::Strict, Self::Moderate, Self::Relaxed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Moderate => "moderate",
            Self::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strictness {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "moderate" => Ok(Self::Moderate),
            "relaxed" => Ok(Self::Relaxed),
            _ => Err(ConfigurationError::UnknownStrictness(s.to_string())),
        }
    }
}

/// Which part of the regulation a run is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sections", rename_all = "snake_case")]
pub enum Scope {
    FullAct,
    RulesOnly,
    ActAndRules,
    /// Explicit section references, e.g. `{"5", "8(6)", "Rule 3"}`. A bare
    /// section number selects every sub-section under it.
    CustomSections(BTreeSet<String>),
}

impl Scope {
    /// Build a custom scope from section references as typed by a user.
    pub fn custom<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CustomSections(sections.into_iter().map(Into::into).collect())
    }

    /// Whether `requirement` falls inside this scope.
    ///
    /// Custom section references compare by normalised sort key, so `"s.5"`
    /// and `"5"` select the same section, and `"8"` selects `"8(6)"`.
    pub fn includes(&self, requirement: &RegulationRequirement) -> bool {
        match self {
            Self::FullAct => requirement.source == RequirementSource::Act,
            Self::RulesOnly => requirement.source == RequirementSource::Rules,
            Self::ActAndRules => true,
            Self::CustomSections(sections) => sections
                .iter()
                .any(|s| section_contains(s, &requirement.section_ref)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::FullAct => "full-act".to_string(),
            Self::RulesOnly => "rules-only".to_string(),
            Self::ActAndRules => "act-and-rules".to_string(),
            Self::CustomSections(sections) => {
                let list: Vec<&str> = sections.iter().map(String::as_str).collect();
                format!("custom[{}]", list.join(","))
            }
        }
    }
}

impl FromStr for Scope {
    type Err = ConfigurationError;

    /// Parses the fixed scopes. Custom scopes are built with [`Scope::custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-act" | "act" => Ok(Self::FullAct),
            "rules-only" | "rules" => Ok(Self::RulesOnly),
            "act-and-rules" | "all" => Ok(Self::ActAndRules),
            _ => Err(ConfigurationError::UnknownScope(s.to_string())),
        }
    }
}

/// Sector the policy's organisation operates in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", content = "name", rename_all = "snake_case")]
pub enum Industry {
    General,
    Fintech,
    Healthcare,
    Ecommerce,
    Education,
    Telecom,
    Government,
    /// A sector outside the known codes, described in free text.
    Other(String),
}

impl Industry {
    pub const KNOWN_CODES: &'static [&'static str] = &[
        "general",
        "fintech",
        "healthcare",
        "ecommerce",
        "education",
        "telecom",
        "government",
        "other",
    ];

    /// Parse an industry code; `other` requires a non-blank custom description.
    pub fn parse(code: &str, custom: Option<&str>) -> Result<Self, ConfigurationError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "fintech" | "banking" => Ok(Self::Fintech),
            "healthcare" | "health" => Ok(Self::Healthcare),
            "ecommerce" | "e-commerce" | "retail" => Ok(Self::Ecommerce),
            "education" | "edtech" => Ok(Self::Education),
            "telecom" => Ok(Self::Telecom),
            "government" => Ok(Self::Government),
            "other" => match custom.map(str::trim) {
                Some(name) if !name.is_empty() => Ok(Self::Other(name.to_string())),
                _ => Err(ConfigurationError::MissingIndustryName),
            },
            _ => Err(ConfigurationError::UnknownIndustry(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Fintech => "fintech",
            Self::Healthcare => "healthcare",
            Self::Ecommerce => "ecommerce",
            Self::Education => "education",
            Self::Telecom => "telecom",
            Self::Government => "government",
            Self::Other(_) => "other",
        }
    }

    /// Categories whose optional requirements count as mandatory for this sector.
    pub fn elevated_categories(&self) -> &'static [Category] {
        match self {
            Self::Education => &[Category::ChildrensData],
            Self::Healthcare => &[Category::SecuritySafeguards, Category::BreachNotification],
            Self::Fintech => &[Category::SecuritySafeguards, Category::DataRetention],
            Self::Ecommerce => &[Category::PurposeLimitation, Category::ConsentManager],
            Self::Telecom => &[Category::CrossBorderTransfer],
            Self::Government => &[Category::LegitimateUse],
            Self::General | Self::Other(_) => &[],
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(name) => write!(f, "other ({name})"),
            known => f.write_str(known.code()),
        }
    }
}

/// Confidence band for one strictness level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    /// At or above: `Matched`.
    pub high: f64,
    /// At or above (and below `high`): `PartiallyMatched`.
    pub low: f64,
}

/// Threshold bands for every strictness level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBands {
    pub strict: ThresholdBand,
    pub moderate: ThresholdBand,
    pub relaxed: ThresholdBand,
}

impl Default for ThresholdBands {
    fn default() -> Self {
        Self {
            strict: ThresholdBand { high: 0.75, low: 0.45 },
            moderate: ThresholdBand { high: 0.60, low: 0.30 },
            relaxed: ThresholdBand { high: 0.50, low: 0.20 },
        }
    }
}

impl ThresholdBands {
    pub fn band(&self, strictness: Strictness) -> ThresholdBand {
        match strictness {
            Strictness::Strict => self.strict,
            Strictness::Moderate => self.moderate,
            Strictness::Relaxed => self.relaxed,
        }
    }

    /// Bands must lie in `[0, 1]`, have `low < high`, and never tighten as
    /// strictness loosens.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for strictness in Strictness::ALL {
            let band = self.band(strictness);
            let in_range = (0.0..=1.0).contains(&band.low) && (0.0..=1.0).contains(&band.high);
            if !in_range || band.low >= band.high {
                return Err(ConfigurationError::InvalidThresholds(format!(
                    "{strictness} band must satisfy 0 <= low < high <= 1 (got low {}, high {})",
                    band.low, band.high
                )));
            }
        }
        let ordered = |a: ThresholdBand, b: ThresholdBand| a.high >= b.high && a.low >= b.low;
        if !ordered(self.strict, self.moderate) || !ordered(self.moderate, self.relaxed) {
            return Err(ConfigurationError::InvalidThresholds(
                "bands must not tighten from strict to moderate to relaxed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a caller chooses for one matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfiguration {
    pub strictness: Strictness,
    pub scope: Scope,
    pub industry: Industry,
    #[serde(default)]
    pub thresholds: ThresholdBands,
}

impl MatchingConfiguration {
    pub fn new(strictness: Strictness, scope: Scope, industry: Industry) -> Self {
        Self {
            strictness,
            scope,
            industry,
            thresholds: ThresholdBands::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdBands) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// The active band for this configuration's strictness.
    pub fn band(&self) -> ThresholdBand {
        self.thresholds.band(self.strictness)
    }

    /// Checks that need no corpus. Section existence is checked by the corpus.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Scope::CustomSections(sections) = &self.scope
            && sections.iter().all(|s| s.trim().is_empty())
        {
            return Err(ConfigurationError::EmptyCustomScope);
        }
        if let Industry::Other(name) = &self.industry
            && name.trim().is_empty()
        {
            return Err(ConfigurationError::MissingIndustryName);
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(section_ref: &str, source: RequirementSource) -> RegulationRequirement {
        RegulationRequirement {
            id: format!("T-{section_ref}"),
            section_ref: section_ref.to_string(),
            source,
            category: Category::Notice,
            description: "test".to_string(),
            mandatory: true,
            default_strictness: Strictness::Moderate,
            elements: vec![],
        }
    }

    #[test]
    fn empty_custom_scope_is_rejected() {
        let config = MatchingConfiguration::new(
            Strictness::Strict,
            Scope::CustomSections(BTreeSet::new()),
            Industry::General,
        );
        assert!(matches!(config.validate(), Err(ConfigurationError::EmptyCustomScope)));
    }

    #[test]
    fn blank_custom_sections_count_as_empty() {
        let config =
            MatchingConfiguration::new(Strictness::Strict, Scope::custom(["  "]), Industry::General);
        assert!(matches!(config.validate(), Err(ConfigurationError::EmptyCustomScope)));
    }

    #[test]
    fn other_industry_needs_a_name() {
        assert!(matches!(
            Industry::parse("other", None),
            Err(ConfigurationError::MissingIndustryName)
        ));
        assert!(matches!(
            Industry::parse("other", Some("   ")),
            Err(ConfigurationError::MissingIndustryName)
        ));
        assert_eq!(
            Industry::parse("other", Some("Agritech")).unwrap(),
            Industry::Other("Agritech".into())
        );
    }

    #[test]
    fn unknown_industry_code_is_rejected() {
        assert!(matches!(
            Industry::parse("crypto-casino", None),
            Err(ConfigurationError::UnknownIndustry(_))
        ));
        assert_eq!(Industry::parse("EdTech", None).unwrap(), Industry::Education);
    }

    #[test]
    fn default_thresholds_are_valid() {
        ThresholdBands::default().validate().unwrap();
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut bands = ThresholdBands::default();
        bands.moderate = ThresholdBand { high: 0.3, low: 0.6 };
        assert!(matches!(bands.validate(), Err(ConfigurationError::InvalidThresholds(_))));
    }

    #[test]
    fn non_monotone_bands_are_rejected() {
        let mut bands = ThresholdBands::default();
        bands.relaxed = ThresholdBand { high: 0.9, low: 0.2 };
        assert!(matches!(bands.validate(), Err(ConfigurationError::InvalidThresholds(_))));
    }

    #[test]
    fn scope_membership() {
        let act = requirement("5", RequirementSource::Act);
        let rule = requirement("Rule 3", RequirementSource::Rules);

        assert!(Scope::FullAct.includes(&act));
        assert!(!Scope::FullAct.includes(&rule));
        assert!(Scope::RulesOnly.includes(&rule));
        assert!(Scope::ActAndRules.includes(&act) && Scope::ActAndRules.includes(&rule));

        let custom = Scope::custom(["s.5", "rule 3"]);
        assert!(custom.includes(&act));
        assert!(custom.includes(&rule));
        assert!(!Scope::custom(["6"]).includes(&act));
    }

    #[test]
    fn bare_section_selects_its_subsections() {
        let whole = Scope::custom(["8"]);
        for sub in ["8(2)", "8(5)", "8(6)", "8(10)"] {
            assert!(whole.includes(&requirement(sub, RequirementSource::Act)), "{sub}");
        }
        assert!(!whole.includes(&requirement("9(1)", RequirementSource::Act)));
        assert!(!whole.includes(&requirement("Rule 8", RequirementSource::Rules)));

        let named = Scope::custom(["8(6)"]);
        assert!(named.includes(&requirement("8(6)", RequirementSource::Act)));
        assert!(!named.includes(&requirement("8(7)", RequirementSource::Act)));
    }

    #[test]
    fn parses_fixed_scopes_and_strictness() {
        assert_eq!("full_act".parse::<Scope>().unwrap(), Scope::FullAct);
        assert_eq!("Rules-Only".parse::<Scope>().unwrap(), Scope::RulesOnly);
        assert!("sections".parse::<Scope>().is_err());
        assert_eq!("RELAXED".parse::<Strictness>().unwrap(), Strictness::Relaxed);
        assert!("lenient".parse::<Strictness>().is_err());
    }

    #[test]
    fn configuration_json_shape() {
        let config =
            MatchingConfiguration::new(Strictness::Moderate, Scope::custom(["5"]), Industry::Fintech);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["strictness"], "moderate");
        assert_eq!(json["scope"]["kind"], "custom_sections");
        assert_eq!(json["scope"]["sections"][0], "5");
        assert_eq!(json["industry"]["code"], "fintech");
    }
}
