pub mod category;
pub mod clause;
pub mod config;
pub mod error;
pub mod report;
pub mod requirement;
pub mod schema;
pub mod section_ref;
pub mod verdict;

pub use category::Category;
pub use clause::{Clause, ClauseId, Span};
pub use config::{
    Industry, MatchingConfiguration, Scope, Strictness, ThresholdBand, ThresholdBands,
};
pub use error::{ConfigurationError, ExtractionError};
pub use report::{CategoryTally, ComplianceReport, Gap, ReportDiff, ReportParts, StatusChange};
pub use requirement::{Element, RegulationRequirement, RequirementSource};
pub use schema::verdicts;
pub use section_ref::{section_contains, section_key};
pub use verdict::{MatchStatus, MatchVerdict};
