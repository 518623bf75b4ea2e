use thiserror::Error;

/// Policy text could not be turned into clauses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("policy text is empty; paste or upload the policy before running a check")]
    Empty,

    #[error("policy text does not look like a document ({reason}); re-export it as plain text")]
    Unparseable { reason: String },
}

/// The caller's matching configuration is invalid and must be corrected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("custom scope selects no sections; choose at least one section")]
    EmptyCustomScope,

    #[error("section '{0}' is not in the regulation corpus")]
    UnknownSection(String),

    #[error("unknown strictness '{0}' (expected strict, moderate, or relaxed)")]
    UnknownStrictness(String),

    #[error("unknown scope '{0}' (expected full-act, rules-only, act-and-rules, or a section list)")]
    UnknownScope(String),

    #[error("scope '{0}' cannot be combined with explicit sections; use scope 'custom' or drop the sections")]
    ConflictingScope(String),

    #[error("unknown industry code '{0}'; use 'other' with a custom sector name")]
    UnknownIndustry(String),

    #[error("industry 'other' needs a custom sector name")]
    MissingIndustryName,

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}
