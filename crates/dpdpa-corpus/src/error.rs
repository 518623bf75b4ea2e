use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusLoadError {
    #[error("corpus file not readable: {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("corpus '{0}' declares no requirements")]
    Empty(String),

    #[error("duplicate requirement id '{0}'")]
    DuplicateRequirement(String),

    #[error("duplicate section '{0}'")]
    DuplicateSection(String),

    #[error("requirement '{requirement}' references missing section '{section_ref}'")]
    MissingSection {
        requirement: String,
        section_ref: String,
    },

    #[error("requirement '{requirement}' is tagged {requirement_source} but section '{section_ref}' belongs to the {section_source}")]
    SourceMismatch {
        requirement: String,
        section_ref: String,
        requirement_source: String,
        section_source: String,
    },

    #[error("requirement '{requirement}' has element '{element}' with no terms")]
    EmptyElement { requirement: String, element: String },
}
