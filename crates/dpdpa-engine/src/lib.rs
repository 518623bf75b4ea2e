//! Matching engine: turns policy text into a compliance report against the DPDPA corpus.
//!
//! [`Pipeline`] is the entry point. The stages it chains are public so they
//! can be exercised on their own.

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod pipeline;
pub mod text;

pub use aggregator::{RunIdentity, build_report, is_effectively_mandatory, overall_score};
pub use classifier::CategoryClassifier;
pub use error::PipelineError;
pub use extractor::{ClauseExtractor, Extraction, Strategy};
pub use matcher::{ClauseFeatures, Matcher, clause_features};
pub use pipeline::Pipeline;
