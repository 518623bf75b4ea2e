//! Regulation corpus: the DPDPA sections and requirements a policy is matched against.

mod corpus;
mod error;

pub use corpus::{GlossaryEntry, RegulationCorpus, Section};
pub use error::CorpusLoadError;
