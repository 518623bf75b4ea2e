//! End-to-end matching run: validate, extract, match, aggregate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use dpdpa_core::{Clause, ComplianceReport, ConfigurationError, MatchVerdict, MatchingConfiguration};
use dpdpa_corpus::RegulationCorpus;

use crate::aggregator::{RunIdentity, build_report};
use crate::classifier::CategoryClassifier;
use crate::error::PipelineError;
use crate::extractor::ClauseExtractor;
use crate::matcher::{ClauseFeatures, Matcher, clause_features};

/// A reusable matching pipeline over one regulation corpus.
///
/// Cheap to clone; the corpus and classifier are shared. Runs share no
/// mutable state, so any number may execute concurrently.
#[derive(Clone)]
pub struct Pipeline {
    corpus: Arc<RegulationCorpus>,
    classifier: Arc<CategoryClassifier>,
    extractor: ClauseExtractor,
}

impl Pipeline {
    pub fn new(corpus: Arc<RegulationCorpus>) -> Self {
        let classifier = CategoryClassifier::build(corpus.requirements());
        let summary = classifier.summary(corpus.len());
        info!(
            corpus = corpus.version(),
            categories = summary.category_count,
            requirements = summary.requirements_used,
            "pipeline ready"
        );
        Self {
            corpus,
            classifier: Arc::new(classifier),
            extractor: ClauseExtractor::new(),
        }
    }

    pub fn corpus(&self) -> &RegulationCorpus {
        &self.corpus
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    /// Everything that can be checked before touching the policy text.
    pub fn validate(&self, config: &MatchingConfiguration) -> Result<(), ConfigurationError> {
        config.validate()?;
        self.corpus.validate_scope(&config.scope)
    }

    /// Split `text` into categorised clauses.
    pub fn extract(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Clause>, PipelineError> {
        self.extractor.extract(text, &self.classifier, cancel)
    }

    /// Run synchronously on the calling thread.
    pub fn run(
        &self,
        text: &str,
        config: &MatchingConfiguration,
        cancel: &CancellationToken,
    ) -> Result<ComplianceReport, PipelineError> {
        self.validate(config)?;
        let run = RunIdentity::new();
        let span = info_span!("matching_run", run_id = %run.run_id);
        let _enter = span.enter();
        let started = Instant::now();

        let clauses = self.extract(text, cancel)?;
        let features = clause_features(&clauses);
        let requirements = self.corpus.requirements_for_scope(&config.scope);
        info!(
            clauses = clauses.len(),
            requirements = requirements.len(),
            strictness = %config.strictness,
            scope = %config.scope.label(),
            "matching"
        );

        let verdicts = Matcher::new(&self.classifier, config).match_all(
            requirements.iter().copied(),
            &features,
            cancel,
        )?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let report = build_report(&requirements, verdicts, config, self.corpus.version(), run)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "run complete");
        Ok(report)
    }

    /// Run on tokio's blocking pool, scoring requirement chunks in parallel.
    ///
    /// All chunks are joined before the report is built. On timeout or
    /// cancellation the workers are told to stop and no report is returned.
    pub async fn run_async(
        &self,
        text: String,
        config: MatchingConfiguration,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<ComplianceReport, PipelineError> {
        self.validate(&config)?;
        let run = RunIdentity::new();
        let span = info_span!("matching_run", run_id = %run.run_id);

        // Stops the workers whenever this future finishes or is dropped.
        let worker_token = cancel.child_token();
        let _guard = worker_token.clone().drop_guard();

        let work = self
            .clone()
            .run_parallel(text, config, worker_token, run)
            .instrument(span);

        let outcome = match timeout {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                res = tokio::time::timeout(limit, work) => {
                    res.unwrap_or(Err(PipelineError::Timeout(limit)))
                }
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                res = work => res,
            },
        };

        if let Err(e) = &outcome {
            info!(run_id = %run.run_id, error = %e, "run aborted");
        }
        outcome
    }

    async fn run_parallel(
        self,
        text: String,
        config: MatchingConfiguration,
        cancel: CancellationToken,
        run: RunIdentity,
    ) -> Result<ComplianceReport, PipelineError> {
        let started = Instant::now();
        let config = Arc::new(config);

        let features = {
            let this = self.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let clauses = this.extract(&text, &cancel)?;
                Ok::<_, PipelineError>(Arc::new(clause_features(&clauses)))
            })
            .await
            .map_err(join_failure)??
        };

        let scoped: Vec<usize> = self
            .corpus
            .requirements()
            .iter()
            .enumerate()
            .filter(|(_, r)| config.scope.includes(r))
            .map(|(i, _)| i)
            .collect();
        info!(
            clauses = features.len(),
            requirements = scoped.len(),
            strictness = %config.strictness,
            scope = %config.scope.label(),
            "matching"
        );

        let workers = std::thread::available_parallelism().map_or(4, |n| n.get());
        let chunk_size = scoped.len().div_ceil(workers).max(1);

        let tasks = scoped.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let this = self.clone();
            let config = Arc::clone(&config);
            let features = Arc::clone(&features);
            let cancel = cancel.clone();
            let span = tracing::Span::current();
            tokio::task::spawn_blocking(move || {
                let _enter = span.enter();
                this.score_chunk(&chunk, &config, &features, &cancel)
            })
        });

        // Barrier: every chunk must finish before aggregation.
        let verdicts: Vec<MatchVerdict> = try_join_all(tasks)
            .await
            .map_err(join_failure)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let requirements = self.corpus.requirements_for_scope(&config.scope);
        let report = build_report(&requirements, verdicts, &config, self.corpus.version(), run)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "run complete");
        Ok(report)
    }

    fn score_chunk(
        &self,
        indices: &[usize],
        config: &MatchingConfiguration,
        features: &[ClauseFeatures],
        cancel: &CancellationToken,
    ) -> Result<Vec<MatchVerdict>, PipelineError> {
        let all = self.corpus.requirements();
        Matcher::new(&self.classifier, config).match_all(
            indices.iter().map(|&i| &all[i]),
            features,
            cancel,
        )
    }
}

fn join_failure(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::InvariantViolation(format!("matching task failed: {e}"))
}
