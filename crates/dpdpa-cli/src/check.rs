//! `dpdpa check`: run a policy through the matching pipeline and export the report.

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use dpdpa_core::{
    ConfigurationError, Industry, MatchingConfiguration, Scope, Strictness, ThresholdBands,
};
use dpdpa_corpus::RegulationCorpus;
use dpdpa_engine::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::export::{self, Format};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Policy text file, or `-` to read standard input.
    pub policy: PathBuf,

    /// strict, moderate, or relaxed.
    #[arg(long, default_value = "moderate")]
    pub strictness: Strictness,

    /// full-act, rules-only, act-and-rules (default), or custom (with --section).
    #[arg(long)]
    pub scope: Option<String>,

    /// Section to check, e.g. `8(5)` or `Rule 7`. Repeatable; implies a custom scope.
    #[arg(long = "section", value_name = "REF")]
    pub sections: Vec<String>,

    /// general, fintech, healthcare, ecommerce, education, telecom, government, or other.
    #[arg(long, default_value = "general")]
    pub industry: String,

    /// Sector description when --industry is `other`.
    #[arg(long)]
    pub industry_name: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Write the report here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Abandon the run after this many seconds.
    #[arg(long, env = "DPDPA_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// JSON file overriding the confidence bands per strictness level.
    #[arg(long, env = "DPDPA_THRESHOLDS")]
    pub thresholds: Option<PathBuf>,
}

impl CheckArgs {
    /// The scope the flags ask for. `--section` selects a custom scope and
    /// conflicts with any fixed `--scope`.
    pub fn scope(&self) -> Result<Scope, ConfigurationError> {
        let named = self.scope.as_deref().map(str::trim);
        let custom = named.is_some_and(|s| s.eq_ignore_ascii_case("custom"));
        if custom || (named.is_none() && !self.sections.is_empty()) {
            return Ok(Scope::custom(self.sections.iter().map(|s| s.trim())));
        }
        let scope: Scope = named.unwrap_or("act-and-rules").parse()?;
        if !self.sections.is_empty() {
            return Err(ConfigurationError::ConflictingScope(scope.label()));
        }
        Ok(scope)
    }

    pub fn configuration(&self) -> anyhow::Result<MatchingConfiguration> {
        let industry = Industry::parse(&self.industry, self.industry_name.as_deref())?;
        let mut config = MatchingConfiguration::new(self.strictness, self.scope()?, industry);
        if let Some(path) = &self.thresholds {
            config = config.with_thresholds(load_thresholds(path)?);
        }
        Ok(config)
    }
}

fn load_thresholds(path: &Path) -> anyhow::Result<ThresholdBands> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading thresholds from {}", path.display()))?;
    let bands: ThresholdBands = serde_json::from_str(&raw)
        .with_context(|| format!("parsing thresholds in {}", path.display()))?;
    Ok(bands)
}

fn read_policy(path: &Path) -> anyhow::Result<String> {
    let mut bytes = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("reading policy from stdin")?;
    } else {
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .with_context(|| format!("reading policy {}", path.display()))?;
    }
    // Exported documents often carry stray bytes; the extractor judges the text.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn run_check(args: &CheckArgs, corpus: Arc<RegulationCorpus>) -> anyhow::Result<()> {
    let config = args.configuration()?;
    let text = read_policy(&args.policy)?;
    let pipeline = Pipeline::new(corpus);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let timeout = args.timeout.map(Duration::from_secs);
    let report = pipeline
        .run_async(text, config, cancel, timeout)
        .await
        .context("matching run failed")?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            export::write_report(&report, args.format, BufWriter::new(file))?;
            info!(path = %path.display(), format = ?args.format, "report written");
        }
        None => export::write_report(&report, args.format, std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: CheckArgs,
    }

    fn parse(argv: &[&str]) -> CheckArgs {
        let mut full = vec!["check"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn defaults_are_moderate_act_and_rules_general() {
        let config = parse(&["policy.txt"]).configuration().unwrap();
        assert_eq!(config.strictness, Strictness::Moderate);
        assert_eq!(config.scope, Scope::ActAndRules);
        assert_eq!(config.industry, Industry::General);
        assert_eq!(config.thresholds, ThresholdBands::default());
    }

    #[test]
    fn sections_imply_custom_scope() {
        let args = parse(&["p.txt", "--section", "8(5)", "--section", "Rule 7"]);
        assert_eq!(args.scope().unwrap(), Scope::custom(["8(5)", "Rule 7"]));

        let explicit = parse(&["p.txt", "--scope", "Custom", "--section", "8"]);
        assert_eq!(explicit.scope().unwrap(), Scope::custom(["8"]));

        let empty = parse(&["p.txt", "--scope", "custom"]);
        assert_eq!(empty.scope().unwrap(), Scope::custom(Vec::<String>::new()));
    }

    #[test]
    fn fixed_scope_with_sections_is_rejected() {
        let err = parse(&["p.txt", "--scope", "full-act", "--section", "8(5)"])
            .scope()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::ConflictingScope("full-act".into()));

        let err = parse(&["p.txt", "--scope", "act-and-rules", "--section", "Rule 7"])
            .configuration()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::ConflictingScope(_))
        ));

        assert_eq!(parse(&["p.txt", "--scope", "rules"]).scope().unwrap(), Scope::RulesOnly);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        assert!(Harness::try_parse_from(["check", "p.txt", "--strictness", "lenient"]).is_err());

        let err = parse(&["p.txt", "--scope", "everything"]).scope().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownScope(_)));

        let err = parse(&["p.txt", "--industry", "other"]).configuration().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::MissingIndustryName)
        ));

        let named = parse(&["p.txt", "--industry", "other", "--industry-name", "logistics"]);
        assert_eq!(
            named.configuration().unwrap().industry,
            Industry::Other("logistics".into())
        );
    }

    #[test]
    fn thresholds_load_from_json() {
        let mut bands = ThresholdBands::default();
        bands.relaxed.low = 0.1;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&bands).unwrap().as_bytes()).unwrap();

        let path = file.path().to_str().unwrap();
        let config = parse(&["p.txt", "--thresholds", path]).configuration().unwrap();
        assert_eq!(config.thresholds, bands);
    }

    #[test]
    fn policy_bytes_are_decoded_lossily() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"We collect data\xff for billing.").unwrap();
        let text = read_policy(file.path()).unwrap();
        assert!(text.starts_with("We collect data"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn check_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.txt");
        std::fs::write(
            &policy,
            "1. Grievances\nContact our Grievance Officer to raise a complaint; we respond within 90 days.\n",
        )
        .unwrap();
        let out = dir.path().join("report.json");

        let args = parse(&[
            policy.to_str().unwrap(),
            "--section",
            "8(10)",
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ]);
        let corpus = Arc::new(RegulationCorpus::builtin().unwrap());
        run_check(&args, corpus).await.unwrap();

        let report: dpdpa_core::ComplianceReport =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report.verdicts().len(), 1);
        assert_eq!(report.verdicts()[0].section_ref, "8(10)");
    }
}
