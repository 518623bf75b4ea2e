mod check;
mod display;
mod export;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dpdpa_core::{ComplianceReport, ReportDiff};
use dpdpa_corpus::RegulationCorpus;
use tracing_subscriber::EnvFilter;

use check::{CheckArgs, run_check};

/// Check a privacy policy against the Digital Personal Data Protection Act, 2023
/// and its Rules.
#[derive(Parser, Debug)]
#[command(name = "dpdpa", version, about, long_about = None)]
struct Cli {
    /// Regulation corpus JSON to use instead of the built-in DPDPA corpus.
    #[arg(long, global = true, env = "DPDPA_CORPUS")]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match a policy against the regulation and report compliance gaps.
    Check(CheckArgs),

    /// Show a section of the Act or Rules with its requirements.
    Explain {
        /// Section reference, e.g. `6(4)`, `s. 8(5)`, or `Rule 7`.
        section: String,
    },

    /// List defined terms, or define one.
    Glossary { term: Option<String> },

    /// List every section with the scopes that include it.
    Sections,

    /// Compare two JSON reports from `dpdpa check --format json`.
    Diff { previous: PathBuf, current: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let corpus = Arc::new(load_corpus(cli.corpus.as_deref())?);
    let stdout = std::io::stdout();

    match cli.command {
        Command::Check(args) => run_check(&args, corpus).await?,
        Command::Explain { section } => {
            let Some(found) = corpus.section(&section) else {
                bail!("section '{section}' is not in corpus {}", corpus.version());
            };
            let requirements = corpus.requirements_in_section(&found.section_ref);
            display::write_section_card(&mut stdout.lock(), found, &requirements)?;
        }
        Command::Glossary { term } => {
            let entries: Vec<_> = match term {
                Some(term) => match corpus.define(&term) {
                    Some(entry) => vec![entry],
                    None => bail!("'{term}' is not a defined term"),
                },
                None => corpus.glossary().iter().collect(),
            };
            display::write_glossary(&mut stdout.lock(), &entries)?;
        }
        Command::Sections => display::write_sections(&mut stdout.lock(), &corpus)?,
        Command::Diff { previous, current } => {
            let previous = read_report(&previous)?;
            let current = read_report(&current)?;
            display::write_diff(&mut stdout.lock(), &ReportDiff::between(&previous, &current))?;
        }
    }
    Ok(())
}

fn load_corpus(path: Option<&Path>) -> anyhow::Result<RegulationCorpus> {
    match path {
        Some(path) => RegulationCorpus::from_path(path)
            .with_context(|| format!("loading corpus {}", path.display())),
        None => RegulationCorpus::builtin().context("loading built-in corpus"),
    }
}

fn read_report(path: &Path) -> anyhow::Result<ComplianceReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading report {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing report {}", path.display()))
}
