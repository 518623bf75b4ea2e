//! End-to-end properties of a matching run against the built-in corpus.

use std::sync::Arc;
use std::time::Duration;

use dpdpa_core::{
    ClauseId, ConfigurationError, ExtractionError, Industry, MatchStatus, MatchingConfiguration,
    Scope, Strictness,
};
use dpdpa_corpus::RegulationCorpus;
use dpdpa_engine::{Pipeline, PipelineError};
use tokio_util::sync::CancellationToken;

const ACME: &str = include_str!("fixtures/acme_policy.txt");

fn pipeline() -> Pipeline {
    Pipeline::new(Arc::new(RegulationCorpus::builtin().unwrap()))
}

fn config(strictness: Strictness, scope: Scope, industry: Industry) -> MatchingConfiguration {
    MatchingConfiguration::new(strictness, scope, industry)
}

fn run(p: &Pipeline, text: &str, cfg: &MatchingConfiguration) -> dpdpa_core::ComplianceReport {
    p.run(text, cfg, &CancellationToken::new()).unwrap()
}

#[test]
fn identical_inputs_give_identical_reports() {
    let p = pipeline();
    for strictness in Strictness::ALL {
        let cfg = config(strictness, Scope::ActAndRules, Industry::Fintech);
        let a = run(&p, ACME, &cfg);
        let b = run(&p, ACME, &cfg);
        assert!(a.same_outcome(&b), "{strictness}");
        assert_ne!(a.run_id(), b.run_id());
    }
}

#[test]
fn loosening_strictness_never_lowers_the_score() {
    let p = pipeline();
    let policies = [
        ACME,
        "we inform users before collecting data",
        "SECURITY\nWe encrypt backups.\n\nCHILDREN\nWe do not knowingly serve minors.",
        "Contact us with any complaint.\n\nYou may withdraw consent.",
    ];
    let industries = [Industry::General, Industry::Education, Industry::Healthcare];
    for text in policies {
        for industry in &industries {
            let scores: Vec<f64> = Strictness::ALL
                .iter()
                .map(|&s| {
                    run(&p, text, &config(s, Scope::ActAndRules, industry.clone())).overall_score()
                })
                .collect();
            assert!(
                scores.windows(2).all(|w| w[0] <= w[1]),
                "{industry}: {scores:?} for {text:.40}"
            );
        }
    }
}

#[test]
fn per_requirement_status_is_monotone_too() {
    let p = pipeline();
    let reports: Vec<_> = Strictness::ALL
        .iter()
        .map(|&s| run(&p, ACME, &config(s, Scope::ActAndRules, Industry::General)))
        .collect();
    for (strict, loose) in reports.iter().zip(&reports[1..]) {
        for (a, b) in strict.verdicts().iter().zip(loose.verdicts()) {
            assert_eq!(a.requirement_id, b.requirement_id);
            assert!(a.status <= b.status, "{}", a.requirement_id);
            assert!(a.confidence <= b.confidence + 1e-12, "{}", a.requirement_id);
        }
    }
}

#[test]
fn scoped_verdicts_equal_full_run_verdicts() {
    let p = pipeline();
    for strictness in Strictness::ALL {
        let full = run(&p, ACME, &config(strictness, Scope::ActAndRules, Industry::General));

        let scopes = [
            Scope::FullAct,
            Scope::RulesOnly,
            Scope::custom(["5(1)", "8(5)", "Rule 7"]),
        ];
        for scope in scopes {
            let part = run(&p, ACME, &config(strictness, scope.clone(), Industry::General));
            assert!(!part.verdicts().is_empty());
            for v in part.verdicts() {
                assert_eq!(full.verdict(&v.requirement_id), Some(v), "{}", scope.label());
            }
        }
    }
}

#[test]
fn custom_scope_selects_only_named_sections() {
    let p = pipeline();
    let cfg = config(
        Strictness::Moderate,
        Scope::custom(["s. 8(6)", "Rule 7"]),
        Industry::General,
    );
    let report = run(&p, ACME, &cfg);
    let ids: Vec<_> = report
        .verdicts()
        .iter()
        .map(|v| v.requirement_id.as_str())
        .collect();
    assert_eq!(ids, ["DPDPA-8-6-BREACH", "RULE-7-BREACH-INTIMATION"]);
}

#[test]
fn whole_section_scope_covers_every_subsection() {
    let p = pipeline();
    for whole in ["5", "8", "Section 6"] {
        let cfg = config(Strictness::Moderate, Scope::custom([whole]), Industry::General);
        let report = p
            .run(ACME, &cfg, &CancellationToken::new())
            .unwrap_or_else(|e| panic!("{whole}: {e}"));
        let prefix = format!("{}(", whole.trim_start_matches("Section "));
        assert!(!report.verdicts().is_empty(), "{whole}");
        assert!(
            report.verdicts().iter().all(|v| v.section_ref.starts_with(&prefix)),
            "{whole}"
        );
    }

    let cfg = config(Strictness::Moderate, Scope::custom(["8"]), Industry::General);
    let report = run(&p, ACME, &cfg);
    for id in ["DPDPA-8-6-BREACH", "DPDPA-8-10-GRIEVANCE"] {
        assert!(report.verdict(id).is_some(), "{id}");
    }
}

#[test]
fn duplicate_clauses_resolve_to_the_earlier_one() {
    let p = pipeline();
    let text = "Welcome to Acme.\n\nYou may withdraw your consent at any time.\n\nYou may withdraw your consent at any time.";
    for strictness in Strictness::ALL {
        let report = run(&p, text, &config(strictness, Scope::FullAct, Industry::General));
        let v = report.verdict("DPDPA-6-4-WITHDRAWAL").unwrap();
        assert_ne!(v.status, MatchStatus::Missing, "{strictness}");
        assert!(v.matched_clause_ids.contains(&ClauseId(2)), "{strictness}");
        assert!(!v.matched_clause_ids.contains(&ClauseId(3)), "{strictness}");
    }
}

#[test]
fn single_unstructured_sentence() {
    let p = pipeline();
    let cfg = config(Strictness::Relaxed, Scope::FullAct, Industry::General);
    let report = run(&p, "we inform users before collecting data", &cfg);

    let notice = report.verdict("DPDPA-5-1-NOTICE").unwrap();
    assert!(
        matches!(notice.status, MatchStatus::Matched | MatchStatus::PartiallyMatched),
        "{notice:?}"
    );
    assert_eq!(notice.matched_clause_ids, [ClauseId(1)].into());

    let children = report.verdict("DPDPA-9-1-CHILD-CONSENT").unwrap();
    assert_eq!(children.status, MatchStatus::Missing);
    assert!(report.gaps().iter().any(|g| g.requirement_id == children.requirement_id));
}

#[test]
fn well_formed_policy_report() {
    let p = pipeline();
    let report = run(&p, ACME, &config(Strictness::Moderate, Scope::ActAndRules, Industry::General));

    assert_eq!(report.verdicts().len(), p.corpus().len());
    assert!(report.overall_score() > 0.5, "{}", report.overall_score());
    assert_eq!(
        report.verdict("DPDPA-8-10-GRIEVANCE").map(|v| v.status),
        Some(MatchStatus::Matched)
    );
    assert_eq!(
        report.verdict("DPDPA-9-1-CHILD-CONSENT").map(|v| v.status),
        Some(MatchStatus::Missing)
    );

    // Gaps hold only mandatory, unmet requirements, in section order.
    for gap in report.gaps() {
        let req = p.corpus().requirement(&gap.requirement_id).unwrap();
        assert!(req.mandatory);
        assert_ne!(gap.status, MatchStatus::Matched);
    }
    let keys: Vec<_> = report
        .gaps()
        .iter()
        .map(|g| dpdpa_core::section_key(&g.section_ref))
        .collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    let tallied: usize = report
        .category_breakdown()
        .iter()
        .map(|t| t.matched + t.partially_matched + t.missing)
        .sum();
    assert_eq!(tallied, report.verdicts().len());
}

#[test]
fn education_elevates_childrens_requirements() {
    let p = pipeline();
    let general = run(&p, ACME, &config(Strictness::Moderate, Scope::FullAct, Industry::General));
    let education = run(&p, ACME, &config(Strictness::Moderate, Scope::FullAct, Industry::Education));

    let gap_ids = |r: &dpdpa_core::ComplianceReport| -> Vec<String> {
        r.gaps().iter().map(|g| g.requirement_id.clone()).collect()
    };
    assert!(!gap_ids(&general).contains(&"DPDPA-9-3-NO-TRACKING".to_string()));
    assert!(gap_ids(&education).contains(&"DPDPA-9-3-NO-TRACKING".to_string()));
    assert!(education.overall_score() < general.overall_score());
    assert_eq!(education.industry_context(), &Industry::Education);
}

#[test]
fn empty_input_is_rejected() {
    let p = pipeline();
    let cfg = config(Strictness::Moderate, Scope::FullAct, Industry::General);
    for text in ["", "   \n\t  "] {
        let err = p.run(text, &cfg, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Empty)));
    }
}

#[test]
fn empty_custom_scope_is_rejected_before_extraction() {
    let p = pipeline();
    let cfg = config(Strictness::Moderate, Scope::custom(Vec::<String>::new()), Industry::General);
    // Invalid text too: configuration must be reported first.
    let err = p.run("\0\0\0", &cfg, &CancellationToken::new()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration(ConfigurationError::EmptyCustomScope)
    ));
    assert!(err.is_recoverable());
}

#[test]
fn other_industry_needs_a_name() {
    let p = pipeline();
    let cfg = config(Strictness::Moderate, Scope::FullAct, Industry::Other("  ".into()));
    let err = p.run(ACME, &cfg, &CancellationToken::new()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration(ConfigurationError::MissingIndustryName)
    ));
}

#[tokio::test]
async fn cancellation_mid_run_yields_no_report() {
    let p = pipeline();
    let cfg = config(Strictness::Moderate, Scope::ActAndRules, Industry::General);
    let big = ACME.repeat(400);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        trigger.cancel();
    });

    let err = p.run_async(big, cfg, token, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled), "{err}");
}

#[tokio::test]
async fn concurrent_runs_share_the_corpus() {
    let p = pipeline();
    let cfg = config(Strictness::Strict, Scope::ActAndRules, Industry::General);
    let expected = run(&p, ACME, &cfg);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = p.clone();
            let cfg = cfg.clone();
            tokio::spawn(async move {
                p.run_async(ACME.to_string(), cfg, CancellationToken::new(), Some(Duration::from_secs(60)))
                    .await
            })
        })
        .collect();

    for h in handles {
        let report = h.await.unwrap().unwrap();
        assert!(report.same_outcome(&expected));
    }
}
