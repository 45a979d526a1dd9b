use std::path::Path;

use fg_api::GeometricSession;
use fg_conformance::{HarnessConfig, run_index_conformance};
use fg_core::ExecutionMode;
use fg_index::IndexOptions;
use fg_runtime::EvidenceKind;
use serde_json::Value;

#[test]
fn index_fixture_is_present() {
    let cfg = HarnessConfig::default_paths();
    let fixture_path = cfg.fixture_root.join("index_cases.json");
    assert!(Path::new(&fixture_path).exists());
}

#[test]
fn index_fixture_executes_in_both_modes() {
    let cfg = HarnessConfig::default_paths();
    for mode in [ExecutionMode::Strict, ExecutionMode::Hardened] {
        let (report, cases) =
            run_index_conformance(&cfg, mode).expect("index conformance should run");
        let failures: Vec<_> = cases
            .iter()
            .filter(|case| !case.passed())
            .map(|case| (case.name.as_str(), case.mismatches.clone()))
            .collect();

        assert_eq!(report.suite, "index");
        assert_eq!(report.cases_total, cases.len());
        assert!(report.cases_total >= 10);
        assert!(report.is_green(), "{mode:?} failures: {failures:?}");
        assert_eq!(report.strict_mode, mode == ExecutionMode::Strict);
    }
}

#[test]
fn forensic_logs_are_json_lines() {
    let cfg = HarnessConfig::default_paths();
    let (_, cases) =
        run_index_conformance(&cfg, ExecutionMode::Hardened).expect("index conformance should run");

    for case in &cases {
        let line = case
            .forensic_log
            .to_json_line()
            .expect("forensic log should encode");
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).expect("line should parse back");
        assert_eq!(value["mode"], "hardened");
        assert_eq!(value["outcome"], "pass");
        assert!(value["runtime_evidence"]["total_entries"].as_u64() >= Some(1));
    }
}

#[test]
fn session_evidence_covers_each_stage() {
    let mut session = GeometricSession::new(ExecutionMode::Strict);
    let mut index = session
        .index(vec![0i64, 1, 1, 2], IndexOptions::new().sorted(true))
        .expect("index should construct");
    session.validate(&mut index).expect("index should validate");
    session.fill_cache(&mut index);

    for kind in [
        EvidenceKind::Policy,
        EvidenceKind::Construction,
        EvidenceKind::Validation,
        EvidenceKind::Cache,
    ] {
        assert!(
            session.evidence().iter().any(|entry| entry.kind == kind),
            "missing {kind:?} evidence"
        );
    }
}
