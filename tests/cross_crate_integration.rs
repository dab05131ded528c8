//! Cross-crate integration tests verifying contracts between workspace
//! crates, plus the end-to-end repair scenarios over real projects on disk.
//!
//! These tests exercise typemend-core the way the CLI binary does: load a
//! manifest, plan, and read the resulting plan object. For items classified
//! as stable in the backward-compatibility policy, these tests help ensure
//! that the corresponding interfaces remain stable across releases.

use std::path::{Path, PathBuf};
use typemend_core::{
    CheckHost, CheckerOptions, Disposition, PlanOptions, Planner, PolicyPreset, RepairRequest,
    SymbolChecker, Vfs,
};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

fn manifest_with(root: &Path, files: &[&str]) -> PathBuf {
    let list: Vec<String> = files.iter().map(|f| format!("\"{f}\"")).collect();
    let manifest = format!("{{ \"files\": [{}] }}", list.join(", "));
    write(root, "project.json", &manifest);
    root.join("project.json")
}

// ============================================================================
// Repair scenarios
// ============================================================================

#[test]
fn scenario_missing_import_is_repaired() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "a.sym", "def foo\n");
    write(temp.path(), "b.sym", "use foo\n");
    let manifest = manifest_with(temp.path(), &["a.sym", "b.sym"]);

    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert_eq!(plan.summary.initial_errors, 1);
    assert_eq!(plan.summary.final_errors, 0);
    assert!(plan.remaining.is_empty());
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].fix_name, "fixMissingImport");
    assert_eq!(plan.steps[0].changes[0].new_text, "import foo\n");
}

#[test]
fn scenario_spelling_near_miss_is_repaired() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "a.sym", "def color\nuse col\n");
    let manifest = manifest_with(temp.path(), &["a.sym"]);

    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert_eq!(plan.summary.final_errors, 0);
    assert_eq!(plan.steps[0].fix_name, "fixSpelling");
}

#[test]
fn scenario_ten_independent_imports_stay_linear() {
    let temp = tempfile::tempdir().unwrap();
    let defs: String = (0..10).map(|i| format!("def s{i}\n")).collect();
    write(temp.path(), "defs.sym", &defs);
    let mut files = vec!["defs.sym".to_string()];
    for i in 0..10 {
        let name = format!("u{i}.sym");
        write(temp.path(), &name, &format!("use s{i}\n"));
        files.push(name);
    }
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let manifest = manifest_with(temp.path(), &refs);

    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert_eq!(plan.summary.fixed_count, 10);
    assert_eq!(plan.summary.final_errors, 0);
    assert!(
        plan.summary.budget.candidates_verified < 30,
        "verified {} times for 10 independent errors",
        plan.summary.budget.candidates_verified
    );
    // Ten fixes in deterministic commit order.
    let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids[0], "fix-1");
    assert_eq!(ids[9], "fix-10");
}

#[test]
fn scenario_synthesized_declaration_gated_on_risk() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "lib.sym", "def existing\n");
    write(temp.path(), "a.sym", "use ghost\n");
    write(
        temp.path(),
        "project.json",
        r#"{ "files": ["lib.sym", "a.sym"], "options": { "declarationFile": "lib.sym" } }"#,
    );
    let manifest = temp.path().join("project.json");

    // Suppressed by default, classified as high-risk auto-fixable.
    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert!(plan.steps.is_empty());
    assert_eq!(
        plan.remaining[0].disposition,
        Disposition::AutoFixableHighRisk
    );

    // Committed once the caller opts in.
    let options = PlanOptions {
        include_high_risk: true,
        ..PlanOptions::default()
    };
    let plan = typemend_core::plan(&manifest, options).unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].fix_name, "addMissingDeclaration");
    assert!(plan.is_clean());
}

#[test]
fn scenario_budget_cap_is_honored() {
    let temp = tempfile::tempdir().unwrap();
    let defs: String = (0..40).map(|i| format!("def t{i}\n")).collect();
    write(temp.path(), "defs.sym", &defs);
    let mut files = vec!["defs.sym".to_string()];
    for i in 0..40 {
        let name = format!("u{i}.sym");
        write(temp.path(), &name, &format!("use t{i}\n"));
        files.push(name);
    }
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let manifest = manifest_with(temp.path(), &refs);

    let options = PlanOptions {
        max_verifications: 5,
        ..PlanOptions::default()
    };
    let plan = typemend_core::plan(&manifest, options).unwrap();
    assert_eq!(plan.summary.budget.candidates_verified, 5);
    assert!(plan.summary.budget.budget_exhausted);
    assert!(plan.summary.fixed_count <= 5);
    assert!(!plan.remaining.is_empty());
    for classified in &plan.remaining {
        assert_eq!(classified.disposition, Disposition::NeedsJudgment);
        assert_eq!(classified.candidate_count, 0);
    }
}

#[test]
fn scenario_unfixable_diagnostic_is_classified() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "a.sym", "def x\ndef x\nuse x\n");
    write(
        temp.path(),
        "project.json",
        r#"{ "files": ["a.sym"], "options": { "strict": true } }"#,
    );
    let manifest = temp.path().join("project.json");

    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert!(plan.steps.is_empty());
    assert_eq!(plan.remaining.len(), 1);
    assert_eq!(
        plan.remaining[0].disposition,
        Disposition::NoGeneratedCandidate
    );
    assert_eq!(plan.remaining[0].candidate_count, 0);
}

#[test]
fn scenario_plans_are_deterministic_across_invocations() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "defs.sym", "def one\ndef two\n");
    write(temp.path(), "x.sym", "use one\n");
    write(temp.path(), "y.sym", "use two\n");
    let manifest = manifest_with(temp.path(), &["defs.sym", "x.sym", "y.sym"]);

    let first = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    let second = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// CLI <-> core contracts
// ============================================================================

#[test]
fn cli_plan_options_default_works() {
    let options = PlanOptions::default();
    assert_eq!(options.max_verifications, 500);
    assert_eq!(options.max_candidates, 10);
    assert!(!options.include_high_risk);
    assert!(options.policy.validate().is_ok());
}

#[test]
fn cli_repair_request_roundtrips_as_json() {
    let request: RepairRequest = serde_json::from_str(
        r#"{
            "project": "/p/project.json",
            "includeHighRisk": true,
            "maxVerifications": 25,
            "preset": "structural"
        }"#,
    )
    .unwrap();
    assert_eq!(request.preset, Some(PolicyPreset::Structural));
    let options = request.resolved_options();
    assert!(options.include_high_risk);
    assert_eq!(options.max_verifications, 25);
}

#[test]
fn cli_persisted_plan_shape_is_stable() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "a.sym", "def foo\n");
    write(temp.path(), "b.sym", "use foo\n");
    let manifest = manifest_with(temp.path(), &["a.sym", "b.sym"]);

    let plan = typemend_core::plan(&manifest, PlanOptions::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();

    for key in [
        "initialErrors",
        "finalErrors",
        "fixedCount",
        "remainingCount",
        "budget",
    ] {
        assert!(json["summary"].get(key).is_some(), "summary.{key} missing");
    }
    for key in [
        "id",
        "fixName",
        "fixDescription",
        "risk",
        "diagnostic",
        "changes",
        "effect",
        "dependencies",
    ] {
        assert!(json["steps"][0].get(key).is_some(), "steps[0].{key} missing");
    }
}

#[test]
fn embedder_constructs_planner_over_custom_host() {
    // An embedder with its own checker wires the pieces together directly,
    // never touching the filesystem.
    let mut vfs = Vfs::new();
    vfs.add_file("/p/a.sym", "def foo\n");
    vfs.add_file("/p/b.sym", "use foo\n");
    let host = CheckHost::new(Box::new(SymbolChecker), vfs, CheckerOptions::default());
    let mut planner = Planner::new(Box::new(host), PlanOptions::default()).unwrap();
    let plan = planner.plan().unwrap();
    assert!(plan.is_clean());
}

#[test]
fn repair_entry_point_accepts_logger() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "a.sym", "def foo\n");
    write(temp.path(), "b.sym", "use foo\n");
    let manifest = manifest_with(temp.path(), &["a.sym", "b.sym"]);

    let request = RepairRequest::new(manifest);
    let plan =
        typemend_core::repair(&request, Some(Box::new(typemend_core::TraceLogger))).unwrap();
    assert_eq!(plan.summary.fixed_count, 1);
}
