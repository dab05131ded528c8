//! typemend - plan verified repairs for a failing project.
//!
//! Exit codes: 0 when the plan leaves no diagnostics, 1 when diagnostics
//! remain, 2 on tool or configuration errors.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use typemend_core::{
    BudgetPreview, PlanOptions, PolicyPreset, RepairPlan, Risk, Vfs, apply_changes,
    generate_plan_schema,
};

#[derive(Parser)]
#[command(
    name = "typemend",
    version,
    about = "Oracle-guided repair planning for type-checked projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and print a verified repair plan
    Plan {
        /// Path to the project manifest (JSON)
        manifest: PathBuf,
        /// Emit the persisted JSON plan instead of a summary
        #[arg(long)]
        json: bool,
        /// Show a unified diff of the committed changes
        #[arg(long)]
        diff: bool,
        /// Verify and commit high-risk candidates
        #[arg(long)]
        include_high_risk: bool,
        /// Accept fixes that introduce new diagnostics
        #[arg(long)]
        allow_regressions: bool,
        /// Cap on total verifications
        #[arg(long)]
        max_verifications: Option<usize>,
        /// Verification policy preset
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
        /// Also write the JSON plan to a file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Count candidates without verifying anything
    Preview {
        /// Path to the project manifest (JSON)
        manifest: PathBuf,
        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON schema of the persisted plan
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Default,
    Structural,
    Wide,
}

impl From<PresetArg> for PolicyPreset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => PolicyPreset::Default,
            PresetArg::Structural => PolicyPreset::Structural,
            PresetArg::Wide => PolicyPreset::Wide,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Command::Plan {
            manifest,
            json,
            diff,
            include_high_risk,
            allow_regressions,
            max_verifications,
            preset,
            out,
        } => {
            let options = PlanOptions {
                include_high_risk,
                allow_regressions,
                max_verifications: max_verifications
                    .unwrap_or(PlanOptions::default().max_verifications),
                policy: preset
                    .map(|p| PolicyPreset::from(p).policy())
                    .unwrap_or_default(),
                ..PlanOptions::default()
            };
            let plan = typemend_core::plan(&manifest, options)?;

            if let Some(out_path) = &out {
                std::fs::write(out_path, plan.to_json()?)?;
            }
            if json {
                println!("{}", plan.to_json()?);
            } else {
                print_summary(&plan);
                if diff {
                    print_diffs(&manifest, &plan)?;
                }
            }
            Ok(if plan.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Preview { manifest, json } => {
            let preview = typemend_core::preview(&manifest, PlanOptions::default())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                print_preview(&preview);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Schema => {
            println!("{}", generate_plan_schema());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(plan: &RepairPlan) {
    let summary = &plan.summary;
    println!(
        "{} {} -> {} errors ({} fixed, {} remaining)",
        "plan:".bold(),
        summary.initial_errors,
        summary.final_errors,
        summary.fixed_count,
        summary.remaining_count
    );
    for step in &plan.steps {
        println!(
            "  {} {} [{}] {}",
            step.id.green(),
            step.fix_name.bold(),
            risk_label(step.risk),
            step.description
        );
    }
    if !plan.remaining.is_empty() {
        println!("{}", "remaining:".bold());
        for classified in &plan.remaining {
            println!(
                "  {}:{}:{} {} [{:?}]",
                classified.diagnostic.file.display(),
                classified.diagnostic.line,
                classified.diagnostic.column,
                classified.diagnostic.message.yellow(),
                classified.disposition
            );
        }
    }
    let budget = &summary.budget;
    if budget.budget_exhausted {
        println!(
            "{} verification budget exhausted ({}/{})",
            "note:".yellow().bold(),
            budget.candidates_verified,
            budget.verification_budget
        );
    }
}

fn print_preview(preview: &BudgetPreview) {
    println!(
        "{} {} diagnostics, {} candidates ({} after pruning, {} high-risk suppressed), budget {}",
        "preview:".bold(),
        preview.diagnostics,
        preview.candidates_generated,
        preview.candidates_after_prune,
        preview.high_risk_suppressed,
        preview.verification_budget
    );
}

fn risk_label(risk: Risk) -> colored::ColoredString {
    match risk {
        Risk::Low => "low".green(),
        Risk::Medium => "medium".yellow(),
        Risk::High => "high".red(),
    }
}

/// Re-derive before/after texts by replaying the plan over a fresh project
/// load, then print one unified diff per touched file.
fn print_diffs(manifest: &Path, plan: &RepairPlan) -> Result<()> {
    use similar::TextDiff;

    let original = Vfs::from_project(manifest)?;
    let mut patched = Vfs::from_project(manifest)?;
    for step in &plan.steps {
        apply_changes(&mut patched, &step.changes)?;
    }

    let mut files: Vec<PathBuf> = plan
        .steps
        .iter()
        .flat_map(|step| step.changes.iter().map(|change| change.file.clone()))
        .collect();
    files.sort();
    files.dedup();

    for file in files {
        let before = original.get_content(&file).unwrap_or("");
        let after = patched.get_content(&file).unwrap_or("");
        if before == after {
            continue;
        }
        println!("{}", format!("--- {}", file.display()).bold());
        let diff = TextDiff::from_lines(before, after);
        print!("{}", diff.unified_diff().header("before", "after"));
    }
    Ok(())
}
