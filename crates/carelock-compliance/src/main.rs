//! Carelock Compliance CLI
//!
//! Validate access contexts against the builtin HIPAA rule catalog and
//! print reports, risk assessments, or the rule registry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use carelock_compliance::{ComplianceEngine, NoPhiFields, SafeguardCategory};
use carelock_types::AccessContext;

#[derive(Parser)]
#[command(name = "carelock-compliance")]
#[command(version, about = "Carelock compliance validation and reporting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an access context (JSON file) against the builtin rules
    Validate {
        /// Path to a JSON-encoded access context
        context: PathBuf,

        /// Restrict validation to one safeguard category
        #[arg(short, long)]
        category: Option<SafeguardCategory>,

        /// Run only the critical-rule gate
        #[arg(short, long)]
        quick: bool,

        /// Include the severity-weighted risk assessment
        #[arg(short, long)]
        risk: bool,

        /// Emit the full report as JSON instead of a text summary
        #[arg(short, long)]
        json: bool,
    },

    /// List the builtin validation rules
    Rules,

    /// Show rule registry statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let engine = ComplianceEngine::with_builtin_rules(Arc::new(NoPhiFields));

    match cli.command {
        Commands::Validate {
            context,
            category,
            quick,
            risk,
            json,
        } => {
            let raw = std::fs::read_to_string(&context)
                .with_context(|| format!("Failed to read {}", context.display()))?;
            let ctx: AccessContext = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", context.display()))?;

            if quick {
                let gate = engine.quick_validation(&ctx);
                println!(
                    "quick validation: {}",
                    if gate.passed { "PASSED" } else { "FAILED" }
                );
                println!("critical failures: {}", gate.critical_failures);
                for rule_id in &gate.failed_rules {
                    println!("  failed: {rule_id}");
                }
                if !gate.passed {
                    std::process::exit(1);
                }
                return Ok(());
            }

            let report = match category {
                Some(category) => engine.validate_category(&ctx, category),
                None => engine.validate_compliance(&ctx),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }

            if risk {
                let assessment = engine.advanced_validation(&ctx);
                println!();
                println!(
                    "risk score: {:.1} ({:?})",
                    assessment.risk_score, assessment.risk_level
                );
                for (index, recommendation) in
                    assessment.priority_recommendations.iter().enumerate()
                {
                    println!("priority {}: {recommendation}", index + 1);
                }
            }

            if report.critical_failures > 0 {
                std::process::exit(1);
            }
        }

        Commands::Rules => {
            for rule in engine.list_rules() {
                println!(
                    "{:<12} {:<32} {:<16} {:<10} {}",
                    rule.id,
                    rule.name,
                    rule.category.as_str(),
                    rule.severity.as_str(),
                    if rule.required { "required" } else { "optional" }
                );
            }
        }

        Commands::Stats => {
            let stats = engine.stats();
            println!("total rules:    {}", stats.total_rules);
            println!("required rules: {}", stats.required_rules);
            println!("by category:");
            let mut categories: Vec<_> = stats.rules_by_category.iter().collect();
            categories.sort();
            for (category, count) in categories {
                println!("  {category}: {count}");
            }
            println!("by severity:");
            let mut severities: Vec<_> = stats.rules_by_severity.iter().collect();
            severities.sort();
            for (severity, count) in severities {
                println!("  {severity}: {count}");
            }
        }
    }

    Ok(())
}
