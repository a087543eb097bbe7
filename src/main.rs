//! Earthworm - lithology classification CLI
//!
//! # Usage
//!
//! ```bash
//! # Classify a log export and print unit intervals
//! earthworm classify well.csv
//!
//! # Report uncovered / overlapping parameter ranges in the rule table
//! earthworm gaps well.csv --json
//!
//! # Compare classified labels against a reference lithology column
//! earthworm compare well.csv --reference LITH
//!
//! # Per-lithology summary as CSV
//! earthworm report well.csv --parameter RHOB --output report.csv
//!
//! # Write units into the Lithology sheet of a template
//! earthworm export well.csv --template TEMPLATE.xlsx --output well.xlsx
//! ```
//!
//! # Environment Variables
//!
//! - `EARTHWORM_CONFIG`: Path to an earthworm.toml (default: ./earthworm.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use earthworm::config::rules::load_rules_file;
use earthworm::dataset::{load_csv, LoadOptions};
use earthworm::summary::LithologyReport;
use earthworm::{
    Comparator, Dataset, EarthwormConfig, LithologyPipeline, Progress, RangeGapAnalyzer,
    Summarizer, TemplateExporter,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "earthworm")]
#[command(about = "Rule-based lithology classification and template export for well-log data")]
#[command(version)]
struct CliArgs {
    /// Path to earthworm.toml (overrides EARTHWORM_CONFIG and ./earthworm.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Standalone rule file (TOML or JSON) replacing the config's [rules]
    #[arg(long, global = true, value_name = "PATH")]
    rules: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// CSV export with a header row and a depth column
    input: PathBuf,

    /// Depth column (default: auto-detect DEPT / DEPTH / MD)
    #[arg(long)]
    depth_column: Option<String>,

    /// Reference lithology column
    #[arg(long = "reference")]
    reference_column: Option<String>,

    /// Secondary qualifier column
    #[arg(long = "qualifier")]
    qualifier_column: Option<String>,

    /// Discard samples at or above this depth
    #[arg(long)]
    casing_depth: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify samples and print the resulting lithology units
    Classify {
        #[command(flatten)]
        input: InputArgs,

        /// Join thin units to following units of the same lithology
        #[arg(long)]
        merge_thin: bool,
    },
    /// Report parameter ranges no rule covers, and ranges several rules claim
    Gaps {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Compare classified labels with the reference column
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Split summary statistics by the qualifier column
        #[arg(long)]
        by_qualifier: bool,
    },
    /// Per-lithology counts, thickness and parameter distribution as CSV
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Parameter whose min/max/mean/median are reported
        #[arg(long)]
        parameter: Option<String>,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write lithology units into the template's Lithology sheet
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Template workbook (default: [export] template)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output workbook (default: [export] output, else the template)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(args: &CliArgs) -> Result<EarthwormConfig> {
    let mut config = match &args.config {
        Some(path) => EarthwormConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EarthwormConfig::load().context("loading configuration")?,
    };
    if let Some(path) = &args.rules {
        let rules = load_rules_file(path, config.dataset.null_value)
            .with_context(|| format!("loading rules {}", path.display()))?;
        config.rules = rules_to_table(&rules);
    }
    Ok(config)
}

/// Round-trip a standalone rule file through the config's rule table so
/// researched defaults apply the same way to both sources.
fn rules_to_table(rules: &earthworm::RangeRuleSet) -> toml::Table {
    let mut table = toml::Table::new();
    for rule in rules.rules() {
        let mut params = toml::Table::new();
        for (parameter, bound) in rule.bounds() {
            let mut spec = toml::Table::new();
            if let earthworm::Bound::Finite(v) = bound.low() {
                spec.insert("low".into(), toml::Value::Float(v));
            }
            if let earthworm::Bound::Finite(v) = bound.high() {
                spec.insert("high".into(), toml::Value::Float(v));
            }
            params.insert(parameter.clone(), toml::Value::Table(spec));
        }
        table.insert(rule.label().to_string(), toml::Value::Table(params));
    }
    table
}

fn load_dataset(input: &InputArgs, config: &EarthwormConfig) -> Result<Dataset> {
    let mut options = LoadOptions::from(config);
    if input.depth_column.is_some() {
        options.depth_column.clone_from(&input.depth_column);
    }
    if input.reference_column.is_some() {
        options.reference_column.clone_from(&input.reference_column);
    }
    if input.qualifier_column.is_some() {
        options.qualifier_column.clone_from(&input.qualifier_column);
    }
    if input.casing_depth.is_some() {
        options.dataset.casing_depth = input.casing_depth;
    }
    load_csv(&input.input, &options).with_context(|| format!("loading {}", input.input.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_progress(message: &str) {
    debug!("{message}");
}

// ============================================================================
// Commands
// ============================================================================

fn run_classify(args: &CliArgs, config: &EarthwormConfig, input: &InputArgs, merge_thin: bool) -> Result<()> {
    let dataset = load_dataset(input, config)?;
    let mut pipeline_config = config.clone();
    pipeline_config.grouping.merge_thin_units |= merge_thin;
    let pipeline = LithologyPipeline::from_config(&pipeline_config)?;

    let mut cb = log_progress;
    let output = pipeline.run(&dataset, &mut Progress::new(&mut cb))?;

    if args.json {
        return print_json(&output.units);
    }
    println!("{:>10} {:>10} {:>9}  {}", "From", "To", "Thick", "Lithology");
    println!("{}", "-".repeat(45));
    for unit in &output.units {
        println!(
            "{:>10.3} {:>10.3} {:>9.3}  {}",
            unit.from_depth(),
            unit.to_depth(),
            unit.thickness(),
            unit.lithology()
        );
    }
    println!(
        "\n{} samples, {} unclassified, {} units",
        output.stats.samples, output.stats.unknown_samples, output.stats.units
    );
    Ok(())
}

fn run_gaps(args: &CliArgs, config: &EarthwormConfig, input: &InputArgs) -> Result<()> {
    let dataset = load_dataset(input, config)?;
    let rules = config.rule_set()?;
    let report = RangeGapAnalyzer::analyze_dataset(&rules, &dataset)?;

    if args.json {
        return print_json(&report);
    }
    for coverage in &report.parameters {
        println!(
            "{} (observed {:.2} - {:.2})",
            coverage.parameter, coverage.observed.min, coverage.observed.max
        );
        println!("  {}", coverage.gap_summary());
        println!("  {}", coverage.overlap_summary());
    }
    Ok(())
}

fn run_compare(args: &CliArgs, config: &EarthwormConfig, input: &InputArgs, by_qualifier: bool) -> Result<()> {
    let dataset = load_dataset(input, config)?;
    if dataset.samples().iter().all(|s| s.reference_label.is_none()) {
        bail!("no reference labels loaded; pass --reference <COLUMN> or set [dataset] reference_column");
    }
    let rules = config.rule_set()?;
    let labels = earthworm::Classifier::classify_with(
        config.classification.method,
        &dataset,
        &rules,
        &config.two_pass_curves(),
        &mut Progress::silent(),
    )?;
    let classified = earthworm::ClassifiedDataset::new(&dataset, labels)?;
    let comparison = Comparator::compare(&classified);
    let groups = Summarizer::summarize(&dataset, by_qualifier);

    if args.json {
        #[derive(Serialize)]
        struct CompareOutput<'a> {
            comparison: &'a earthworm::Comparison,
            groups: &'a [earthworm::GroupSummary],
        }
        return print_json(&CompareOutput {
            comparison: &comparison,
            groups: &groups,
        });
    }

    let table = &comparison.table;
    print!("{:<12}", "Reference");
    for label in &table.classified_labels {
        print!(" {label:>8}");
    }
    println!();
    for (r, reference) in table.reference_labels.iter().enumerate() {
        print!("{reference:<12}");
        for p in &table.proportions[r] {
            print!(" {:>7.1}%", p * 100.0);
        }
        println!();
    }
    match comparison.agreement {
        Some(a) => println!(
            "\nAgreement: {:.1}% ({}/{} samples, {} without reference)",
            a * 100.0,
            comparison.matched,
            comparison.compared,
            comparison.excluded
        ),
        None => println!("\nAgreement: n/a"),
    }
    if let Some(chi) = comparison.chi_square {
        println!(
            "Chi-square: {:.2} (df {}), p = {:.4}",
            chi.statistic, chi.degrees_of_freedom, chi.p_value
        );
    }
    println!();
    for g in &groups {
        let key = match &g.qualifier {
            Some(q) => format!("{} / {q}", g.reference_label),
            None => g.reference_label.clone(),
        };
        println!("{key} ({} samples)", g.sample_count);
        for (name, s) in &g.parameters {
            println!(
                "  {name:<10} mean {:>9.3}  sd {:>8.3}  min {:>9.3}  max {:>9.3}",
                s.mean, s.std_dev, s.min, s.max
            );
        }
    }
    Ok(())
}

fn run_report(
    args: &CliArgs,
    config: &EarthwormConfig,
    input: &InputArgs,
    parameter: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let dataset = load_dataset(input, config)?;
    let pipeline = LithologyPipeline::from_config(config)?;
    let result = pipeline.run(&dataset, &mut Progress::silent())?;
    let report = LithologyReport::build(&result.classified, &result.units, pipeline.rules(), parameter)?;

    match output {
        Some(path) => {
            report.save(path)?;
            info!(path = %path.display(), "Report written");
        }
        None if args.json => print_json(&report)?,
        None => report.write_csv(&mut std::io::stdout().lock())?,
    }
    Ok(())
}

fn run_export(
    args: &CliArgs,
    config: &EarthwormConfig,
    input: &InputArgs,
    template: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let Some(template) = template.or(config.export.template.as_deref()) else {
        bail!("no template given; pass --template or set [export] template");
    };
    let output = output
        .or(config.export.output.as_deref())
        .unwrap_or(template);

    let dataset = load_dataset(input, config)?;
    let pipeline = LithologyPipeline::from_config(config)?;
    let mut cb = |m: &str| info!("{m}");
    let (result, summary) =
        pipeline.run_and_export(&dataset, template, output, &mut Progress::new(&mut cb))?;

    if args.json {
        return print_json(&summary);
    }
    println!(
        "Wrote {} units ({} cells) to '{}' in {}{}",
        result.units.len(),
        summary.cells_written,
        TemplateExporter::default().sheet_name(),
        summary.output_path.display(),
        if summary.sheet_created { " (sheet created)" } else { "" }
    );
    if summary.merged_cells_skipped > 0 {
        println!("Skipped {} cells inside merged ranges", summary.merged_cells_skipped);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    match &args.command {
        Command::Classify { input, merge_thin } => run_classify(&args, &config, input, *merge_thin),
        Command::Gaps { input } => run_gaps(&args, &config, input),
        Command::Compare { input, by_qualifier } => run_compare(&args, &config, input, *by_qualifier),
        Command::Report {
            input,
            parameter,
            output,
        } => run_report(&args, &config, input, parameter.as_deref(), output.as_deref()),
        Command::Export {
            input,
            template,
            output,
        } => run_export(&args, &config, input, template.as_deref(), output.as_deref()),
    }
}
