//! linkcost CLI
//!
//! Preprocess and evaluate link-junction VDF tables outside the assignment host.

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use linkcost_core::{
    derivative, integral, preprocess, time_only, value, values, LinkSet, LoadedLinks, Status,
    Variant, VdfState, INFINITE_COST,
};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(name = "linkcost")]
#[command(author, version, about = "Link-junction volume-delay functions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run configuration (TOML)
    #[arg(short, long, global = true, env = "LINKCOST_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Baseline,
    Extended,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Baseline => Variant::Baseline,
            VariantArg::Extended => Variant::Extended,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the parameters, defaults and bounds of a variant
    Params {
        #[arg(long, value_enum, default_value = "baseline")]
        variant: VariantArg,
    },

    /// Fill defaults and validate a link file
    Preprocess {
        /// Link file (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Evaluate every link at its flow and write a report
    Evaluate {
        /// Link file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Leave out the reliability multiplier
        #[arg(long)]
        time_only: bool,

        /// Report path (default: linkcost_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a single link
    Link {
        /// Link file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// 1-based link index
        #[arg(short, long)]
        link: usize,

        /// Flow to evaluate at (default: the link's flow in the file)
        #[arg(short, long)]
        flow: Option<f64>,
    },
}

/// Per-link line of an evaluation report
#[derive(Debug, Serialize)]
struct LinkReport {
    link: usize,
    flow: f64,
    disabled: bool,
    cost: Option<f64>,
    derivative: f64,
    integral: f64,
}

/// Evaluation report written by `evaluate`
#[derive(Debug, Serialize)]
struct EvaluationReport {
    generated_at: chrono::DateTime<chrono::Utc>,
    variant: Variant,
    label: &'static str,
    time_only: bool,
    status: Status,
    big_real: f64,
    threshold: f64,
    clamped: usize,
    links: Vec<LinkReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = RunConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Params { variant } => show_params(variant.into()),
        Commands::Preprocess { input } => run_preprocess(&input, &config)?,
        Commands::Evaluate {
            input,
            time_only,
            output,
        } => run_evaluate(&input, &config, time_only, output)?,
        Commands::Link { input, link, flow } => run_link(&input, &config, link, flow)?,
    }

    Ok(())
}

fn show_params(variant: Variant) {
    println!("{}\n", variant.label());
    println!("{:<4} {:<32} {:>10}  {:<4} {}", "#", "name", "default", "req", "bounds");

    for (i, spec) in variant.fields().iter().enumerate() {
        let default = spec
            .default
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let bounds = spec
            .bounds
            .map_or_else(|| "-".to_string(), |(lo, hi)| format!("[{}, {}]", lo, hi));
        let required = if spec.required { "yes" } else { "no" };
        println!(
            "{:<4} {:<32} {:>10}  {:<4} {}",
            i + 1,
            spec.name,
            default,
            required,
            bounds
        );
    }
}

/// Load a link file, apply the config's variant override and preprocess it
fn load_prepared(input: &Path, config: &RunConfig) -> Result<(VdfState, LoadedLinks)> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read link file {}", input.display()))?;
    let mut set = LinkSet::from_json_str(&text)?;
    if let Some(variant) = config.variant {
        set.variant = variant;
    }

    let mut loaded = set.into_table()?;
    let defaults = config.resolve_defaults(loaded.table.variant())?;

    let mut state = VdfState::new();
    state.set_flags(config.flags);
    preprocess(&mut state, &mut loaded.table, &defaults)
        .with_context(|| format!("Preprocessing {} failed", input.display()))?;

    info!(
        links = loaded.table.len(),
        variant = ?loaded.table.variant(),
        "Loaded link table"
    );
    Ok((state, loaded))
}

fn run_preprocess(input: &Path, config: &RunConfig) -> Result<()> {
    let (state, loaded) = load_prepared(input, config)?;

    println!("✅ {} links valid ({:?})", loaded.table.len(), loaded.table.variant());
    println!("   Overflow guard: {:e}", state.big_real);
    println!("   Max free-flow time: {}", state.threshold);
    Ok(())
}

fn run_evaluate(
    input: &Path,
    config: &RunConfig,
    use_time_only: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let (mut state, mut loaded) = load_prepared(input, config)?;

    let summary = if use_time_only {
        time_only(&mut state, &mut loaded.table, &loaded.disabled, &loaded.flows)?
    } else {
        values(&mut state, &mut loaded.table, &loaded.disabled, &loaded.flows)?
    };

    let LoadedLinks {
        table,
        flows,
        disabled,
    } = loaded;

    let links = flows
        .iter()
        .enumerate()
        .map(|(link, &flow)| {
            let is_disabled = disabled.get(link).copied().unwrap_or(false);
            LinkReport {
                link: link + 1,
                flow,
                disabled: is_disabled,
                cost: if is_disabled {
                    Some(INFINITE_COST)
                } else {
                    table.current_cost(link)
                },
                derivative: derivative(&table, &disabled, link, flow),
                integral: integral(&table, &disabled, link, flow),
            }
        })
        .collect();

    let variant = table.variant();
    let report = EvaluationReport {
        generated_at: chrono::Utc::now(),
        variant,
        label: variant.label(),
        time_only: use_time_only,
        status: state.status,
        big_real: state.big_real,
        threshold: state.threshold,
        clamped: summary.clamped,
        links,
    };

    let output_path = output.or_else(|| config.output.clone()).unwrap_or_else(|| {
        let timestamp = report.generated_at.format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("linkcost_{}.json", timestamp))
    });

    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&output_path, json)
        .with_context(|| format!("Failed to write report {}", output_path.display()))?;

    println!("✅ Evaluated {} links", summary.evaluated);
    if summary.clamped > 0 {
        println!(
            "⚠️  {} links fell below free-flow time and were clamped",
            summary.clamped
        );
    }
    println!("   Max current cost: {}", state.threshold);
    println!("📄 Report saved to: {}", output_path.display());
    Ok(())
}

fn run_link(input: &Path, config: &RunConfig, link: usize, flow: Option<f64>) -> Result<()> {
    let (state, loaded) = load_prepared(input, config)?;

    let index = link.checked_sub(1).context("Link indices start at 1")?;
    loaded.table.ensure_link(index)?;

    let flow = flow.unwrap_or(loaded.flows[index]);
    let cost = value(&state, &loaded.table, &loaded.disabled, index, flow);

    println!("Link {} at flow {}", link, flow);
    match cost {
        Some(cost) => println!("   Cost:       {}", cost),
        None => println!("   Cost:       (no free-flow time)"),
    }
    println!(
        "   Derivative: {}",
        derivative(&loaded.table, &loaded.disabled, index, flow)
    );
    println!(
        "   Integral:   {}",
        integral(&loaded.table, &loaded.disabled, index, flow)
    );
    Ok(())
}
