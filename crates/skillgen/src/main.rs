//! skillgen - dialog skill generator
//!
//! Builds the generated dialog nodes, intents and entities of a chatbot skill
//! from a question sheet and merges them into the prior skill export.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod render;

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use skill_core::{pipeline, Config};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Generate dialog skills from question sheets.
#[derive(Parser)]
#[command(name = "skillgen")]
#[command(about = "Generate chatbot dialog skills from question sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new skill from the sheet and the prior skill export
    Generate {
        /// Config file path (overrides .skillgen/config)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Question sheet (TSV)
        #[arg(long)]
        sheet: Option<PathBuf>,

        /// Prior skill export (JSON)
        #[arg(long)]
        skill: Option<PathBuf>,

        /// Intent confidence required by answer nodes (0..=1)
        #[arg(long, value_parser = parse_confidence)]
        confidence: Option<f64>,

        /// Maximum number of intents (0 = unlimited)
        #[arg(long)]
        intent_limit: Option<usize>,

        /// Seed for reproducible node ids
        #[arg(long, env = "SKILLGEN_ID_SEED")]
        id_seed: Option<String>,
    },

    /// Run the structural checks over a skill export
    Check {
        /// Skill export (JSON)
        skill: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_confidence(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("invalid confidence: {s}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("confidence must be between 0 and 1, got {s}"))
    }
}

fn main() {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Generate {
            config,
            sheet,
            skill,
            confidence,
            intent_limit,
            id_seed,
        } => run_generate(config, sheet, skill, confidence, intent_limit, id_seed),
        Command::Check { skill, json } => run_check(&skill, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run_generate(
    config_path: Option<PathBuf>,
    sheet: Option<PathBuf>,
    skill: Option<PathBuf>,
    confidence: Option<f64>,
    intent_limit: Option<usize>,
    id_seed: Option<String>,
) -> eyre::Result<()> {
    let root = std::env::current_dir().wrap_err("failed to read working directory")?;
    let mut config: Config =
        pipeline::load_config(config_path.as_deref(), &root).wrap_err("failed to load config")?;

    // CLI flags take precedence over config files.
    if let Some(sheet) = sheet {
        config.sheet_path = root.join(sheet);
    }
    if let Some(skill) = skill {
        config.skill_path = root.join(skill);
    }
    if let Some(confidence) = confidence {
        config.confidence = confidence;
    }
    if let Some(limit) = intent_limit {
        config.intent_limit = limit;
    }
    if id_seed.is_some() {
        config.id_seed = id_seed;
    }
    debug!(?config, "configuration resolved");

    let generated = pipeline::generate(&config).wrap_err_with(|| {
        format!(
            "failed to generate skill from {}",
            config.skill_path.display()
        )
    })?;
    render::print_generated(&generated);
    Ok(())
}

fn run_check(skill: &std::path::Path, json: bool) -> eyre::Result<()> {
    let report = pipeline::check(skill)
        .wrap_err_with(|| format!("failed to check {}", skill.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_check_report(&report);
    }
    if !report.passed() {
        eyre::bail!("{} structural error(s)", report.errors().count());
    }
    Ok(())
}
