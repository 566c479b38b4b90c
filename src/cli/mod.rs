//! PL-010: CLI subcommands for plan and validate.

use crate::core::error::ConfigError;
use crate::core::parser::{self, CompileRequest, PlannerConfig};
use crate::core::{hasher, types::Plan};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a step into a build plan and print it as JSON
    Plan {
        /// Path to the compile request
        #[arg(short, long, default_value = "request.yaml")]
        file: PathBuf,

        /// Path to planner configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the starting plan id
        #[arg(long)]
        start: Option<u64>,
    },

    /// Check a compile request for structural errors without compiling
    Validate {
        /// Path to the compile request
        #[arg(short, long, default_value = "request.yaml")]
        file: PathBuf,

        /// Path to planner configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Plan {
            file,
            config,
            start,
        } => cmd_plan(&file, config.as_deref(), start),
        Commands::Validate { file, config } => cmd_validate(&file, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<PlannerConfig, String> {
    match path {
        Some(path) => parser::parse_config_file(path).map_err(|e| e.to_string()),
        None => Ok(PlannerConfig::default()),
    }
}

/// Parse and validate a compile request, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<CompileRequest, ConfigError> {
    let request = parser::parse_request_file(file)?;
    let errors = parser::validate_request(&request);
    if errors.is_empty() {
        Ok(request)
    } else {
        Err(ConfigError::Invalid(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

fn compile(file: &Path, config: Option<&Path>, start: Option<u64>) -> Result<Plan, String> {
    let mut config = load_config(config)?;
    if let Some(start) = start {
        config.starting_plan_id = start;
    }
    let request = parse_and_validate(file).map_err(|e| e.to_string())?;
    request
        .compile(&config.planner())
        .map_err(|e| e.to_string())
}

fn render(plan: &Plan) -> Result<String, String> {
    serde_json::to_string_pretty(plan).map_err(|e| e.to_string())
}

fn cmd_plan(file: &Path, config: Option<&Path>, start: Option<u64>) -> Result<(), String> {
    let plan = compile(file, config, start)?;
    let json = render(&plan)?;
    let fingerprint = hasher::hash_plan(&plan).map_err(|e| e.to_string())?;

    println!("{}", json);
    eprintln!("plan {} ({} nodes)", fingerprint, plan.ids().len());
    Ok(())
}

fn cmd_validate(file: &Path, config: Option<&Path>) -> Result<(), String> {
    let config = load_config(config)?;
    let request = parser::parse_request_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_request(&request);

    if errors.is_empty() {
        // Trial compile catches unresolved names and missing versions.
        request
            .compile(&config.planner())
            .map_err(|e| e.to_string())?;
        println!(
            "OK: {} step ({} resources, {} resource types, {} prototypes)",
            request.step.kind(),
            request.resources.len(),
            request.resource_types.len(),
            request.prototypes.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}
