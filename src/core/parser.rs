//! PL-006: YAML loading and validation of compile requests and planner config.
//!
//! Validation catches structural problems without compiling:
//! - Duplicate resource, resource type and prototype names
//! - Retry steps with zero attempts
//! - Across axes without a variable name

use super::error::{ConfigError, PlannerError};
use super::plan_id::PlanFactory;
use super::planner::Planner;
use super::resolver::BaseTypeDefaults;
use super::types::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::with::singleton_map_recursive;
use std::collections::HashSet;
use std::path::Path;

/// Planner configuration, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Source defaults for base resource types
    #[serde(default)]
    pub base_resource_type_defaults: BaseTypeDefaults,

    /// The first issued plan id is this plus one
    #[serde(default)]
    pub starting_plan_id: u64,
}

impl PlannerConfig {
    pub fn planner(&self) -> Planner {
        Planner::new(
            PlanFactory::new(self.starting_plan_id),
            self.base_resource_type_defaults.clone(),
        )
    }
}

/// Everything needed to compile one build plan.
///
/// Lists are kept as declared so validation can see duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub step: StepConfig,

    #[serde(default)]
    pub resources: Vec<SchedulerResource>,

    #[serde(default)]
    pub resource_types: Vec<ResourceType>,

    #[serde(default)]
    pub prototypes: Vec<Prototype>,

    #[serde(default)]
    pub inputs: Vec<BuildInput>,
}

impl CompileRequest {
    /// Compile this request with `planner`.
    pub fn compile(&self, planner: &Planner) -> Result<Plan, PlannerError> {
        planner.create(
            &self.step,
            &SchedulerResources::from(self.resources.clone()),
            &VersionedResourceTypes(self.resource_types.clone()),
            &Prototypes::from(self.prototypes.clone()),
            &self.inputs,
        )
    }
}

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a compile request from disk.
pub fn parse_request_file(path: &Path) -> Result<CompileRequest, ConfigError> {
    parse_request(&read(path)?)
}

/// Deserialize YAML where enums are written as single-key maps
/// (`{get: {name: src}}`) rather than `!get` tags.
fn from_yaml<T: DeserializeOwned>(yaml: &str) -> Result<T, ConfigError> {
    Ok(singleton_map_recursive::deserialize(
        serde_yaml_ng::Deserializer::from_str(yaml),
    )?)
}

/// Parse a compile request from a string.
pub fn parse_request(yaml: &str) -> Result<CompileRequest, ConfigError> {
    from_yaml(yaml)
}

/// Parse a single step configuration from a string.
pub fn parse_step(yaml: &str) -> Result<StepConfig, ConfigError> {
    from_yaml(yaml)
}

/// Parse planner configuration from disk.
pub fn parse_config_file(path: &Path) -> Result<PlannerConfig, ConfigError> {
    parse_config(&read(path)?)
}

/// Parse planner configuration from a string.
pub fn parse_config(yaml: &str) -> Result<PlannerConfig, ConfigError> {
    from_yaml(yaml)
}

/// Validate a parsed request. Returns a list of errors (empty = valid).
pub fn validate_request(request: &CompileRequest) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_unique(
        "resource",
        request.resources.iter().map(|r| r.name.as_str()),
        &mut errors,
    );
    check_unique(
        "resource type",
        request.resource_types.iter().map(|t| t.name.as_str()),
        &mut errors,
    );
    check_unique(
        "prototype",
        request.prototypes.iter().map(|p| p.name.as_str()),
        &mut errors,
    );

    validate_step(&request.step, &mut errors);
    errors
}

fn check_unique<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            errors.push(ValidationError {
                message: format!("duplicate {} '{}'", what, name),
            });
        }
    }
}

fn validate_step(step: &StepConfig, errors: &mut Vec<ValidationError>) {
    match step {
        StepConfig::Task(_)
        | StepConfig::Run(_)
        | StepConfig::Get(_)
        | StepConfig::Put(_)
        | StepConfig::SetPipeline(_)
        | StepConfig::LoadVar(_) => {}
        StepConfig::Do(DoStep { steps }) | StepConfig::InParallel(InParallelStep { steps, .. }) => {
            for s in steps {
                validate_step(s, errors);
            }
        }
        StepConfig::Across(across) => {
            for (i, var) in across.vars.iter().enumerate() {
                if var.var.is_empty() {
                    errors.push(ValidationError {
                        message: format!("across var #{} has no name", i + 1),
                    });
                }
            }
            validate_step(&across.step, errors);
        }
        StepConfig::Try(TryStep { step }) | StepConfig::Timeout(TimeoutStep { step, .. }) => {
            validate_step(step, errors);
        }
        StepConfig::Retry(retry) => {
            if retry.attempts == 0 {
                errors.push(ValidationError {
                    message: "retry must have at least one attempt".to_string(),
                });
            }
            validate_step(&retry.step, errors);
        }
        StepConfig::OnSuccess(h)
        | StepConfig::OnFailure(h)
        | StepConfig::OnAbort(h)
        | StepConfig::OnError(h)
        | StepConfig::Ensure(h) => {
            validate_step(&h.step, errors);
            validate_step(&h.hook, errors);
        }
    }
}
