//! PL-001: Step configuration and plan tree types.
//!
//! `StepConfig` is the declarative input tree, `Plan` the resolved output tree.
//! Both are closed sum types; every consumer matches over them exhaustively.
//! All types derive Serialize/Deserialize so a compiled plan can be persisted
//! or sent over the wire keyed by its `PlanId`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Shared value types
// ============================================================================

/// Resource configuration handed to the resource implementation.
pub type Source = BTreeMap<String, serde_json::Value>;

/// Free-form step parameters.
pub type Params = BTreeMap<String, serde_json::Value>;

/// A concrete resource version.
pub type Version = BTreeMap<String, String>;

/// Worker tags a step is pinned to.
pub type Tags = Vec<String>;

/// Container resource limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

// ============================================================================
// Plan identifiers
// ============================================================================

const IMAGE_GET_SUFFIX: &str = "/image-get";
const IMAGE_CHECK_SUFFIX: &str = "/image-check";

/// Identifier of a single plan node, unique within one compiled tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the image get attached to this node.
    pub fn image_get(&self) -> PlanId {
        Self(format!("{}{}", self.0, IMAGE_GET_SUFFIX))
    }

    /// Id of the image check attached to this node.
    pub fn image_check(&self) -> PlanId {
        Self(format!("{}{}", self.0, IMAGE_CHECK_SUFFIX))
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Resolver tables (consumed read-only by the planner)
// ============================================================================

/// A pipeline resource as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerResource {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub source: Source,

    /// Informational; plans are tagged from the step, not the resource
    #[serde(default)]
    pub tags: Tags,

    /// Expose the identity of the build creator to the resource
    #[serde(default)]
    pub expose_build_created_by: bool,
}

/// Resources keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SchedulerResource>", into = "Vec<SchedulerResource>")]
pub struct SchedulerResources(IndexMap<String, SchedulerResource>);

impl From<Vec<SchedulerResource>> for SchedulerResources {
    fn from(resources: Vec<SchedulerResource>) -> Self {
        Self(resources.into_iter().map(|r| (r.name.clone(), r)).collect())
    }
}

impl From<SchedulerResources> for Vec<SchedulerResource> {
    fn from(resources: SchedulerResources) -> Self {
        resources.0.into_values().collect()
    }
}

impl SchedulerResources {
    pub fn lookup(&self, name: &str) -> Option<&SchedulerResource> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A custom resource type declared by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,

    /// Type used to fetch this type's image (base or another custom type)
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub source: Source,

    /// Source defaults applied to every resource of this type
    #[serde(default, skip_serializing_if = "Source::is_empty")]
    pub defaults: Source,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(default)]
    pub privileged: bool,

    /// Pinned image version; `None` means a check is required first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

/// Ordered list of custom resource types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionedResourceTypes(pub Vec<ResourceType>);

/// A prototype invoked by `run` steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,

    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(default)]
    pub source: Source,

    /// Default parameters merged under the step's own params
    #[serde(default)]
    pub defaults: Params,
}

/// Prototypes keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Prototype>", into = "Vec<Prototype>")]
pub struct Prototypes(IndexMap<String, Prototype>);

impl From<Vec<Prototype>> for Prototypes {
    fn from(prototypes: Vec<Prototype>) -> Self {
        Self(prototypes.into_iter().map(|p| (p.name.clone(), p)).collect())
    }
}

impl From<Prototypes> for Vec<Prototype> {
    fn from(prototypes: Prototypes) -> Self {
        prototypes.0.into_values().collect()
    }
}

impl Prototypes {
    pub fn lookup(&self, name: &str) -> Option<&Prototype> {
        self.0.get(name)
    }
}

/// A version chosen for a get step by a prior scheduling decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInput {
    /// Step name the version is bound to
    pub name: String,

    #[serde(default)]
    pub version: Option<Version>,
}

// ============================================================================
// Step configuration
// ============================================================================

/// One node of the declarative step tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepConfig {
    Task(TaskStep),
    Run(RunStep),
    Get(GetStep),
    Put(PutStep),
    Do(DoStep),
    InParallel(InParallelStep),
    Across(AcrossStep),
    SetPipeline(SetPipelineStep),
    LoadVar(LoadVarStep),
    Try(TryStep),
    Timeout(TimeoutStep),
    Retry(RetryStep),
    OnSuccess(HookStep),
    OnFailure(HookStep),
    OnAbort(HookStep),
    OnError(HookStep),
    Ensure(HookStep),
}

impl StepConfig {
    /// Step kind as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Run(_) => "run",
            Self::Get(_) => "get",
            Self::Put(_) => "put",
            Self::Do(_) => "do",
            Self::InParallel(_) => "in_parallel",
            Self::Across(_) => "across",
            Self::SetPipeline(_) => "set_pipeline",
            Self::LoadVar(_) => "load_var",
            Self::Try(_) => "try",
            Self::Timeout(_) => "timeout",
            Self::Retry(_) => "retry",
            Self::OnSuccess(_) => "on_success",
            Self::OnFailure(_) => "on_failure",
            Self::OnAbort(_) => "on_abort",
            Self::OnError(_) => "on_error",
            Self::Ensure(_) => "ensure",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub name: String,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default)]
    pub limits: Option<ContainerLimits>,

    /// Inline task config (opaque to the planner)
    #[serde(default)]
    pub config: Option<serde_json::Value>,

    #[serde(default)]
    pub config_path: Option<String>,

    #[serde(default)]
    pub vars: Params,

    #[serde(default)]
    pub tags: Tags,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub input_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub output_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub image_artifact_name: Option<String>,

    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStep {
    pub message: String,

    /// Prototype name
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default)]
    pub tags: Tags,

    #[serde(default)]
    pub limits: Option<ContainerLimits>,

    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetStep {
    pub name: String,

    /// Resource to fetch; defaults to the step name
    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub tags: Tags,

    #[serde(default)]
    pub timeout: Option<String>,
}

/// Artifacts a put step makes available to the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PutInputs {
    /// `all` or `detect`
    Strategy(String),
    Specified(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutStep {
    pub name: String,

    /// Resource to push to; defaults to the step name
    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub params: Params,

    /// Params for the implicit get that follows a successful put
    #[serde(default)]
    pub get_params: Params,

    #[serde(default)]
    pub inputs: Option<PutInputs>,

    #[serde(default)]
    pub tags: Tags,

    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoStep {
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InParallelStep {
    pub steps: Vec<StepConfig>,

    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub fail_fast: bool,
}

/// One axis of an across step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcrossVar {
    pub var: String,

    #[serde(default)]
    pub values: Vec<serde_json::Value>,

    /// Concurrent instances along this axis; `None` means all at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrossStep {
    pub vars: Vec<AcrossVar>,

    pub step: Box<StepConfig>,

    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetPipelineStep {
    pub name: String,

    pub file: String,

    #[serde(default)]
    pub team: Option<String>,

    #[serde(default)]
    pub vars: Params,

    #[serde(default)]
    pub var_files: Vec<String>,

    #[serde(default)]
    pub instance_vars: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadVarStep {
    pub name: String,

    pub file: String,

    /// `json`, `yaml`, `trim` or `raw`; detected from the file name when absent
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub reveal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStep {
    pub step: Box<StepConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutStep {
    pub step: Box<StepConfig>,

    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryStep {
    pub step: Box<StepConfig>,

    pub attempts: usize,
}

/// Primary step plus a hook; shared by on_success/on_failure/on_abort/on_error/ensure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookStep {
    pub step: Box<StepConfig>,

    pub hook: Box<StepConfig>,
}

// ============================================================================
// Plan tree
// ============================================================================

/// A resolved plan node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,

    #[serde(flatten)]
    pub step: PlanStep,
}

/// Plan node payload, one variant per step kind plus `check` for image resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    Task(TaskPlan),
    Run(RunPlan),
    Get(GetPlan),
    Put(PutPlan),
    Check(CheckPlan),
    Do(Vec<Plan>),
    InParallel(InParallelPlan),
    Across(AcrossPlan),
    SetPipeline(SetPipelinePlan),
    LoadVar(LoadVarPlan),
    Try(TryPlan),
    Timeout(TimeoutPlan),
    Retry(Vec<Plan>),
    OnSuccess(HookPlan),
    OnFailure(HookPlan),
    OnAbort(HookPlan),
    OnError(HookPlan),
    Ensure(HookPlan),
}

macro_rules! impl_into_plan_step {
    ($($plan:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$plan> for PlanStep {
                fn from(plan: $plan) -> Self {
                    PlanStep::$variant(plan)
                }
            }
        )*
    };
}

impl_into_plan_step! {
    TaskPlan => Task,
    RunPlan => Run,
    GetPlan => Get,
    PutPlan => Put,
    CheckPlan => Check,
    InParallelPlan => InParallel,
    AcrossPlan => Across,
    SetPipelinePlan => SetPipeline,
    LoadVarPlan => LoadVar,
    TryPlan => Try,
    TimeoutPlan => Timeout,
}

impl PlanStep {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Run(_) => "run",
            Self::Get(_) => "get",
            Self::Put(_) => "put",
            Self::Check(_) => "check",
            Self::Do(_) => "do",
            Self::InParallel(_) => "in_parallel",
            Self::Across(_) => "across",
            Self::SetPipeline(_) => "set_pipeline",
            Self::LoadVar(_) => "load_var",
            Self::Try(_) => "try",
            Self::Timeout(_) => "timeout",
            Self::Retry(_) => "retry",
            Self::OnSuccess(_) => "on_success",
            Self::OnFailure(_) => "on_failure",
            Self::OnAbort(_) => "on_abort",
            Self::OnError(_) => "on_error",
            Self::Ensure(_) => "ensure",
        }
    }
}

impl Plan {
    pub fn as_get(&self) -> Option<&GetPlan> {
        match &self.step {
            PlanStep::Get(get) => Some(get),
            _ => None,
        }
    }

    pub fn as_put(&self) -> Option<&PutPlan> {
        match &self.step {
            PlanStep::Put(put) => Some(put),
            _ => None,
        }
    }

    pub fn as_task(&self) -> Option<&TaskPlan> {
        match &self.step {
            PlanStep::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_check(&self) -> Option<&CheckPlan> {
        match &self.step {
            PlanStep::Check(check) => Some(check),
            _ => None,
        }
    }

    /// Direct children, including image sub-plans, in declaration order.
    pub fn children(&self) -> Vec<&Plan> {
        match &self.step {
            PlanStep::Get(get) => get.type_image.sub_plans(),
            PlanStep::Put(put) => put.type_image.sub_plans(),
            PlanStep::Check(check) => check.type_image.sub_plans(),
            PlanStep::Task(_)
            | PlanStep::Run(_)
            | PlanStep::SetPipeline(_)
            | PlanStep::LoadVar(_) => Vec::new(),
            PlanStep::Do(plans) | PlanStep::Retry(plans) => plans.iter().collect(),
            PlanStep::InParallel(par) => par.steps.iter().collect(),
            PlanStep::Across(across) => across.steps.iter().map(|s| &s.step).collect(),
            PlanStep::Try(t) => vec![t.step.as_ref()],
            PlanStep::Timeout(t) => vec![t.step.as_ref()],
            PlanStep::OnSuccess(h)
            | PlanStep::OnFailure(h)
            | PlanStep::OnAbort(h)
            | PlanStep::OnError(h)
            | PlanStep::Ensure(h) => vec![h.step.as_ref(), h.next.as_ref()],
        }
    }

    /// Visit this node and every descendant, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Plan)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Every id in the tree, in walk order.
    pub fn ids(&self) -> Vec<&PlanId> {
        let mut ids = Vec::new();
        self.walk(&mut |plan| ids.push(&plan.id));
        ids
    }
}

/// Image resolution attached to a node whose resource type needs a container image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeImage {
    /// Base type at the bottom of the custom type chain
    pub base_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_plan: Option<Box<Plan>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_plan: Option<Box<Plan>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
}

impl TypeImage {
    /// Check (if any) then get.
    pub fn sub_plans(&self) -> Vec<&Plan> {
        self.check_plan
            .iter()
            .chain(self.get_plan.iter())
            .map(|p| p.as_ref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub name: String,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ContainerLimits>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,

    /// Custom types available to the task for image resolution at run time
    #[serde(default)]
    pub resource_types: VersionedResourceTypes,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub vars: Params,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_mapping: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_mapping: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_artifact_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub message: String,

    #[serde(rename = "type")]
    pub type_name: String,

    /// Prototype defaults merged with the step params
    pub object: Params,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ContainerLimits>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetPlan {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    pub source: Source,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    /// Take the version produced by this plan at run time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_from: Option<PlanId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(rename = "image")]
    pub type_image: TypeImage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutPlan {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    pub resource: String,

    pub source: Source,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<PutInputs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(default)]
    pub expose_build_created_by: bool,

    #[serde(rename = "image")]
    pub type_image: TypeImage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckPlan {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    pub source: Source,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,

    #[serde(rename = "image")]
    pub type_image: TypeImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InParallelPlan {
    pub steps: Vec<Plan>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub fail_fast: bool,
}

/// One compiled instance of an across step with the values that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarScopedPlan {
    pub step: Plan,

    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrossPlan {
    pub vars: Vec<AcrossVar>,

    pub steps: Vec<VarScopedPlan>,

    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetPipelinePlan {
    pub name: String,

    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub vars: Params,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub var_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub instance_vars: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadVarPlan {
    pub name: String,

    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default)]
    pub reveal: bool,
}

/// Failure of the inner step is swallowed at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryPlan {
    pub step: Box<Plan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutPlan {
    pub duration: String,

    pub step: Box<Plan>,
}

/// Primary plan and the hook run after it; the variant decides when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookPlan {
    pub step: Box<Plan>,

    pub next: Box<Plan>,
}

// ============================================================================
// Tests
// ============================================================================
