//! PL-004: Build plan compilation. Step configuration in, plan tree out.
//!
//! One `PlanVisitor` per `create` call walks the step tree recursively and
//! returns each compiled node by value. Ids are issued post-order: children
//! before the composite that owns them. The first error aborts the whole
//! compilation; no partial plan is returned.

use super::error::PlannerError;
use super::plan_id::PlanFactory;
use super::resolver::{merge_defaults, BaseTypeDefaults};
use super::types::*;

/// Compiles step configurations into plan trees.
///
/// The id counter lives in the owned [`PlanFactory`] and keeps counting
/// across `create` calls, so ids stay unique between plans compiled by the
/// same planner. Identical ids for identical input need a fresh planner
/// built with the same starting number.
#[derive(Debug, Default)]
pub struct Planner {
    factory: PlanFactory,
    base_defaults: BaseTypeDefaults,
}

impl Planner {
    pub fn new(factory: PlanFactory, base_defaults: BaseTypeDefaults) -> Self {
        Self {
            factory,
            base_defaults,
        }
    }

    /// Compile `step` against the resolved resource, type, prototype and
    /// input tables.
    pub fn create(
        &self,
        step: &StepConfig,
        resources: &SchedulerResources,
        resource_types: &VersionedResourceTypes,
        prototypes: &Prototypes,
        inputs: &[BuildInput],
    ) -> Result<Plan, PlannerError> {
        tracing::debug!(
            step = step.kind(),
            resources = resources.len(),
            resource_types = resource_types.len(),
            inputs = inputs.len(),
            "compiling build plan"
        );

        let resource_types = resource_types.with_source_defaults(&self.base_defaults);
        let visitor = PlanVisitor {
            factory: &self.factory,
            base_defaults: &self.base_defaults,
            resources,
            resource_types: &resource_types,
            prototypes,
            inputs,
        };

        match visitor.visit(step) {
            Ok(plan) => {
                tracing::debug!(plan_id = %plan.id, "compiled build plan");
                Ok(plan)
            }
            Err(e) => {
                tracing::debug!(error = %e, "build plan compilation failed");
                Err(e)
            }
        }
    }
}

struct PlanVisitor<'a> {
    factory: &'a PlanFactory,
    base_defaults: &'a BaseTypeDefaults,

    resources: &'a SchedulerResources,
    resource_types: &'a VersionedResourceTypes,
    prototypes: &'a Prototypes,
    inputs: &'a [BuildInput],
}

impl PlanVisitor<'_> {
    fn visit(&self, step: &StepConfig) -> Result<Plan, PlannerError> {
        match step {
            StepConfig::Task(task) => Ok(self.visit_task(task)),
            StepConfig::Run(run) => self.visit_run(run),
            StepConfig::Get(get) => self.visit_get(get),
            StepConfig::Put(put) => self.visit_put(put),
            StepConfig::Do(do_step) => self.visit_do(do_step),
            StepConfig::InParallel(par) => self.visit_in_parallel(par),
            StepConfig::Across(across) => self.visit_across(across),
            StepConfig::SetPipeline(sp) => Ok(self.visit_set_pipeline(sp)),
            StepConfig::LoadVar(lv) => Ok(self.visit_load_var(lv)),
            StepConfig::Try(t) => {
                let inner = self.visit(&t.step)?;
                Ok(self.factory.new_plan(TryPlan {
                    step: Box::new(inner),
                }))
            }
            StepConfig::Timeout(t) => {
                let inner = self.visit(&t.step)?;
                Ok(self.factory.new_plan(TimeoutPlan {
                    duration: t.duration.clone(),
                    step: Box::new(inner),
                }))
            }
            StepConfig::Retry(retry) => {
                let attempts = (0..retry.attempts)
                    .map(|_| self.visit(&retry.step))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.factory.new_plan(PlanStep::Retry(attempts)))
            }
            StepConfig::OnSuccess(h) => self.visit_hook(h, PlanStep::OnSuccess),
            StepConfig::OnFailure(h) => self.visit_hook(h, PlanStep::OnFailure),
            StepConfig::OnAbort(h) => self.visit_hook(h, PlanStep::OnAbort),
            StepConfig::OnError(h) => self.visit_hook(h, PlanStep::OnError),
            StepConfig::Ensure(h) => self.visit_hook(h, PlanStep::Ensure),
        }
    }

    fn visit_task(&self, step: &TaskStep) -> Plan {
        self.factory.new_plan(TaskPlan {
            name: step.name.clone(),
            privileged: step.privileged,
            limits: step.limits.clone(),
            config: step.config.clone(),
            config_path: step.config_path.clone(),
            resource_types: self.resource_types.clone(),
            vars: step.vars.clone(),
            tags: step.tags.clone(),
            params: step.params.clone(),
            input_mapping: step.input_mapping.clone(),
            output_mapping: step.output_mapping.clone(),
            image_artifact_name: step.image_artifact_name.clone(),
            timeout: step.timeout.clone(),
        })
    }

    fn visit_run(&self, step: &RunStep) -> Result<Plan, PlannerError> {
        let prototype = self
            .prototypes
            .lookup(&step.type_name)
            .ok_or_else(|| PlannerError::UnknownPrototype(step.type_name.clone()))?;

        Ok(self.factory.new_plan(RunPlan {
            message: step.message.clone(),
            type_name: step.type_name.clone(),
            object: merge_defaults(&prototype.defaults, &step.params),
            privileged: step.privileged,
            tags: step.tags.clone(),
            limits: step.limits.clone(),
            timeout: step.timeout.clone(),
        }))
    }

    /// Look up a resource by name and merge its type's source defaults.
    fn resolve_resource(&self, name: &str) -> Result<SchedulerResource, PlannerError> {
        let mut resource = self
            .resources
            .lookup(name)
            .cloned()
            .ok_or_else(|| PlannerError::UnknownResource(name.to_string()))?;
        resource.apply_source_defaults(self.resource_types, self.base_defaults);
        Ok(resource)
    }

    fn visit_get(&self, step: &GetStep) -> Result<Plan, PlannerError> {
        let resource_name = resource_name(step.resource.as_deref(), &step.name);
        let resource = self.resolve_resource(resource_name)?;

        let version = self
            .inputs
            .iter()
            .find(|input| input.name == step.name)
            .and_then(|input| input.version.clone())
            .ok_or_else(|| PlannerError::VersionNotProvided(step.name.clone()))?;

        Ok(self.factory.new_plan_with(|id| GetPlan {
            name: step.name.clone(),
            type_name: resource.type_name.clone(),
            resource: Some(resource_name.to_string()),
            source: resource.source.clone(),
            params: step.params.clone(),
            version: Some(version),
            version_from: None,
            tags: step.tags.clone(),
            timeout: step.timeout.clone(),
            type_image: self
                .resource_types
                .image_for_type(id, &resource.type_name, &step.tags),
        }))
    }

    fn visit_put(&self, step: &PutStep) -> Result<Plan, PlannerError> {
        let resource_name = resource_name(step.resource.as_deref(), &step.name);
        let resource = self.resolve_resource(resource_name)?;

        let put = self.factory.new_plan_with(|id| PutPlan {
            name: step.name.clone(),
            type_name: resource.type_name.clone(),
            resource: resource_name.to_string(),
            source: resource.source.clone(),
            params: step.params.clone(),
            tags: step.tags.clone(),
            inputs: step.inputs.clone(),
            timeout: step.timeout.clone(),
            expose_build_created_by: resource.expose_build_created_by,
            type_image: self
                .resource_types
                .image_for_type(id, &resource.type_name, &step.tags),
        });

        let dependent_get = self.factory.new_plan_with(|id| GetPlan {
            name: step.name.clone(),
            type_name: resource.type_name.clone(),
            resource: Some(resource_name.to_string()),
            source: resource.source.clone(),
            params: step.get_params.clone(),
            version: None,
            version_from: Some(put.id.clone()),
            tags: step.tags.clone(),
            timeout: step.timeout.clone(),
            type_image: self
                .resource_types
                .image_for_type(id, &resource.type_name, &step.tags),
        });

        Ok(self.factory.new_plan(PlanStep::OnSuccess(HookPlan {
            step: Box::new(put),
            next: Box::new(dependent_get),
        })))
    }

    fn visit_do(&self, step: &DoStep) -> Result<Plan, PlannerError> {
        let plans = self.visit_all(&step.steps)?;
        Ok(self.factory.new_plan(PlanStep::Do(plans)))
    }

    fn visit_in_parallel(&self, step: &InParallelStep) -> Result<Plan, PlannerError> {
        let steps = self.visit_all(&step.steps)?;
        Ok(self.factory.new_plan(InParallelPlan {
            steps,
            limit: step.limit,
            fail_fast: step.fail_fast,
        }))
    }

    fn visit_across(&self, step: &AcrossStep) -> Result<Plan, PlannerError> {
        let steps = cartesian_product(&step.vars)
            .into_iter()
            .map(|values| -> Result<VarScopedPlan, PlannerError> {
                Ok(VarScopedPlan {
                    step: self.visit(&step.step)?,
                    values,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.factory.new_plan(AcrossPlan {
            vars: step.vars.clone(),
            steps,
            fail_fast: step.fail_fast,
        }))
    }

    fn visit_set_pipeline(&self, step: &SetPipelineStep) -> Plan {
        self.factory.new_plan(SetPipelinePlan {
            name: step.name.clone(),
            file: step.file.clone(),
            team: step.team.clone(),
            vars: step.vars.clone(),
            var_files: step.var_files.clone(),
            instance_vars: step.instance_vars.clone(),
        })
    }

    fn visit_load_var(&self, step: &LoadVarStep) -> Plan {
        self.factory.new_plan(LoadVarPlan {
            name: step.name.clone(),
            file: step.file.clone(),
            format: step.format.clone(),
            reveal: step.reveal,
        })
    }

    fn visit_hook(
        &self,
        step: &HookStep,
        wrap: fn(HookPlan) -> PlanStep,
    ) -> Result<Plan, PlannerError> {
        let primary = self.visit(&step.step)?;
        let hook = self.visit(&step.hook)?;
        Ok(self.factory.new_plan(wrap(HookPlan {
            step: Box::new(primary),
            next: Box::new(hook),
        })))
    }

    fn visit_all(&self, steps: &[StepConfig]) -> Result<Vec<Plan>, PlannerError> {
        steps.iter().map(|s| self.visit(s)).collect()
    }
}

/// Explicit `resource:` when set and non-empty, else the step name.
fn resource_name<'a>(explicit: Option<&'a str>, step_name: &'a str) -> &'a str {
    explicit.filter(|r| !r.is_empty()).unwrap_or(step_name)
}

/// Every combination of axis values, axis order preserved, last axis
/// varying fastest. No axes yields a single empty combination.
pub fn cartesian_product(vars: &[AcrossVar]) -> Vec<Vec<serde_json::Value>> {
    vars.iter().fold(vec![Vec::new()], |product, var| {
        product
            .iter()
            .flat_map(|combo| {
                var.values.iter().map(move |value| {
                    let mut next = combo.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect()
    })
}
