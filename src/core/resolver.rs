//! PL-003: Resource, resource type and image resolution.
//!
//! Applies source defaults through the custom type chain and builds the
//! check/get sub-plans that fetch a resource type's container image.
//! Image resolution recurses over the type list *without* the type being
//! resolved, so the list shrinks on every level and cyclic type definitions
//! terminate at a base type.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source defaults for base resource types, keyed by type name.
///
/// Owned by the caller and passed to the planner explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseTypeDefaults(pub BTreeMap<String, Source>);

impl BaseTypeDefaults {
    pub fn lookup(&self, type_name: &str) -> Option<&Source> {
        self.0.get(type_name)
    }
}

/// Overlay `values` on `defaults`. Keys present in `values` win.
///
/// Used for both resource sources and prototype params.
pub fn merge_defaults(defaults: &Source, values: &Source) -> Source {
    let mut merged = defaults.clone();
    merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

impl SchedulerResource {
    /// Merge the defaults of this resource's type under its source.
    pub fn apply_source_defaults(
        &mut self,
        resource_types: &VersionedResourceTypes,
        base_defaults: &BaseTypeDefaults,
    ) {
        if let Some(defaults) = resource_types.defaults_for(&self.type_name, base_defaults) {
            self.source = merge_defaults(defaults, &self.source);
        }
    }
}

impl VersionedResourceTypes {
    pub fn lookup(&self, name: &str) -> Option<&ResourceType> {
        self.0.iter().find(|t| t.name == name)
    }

    /// Copy of the list with every type named `name` removed.
    pub fn without(&self, name: &str) -> Self {
        Self(self.0.iter().filter(|t| t.name != name).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Defaults for resources of `type_name`: the custom type's own defaults
    /// when it is declared here, otherwise the base type defaults.
    pub fn defaults_for<'a>(
        &'a self,
        type_name: &str,
        base_defaults: &'a BaseTypeDefaults,
    ) -> Option<&'a Source> {
        match self.lookup(type_name) {
            Some(parent) => Some(&parent.defaults),
            None => base_defaults.lookup(type_name),
        }
    }

    /// Apply each type's parent defaults to the type's own source.
    ///
    /// A type never takes defaults from itself: a custom `registry-image`
    /// overriding the base `registry-image` receives the base defaults.
    pub fn with_source_defaults(&self, base_defaults: &BaseTypeDefaults) -> Self {
        let types = self
            .0
            .iter()
            .map(|t| {
                let mut t = t.clone();
                let parents = self.without(&t.name);
                if let Some(defaults) = parents.defaults_for(&t.type_name, base_defaults) {
                    t.source = merge_defaults(defaults, &t.source);
                }
                t
            })
            .collect();
        Self(types)
    }

    /// Resolve the image needed to run resources of `type_name`.
    ///
    /// Base types resolve to just their name. Custom types yield a get (and,
    /// when the image version is not pinned, a preceding check) with ids
    /// derived from `plan_id`.
    pub fn image_for_type(&self, plan_id: &PlanId, type_name: &str, step_tags: &Tags) -> TypeImage {
        let Some(parent) = self.lookup(type_name) else {
            return TypeImage {
                base_type: type_name.to_string(),
                ..Default::default()
            };
        };

        tracing::trace!(
            plan_id = %plan_id,
            type_name,
            needs_check = parent.version.is_none(),
            "resolving custom type image"
        );

        let image = ImageResource::from(parent);
        let remaining = self.without(&parent.name);
        let plans = fetch_image_plan(plan_id, &image, &remaining, step_tags);

        TypeImage {
            base_type: plans.base_type,
            check_plan: plans.check_plan.map(Box::new),
            get_plan: Some(Box::new(plans.get_plan)),
            privileged: parent.privileged,
        }
    }
}

/// A container image fetched through a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageResource {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub version: Option<Version>,

    #[serde(default)]
    pub tags: Tags,
}

impl From<&ResourceType> for ImageResource {
    fn from(t: &ResourceType) -> Self {
        Self {
            name: t.name.clone(),
            type_name: t.type_name.clone(),
            source: t.source.clone(),
            params: t.params.clone(),
            version: t.version.clone(),
            tags: t.tags.clone(),
        }
    }
}

/// Sub-plans that fetch an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlans {
    pub get_plan: Plan,

    /// Present only when the image version is not pinned
    pub check_plan: Option<Plan>,

    pub base_type: String,
}

/// Build the get (and optional check) for `image`, attached to `plan_id`.
pub fn fetch_image_plan(
    plan_id: &PlanId,
    image: &ImageResource,
    resource_types: &VersionedResourceTypes,
    step_tags: &Tags,
) -> ImagePlans {
    let tags = if image.tags.is_empty() {
        step_tags.clone()
    } else {
        image.tags.clone()
    };

    let get_id = plan_id.image_get();
    let get_image = resource_types.image_for_type(&get_id, &image.type_name, &tags);
    let base_type = get_image.base_type.clone();

    let mut get = GetPlan {
        name: image.name.clone(),
        type_name: image.type_name.clone(),
        source: image.source.clone(),
        params: image.params.clone(),
        tags: tags.clone(),
        type_image: get_image,
        ..Default::default()
    };

    let check_plan = match &image.version {
        Some(version) => {
            get.version = Some(version.clone());
            None
        }
        None => {
            let check_id = plan_id.image_check();
            let check = CheckPlan {
                name: image.name.clone(),
                type_name: image.type_name.clone(),
                source: image.source.clone(),
                type_image: resource_types.image_for_type(&check_id, &image.type_name, &tags),
                tags,
            };
            get.version_from = Some(check_id.clone());
            Some(Plan {
                id: check_id,
                step: PlanStep::Check(check),
            })
        }
    };

    ImagePlans {
        get_plan: Plan {
            id: get_id,
            step: PlanStep::Get(get),
        },
        check_plan,
        base_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(pairs: &[(&str, &str)]) -> Source {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    fn custom_type(name: &str, type_name: &str) -> ResourceType {
        ResourceType {
            name: name.to_string(),
            type_name: type_name.to_string(),
            source: source(&[("repository", name)]),
            ..Default::default()
        }
    }

    fn pinned(mut t: ResourceType) -> ResourceType {
        t.version = Some(Version::from([("digest".to_string(), "sha256:1".to_string())]));
        t
    }

    #[test]
    fn test_pl003_merge_defaults_precedence() {
        let defaults = source(&[("a", "default"), ("b", "default")]);
        let own = source(&[("b", "own"), ("c", "own")]);
        let merged = merge_defaults(&defaults, &own);
        assert_eq!(merged, source(&[("a", "default"), ("b", "own"), ("c", "own")]));
    }

    #[test]
    fn test_pl003_base_type_image() {
        let types = VersionedResourceTypes::default();
        let image = types.image_for_type(&PlanId::new("1"), "git", &vec![]);
        assert_eq!(image.base_type, "git");
        assert!(image.get_plan.is_none());
        assert!(image.check_plan.is_none());
        assert!(!image.privileged);
    }

    #[test]
    fn test_pl003_custom_type_unpinned_needs_check() {
        let mut t = custom_type("slack", "registry-image");
        t.privileged = true;
        let types = VersionedResourceTypes(vec![t]);
        let image = types.image_for_type(&PlanId::new("4"), "slack", &vec!["linux".to_string()]);

        assert_eq!(image.base_type, "registry-image");
        assert!(image.privileged);

        let check = image.check_plan.as_ref().unwrap();
        assert_eq!(check.id.as_str(), "4/image-check");
        let check_plan = check.as_check().unwrap();
        assert_eq!(check_plan.type_name, "registry-image");
        assert_eq!(check_plan.tags, vec!["linux".to_string()]);

        let get = image.get_plan.as_ref().unwrap();
        assert_eq!(get.id.as_str(), "4/image-get");
        let get_plan = get.as_get().unwrap();
        assert_eq!(get_plan.name, "slack");
        assert_eq!(get_plan.version_from, Some(PlanId::new("4/image-check")));
        assert!(get_plan.version.is_none());
        assert_eq!(get_plan.source, source(&[("repository", "slack")]));
    }

    #[test]
    fn test_pl003_custom_type_pinned_skips_check() {
        let types = VersionedResourceTypes(vec![pinned(custom_type("slack", "registry-image"))]);
        let image = types.image_for_type(&PlanId::new("4"), "slack", &vec![]);
        assert!(image.check_plan.is_none());
        let get = image.get_plan.unwrap();
        let get_plan = get.as_get().unwrap();
        assert_eq!(
            get_plan.version.as_ref().unwrap()["digest"],
            "sha256:1".to_string()
        );
        assert!(get_plan.version_from.is_none());
    }

    #[test]
    fn test_pl003_image_tags_override_step_tags() {
        let mut t = pinned(custom_type("slack", "registry-image"));
        t.tags = vec!["gpu".to_string()];
        let types = VersionedResourceTypes(vec![t]);
        let image = types.image_for_type(&PlanId::new("1"), "slack", &vec!["linux".to_string()]);
        let get = image.get_plan.unwrap();
        assert_eq!(get.as_get().unwrap().tags, vec!["gpu".to_string()]);
    }

    #[test]
    fn test_pl003_nested_custom_chain() {
        // outer -> inner -> registry-image
        let types = VersionedResourceTypes(vec![
            custom_type("outer", "inner"),
            pinned(custom_type("inner", "registry-image")),
        ]);
        let image = types.image_for_type(&PlanId::new("7"), "outer", &vec![]);
        assert_eq!(image.base_type, "registry-image");

        let outer_check = image.check_plan.as_ref().unwrap();
        let outer_get = image.get_plan.as_ref().unwrap();
        let nested = &outer_get.as_get().unwrap().type_image;
        assert_eq!(nested.base_type, "registry-image");
        let inner_get = nested.get_plan.as_ref().unwrap();
        assert_eq!(inner_get.id.as_str(), "7/image-get/image-get");
        assert_eq!(inner_get.as_get().unwrap().name, "inner");
        assert!(nested.check_plan.is_none());

        let check_nested = &outer_check.as_check().unwrap().type_image;
        assert_eq!(
            check_nested.get_plan.as_ref().unwrap().id.as_str(),
            "7/image-check/image-get"
        );
    }

    #[test]
    fn test_pl003_self_named_override_resolves_to_base() {
        let types = VersionedResourceTypes(vec![pinned(custom_type(
            "registry-image",
            "registry-image",
        ))]);
        let image = types.image_for_type(&PlanId::new("1"), "registry-image", &vec![]);
        assert_eq!(image.base_type, "registry-image");
        let get = image.get_plan.unwrap();
        let nested = &get.as_get().unwrap().type_image;
        assert!(nested.get_plan.is_none());
    }

    #[test]
    fn test_pl003_cyclic_types_terminate() {
        let types = VersionedResourceTypes(vec![
            pinned(custom_type("a", "b")),
            pinned(custom_type("b", "a")),
        ]);
        let image = types.image_for_type(&PlanId::new("1"), "a", &vec![]);
        // a -> b -> (a removed) base "a"
        assert_eq!(image.base_type, "a");
        let depth = image.get_plan.unwrap().ids().len();
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_pl003_apply_source_defaults_custom() {
        let mut t = custom_type("slack", "registry-image");
        t.defaults = source(&[("channel", "#builds"), ("url", "default")]);
        let types = VersionedResourceTypes(vec![t]);
        let mut resource = SchedulerResource {
            name: "notify".to_string(),
            type_name: "slack".to_string(),
            source: source(&[("url", "https://hooks")]),
            tags: vec![],
            expose_build_created_by: false,
        };
        resource.apply_source_defaults(&types, &BaseTypeDefaults::default());
        assert_eq!(
            resource.source,
            source(&[("channel", "#builds"), ("url", "https://hooks")])
        );
    }

    #[test]
    fn test_pl003_apply_source_defaults_base() {
        let base = BaseTypeDefaults(BTreeMap::from([(
            "s3".to_string(),
            source(&[("region", "us-east-1")]),
        )]));
        let mut resource = SchedulerResource {
            name: "bucket".to_string(),
            type_name: "s3".to_string(),
            source: source(&[("bucket", "artifacts")]),
            tags: vec![],
            expose_build_created_by: false,
        };
        resource.apply_source_defaults(&VersionedResourceTypes::default(), &base);
        assert_eq!(
            resource.source,
            source(&[("bucket", "artifacts"), ("region", "us-east-1")])
        );
    }

    #[test]
    fn test_pl003_custom_type_shadows_base_defaults() {
        let base = BaseTypeDefaults(BTreeMap::from([(
            "s3".to_string(),
            source(&[("region", "us-east-1")]),
        )]));
        let types = VersionedResourceTypes(vec![custom_type("s3", "registry-image")]);
        let mut resource = SchedulerResource {
            name: "bucket".to_string(),
            type_name: "s3".to_string(),
            source: source(&[("bucket", "artifacts")]),
            tags: vec![],
            expose_build_created_by: false,
        };
        resource.apply_source_defaults(&types, &base);
        assert_eq!(resource.source, source(&[("bucket", "artifacts")]));
    }

    #[test]
    fn test_pl003_type_sources_receive_parent_defaults() {
        let base = BaseTypeDefaults(BTreeMap::from([(
            "s3".to_string(),
            source(&[("default-s3-key", "some-value")]),
        )]));
        let mut parent = custom_type("some-type", "registry-image");
        parent.defaults = source(&[("some-default-k1", "some-default-v1")]);
        let types = VersionedResourceTypes(vec![
            parent,
            custom_type("some-other-type", "some-type"),
            custom_type("some-type-with-params", "s3"),
        ]);

        let resolved = types.with_source_defaults(&base);
        assert_eq!(
            resolved.lookup("some-type").unwrap().source,
            source(&[("repository", "some-type")])
        );
        assert_eq!(
            resolved.lookup("some-other-type").unwrap().source,
            source(&[
                ("repository", "some-other-type"),
                ("some-default-k1", "some-default-v1")
            ])
        );
        assert_eq!(
            resolved.lookup("some-type-with-params").unwrap().source,
            source(&[
                ("default-s3-key", "some-value"),
                ("repository", "some-type-with-params")
            ])
        );
    }

    #[test]
    fn test_pl003_without() {
        let types = VersionedResourceTypes(vec![
            custom_type("a", "registry-image"),
            custom_type("b", "registry-image"),
        ]);
        let rest = types.without("a");
        assert_eq!(rest.len(), 1);
        assert!(rest.lookup("a").is_none());
        assert!(rest.lookup("b").is_some());
    }
}
