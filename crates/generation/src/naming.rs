//! Parameter naming: the shortest names that stay unique across the scanned
//! resources.
//!
//! Naming is decided in two steps. [`NamingPolicy`] is computed once over every
//! resource and says whether the kind and the resource name are needed to tell
//! resources apart. [`ResourceNamingPolicy`] is computed per resource and says
//! whether the field path (for example the container name) is needed to tell
//! that resource's parameters apart.

use knob_core::ObjectReference;
use knob_resmap::FieldPath;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resource::ApplicationResource;

const SEPARATOR: &str = "_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamingPolicy {
    pub needs_kind: bool,
    pub needs_name: bool,
}

impl NamingPolicy {
    pub fn compute(resources: &[ApplicationResource]) -> Self {
        let mut names: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
        for r in resources {
            names.entry(r.target_ref.kind.as_str()).or_default().insert(r.target_ref.name.as_str());
        }
        Self { needs_kind: names.len() > 1, needs_name: names.values().any(|n| n.len() > 1) }
    }

    /// Prefix segments for parameters of `target`.
    pub fn prefix(&self, target: &ObjectReference) -> Vec<String> {
        let mut parts = Vec::new();
        if self.needs_kind {
            parts.push(target.kind.to_lowercase());
        }
        if self.needs_name {
            parts.extend(target.name.split('-').map(str::to_string));
        }
        parts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceNamingPolicy {
    pub needs_path: bool,
}

impl ResourceNamingPolicy {
    pub fn for_resource(resource: &ApplicationResource) -> Self { Self { needs_path: resource.params.len() > 1 } }
}

/// Names the parameters of one resource.
#[derive(Debug, Clone, Copy)]
pub struct ParameterNamer<'a> {
    pub policy: NamingPolicy,
    pub resource_policy: ResourceNamingPolicy,
    pub target: &'a ObjectReference,
}

impl<'a> ParameterNamer<'a> {
    pub fn new(policy: NamingPolicy, resource: &'a ApplicationResource) -> Self {
        Self { policy, resource_policy: ResourceNamingPolicy::for_resource(resource), target: &resource.target_ref }
    }

    pub fn name(&self, path: &FieldPath, leaf: &str) -> String {
        let mut parts = self.policy.prefix(self.target);
        if self.resource_policy.needs_path {
            // TODO: split list values on "-" the same way resource names are
            parts.extend(path.list_values().map(str::to_string));
        }
        parts.push(leaf.to_string());
        parts.join(SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ParameterNode, ReplicasNode};
    use knob_resmap::PathSegment;

    fn resource(kind: &str, name: &str, containers: &[&str]) -> ApplicationResource {
        let base = FieldPath::parse("/spec/template/spec/containers").unwrap();
        let params = containers
            .iter()
            .map(|c| {
                let field_path = base.child(PathSegment::matching("name", *c)).child(PathSegment::field("resources"));
                ParameterNode::Replicas(ReplicasNode { field_path, replicas: 1 })
            })
            .collect();
        ApplicationResource { target_ref: ObjectReference::new("apps/v1", kind, name, "default"), params }
    }

    fn names(resources: &[ApplicationResource], leaf: &str) -> Vec<String> {
        let policy = NamingPolicy::compute(resources);
        resources
            .iter()
            .flat_map(|r| {
                let namer = ParameterNamer::new(policy, r);
                r.params.iter().map(move |p| namer.name(p.field_path(), leaf)).collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn single_parameter_is_bare_leaf() {
        assert_eq!(names(&[resource("Deployment", "web", &["app"])], "cpu"), vec!["cpu"]);
    }

    #[test]
    fn disambiguation_levels() {
        let same_kind = [resource("Deployment", "web-front", &["app"]), resource("Deployment", "api", &["app"])];
        assert_eq!(names(&same_kind, "cpu"), vec!["web_front_cpu", "api_cpu"]);

        let double_dash = [resource("Deployment", "a--b", &["x"]), resource("Deployment", "a-b", &["x"])];
        assert_eq!(names(&double_dash, "replicas"), vec!["a__b_replicas", "a_b_replicas"]);

        let two_kinds = [resource("Deployment", "web", &["app"]), resource("StatefulSet", "db", &["pg"])];
        assert_eq!(names(&two_kinds, "cpu"), vec!["deployment_cpu", "statefulset_cpu"]);

        let containers = [resource("Deployment", "web", &["app", "envoy"])];
        assert_eq!(names(&containers, "cpu"), vec!["app_cpu", "envoy_cpu"]);
    }

    #[test]
    fn names_unique_across_combinations() {
        let sets: Vec<Vec<ApplicationResource>> = vec![
            vec![resource("Deployment", "a", &["x"])],
            vec![resource("Deployment", "a", &["x", "y"])],
            vec![resource("Deployment", "a", &["x"]), resource("Deployment", "b", &["x"])],
            vec![resource("Deployment", "a", &["x", "y"]), resource("Deployment", "b", &["x"])],
            vec![resource("Deployment", "a", &["x"]), resource("StatefulSet", "a", &["x"])],
            vec![resource("Deployment", "a", &["x", "y"]), resource("StatefulSet", "a", &["x", "y"]), resource("StatefulSet", "b", &["x"])],
            vec![resource("Deployment", "a--b", &["x"]), resource("Deployment", "a-b", &["x"])],
        ];
        for set in &sets {
            let mut all = names(set, "memory");
            let n = all.len();
            all.sort();
            all.dedup();
            assert_eq!(all.len(), n, "{:?}", all);
        }
    }

    #[test]
    fn naming_is_independent_of_order() {
        let mut set = vec![resource("Deployment", "a", &["x"]), resource("StatefulSet", "b", &["y", "z"])];
        let forward = names(&set, "cpu");
        set.reverse();
        let mut backward = names(&set, "cpu");
        backward.rotate_left(2);
        assert_eq!(forward, backward);
    }
}
