//! Selectors locating tunable fields: replica counts and container resources.

use anyhow::{Context, Result};
use knob_application::Application;
use knob_resmap::{lookup, FieldPath, GenericSelector, PathSegment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::node::{ContainerResourcesNode, ParameterNode, ReplicasNode};

const DEFAULT_GROUPS: &str = "apps|extensions";
const DEFAULT_KINDS: &str = "Deployment|StatefulSet";

/// Finds parameter nodes inside documents picked by a metadata selector.
pub trait ParameterSelector {
    fn selector(&self) -> &GenericSelector;
    fn find_parameters(&self, node: &Value) -> Result<Vec<ParameterNode>>;
}

fn default_selector() -> GenericSelector {
    GenericSelector { group: DEFAULT_GROUPS.to_string(), kind: DEFAULT_KINDS.to_string(), ..Default::default() }
}

/// Identifies zero or more replica counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSelector {
    #[serde(flatten)]
    pub selector: GenericSelector,
    pub path: String,
    /// Synthesize the field (baseline 1) when the document does not have it.
    #[serde(default, rename = "create")]
    pub create_if_not_present: bool,
}

impl ReplicaSelector {
    pub fn defaults() -> Vec<Self> {
        vec![Self { selector: default_selector(), path: "/spec/replicas".to_string(), create_if_not_present: true }]
    }
}

impl ParameterSelector for ReplicaSelector {
    fn selector(&self) -> &GenericSelector { &self.selector }

    fn find_parameters(&self, node: &Value) -> Result<Vec<ParameterNode>> {
        let path = FieldPath::parse(&self.path)?;
        let replicas = match lookup(node, &path)?.filter(|v| !v.is_null()) {
            None if !self.create_if_not_present => return Ok(Vec::new()),
            None => 1,
            // TODO: report undecodable counts as errors instead of assuming 1
            Some(v) => v.as_i64().and_then(|r| i32::try_from(r).ok()).unwrap_or_else(|| {
                warn!(path = %path, value = ?v, "replica count is not an integer, assuming 1");
                1
            }),
        };
        Ok(vec![ParameterNode::Replicas(ReplicasNode { field_path: path, replicas })])
    }
}

/// Identifies zero or more container resources sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResourcesSelector {
    #[serde(flatten)]
    pub selector: GenericSelector,
    /// Path to the list of containers.
    pub path: String,
    /// Consider containers that have no `resources` section.
    #[serde(default, rename = "create")]
    pub create_if_not_present: bool,
    /// Anchored regular expression matching the container name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,
}

impl ContainerResourcesSelector {
    pub fn defaults() -> Vec<Self> {
        vec![Self {
            selector: default_selector(),
            path: "/spec/template/spec/containers".to_string(),
            create_if_not_present: true,
            container_name: String::new(),
        }]
    }

    /// Empty matches every container; a pattern that does not compile falls back to
    /// exact comparison.
    pub fn matches_container_name(&self, name: &str) -> bool {
        if self.container_name.is_empty() { return true; }
        match Regex::new(&format!("^(?:{})$", self.container_name)) {
            Ok(re) => re.is_match(name),
            Err(_) => self.container_name == name,
        }
    }
}

impl ParameterSelector for ContainerResourcesSelector {
    fn selector(&self) -> &GenericSelector { &self.selector }

    fn find_parameters(&self, node: &Value) -> Result<Vec<ParameterNode>> {
        let path = FieldPath::parse(&self.path)?;
        let containers = match lookup(node, &path)? {
            Some(Value::Sequence(items)) => items,
            Some(_) => anyhow::bail!("expected a list of containers at {}", path),
            None => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        for c in containers {
            let resources = c.get("resources");
            if resources.is_none() && !self.create_if_not_present { continue; }
            let name = c.get("name").and_then(Value::as_str).unwrap_or_default();
            if !self.matches_container_name(name) {
                debug!(container = name, pattern = %self.container_name, "container skipped");
                continue;
            }
            let field_path = path.child(PathSegment::matching("name", name)).child(PathSegment::field("resources"));
            let node = ContainerResourcesNode::from_resources(field_path, resources)
                .with_context(|| format!("container '{}' resources", name))?;
            out.push(ParameterNode::ContainerResources(node));
        }
        Ok(out)
    }
}

/// Default selectors, narrowed by the application's label selectors. Replica
/// scanning only happens when the application asks for it.
pub fn default_selectors(app: &Application) -> (Vec<ContainerResourcesSelector>, Vec<ReplicaSelector>) {
    let params = app.parameters.as_ref();

    let mut containers = ContainerResourcesSelector::defaults();
    if let Some(cr) = params.and_then(|p| p.container_resources.as_ref()) {
        for s in containers.iter_mut() {
            s.selector.label_selector = cr.label_selector.clone();
        }
    }

    let replicas = match params.and_then(|p| p.replicas.as_ref()) {
        Some(r) => ReplicaSelector::defaults()
            .into_iter()
            .map(|mut s| {
                s.selector.label_selector = r.label_selector.clone();
                s
            })
            .collect(),
        None => Vec::new(),
    };
    (containers, replicas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value { serde_yaml::from_str(s).unwrap() }

    #[test]
    fn replicas_read_or_synthesized() {
        let sel = ReplicaSelector::defaults().remove(0);
        let found = sel.find_parameters(&yaml("spec:\n  replicas: 3\n")).unwrap();
        assert_eq!(found, vec![ParameterNode::Replicas(ReplicasNode { field_path: FieldPath::parse("/spec/replicas").unwrap(), replicas: 3 })]);

        let found = sel.find_parameters(&yaml("spec: {}\n")).unwrap();
        assert!(matches!(found[..], [ParameterNode::Replicas(ReplicasNode { replicas: 1, .. })]));

        let strict = ReplicaSelector { create_if_not_present: false, ..sel.clone() };
        assert!(strict.find_parameters(&yaml("spec: {}\n")).unwrap().is_empty());
    }

    #[test]
    fn undecodable_replicas_default_to_one() {
        let sel = ReplicaSelector::defaults().remove(0);
        let found = sel.find_parameters(&yaml("spec:\n  replicas: many\n")).unwrap();
        assert!(matches!(found[..], [ParameterNode::Replicas(ReplicasNode { replicas: 1, .. })]));
    }

    #[test]
    fn replica_path_through_scalar_is_an_error() {
        let sel = ReplicaSelector::defaults().remove(0);
        assert!(sel.find_parameters(&yaml("spec: 3\n")).is_err());
    }

    #[test]
    fn containers_filtered_by_name_and_presence() {
        let doc = yaml(
            r#"
spec:
  template:
    spec:
      containers:
      - name: web
        resources:
          requests:
            cpu: 250m
      - name: sidecar
"#,
        );
        let mut sel = ContainerResourcesSelector::defaults().remove(0);
        let names = |found: Vec<ParameterNode>| found.iter().map(|p| p.field_path().to_string()).collect::<Vec<_>>();
        assert_eq!(
            names(sel.find_parameters(&doc).unwrap()),
            vec!["/spec/template/spec/containers/[name=web]/resources", "/spec/template/spec/containers/[name=sidecar]/resources"]
        );

        sel.create_if_not_present = false;
        assert_eq!(names(sel.find_parameters(&doc).unwrap()), vec!["/spec/template/spec/containers/[name=web]/resources"]);

        sel.create_if_not_present = true;
        sel.container_name = "side.*".into();
        assert_eq!(names(sel.find_parameters(&doc).unwrap()), vec!["/spec/template/spec/containers/[name=sidecar]/resources"]);
    }

    #[test]
    fn bad_container_pattern_is_exact_match() {
        let sel = ContainerResourcesSelector { container_name: "web(".into(), ..Default::default() };
        assert!(sel.matches_container_name("web("));
        assert!(!sel.matches_container_name("web"));
    }

    #[test]
    fn replicas_only_when_requested() {
        let mut app = Application::new("app");
        let (containers, replicas) = default_selectors(&app);
        assert_eq!(containers.len(), 1);
        assert!(replicas.is_empty());

        app.parameters = Some(knob_application::Parameters {
            container_resources: Some(knob_application::ContainerResources { label_selector: "tier=back".into() }),
            replicas: Some(knob_application::Replicas { label_selector: "tier=front".into() }),
        });
        let (containers, replicas) = default_selectors(&app);
        assert_eq!(containers[0].selector.label_selector, "tier=back");
        assert_eq!(replicas[0].selector.label_selector, "tier=front");
        assert!(replicas[0].create_if_not_present);
    }
}
