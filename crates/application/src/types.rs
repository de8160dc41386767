use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use knob_core::ObjectMeta;
use serde::{Deserialize, Serialize};

pub const APPLICATION_API_VERSION: &str = "apps.knob.dev/v1alpha1";
pub const APPLICATION_KIND: &str = "Application";

/// Description of an application to run experiments on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// File or directory references, relative to the application's working directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objectives: Vec<Objective>,
    /// Number of objectives added by defaulting; zero when the objectives were explicit.
    #[serde(skip)]
    pub initial_objective_count: usize,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        let mut app = Self {
            api_version: APPLICATION_API_VERSION.to_string(),
            kind: APPLICATION_KIND.to_string(),
            ..Default::default()
        };
        app.metadata.name = name.into();
        app
    }

    pub fn name(&self) -> &str { &self.metadata.name }
    pub fn namespace(&self) -> &str { &self.metadata.namespace }

    /// True when the current objectives are exactly the ones added by defaulting.
    pub fn has_default_objectives(&self) -> bool {
        self.initial_objective_count > 0 && self.objectives.len() == self.initial_objective_count
    }

    /// Directory relative resource references resolve against.
    pub fn working_directory(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn scenario(&self, name: &str) -> Option<&Scenario> { self.scenarios.iter().find(|s| s.name == name) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_resources: Option<ContainerResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<Replicas>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResources {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replicas {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_selector: String,
}

/// A pattern of load to optimize the application for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stormforger: Option<StormForgerScenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locust: Option<LocustScenario>,
}

impl Scenario {
    pub fn named(name: impl Into<String>) -> Self { Self { name: name.into(), ..Default::default() } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StormForgerScenario {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_case: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_case_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocustScenario {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locustfile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_rate: Option<i32>,
}

/// An optimization goal. At most one of `requests` or `duration` is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Quantity>,
    /// Optimize rather than only monitor (default true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<RequestsObjective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationType>,
    /// Set once a metric has been generated for this objective.
    #[serde(skip)]
    pub implemented: bool,
}

impl Objective {
    pub fn named(name: impl Into<String>) -> Self { Self { name: name.into(), ..Default::default() } }

    pub(crate) fn is_empty_config(&self) -> bool { self.requests.is_none() && self.duration.is_none() }
}

/// Resource requests of the pods matched by `metric_selector`, weighted per resource
/// (`cpu`, `memory`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestsObjective {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<String, Quantity>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    Trial,
}
