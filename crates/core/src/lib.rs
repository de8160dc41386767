//! Knob core types: the experiment object model shared by the scanner, the
//! application filters and the CLI.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

/// API version written on generated experiments.
pub const API_VERSION: &str = "knob.dev/v1beta1";
pub const EXPERIMENT_KIND: &str = "Experiment";

/// Label carrying the application name on generated objects.
pub const LABEL_APPLICATION: &str = "knob.dev/application";
/// Label carrying the scenario name when the experiment targets exactly one scenario.
pub const LABEL_SCENARIO: &str = "knob.dev/scenario";

/// Identity of a target resource. Two application resources are the same entity
/// iff their references are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ObjectReference {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { api_version: api_version.into(), kind: kind.into(), name: name.into(), namespace: namespace.into() }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A named, bounded, numeric tunable exposed to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub min: i32,
    pub max: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<IntOrString>,
}

impl Parameter {
    /// Integer view of the baseline, if there is one and it is numeric.
    pub fn baseline_int(&self) -> Option<i32> {
        match &self.baseline {
            Some(IntOrString::Int(v)) => Some(*v),
            Some(IntOrString::String(s)) => s.parse().ok(),
            None => None,
        }
    }
}

/// YAML patch text with `{{ .Values.<name> }}` placeholders, applied to `target_ref`
/// at trial time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchTemplate {
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<ObjectReference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    #[default]
    Local,
    Prometheus,
}

fn is_local(t: &MetricType) -> bool { *t == MetricType::Local }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    #[serde(default)]
    pub minimize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "is_local")]
    pub metric_type: MetricType,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchTemplate>,
}

/// A generated experiment: tunable parameters, metrics and patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ExperimentSpec,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: EXPERIMENT_KIND.to_string(),
            metadata: ObjectMeta::default(),
            spec: ExperimentSpec::default(),
        }
    }
}

impl Experiment {
    pub fn named(name: impl Into<String>) -> Self {
        let mut exp = Self::default();
        exp.metadata.name = name.into();
        exp
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.spec.parameters.iter().find(|p| p.name == name)
    }
}

pub mod prelude {
    pub use super::{Experiment, ExperimentSpec, Metric, MetricType, ObjectMeta, ObjectReference, Parameter, PatchTemplate};
    pub use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
}
