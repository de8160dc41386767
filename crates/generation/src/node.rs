//! Tunable fields discovered in a single resource document.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use knob_core::Parameter;
use knob_resmap::path::scalar_string;
use knob_resmap::{ensure, set, FieldPath, NodeKind, PathError};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::naming::ParameterNamer;
use crate::quantity::{ParsedQuantity, QuantityError, MEGA, MILLI};

/// `{{ .Values.<name> }}`
pub fn placeholder(name: &str) -> String { format!("{{{{ .Values.{} }}}}", name) }

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterNode {
    Replicas(ReplicasNode),
    ContainerResources(ContainerResourcesNode),
}

impl ParameterNode {
    pub fn field_path(&self) -> &FieldPath {
        match self {
            Self::Replicas(n) => &n.field_path,
            Self::ContainerResources(n) => &n.field_path,
        }
    }

    /// Writes this node's placeholders into the patch document.
    pub fn patch(&self, namer: &ParameterNamer<'_>, doc: &mut Value) -> Result<(), PathError> {
        match self {
            Self::Replicas(n) => n.patch(namer, doc),
            Self::ContainerResources(n) => n.patch(namer, doc),
        }
    }

    /// Zero or more experiment parameters for this node.
    pub fn parameters(&self, namer: &ParameterNamer<'_>) -> Vec<Parameter> {
        match self {
            Self::Replicas(n) => n.parameters(namer).into_iter().collect(),
            Self::ContainerResources(n) => n.parameters(namer),
        }
    }

    fn same_field(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.field_path() == other.field_path()
    }

    pub(crate) fn is_duplicate_of(&self, others: &[Self]) -> bool { others.iter().any(|o| o.same_field(self)) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicasNode {
    pub field_path: FieldPath,
    pub replicas: i32,
}

impl ReplicasNode {
    const MIN: i32 = 1;
    const MAX: i32 = 5;

    /// Disabled counts have no parameter, so they are left out of the patch.
    fn patch(&self, namer: &ParameterNamer<'_>, doc: &mut Value) -> Result<(), PathError> {
        if self.replicas <= 0 { return Ok(()); }
        set(doc, &self.field_path, Value::String(placeholder(&namer.name(&self.field_path, "replicas"))))
    }

    fn parameters(&self, namer: &ParameterNamer<'_>) -> Option<Parameter> {
        // Never enable something that was disabled
        if self.replicas <= 0 {
            debug!(path = %self.field_path, replicas = self.replicas, "replicas disabled, parameter dropped");
            return None;
        }
        Some(Parameter {
            name: namer.name(&self.field_path, "replicas"),
            min: Self::MIN,
            max: Self::MAX.max(self.replicas),
            baseline: Some(IntOrString::Int(self.replicas)),
        })
    }
}

/// The `resources` section of one container, with its current requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerResourcesNode {
    pub field_path: FieldPath,
    pub memory: Option<ParsedQuantity>,
    pub cpu: Option<ParsedQuantity>,
}

impl ContainerResourcesNode {
    pub fn from_resources(field_path: FieldPath, resources: Option<&Value>) -> Result<Self, QuantityError> {
        let requests = resources.and_then(|r| r.get("requests"));
        let request = |name: &str| -> Result<Option<ParsedQuantity>, QuantityError> {
            match requests.and_then(|r| r.get(name)).and_then(scalar_string) {
                Some(s) => ParsedQuantity::parse(&s).map(Some),
                None => Ok(None),
            }
        };
        Ok(Self { memory: request("memory")?, cpu: request("cpu")?, field_path })
    }

    fn patch(&self, namer: &ParameterNamer<'_>, doc: &mut Value) -> Result<(), PathError> {
        let memory = format!("{}M", placeholder(&namer.name(&self.field_path, "memory")));
        let cpu = format!("{}m", placeholder(&namer.name(&self.field_path, "cpu")));
        let mut values = Mapping::new();
        values.insert("memory".into(), memory.into());
        values.insert("cpu".into(), cpu.into());

        let resources = ensure(doc, &self.field_path, NodeKind::Mapping)?;
        if let Value::Mapping(m) = resources {
            m.insert("limits".into(), Value::Mapping(values.clone()));
            m.insert("requests".into(), Value::Mapping(values));
        }
        Ok(())
    }

    fn parameters(&self, namer: &ParameterNamer<'_>) -> Vec<Parameter> {
        let memory = baseline(self.memory, MEGA);
        let (min_memory, max_memory) = memory_range(memory);
        let cpu = baseline(self.cpu, MILLI);
        let (min_cpu, max_cpu) = cpu_range(cpu);
        vec![
            Parameter { name: namer.name(&self.field_path, "memory"), min: min_memory, max: max_memory, baseline: memory.map(IntOrString::Int) },
            Parameter { name: namer.name(&self.field_path, "cpu"), min: min_cpu, max: max_cpu, baseline: cpu.map(IntOrString::Int) },
        ]
    }
}

/// A zero or negative request counts as no request.
fn baseline(q: Option<ParsedQuantity>, scale: i32) -> Option<i32> {
    q.map(|q| q.scaled_i32(scale)).filter(|v| *v > 0)
}

fn floor_log2(v: i64) -> u32 { 63 - v.leading_zeros() }

fn ceil_log2(v: i64) -> u32 {
    let f = floor_log2(v);
    if v.count_ones() == 1 { f } else { f + 1 }
}

/// Raises the maximum to a baseline above it, otherwise lowers it to `bound`.
fn set_max(max: &mut i32, baseline: i32, bound: i64) {
    if baseline > *max {
        *max = baseline;
    } else if bound < *max as i64 {
        *max = bound as i32;
    }
}

/// Memory in megabytes: defaults to `[128, 4096]`, otherwise power-of-two bounds
/// around the baseline.
pub fn memory_range(baseline: Option<i32>) -> (i32, i32) {
    let (mut min, mut max) = (128, 4096);
    if let Some(v) = baseline {
        let half = v as i64 / 2;
        min = if half > 0 { 1i32 << floor_log2(half).min(30) } else { 0 };
        set_max(&mut max, v, 1i64 << ceil_log2(v as i64 * 2));
    }
    (min, max)
}

/// CPU in millicores: defaults to `[100, 4000]`, otherwise half to double the
/// baseline in steps of ten.
pub fn cpu_range(baseline: Option<i32>) -> (i32, i32) {
    let (mut min, mut max) = (100, 4000);
    if let Some(v) = baseline {
        min = (v / 20) * 10;
        set_max(&mut max, v, ((v as i64 + 9) / 10) * 20);
    }
    (min, max)
}
