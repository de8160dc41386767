//! Experiment metrics for application objectives.

use anyhow::{bail, Result};
use knob_application::{DurationType, Objective, RequestsObjective};
use knob_core::{Metric, MetricType};
use tracing::debug;

use crate::quantity::ParsedQuantity;

const DURATION_QUERY: &str = "{{ duration .StartTime .CompletionTime }}";

/// Double-quoted string literal, as the template engine expects it.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Integer weight, rounded up; absent or unparsable weights count as zero.
fn weight(requests: &RequestsObjective, resource: &str) -> i64 {
    requests
        .weights
        .as_ref()
        .and_then(|w| w.get(resource))
        .and_then(|q| ParsedQuantity::from_quantity(q).ok())
        .map(|q| q.scaled_value(0))
        .unwrap_or(0)
}

fn metric(name: String, metric_type: MetricType, query: String) -> Metric {
    Metric { name, minimize: true, optimize: None, metric_type, query, min: None, max: None }
}

fn bounded(mut m: Metric, obj: &Objective) -> Metric {
    m.optimize = obj.optimize;
    m.min = obj.min.clone();
    m.max = obj.max.clone();
    m
}

fn requests_metrics(obj: &Objective, requests: &RequestsObjective) -> Vec<Metric> {
    let sel = quote(&requests.metric_selector);
    let cpu = weight(requests, "cpu");
    let memory = weight(requests, "memory");
    let query = format!("({{{{ cpuRequests . {sel} }}}} * {cpu}) + ({{{{ memoryRequests . {sel} | GB }}}} * {memory})");
    let mut out = vec![bounded(metric(obj.name.clone(), MetricType::Prometheus, query), obj)];

    // Track the individual requests behind a cost without optimizing them
    if obj.name.contains("cost") && cpu != 0 && memory != 0 && obj.optimize.unwrap_or(true) {
        let mut cpu_requests = metric(format!("{}-cpu-requests", obj.name), MetricType::Prometheus, format!("{{{{ cpuRequests . {sel} }}}}"));
        cpu_requests.optimize = Some(false);
        let mut memory_requests =
            metric(format!("{}-memory-requests", obj.name), MetricType::Prometheus, format!("{{{{ memoryRequests . {sel} | GB }}}}"));
        memory_requests.optimize = Some(false);
        out.push(cpu_requests);
        out.push(memory_requests);
    }
    out
}

/// Generates metrics for every objective it knows how to implement and marks
/// those objectives. Any objective left unimplemented is an error.
pub fn objective_metrics(objectives: &mut [Objective]) -> Result<Vec<Metric>> {
    let mut metrics = Vec::new();
    for obj in objectives.iter_mut() {
        if obj.implemented { continue; }
        if let Some(requests) = &obj.requests {
            metrics.extend(requests_metrics(obj, requests));
            obj.implemented = true;
        } else if obj.duration == Some(DurationType::Trial) {
            metrics.push(bounded(metric(obj.name.clone(), MetricType::Local, DURATION_QUERY.to_string()), obj));
            obj.implemented = true;
        }
        debug!(objective = %obj.name, implemented = obj.implemented, "objective processed");
    }
    if let Some(obj) = objectives.iter().find(|o| !o.implemented) {
        bail!("generated experiment cannot optimize objective: {}", obj.name);
    }
    Ok(metrics)
}
