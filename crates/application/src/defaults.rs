//! Defaulting for application descriptors. Defaulting is idempotent: explicit
//! values are never overwritten.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::types::{Application, DurationType, Objective, RequestsObjective, Scenario};

const DEFAULT_NAME: &str = "default";

/// Objectives an application without any explicit objectives is optimized for.
pub const DEFAULT_OBJECTIVES: &[&str] = &["cost"];

impl Application {
    pub fn apply_defaults(&mut self) {
        if self.objectives.is_empty() {
            self.objectives = DEFAULT_OBJECTIVES.iter().map(|n| Objective::named(*n)).collect();
            self.initial_objective_count = self.objectives.len();
        }
        for s in self.scenarios.iter_mut() {
            s.apply_defaults();
        }
        for o in self.objectives.iter_mut() {
            o.apply_defaults();
        }
    }
}

impl Scenario {
    pub fn apply_defaults(&mut self) {
        if !self.name.is_empty() { return; }
        self.name = if let Some(sf) = &self.stormforger {
            default_scenario_name(&[sf.test_case.as_str(), sf.test_case_file.as_str()])
        } else if let Some(l) = &self.locust {
            default_scenario_name(&[l.locustfile.as_str()])
        } else {
            DEFAULT_NAME.to_string()
        };
    }
}

impl Objective {
    pub fn apply_defaults(&mut self) {
        // No explicit configuration: derive it from the name
        if !self.name.is_empty() && self.is_empty_config() {
            match to_name(&self.name).as_str() {
                "duration" | "time" | "time-elapsed" | "elapsed-time" => self.duration = Some(DurationType::Trial),
                name => {
                    if let Some(w) = default_cost_weights(name) {
                        self.requests = Some(RequestsObjective { weights: Some(w), ..Default::default() });
                    }
                }
            }
        }

        if let Some(req) = self.requests.as_mut() {
            if req.weights.is_none() {
                req.weights = Some(default_cost_weights(&self.name).unwrap_or_else(|| weights(1, 1)));
            }
        }

        if self.name.is_empty() {
            self.name = if self.requests.is_some() {
                "requests"
            } else if self.duration.is_some() {
                "duration"
            } else {
                DEFAULT_NAME
            }
            .to_string();
        }
    }
}

fn weights(cpu: u32, memory: u32) -> BTreeMap<String, Quantity> {
    let mut w = BTreeMap::new();
    if cpu > 0 { w.insert("cpu".to_string(), Quantity(cpu.to_string())); }
    if memory > 0 { w.insert("memory".to_string(), Quantity(memory.to_string())); }
    w
}

/// Resource weightings for recognized cost objective names.
pub fn default_cost_weights(name: &str) -> Option<BTreeMap<String, Quantity>> {
    match to_name(name).as_str() {
        "cost" => Some(weights(17, 3)),
        "cost-gcp" | "gcp-cost" | "cost-gke" | "gke-cost" => Some(weights(17, 2)),
        "cost-aws" | "aws-cost" | "cost-eks" | "eks-cost" => Some(weights(18, 5)),
        "cpu-requests" | "cpu" => Some(weights(1, 0)),
        "memory-requests" | "memory" => Some(weights(0, 1)),
        _ => None,
    }
}

fn default_scenario_name(values: &[&str]) -> String {
    for v in values {
        let base = Path::new(v).file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if base.is_empty() || base == "locustfile.py" { continue; }
        let stem = Path::new(base).file_stem().and_then(|n| n.to_str()).unwrap_or(base);
        return to_name(stem);
    }
    DEFAULT_NAME.to_string()
}

fn to_name(s: &str) -> String {
    s.chars().map(|c| if c == '_' { '-' } else { c }).flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LocustScenario, StormForgerScenario};

    #[test]
    fn scenario_names_from_load_generators() {
        let mut s = Scenario { stormforger: Some(StormForgerScenario { test_case: "Black_Friday".into(), ..Default::default() }), ..Default::default() };
        s.apply_defaults();
        assert_eq!(s.name, "black-friday");

        let mut s = Scenario {
            stormforger: Some(StormForgerScenario { test_case_file: "cases/checkout.js".into(), ..Default::default() }),
            ..Default::default()
        };
        s.apply_defaults();
        assert_eq!(s.name, "checkout");

        let mut s = Scenario { locust: Some(LocustScenario { locustfile: "load/locustfile.py".into(), ..Default::default() }), ..Default::default() };
        s.apply_defaults();
        assert_eq!(s.name, "default");

        let mut s = Scenario::named("Explicit");
        s.apply_defaults();
        assert_eq!(s.name, "Explicit");
    }

    #[test]
    fn objectives_derive_configuration_from_name() {
        let mut o = Objective::named("cost");
        o.apply_defaults();
        let w = o.requests.as_ref().and_then(|r| r.weights.as_ref()).unwrap();
        assert_eq!(w.get("cpu"), Some(&Quantity("17".into())));
        assert_eq!(w.get("memory"), Some(&Quantity("3".into())));

        let mut o = Objective::named("Elapsed_Time");
        o.apply_defaults();
        assert_eq!(o.duration, Some(DurationType::Trial));
        assert_eq!(o.name, "Elapsed_Time");

        let mut o = Objective::named("throughput");
        o.apply_defaults();
        assert!(o.is_empty_config());
    }

    #[test]
    fn requests_without_weights_get_unit_weights() {
        let mut o = Objective { requests: Some(RequestsObjective { metric_selector: "app=web".into(), weights: None }), ..Default::default() };
        o.apply_defaults();
        assert_eq!(o.name, "requests");
        assert_eq!(o.requests.unwrap().weights, Some(weights(1, 1)));
    }

    #[test]
    fn default_objectives_are_remembered() {
        let mut app = Application::new("app");
        app.apply_defaults();
        assert_eq!(app.objectives.len(), 1);
        assert_eq!(app.objectives[0].name, "cost");
        assert!(app.has_default_objectives());

        app.apply_defaults();
        assert_eq!(app.objectives.len(), 1);
        assert!(app.has_default_objectives());

        let mut explicit = Application::new("app");
        explicit.objectives.push(Objective::named("cost"));
        explicit.apply_defaults();
        assert!(!explicit.has_default_objectives());
    }
}
