use knob_application::Application;
use knob_core::prelude::*;
use knob_generation::quantity::{ParsedQuantity, MEGA, MILLI};
use knob_generation::{build_patch, ContainerResourcesSelector, Generator, NamingPolicy, ReplicaSelector, Scanner};
use knob_resmap::{lookup, FieldPath, ResourceMap};
use serde_yaml::Value;

const SHOP: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
  labels:
    tier: front
spec:
  replicas: 12
  template:
    spec:
      containers:
      - name: app
        resources:
          requests:
            memory: 512M
            cpu: 250m
      - name: envoy
        resources:
          requests:
            memory: 64M
            cpu: 100m
---
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: db
  namespace: shop
  labels:
    tier: back
spec:
  replicas: 0
  template:
    spec:
      containers:
      - name: postgres
        resources:
          requests:
            memory: 1Gi
            cpu: "1"
"#;

fn application(yaml: &str) -> Application { Application::from_yaml_str(yaml).unwrap() }

fn scanner() -> Scanner { Scanner { container_resources: ContainerResourcesSelector::defaults(), replicas: ReplicaSelector::defaults() } }

#[test]
fn selectors_merge_into_one_resource_per_target() {
    let map = ResourceMap::from_yaml_str(SHOP).unwrap();
    let resources = scanner().scan(&map).unwrap();
    assert_eq!(resources.len(), 2);

    let paths: Vec<_> = resources[0].params.iter().map(|p| p.field_path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "/spec/template/spec/containers/[name=app]/resources",
            "/spec/template/spec/containers/[name=envoy]/resources",
            "/spec/replicas",
        ]
    );
    assert_eq!(resources[1].target_ref, ObjectReference::new("apps/v1", "StatefulSet", "db", "shop"));
}

#[test]
fn names_and_ranges() {
    let map = ResourceMap::from_yaml_str(SHOP).unwrap();
    let mut exp = Experiment::default();
    scanner().scan_into(&map, &mut exp).unwrap();

    let names: Vec<_> = exp.spec.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "deployment_app_memory",
            "deployment_app_cpu",
            "deployment_envoy_memory",
            "deployment_envoy_cpu",
            "deployment_replicas",
            "statefulset_postgres_memory",
            "statefulset_postgres_cpu",
        ]
    );

    let replicas = exp.parameter("deployment_replicas").unwrap();
    assert_eq!((replicas.min, replicas.max, replicas.baseline_int()), (1, 12, Some(12)));

    let memory = exp.parameter("deployment_app_memory").unwrap();
    assert_eq!((memory.min, memory.max, memory.baseline_int()), (256, 1024, Some(512)));

    let cpu = exp.parameter("deployment_app_cpu").unwrap();
    assert_eq!((cpu.min, cpu.max, cpu.baseline_int()), (120, 500, Some(250)));

    // 0 replicas stays disabled
    assert!(exp.spec.parameters.iter().all(|p| !p.name.starts_with("statefulset_replicas")));
}

#[test]
fn disabled_replicas_yield_no_parameter() {
    let map = ResourceMap::from_yaml_str("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 0\n").unwrap();
    let scanner = Scanner { container_resources: Vec::new(), replicas: ReplicaSelector::defaults() };
    let mut exp = Experiment::default();
    scanner.scan_into(&map, &mut exp).unwrap();
    assert!(exp.spec.parameters.is_empty());
    assert_eq!(exp.spec.patches.len(), 1);
    assert!(!exp.spec.patches[0].patch.contains("{{"), "{}", exp.spec.patches[0].patch);
}

#[test]
fn single_parameter_keeps_bare_name() {
    let map = ResourceMap::from_yaml_str("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 3\n").unwrap();
    let scanner = Scanner { container_resources: Vec::new(), replicas: ReplicaSelector::defaults() };
    let resources = scanner.scan(&map).unwrap();
    let patch = build_patch(&resources[0], NamingPolicy::compute(&resources)).unwrap();
    assert_eq!(patch.patch, "spec:\n  replicas: {{ .Values.replicas }}\n");
}

#[test]
fn patch_round_trips_baselines() {
    let map = ResourceMap::from_yaml_str(SHOP).unwrap();
    let resources = scanner().scan(&map).unwrap();
    let mut exp = Experiment::default();
    scanner().scan_into(&map, &mut exp).unwrap();

    let web = &resources[0];
    let mut text = build_patch(web, NamingPolicy::compute(&resources)).unwrap().patch;
    for p in &exp.spec.parameters {
        if let Some(v) = p.baseline_int() {
            text = text.replace(&format!("{{{{ .Values.{} }}}}", p.name), &v.to_string());
        }
    }
    let rendered: Value = serde_yaml::from_str(&text).unwrap();
    let source = &map.iter().next().unwrap().node;

    let at = |doc: &Value, path: &str| lookup(doc, &FieldPath::parse(path).unwrap()).unwrap().cloned().unwrap();
    assert_eq!(at(&rendered, "/spec/replicas"), at(source, "/spec/replicas"));

    for (path, scale) in [
        ("/spec/template/spec/containers/[name=app]/resources/requests/memory", MEGA),
        ("/spec/template/spec/containers/[name=app]/resources/requests/cpu", MILLI),
        ("/spec/template/spec/containers/[name=envoy]/resources/requests/cpu", MILLI),
    ] {
        let q = |v: Value| ParsedQuantity::parse(v.as_str().unwrap()).unwrap().scaled_value(scale);
        assert_eq!(q(at(&rendered, path)), q(at(source, path)), "{}", path);
    }
}

#[test]
fn generator_builds_complete_experiment() {
    let app = application(
        r#"
metadata:
  name: shop
  namespace: shop
parameters:
  replicas:
    labelSelector: tier=front
scenarios:
- name: checkout
objectives:
- name: cost
- name: duration
"#,
    );
    let map = ResourceMap::from_yaml_str(SHOP).unwrap();
    let mut generator = Generator::new(app);
    generator.include_resources = true;
    let out = generator.generate_from(&map).unwrap();
    let exp = &out.experiment;

    assert_eq!(exp.metadata.name, "shop-checkout-cost-duration");
    assert_eq!(exp.metadata.namespace, "shop");
    assert_eq!(exp.metadata.labels.get("knob.dev/application").map(String::as_str), Some("shop"));
    assert_eq!(exp.metadata.labels.get("knob.dev/scenario").map(String::as_str), Some("checkout"));

    // Replicas only from the front tier
    assert!(exp.parameter("deployment_replicas").is_some());
    assert!(exp.spec.parameters.iter().all(|p| p.baseline.is_some()));

    let metrics: Vec<_> = exp.spec.metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(metrics, vec!["cost", "cost-cpu-requests", "cost-memory-requests", "duration"]);
    assert_eq!(exp.spec.metrics[0].query, r#"({{ cpuRequests . "" }} * 17) + ({{ memoryRequests . "" | GB }} * 3)"#);
    assert_eq!(out.resources.len(), 2);
}

#[test]
fn missing_baseline_clears_all_baselines() {
    let app = application("metadata:\n  name: app\n");
    let map = ResourceMap::from_yaml_str(
        r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
      - name: app
        resources:
          requests:
            memory: 128M
"#,
    )
    .unwrap();
    let out = Generator::new(app).generate_from(&map).unwrap();
    assert_eq!(out.experiment.spec.parameters.len(), 2);
    assert!(out.experiment.spec.parameters.iter().all(|p| p.baseline.is_none()));
    let cpu = out.experiment.parameter("cpu").unwrap();
    assert_eq!((cpu.min, cpu.max), (100, 4000));
    assert!(out.resources.is_empty());
}

#[test]
fn unimplementable_objective_fails() {
    let app = application("metadata:\n  name: app\nobjectives:\n- name: throughput\n");
    let map = ResourceMap::from_yaml_str(SHOP).unwrap();
    let err = Generator::new(app).generate_from(&map).unwrap_err();
    assert_eq!(err.to_string(), "generated experiment cannot optimize objective: throughput");
}
