use std::io::Write;

use knob_resmap::{lookup, FieldPath, GenericSelector, ResourceMap};

const MANIFESTS: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
  labels:
    app: web
    tier: front
spec:
  replicas: 2
---
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: db
  namespace: shop
  labels:
    app: db
spec:
  replicas: 1
---
---
apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: Service
  metadata:
    name: web
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: settings
"#;

#[test]
fn parses_stream_and_flattens_lists() {
    let map = ResourceMap::from_yaml_str(MANIFESTS).unwrap();
    let kinds: Vec<_> = map.iter().map(|d| d.meta.kind.as_str()).collect();
    assert_eq!(kinds, vec!["Deployment", "StatefulSet", "Service", "ConfigMap"]);
}

#[test]
fn select_by_group_kind_and_labels() {
    let map = ResourceMap::from_yaml_str(MANIFESTS).unwrap();
    let sel = GenericSelector { group: "apps|extensions".into(), kind: "Deployment|StatefulSet".into(), ..Default::default() };
    let m = sel.compile().unwrap();
    let names: Vec<_> = map.select(&m).map(|d| d.meta.name.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);

    let sel = GenericSelector { label_selector: "tier=front".into(), ..Default::default() };
    let m = sel.compile().unwrap();
    let refs: Vec<_> = map.select(&m).map(|d| d.meta.object_reference().to_string()).collect();
    assert_eq!(refs, vec!["Deployment/shop/web"]);
}

#[test]
fn core_group_is_empty() {
    let map = ResourceMap::from_yaml_str(MANIFESTS).unwrap();
    let sel = GenericSelector { group: "".into(), version: "v1".into(), kind: "Service".into(), ..Default::default() };
    let m = sel.compile().unwrap();
    let doc = map.select(&m).next().unwrap();
    assert_eq!(doc.meta.group, "");
    assert_eq!(doc.meta.object_reference().api_version, "v1");
}

#[test]
fn documents_support_path_lookup() {
    let map = ResourceMap::from_yaml_str(MANIFESTS).unwrap();
    let p = FieldPath::parse("/spec/replicas").unwrap();
    let replicas: Vec<_> = map.iter().filter_map(|d| lookup(&d.node, &p).unwrap()).filter_map(|v| v.as_i64()).collect();
    assert_eq!(replicas, vec![2, 1]);
}

#[test]
fn load_resolves_directories_in_order() {
    let dir = std::env::temp_dir().join(format!("knob-resmap-load-{}", std::process::id()));
    let manifests = dir.join("manifests");
    std::fs::create_dir_all(&manifests).unwrap();
    let write = |name: &str, body: &str| {
        let mut f = std::fs::File::create(manifests.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    };
    write("b.yaml", "apiVersion: v1\nkind: Service\nmetadata:\n  name: second\n");
    write("a.yml", "apiVersion: v1\nkind: Service\nmetadata:\n  name: first\n");
    write("notes.txt", "not yaml at all: [");

    let map = ResourceMap::load(&dir, &["manifests".to_string()]).unwrap();
    let names: Vec<_> = map.iter().map(|d| d.meta.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);

    assert!(ResourceMap::load(&dir, &["missing.yaml".to_string()]).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
