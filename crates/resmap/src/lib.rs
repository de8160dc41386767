//! Knob resource map: an ordered, queryable collection of Kubernetes manifests
//! with field-path navigation.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use knob_core::ObjectReference;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

pub mod labels;
pub mod path;
pub mod selector;

pub use labels::LabelSelector;
pub use path::{ensure, lookup, set, FieldPath, NodeKind, PathError, PathSegment};
pub use selector::{GenericSelector, MetaMatcher, SelectorError};

/// Upper bound on a single manifest file, from `KNOB_MAX_YAML_BYTES`.
pub fn max_yaml_bytes() -> usize {
    std::env::var("KNOB_MAX_YAML_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(8 * 1024 * 1024) // 8 MiB default
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMeta {
    pub api_version: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourceMeta {
    /// Sets `apiVersion` and splits it: `apps/v1` is group `apps`, `v1` is the core group.
    pub fn set_api_version(&mut self, api_version: &str) {
        self.api_version = api_version.to_string();
        let (group, version) = api_version.rsplit_once('/').unwrap_or(("", api_version));
        self.group = group.to_string();
        self.version = version.to_string();
    }

    pub fn object_reference(&self) -> ObjectReference {
        ObjectReference::new(&self.api_version, &self.kind, &self.name, &self.namespace)
    }

    fn from_node(node: &Value) -> Result<Self> {
        let str_at = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();
        let string_map = |v: Option<&Value>| -> BTreeMap<String, String> {
            v.and_then(Value::as_mapping)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| Some((k.as_str()?.to_string(), path::scalar_string(v)?)))
                        .collect()
                })
                .unwrap_or_default()
        };
        let kind = str_at(node.get("kind"));
        if kind.is_empty() { return Err(anyhow!("YAML missing kind")); }
        let metadata = node.get("metadata");
        let mut meta = ResourceMeta {
            kind,
            name: str_at(metadata.and_then(|m| m.get("name"))),
            namespace: str_at(metadata.and_then(|m| m.get("namespace"))),
            labels: string_map(metadata.and_then(|m| m.get("labels"))),
            annotations: string_map(metadata.and_then(|m| m.get("annotations"))),
            ..Default::default()
        };
        meta.set_api_version(&str_at(node.get("apiVersion")));
        Ok(meta)
    }
}

/// One manifest: its metadata and the full YAML tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub meta: ResourceMeta,
    pub node: Value,
}

impl Document {
    pub fn new(node: Value) -> Result<Self> {
        Ok(Self { meta: ResourceMeta::from_node(&node)?, node })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    docs: Vec<Document>,
}

impl ResourceMap {
    pub fn new() -> Self { Self::default() }

    /// Parses a multi-document YAML stream. Empty documents are skipped and
    /// `kind: List` documents contribute their items.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut map = Self::new();
        map.extend_from_yaml(yaml)?;
        Ok(map)
    }

    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<()> {
        for (i, de) in serde_yaml::Deserializer::from_str(yaml).enumerate() {
            let node = Value::deserialize(de).with_context(|| format!("parse YAML document {}", i))?;
            self.push_node(node).with_context(|| format!("YAML document {}", i))?;
        }
        Ok(())
    }

    fn push_node(&mut self, node: Value) -> Result<()> {
        if node.is_null() { return Ok(()); }
        if node.get("kind").and_then(Value::as_str) == Some("List") {
            if let Some(Value::Sequence(items)) = node.get("items") {
                for item in items.iter().cloned() {
                    self.push_node(item)?;
                }
            }
            return Ok(());
        }
        self.push(Document::new(node)?);
        Ok(())
    }

    pub fn push(&mut self, doc: Document) { self.docs.push(doc); }

    /// Loads every referenced file or directory. Relative references resolve
    /// against `base_dir`; directories contribute their `*.yaml`/`*.yml` files
    /// in sorted order.
    pub fn load(base_dir: &Path, resources: &[String]) -> Result<Self> {
        let mut map = Self::new();
        for res in resources {
            let p = base_dir.join(res);
            if p.is_dir() {
                let mut files: Vec<PathBuf> = std::fs::read_dir(&p)
                    .with_context(|| format!("read directory {}", p.display()))?
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|f| matches!(f.extension().and_then(|x| x.to_str()), Some("yaml" | "yml")))
                    .collect();
                files.sort();
                for f in files {
                    map.load_file(&f)?;
                }
            } else {
                map.load_file(&p)?;
            }
        }
        debug!(resources = resources.len(), documents = map.len(), "resource map loaded");
        Ok(map)
    }

    fn load_file(&mut self, file: &Path) -> Result<()> {
        let size = std::fs::metadata(file).with_context(|| format!("stat {}", file.display()))?.len();
        let max = max_yaml_bytes();
        if size as usize > max {
            return Err(anyhow!("{}: YAML too large: {} bytes (max {})", file.display(), size, max));
        }
        let text = std::fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
        self.extend_from_yaml(&text).with_context(|| format!("load {}", file.display()))
    }

    pub fn select<'a>(&'a self, matcher: &'a MetaMatcher) -> impl Iterator<Item = &'a Document> + 'a {
        self.docs.iter().filter(move |d| matcher.matches(&d.meta))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> { self.docs.iter() }
    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
}
