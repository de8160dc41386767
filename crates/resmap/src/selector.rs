//! Metadata selectors over resource documents.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::LabelSelector;
use crate::ResourceMeta;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid {field} pattern '{pattern}': {source}")]
    Pattern { field: &'static str, pattern: String, #[source] source: regex::Error },
    #[error("invalid selector '{selector}': cannot parse requirement '{requirement}'")]
    Label { selector: String, requirement: String },
}

/// Selects documents by metadata. Every non-empty string field other than the
/// selectors is an anchored regular expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_selector: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub annotation_selector: String,
}

impl GenericSelector {
    pub fn compile(&self) -> Result<MetaMatcher, SelectorError> {
        Ok(MetaMatcher {
            group: anchored("group", &self.group)?,
            version: anchored("version", &self.version)?,
            kind: anchored("kind", &self.kind)?,
            namespace: anchored("namespace", &self.namespace)?,
            name: anchored("name", &self.name)?,
            labels: LabelSelector::parse(&self.label_selector)?,
            annotations: LabelSelector::parse(&self.annotation_selector)?,
        })
    }
}

/// Compiles `pattern` as `^(?:pattern)$`; empty patterns match anything.
pub fn anchored(field: &'static str, pattern: &str) -> Result<Option<Regex>, SelectorError> {
    if pattern.is_empty() { return Ok(None); }
    Regex::new(&format!("^(?:{})$", pattern))
        .map(Some)
        .map_err(|source| SelectorError::Pattern { field, pattern: pattern.to_string(), source })
}

/// Compiled form of a [`GenericSelector`].
#[derive(Debug, Clone)]
pub struct MetaMatcher {
    group: Option<Regex>,
    version: Option<Regex>,
    kind: Option<Regex>,
    namespace: Option<Regex>,
    name: Option<Regex>,
    labels: LabelSelector,
    annotations: LabelSelector,
}

fn field_matches(re: &Option<Regex>, value: &str) -> bool {
    re.as_ref().map(|r| r.is_match(value)).unwrap_or(true)
}

impl MetaMatcher {
    pub fn matches(&self, meta: &ResourceMeta) -> bool {
        field_matches(&self.group, &meta.group)
            && field_matches(&self.version, &meta.version)
            && field_matches(&self.kind, &meta.kind)
            && field_matches(&self.namespace, &meta.namespace)
            && field_matches(&self.name, &meta.name)
            && self.labels.matches(&meta.labels)
            && self.annotations.matches(&meta.annotations)
    }
}
