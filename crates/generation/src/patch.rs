//! Patch templates and experiment parameters for scanned resources.

use anyhow::{Context, Result};
use knob_core::{Parameter, PatchTemplate};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::naming::{NamingPolicy, ParameterNamer};
use crate::resource::ApplicationResource;

/// A quoted scalar that is exactly one placeholder.
static QUOTED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"](\{\{ \.Values\.[^\s'"]+ \}\})['"]"#).unwrap());

/// Removes the quotes the serializer puts around bare placeholders so the
/// rendered value reads back as a number. Placeholders with a unit suffix keep
/// their quotes.
pub fn unquote_placeholders(yaml: &str) -> String { QUOTED_PLACEHOLDER.replace_all(yaml, "$1").into_owned() }

/// Applies every node's fragment, in parameter order, to one empty document.
pub fn build_patch(resource: &ApplicationResource, policy: NamingPolicy) -> Result<PatchTemplate> {
    let namer = ParameterNamer::new(policy, resource);
    let mut doc = Value::Mapping(Mapping::new());
    for p in &resource.params {
        p.patch(&namer, &mut doc).with_context(|| format!("patch {} at {}", resource.target_ref, p.field_path()))?;
    }
    let text = serde_yaml::to_string(&doc).with_context(|| format!("serialize patch for {}", resource.target_ref))?;
    counter!("patches_rendered_total", 1);
    debug!(target = %resource.target_ref, nodes = resource.params.len(), "patch rendered");
    Ok(PatchTemplate { patch: unquote_placeholders(&text), target_ref: Some(resource.target_ref.clone()) })
}

/// Parameters in node order; nodes that contribute nothing are skipped.
pub fn extract_parameters(resource: &ApplicationResource, policy: NamingPolicy) -> Vec<Parameter> {
    let namer = ParameterNamer::new(policy, resource);
    resource.params.iter().flat_map(|p| p.parameters(&namer)).collect()
}
