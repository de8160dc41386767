//! Parameter nodes grouped by the resource they were found in.

use knob_core::ObjectReference;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::node::ParameterNode;

/// All tunable fields discovered on one target resource, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationResource {
    pub target_ref: ObjectReference,
    pub params: Vec<ParameterNode>,
}

/// Merge-or-append accumulator keyed by target reference. Resources keep the
/// order in which they were first seen.
#[derive(Debug, Default)]
pub struct ResourceAccumulator {
    index: FxHashMap<ObjectReference, usize>,
    resources: Vec<ApplicationResource>,
}

impl ResourceAccumulator {
    pub fn new() -> Self { Self::default() }

    /// Appends `params` to the resource with an equal reference, or starts a new
    /// one. Empty input never creates a resource; a node already recorded at the
    /// same field path is not added twice.
    pub fn merge_or_append(&mut self, target_ref: ObjectReference, params: Vec<ParameterNode>) {
        if params.is_empty() { return; }
        match self.index.get(&target_ref) {
            Some(&i) => {
                let existing = &mut self.resources[i].params;
                for p in params {
                    if p.is_duplicate_of(existing) {
                        debug!(target = %target_ref, path = %p.field_path(), "duplicate parameter node ignored");
                        continue;
                    }
                    existing.push(p);
                }
                debug!(target = %target_ref, params = existing.len(), "merged into existing resource");
            }
            None => {
                self.index.insert(target_ref.clone(), self.resources.len());
                self.resources.push(ApplicationResource { target_ref, params });
            }
        }
    }

    pub fn len(&self) -> usize { self.resources.len() }
    pub fn is_empty(&self) -> bool { self.resources.is_empty() }

    pub fn into_resources(self) -> Vec<ApplicationResource> { self.resources }
}
