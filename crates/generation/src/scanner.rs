//! Drives the selectors over a resource map and turns the result into
//! experiment parameters and patches.

use anyhow::{Context, Result};
use knob_application::Application;
use knob_core::Experiment;
use knob_resmap::ResourceMap;
use metrics::counter;
use tracing::{debug, info};

use crate::naming::NamingPolicy;
use crate::patch::{build_patch, extract_parameters};
use crate::resource::{ApplicationResource, ResourceAccumulator};
use crate::selector::{default_selectors, ContainerResourcesSelector, ParameterSelector, ReplicaSelector};

/// Runs one selector over every matching document, merging what it finds into `acc`.
pub fn scan<S: ParameterSelector + ?Sized>(acc: &mut ResourceAccumulator, map: &ResourceMap, selector: &S) -> Result<()> {
    let matcher = selector.selector().compile()?;
    for doc in map.select(&matcher) {
        counter!("scan_documents_total", 1);
        let target = doc.meta.object_reference();
        let params = selector.find_parameters(&doc.node).with_context(|| format!("scan {}", target))?;
        if params.is_empty() {
            counter!("scan_skipped_total", 1);
            debug!(target = %target, "no parameters found");
            continue;
        }
        counter!("scan_parameters_total", params.len() as u64);
        acc.merge_or_append(target, params);
    }
    Ok(())
}

/// Adds the patches and parameters of `resources` to the experiment.
pub fn populate(resources: &[ApplicationResource], exp: &mut Experiment) -> Result<()> {
    let policy = NamingPolicy::compute(resources);
    debug!(needs_kind = policy.needs_kind, needs_name = policy.needs_name, "naming policy");
    for r in resources {
        exp.spec.patches.push(build_patch(r, policy)?);
        exp.spec.parameters.extend(extract_parameters(r, policy));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct Scanner {
    pub container_resources: Vec<ContainerResourcesSelector>,
    pub replicas: Vec<ReplicaSelector>,
}

impl Scanner {
    pub fn for_application(app: &Application) -> Self {
        let (container_resources, replicas) = default_selectors(app);
        Self { container_resources, replicas }
    }

    /// Container resources first, then replicas.
    pub fn scan(&self, map: &ResourceMap) -> Result<Vec<ApplicationResource>> {
        let mut acc = ResourceAccumulator::new();
        for s in &self.container_resources {
            scan(&mut acc, map, s)?;
        }
        for s in &self.replicas {
            scan(&mut acc, map, s)?;
        }
        info!(documents = map.len(), resources = acc.len(), "scan complete");
        Ok(acc.into_resources())
    }

    pub fn scan_into(&self, map: &ResourceMap, exp: &mut Experiment) -> Result<()> {
        let resources = self.scan(map)?;
        populate(&resources, exp)
    }
}
