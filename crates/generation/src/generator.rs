//! Builds a complete experiment for an application.

use anyhow::{bail, Context, Result};
use knob_application::{experiment_name, Application};
use knob_core::{Experiment, LABEL_APPLICATION, LABEL_SCENARIO};
use knob_resmap::ResourceMap;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::objectives::objective_metrics;
use crate::scanner::{populate, Scanner};

/// The generated experiment, plus the scanned manifests when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub experiment: Experiment,
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    pub application: Application,
    pub include_resources: bool,
}

impl Generator {
    pub fn new(application: Application) -> Self { Self { application, include_resources: false } }

    /// Loads the application's resources relative to its working directory.
    pub fn generate(&self) -> Result<Generated> {
        let dir = self.application.working_directory();
        let map = ResourceMap::load(&dir, &self.application.resources)
            .with_context(|| format!("load resources of application '{}'", self.application.name()))?;
        self.generate_from(&map)
    }

    pub fn generate_from(&self, map: &ResourceMap) -> Result<Generated> {
        let mut app = self.application.clone();

        let mut exp = Experiment::named(experiment_name(&app));
        exp.metadata.namespace = app.namespace().to_string();
        exp.metadata.labels.insert(LABEL_APPLICATION.to_string(), app.name().to_string());
        if let [scenario] = app.scenarios.as_slice() {
            exp.metadata.labels.insert(LABEL_SCENARIO.to_string(), scenario.name.clone());
        }

        let resources = Scanner::for_application(&app).scan(map)?;
        populate(&resources, &mut exp)?;
        exp.spec.metrics = objective_metrics(&mut app.objectives)?;

        if exp.spec.parameters.is_empty() {
            if map.is_empty() { bail!("the application did not match any resources"); }
            bail!("invalid experiment, no parameters found while scanning {} resources", map.len());
        }
        if exp.spec.metrics.is_empty() {
            bail!("invalid experiment, no metrics found");
        }

        // Baselines are all or nothing
        if exp.spec.parameters.iter().any(|p| p.baseline.is_none()) {
            debug!("not every parameter has a baseline, clearing baselines");
            for p in exp.spec.parameters.iter_mut() {
                p.baseline = None;
            }
        }

        info!(
            experiment = %exp.metadata.name,
            parameters = exp.spec.parameters.len(),
            metrics = exp.spec.metrics.len(),
            patches = exp.spec.patches.len(),
            "experiment generated"
        );
        let resources = if self.include_resources { map.iter().map(|d| d.node.clone()).collect() } else { Vec::new() };
        Ok(Generated { experiment: exp, resources })
    }
}
