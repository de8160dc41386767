//! Knob experiment generation: finds tunable fields in Kubernetes manifests,
//! names them, and renders the patches and parameters of an experiment.

#![forbid(unsafe_code)]

pub mod generator;
pub mod naming;
pub mod node;
pub mod objectives;
pub mod patch;
pub mod quantity;
pub mod resource;
pub mod scanner;
pub mod selector;

pub use generator::{Generated, Generator};
pub use naming::{NamingPolicy, ParameterNamer, ResourceNamingPolicy};
pub use node::{ContainerResourcesNode, ParameterNode, ReplicasNode};
pub use patch::{build_patch, extract_parameters};
pub use resource::{ApplicationResource, ResourceAccumulator};
pub use scanner::{scan, Scanner};
pub use selector::{default_selectors, ContainerResourcesSelector, ParameterSelector, ReplicaSelector};
