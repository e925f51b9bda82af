// src/registry/mod.rs
mod descriptor;
mod registry;

pub use descriptor::{ProbeDescriptor, TagFilter};
pub use registry::{ProbeRegistry, RegistryError};
