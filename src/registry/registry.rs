// src/registry/registry.rs
use super::descriptor::{ProbeDescriptor, TagFilter};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a probe named '{0}' is already registered")]
    DuplicateName(String),
}

/// Registered probes in registration order.
///
/// Readers load an immutable snapshot without locking; registration swaps
/// in a new copy, so `select` never contends with request volume.
pub struct ProbeRegistry {
    descriptors: ArcSwap<Vec<Arc<ProbeDescriptor>>>,
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.descriptors.load().iter().map(|d| d.name.clone()).collect();
        f.debug_struct("ProbeRegistry").field("descriptors", &names).finish()
    }
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Fails without touching the registry if the name is taken.
    pub fn register(&self, descriptor: ProbeDescriptor) -> Result<(), RegistryError> {
        let descriptor = Arc::new(descriptor);
        let mut duplicate = false;

        self.descriptors.rcu(|current| {
            duplicate = current.iter().any(|d| d.name == descriptor.name);
            if duplicate {
                return Arc::clone(current);
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(descriptor.clone());
            Arc::new(next)
        });

        if duplicate {
            return Err(RegistryError::DuplicateName(descriptor.name.clone()));
        }

        info!(
            "Registered probe '{}' ({}) with tags {:?}",
            descriptor.name,
            descriptor.probe.kind(),
            descriptor.tags
        );
        Ok(())
    }

    /// Descriptors whose tags satisfy `filter`, in registration order.
    pub fn select(&self, filter: &TagFilter) -> Vec<Arc<ProbeDescriptor>> {
        self.descriptors
            .load()
            .iter()
            .filter(|d| filter.matches(&d.tags))
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProbeDescriptor>> {
        self.descriptors
            .load()
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors.load().iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::LivenessProbe;
    use std::time::Duration;

    #[test]
    fn test_select_all_preserves_registration_order() {
        let registry = ProbeRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(ProbeDescriptor::new(name, LivenessProbe)).unwrap();
        }

        let names: Vec<_> = registry
            .select(&TagFilter::all())
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicate_name_keeps_first_registration() {
        let registry = ProbeRegistry::new();
        registry
            .register(
                ProbeDescriptor::new("SqlServer", LivenessProbe)
                    .with_tags(["db"])
                    .with_timeout(Duration::from_secs(1)),
            )
            .unwrap();

        let err = registry
            .register(ProbeDescriptor::new("SqlServer", LivenessProbe).with_tags(["other"]))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("SqlServer".into()));

        assert_eq!(registry.len(), 1);
        let kept = registry.get("SqlServer").unwrap();
        assert!(kept.has_tag("db"));
        assert_eq!(kept.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_snapshot_unaffected_by_later_registration() {
        let registry = ProbeRegistry::new();
        registry.register(ProbeDescriptor::new("ping", LivenessProbe)).unwrap();

        let before = registry.select(&TagFilter::all());
        registry.register(ProbeDescriptor::new("late", LivenessProbe)).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(registry.select(&TagFilter::all()).len(), 2);
    }
}
