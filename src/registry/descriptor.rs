// src/registry/descriptor.rs
use crate::probe::Probe;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A registered probe: unique name, tags, optional timeout override.
#[derive(Clone)]
pub struct ProbeDescriptor {
    pub name: String,
    pub tags: BTreeSet<String>,
    /// `None` falls back to the executor's default timeout.
    pub timeout: Option<Duration>,
    pub probe: Arc<dyn Probe>,
}

impl ProbeDescriptor {
    pub fn new(name: impl Into<String>, probe: impl Probe + 'static) -> Self {
        Self::from_arc(name, Arc::new(probe))
    }

    pub fn from_arc(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            timeout: None,
            probe,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Debug for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.probe.kind())
            .field("tags", &self.tags)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Predicate over a descriptor's tag set.
#[derive(Clone, Default)]
pub enum TagFilter {
    #[default]
    All,
    /// Matches when the probe carries at least one of these tags.
    Any(BTreeSet<String>),
    Predicate(Arc<dyn Fn(&BTreeSet<String>) -> bool + Send + Sync>),
}

impl TagFilter {
    pub fn all() -> Self {
        TagFilter::All
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        TagFilter::Any(BTreeSet::from([tag.into()]))
    }

    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagFilter::Any(tags.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&BTreeSet<String>) -> bool + Send + Sync + 'static,
    {
        TagFilter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Any(wanted) => !wanted.is_disjoint(tags),
            TagFilter::Predicate(f) => f(tags),
        }
    }
}

impl fmt::Debug for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagFilter::All => f.write_str("All"),
            TagFilter::Any(tags) => f.debug_tuple("Any").field(tags).finish(),
            TagFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
