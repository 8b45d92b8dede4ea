//! Explicit registry of device kinds.

use crate::device::{DeviceHost, DeviceLogic, NodeBehavior};
use std::collections::BTreeMap;
use std::fmt;

type Factory = Box<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

/// Maps a node-type identifier to a constructor for its device logic.
///
/// Device modules register themselves at startup; topologies refer to them
/// by identifier.
#[derive(Default)]
pub struct DeviceRegistry {
    factories: BTreeMap<String, Factory>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `node_type`, replacing any earlier entry.
    pub fn register<D, F>(&mut self, node_type: impl Into<String>, factory: F)
    where
        D: DeviceLogic,
        F: Fn() -> D + Send + Sync + 'static,
    {
        self.factories.insert(
            node_type.into(),
            Box::new(move || Box::new(DeviceHost::new(factory())) as Box<dyn NodeBehavior>),
        );
    }

    /// Register a device kind constructed with `Default`.
    pub fn register_default<D>(&mut self, node_type: impl Into<String>)
    where
        D: DeviceLogic + Default,
    {
        self.register(node_type, D::default);
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Registered identifiers, sorted.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn instantiate(&self, node_type: &str) -> Option<Box<dyn NodeBehavior>> {
        self.factories.get(node_type).map(|factory| factory())
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("node_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
