//! Name-to-slot registry for per-sample counters.
//!
//! Every [`crate::summary::SampleSummary`] under one summary stores its
//! counters as a plain vector indexed by the slots handed out here, so all
//! samples stay key-compatible as long as slots are only ever appended.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterRegistry {
    names: Vec<String>,
    slots: HashMap<String, usize>,
}

/// Outcome of [`CounterRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Name already known.
    Existing(usize),
    /// Name appended; every sample must grow by one zeroed slot.
    Added(usize),
}

impl Registration {
    pub fn slot(self) -> usize {
        match self {
            Registration::Existing(slot) | Registration::Added(slot) => slot,
        }
    }
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name);
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>) -> Registration {
        let name = name.into();
        if let Some(&slot) = self.slots.get(&name) {
            return Registration::Existing(slot);
        }
        let slot = self.names.len();
        self.slots.insert(name.clone(), slot);
        self.names.push(name);
        Registration::Added(slot)
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Counter names in slot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
