//! Step registry - ordered mapping from step name to state.
//!
//! Insertion order is display order, and it survives a JSON round-trip
//! because the registry (de)serializes itself as an ordered map.

use crate::step::StepState;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Ordered collection of steps keyed by unique name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepRegistry {
    entries: Vec<(String, StepState)>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry of fresh steps. Duplicate names are kept once.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_states(names.into_iter().map(|n| (n.into(), StepState::default())))
    }

    /// Create a registry from pre-populated states. A later duplicate replaces
    /// the earlier state but keeps its position.
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = (String, StepState)>,
    {
        let mut registry = Self::new();
        for (name, state) in states {
            registry.insert(name, state);
        }
        registry
    }

    /// Insert or replace a step.
    pub fn insert(&mut self, name: String, state: StepState) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = state,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, state));
            }
        }
    }

    /// Whether a step exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get a step.
    pub fn get(&self, name: &str) -> Option<&StepState> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Get a step mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut StepState> {
        let i = *self.index.get(name)?;
        Some(&mut self.entries[i].1)
    }

    /// Iterate in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepState)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Iterate mutably in registry order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut StepState)> {
        self.entries.iter_mut().map(|(n, s)| (n.as_str(), s))
    }

    /// Step names in registry order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no steps.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed steps.
    pub fn completed_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.completed).count()
    }

    /// Sum of attempts across steps.
    pub fn total_attempts(&self) -> u64 {
        self.entries.iter().map(|(_, s)| s.attempts as u64).sum()
    }

    /// Percentage of completed steps in [0, 100]; 0 when empty.
    pub fn completion_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.entries.len() as f64 * 100.0
    }

    /// Mean score over completed steps that have one.
    pub fn average_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .entries
            .iter()
            .filter(|(_, s)| s.completed)
            .filter_map(|(_, s)| s.score)
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    /// Names of steps not yet completed, in order.
    pub fn incomplete_steps(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, s)| !s.completed)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// First incomplete step.
    pub fn current_step(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, s)| !s.completed)
            .map(|(n, _)| n.as_str())
    }
}

impl Serialize for StepRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, state) in &self.entries {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StepRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = StepRegistry;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of step name to step state")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StepRegistry, A::Error> {
                let mut registry = StepRegistry::new();
                while let Some((name, state)) = access.next_entry::<String, StepState>()? {
                    registry.insert(name, state);
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}
