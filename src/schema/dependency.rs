use std::collections::BTreeMap;

use crate::foundation::value::{Descriptor, Value};

/// Parameter bifurcation rules ("associations" in the schema file).
///
/// Maps a dependent parameter to its controllers and, per controller, the values for which the
/// dependent parameter is enumerated. All controllers of a dependent must pass (AND). Only a
/// single level is honoured: a controller that is itself dependent never unlocks anything.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph(BTreeMap<String, BTreeMap<String, Vec<Value>>>);

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate `dependent` only while `controller` takes one of `allowed`.
    ///
    /// Repeating a controller for the same dependent replaces its allowed set.
    pub fn assign(
        &mut self,
        dependent: impl Into<String>,
        controller: impl Into<String>,
        allowed: Vec<Value>,
    ) {
        self.0
            .entry(dependent.into())
            .or_default()
            .insert(controller.into(), allowed);
    }

    /// `true` when `name` has at least one controller.
    pub fn is_dependent(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|c| !c.is_empty())
    }

    /// Names of all dependent parameters.
    pub fn dependents(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(k, _)| k.as_str())
    }

    /// Controllers of `dependent` with their allowed values.
    pub fn controllers(&self, dependent: &str) -> impl Iterator<Item = (&str, &[Value])> {
        self.0
            .get(dependent)
            .into_iter()
            .flat_map(|c| c.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
    }

    /// Whether `dependent` is enumerated under the controller values in `assigned`.
    ///
    /// A controller missing from `assigned` keeps the dependent locked.
    pub fn is_unlocked(&self, dependent: &str, assigned: &Descriptor) -> bool {
        self.controllers(dependent).all(|(controller, allowed)| {
            assigned
                .get(controller)
                .is_some_and(|value| allowed.contains(value))
        })
    }

    /// Number of dependent parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when there are no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schema/dependency.rs"]
mod tests;
