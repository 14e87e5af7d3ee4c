use thiserror::Error;

use crate::job::Job;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("cannot delete the last remaining tab")]
    LastTab,
    #[error("no tab named '{0}'")]
    UnknownTab(String),
}

/// A named, independently-evaluated session slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub name: String,
    pub job: Option<Job>,
}

/// Creation-ordered mapping of tab name to job state.
///
/// Invariant: never empty — deleting the sole tab is rejected. Generated
/// names come from a counter that survives deletions, so `Tab N` names
/// stay unique under out-of-order deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    active: String,
    next_tab_number: u64,
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TabRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tabs: Vec::new(),
            active: String::new(),
            next_tab_number: 1,
        };
        registry.add_tab();
        registry
    }

    /// Create a tab with a generated unique name and make it active.
    pub fn add_tab(&mut self) -> String {
        let name = format!("Tab {}", self.next_tab_number);
        self.next_tab_number += 1;

        self.tabs.push(Tab {
            name: name.clone(),
            job: None,
        });
        self.active = name.clone();
        name
    }

    /// Remove a tab. Deleting the sole remaining tab is a rejected no-op.
    /// Deleting the active tab activates the last remaining tab.
    pub fn delete_tab(&mut self, name: &str) -> Result<(), RegistryError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownTab(name.to_string()))?;
        if self.tabs.len() == 1 {
            return Err(RegistryError::LastTab);
        }

        self.tabs.remove(index);
        if self.active == name {
            // Last-in-map by convention; any deterministic pick would do.
            self.active = self
                .tabs
                .last()
                .map(|tab| tab.name.clone())
                .unwrap_or_default();
        }
        Ok(())
    }

    /// Pure state change; no side effect on jobs.
    pub fn set_active(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.index_of(name).is_none() {
            return Err(RegistryError::UnknownTab(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn tab_names(&self) -> Vec<&str> {
        self.tabs.iter().map(|tab| tab.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.tabs
            .iter()
            .find(|tab| tab.name == name)
            .and_then(|tab| tab.job.as_ref())
    }

    /// Scoped mutation of one tab's job slot.
    ///
    /// The closure always sees the latest state under the registry's
    /// lock discipline, so racing callbacks cannot lose updates to a
    /// stale copy. Updates to a non-active tab are legal: jobs keep
    /// running in background tabs.
    pub fn with_job_mut<R>(
        &mut self,
        name: &str,
        apply: impl FnOnce(&mut Option<Job>) -> R,
    ) -> Result<R, RegistryError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| RegistryError::UnknownTab(name.to_string()))?;
        Ok(apply(&mut self.tabs[index].job))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.name == name)
    }
}
