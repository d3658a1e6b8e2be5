//! Plug-in registry: entries by full name, instances and their
//! dependencies.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entry::RegistryEntry;
use crate::error::{HostError, Result};
use crate::family::AbstractPluginPtr;
use crate::info::{Info, INFO_SEPARATOR};
use crate::module::ModuleHandle;
use crate::signal::Signal;

/// Notifications emitted by the [`Registry`].
#[derive(Debug, Default)]
pub struct RegistrySignals {
    /// A new entry was added
    pub module_registered: Signal<Info>,
    /// An entry was removed
    pub module_removed: Signal<Info>,
    /// An instance was created and recorded
    pub plugin_instantiated: Signal<AbstractPluginPtr>,
}

struct InstanceRecord {
    plugin: AbstractPluginPtr,
    // Dropped after `plugin` so the code stays mapped while it is released.
    _module: Option<ModuleHandle>,
}

/// Registry of plug-in entries and the instances made from them.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Arc<dyn RegistryEntry>>,
    instances: HashMap<String, Vec<InstanceRecord>>,
    named: HashMap<String, AbstractPluginPtr>,
    signals: RegistrySignals,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. An entry whose full name is already registered is
    /// ignored and `false` is returned.
    pub fn add_entry<E: RegistryEntry + 'static>(&mut self, entry: E) -> bool {
        self.add_shared_entry(Arc::new(entry))
    }

    pub fn add_shared_entry(&mut self, entry: Arc<dyn RegistryEntry>) -> bool {
        let full_name = entry.info().full_name();
        if self.entry(full_name).is_some() {
            tracing::debug!("Ignoring duplicate registry entry {}", full_name);
            return false;
        }

        tracing::info!("Registered plug-in {}", full_name);
        let info = entry.info().clone();
        self.entries.push(entry);
        self.signals.module_registered.emit(&info);
        true
    }

    /// Remove the entry with this full name. The module is unloaded once
    /// nothing else holds it.
    pub fn remove_entry(&mut self, full_name: &str) -> bool {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.info().full_name() == full_name)
        else {
            return false;
        };

        let entry = self.entries.remove(pos);
        tracing::info!("Removed plug-in {}", full_name);
        self.signals.module_removed.emit(entry.info());
        true
    }

    /// Entry with exactly this full name.
    pub fn entry(&self, full_name: &str) -> Option<&Arc<dyn RegistryEntry>> {
        self.entries
            .iter()
            .find(|e| e.info().full_name() == full_name)
    }

    /// Entry by full name, else the newest version whose name matches the
    /// part of `type_id` before the version separator.
    pub fn find_entry(&self, type_id: &str) -> Option<&Arc<dyn RegistryEntry>> {
        self.entry(type_id).or_else(|| {
            let name = type_name(type_id);
            self.entries
                .iter()
                .filter(|e| name_matches(e.info(), name))
                .max_by_key(|e| *e.info().version())
        })
    }

    pub fn entries(&self) -> &[Arc<dyn RegistryEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn signals(&self) -> &RegistrySignals {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut RegistrySignals {
        &mut self.signals
    }

    /// Create an instance of the plug-in identified by `type_id`.
    ///
    /// Dependencies that have no instance yet are instantiated first.
    pub fn make_instance(&mut self, type_id: &str) -> Result<AbstractPluginPtr> {
        let mut in_progress = Vec::new();
        self.instantiate(type_id, &mut in_progress)
    }

    /// Like [`make_instance`](Self::make_instance), also recording the
    /// instance under `name`.
    pub fn make_named_instance(&mut self, type_id: &str, name: &str) -> Result<AbstractPluginPtr> {
        let plugin = self.make_instance(type_id)?;
        self.named.insert(name.to_string(), plugin.clone());
        Ok(plugin)
    }

    pub fn instance_by_info(&self, info: &Info) -> Result<AbstractPluginPtr> {
        self.instance_by_type(info.full_name())
    }

    /// Instance by full name, else an instance of the newest version whose
    /// name matches.
    pub fn instance_by_type(&self, type_id: &str) -> Result<AbstractPluginPtr> {
        self.find_instance(type_id)
            .ok_or_else(|| HostError::InstanceNotFound(type_id.to_string()))
    }

    pub fn instance_by_name(&self, name: &str) -> Result<AbstractPluginPtr> {
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::InstanceNotFound(name.to_string()))
    }

    fn find_instance(&self, type_id: &str) -> Option<AbstractPluginPtr> {
        if let Some(record) = self.instances.get(type_id).and_then(|r| r.first()) {
            return Some(record.plugin.clone());
        }

        let name = type_name(type_id);
        self.instances
            .values()
            .filter_map(|records| records.first())
            .filter(|r| name_matches(r.plugin.info(), name))
            .max_by_key(|r| *r.plugin.info().version())
            .map(|r| r.plugin.clone())
    }

    fn instantiate(
        &mut self,
        type_id: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<AbstractPluginPtr> {
        let entry = self
            .find_entry(type_id)
            .cloned()
            .ok_or_else(|| HostError::EntryNotFound(type_id.to_string()))?;
        let full_name = entry.info().full_name().to_string();

        if in_progress.contains(&full_name) {
            let mut cycle = in_progress.join(" -> ");
            cycle.push_str(" -> ");
            cycle.push_str(&full_name);
            return Err(HostError::CircularDependency(cycle));
        }

        in_progress.push(full_name.clone());
        self.satisfy_deps(&entry, in_progress)?;
        in_progress.pop();

        let plugin = entry.create()?;
        tracing::info!("Instantiated plug-in {}", full_name);

        self.instances
            .entry(full_name)
            .or_default()
            .push(InstanceRecord {
                plugin: plugin.clone(),
                _module: entry.module().cloned(),
            });
        self.signals.plugin_instantiated.emit(&plugin);

        Ok(plugin)
    }

    fn satisfy_deps(
        &mut self,
        entry: &Arc<dyn RegistryEntry>,
        in_progress: &mut Vec<String>,
    ) -> Result<()> {
        let plugin = entry.info().full_name();

        for dependency in entry.info().dependencies() {
            if self.find_instance(dependency).is_some() {
                continue;
            }

            if self.find_entry(dependency).is_none() {
                return Err(HostError::DependencyNotFound {
                    plugin: plugin.to_string(),
                    dependency: dependency.clone(),
                });
            }

            tracing::debug!("Instantiating dependency {} of {}", dependency, plugin);

            match self.instantiate(dependency, in_progress) {
                Ok(_) => {}
                Err(e @ HostError::CircularDependency(_)) => return Err(e),
                Err(e) => {
                    return Err(HostError::DependencyFailed {
                        plugin: plugin.to_string(),
                        dependency: dependency.clone(),
                        source: Box::new(e),
                    })
                }
            }
        }

        Ok(())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // Instances go first: their code lives in the entries' modules.
        self.named.clear();
        self.instances.clear();
        self.entries.clear();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|e| e.info().full_name())
                    .collect::<Vec<_>>(),
            )
            .field("instances", &self.instances.len())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn type_name(type_id: &str) -> &str {
    type_id
        .split_once(INFO_SEPARATOR)
        .map_or(type_id, |(name, _)| name)
}

fn name_matches(info: &Info, name: &str) -> bool {
    info.name() == name || type_name(info.full_name()) == name
}
