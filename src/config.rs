//! Plug-in host configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::search::{build_search_path, plugin_base_dir, search_path_under, LOCAL_PLUGINS_DIR};

/// What a scan does with a module that fails to become a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Report the module and keep scanning
    #[default]
    Skip,
    /// Stop at the first failure
    Abort,
}

/// Configuration for the plug-in host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Installed plug-in base directory
    pub plugins_dir: PathBuf,

    /// Directory searched before `plugins_dir` (None = `./plugins`)
    pub base_dir: Option<PathBuf>,

    /// Also search the `debug` subdirectory of every root
    pub search_debug: bool,

    /// Handling of modules that fail validation
    pub load_policy: LoadPolicy,

    /// Additional roots searched as-is, after the family subdirectories
    pub extra_roots: Vec<PathBuf>,
}

impl PluginConfig {
    /// Create a configuration rooted at `plugins_dir`.
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            base_dir: None,
            search_debug: false,
            load_policy: LoadPolicy::default(),
            extra_roots: Vec::new(),
        }
    }

    /// Set the directory searched before the installed plug-ins.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_search_debug(mut self, search_debug: bool) -> Self {
        self.search_debug = search_debug;
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Add an extra search root.
    pub fn with_extra_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extra_roots.push(root.into());
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Search path for the plug-in family living in `subdir`.
    pub fn search_path(&self, subdir: &str) -> Vec<PathBuf> {
        let local = self
            .base_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(LOCAL_PLUGINS_DIR));

        let mut path = search_path_under([local, self.plugins_dir.clone()], &[subdir], self.search_debug);
        path.extend(build_search_path(&self.extra_roots, self.search_debug));
        path
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        let plugins_dir = plugin_base_dir().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vrkit")
                .join("plugins")
        });

        Self::new(plugins_dir)
    }
}
