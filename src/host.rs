//! Main plug-in host implementation.

use std::sync::Arc;

use crate::config::{LoadPolicy, PluginConfig};
use crate::creator::Creator;
use crate::entry::{RegistryEntry, TypedRegistryEntry};
use crate::error::{HostError, Result};
use crate::family::{AbstractPluginPtr, PluginFamily, ViewerPtr};
use crate::info::Info;
use crate::module::ModuleHandle;
use crate::registry::Registry;
use crate::search::find_modules;
use crate::vrkit_status;

/// Outcome of scanning the search path for one plug-in family.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Full names of the entries added
    pub registered: Vec<String>,
    /// Full names already present in the registry
    pub duplicates: Vec<String>,
    /// Modules that did not become entries
    pub failed: Vec<(String, HostError)>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct ActivePlugin {
    name: Option<String>,
    plugin: AbstractPluginPtr,
}

/// Plug-in host owning the registry and the active plug-ins.
pub struct PluginHost {
    config: PluginConfig,
    // Declared before `registry`, whose modules hold the plug-ins' code.
    active: Vec<ActivePlugin>,
    registry: Registry,
}

impl PluginHost {
    pub fn new(config: PluginConfig) -> Self {
        Self {
            config,
            active: Vec::new(),
            registry: Registry::new(),
        }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    // === Discovery ===

    /// Load every module in the search path for `subdir` and register the
    /// ones that are valid plug-ins of family `F`.
    ///
    /// # Safety
    /// Opening a library runs its initialisation code, and its exported
    /// entry points are trusted to have the signatures `F` expects.
    pub unsafe fn scan<F: PluginFamily>(&mut self, subdir: &str) -> Result<ScanReport> {
        let search_path = self.config.search_path(subdir);
        tracing::debug!("Scanning {:?} for {} plug-ins", search_path, F::NAME);

        let mut report = ScanReport::default();
        for module in find_modules(&search_path) {
            let library = module.name().to_string();
            match self.add_module::<F>(module) {
                Ok((full_name, true)) => report.registered.push(full_name),
                Ok((full_name, false)) => {
                    tracing::debug!("{} duplicates {}", library, full_name);
                    report.duplicates.push(full_name);
                }
                Err(e) => match self.config.load_policy {
                    LoadPolicy::Skip => {
                        vrkit_status!("Skipping {} plug-in {}: {}", F::NAME, library, e);
                        report.failed.push((library, e));
                    }
                    LoadPolicy::Abort => return Err(e),
                },
            }
        }

        tracing::info!(
            "Registered {} {} plug-ins ({} failed)",
            report.registered.len(),
            F::NAME,
            report.failed.len()
        );
        Ok(report)
    }

    /// Validate `module` as family `F` and add it to the registry.
    ///
    /// Returns the entry's full name, or `None` if that name was already
    /// registered.
    pub fn register_module<F: PluginFamily>(&mut self, module: ModuleHandle) -> Result<Option<String>> {
        let (full_name, added) = self.add_module::<F>(module)?;
        Ok(added.then_some(full_name))
    }

    fn add_module<F: PluginFamily>(&mut self, module: ModuleHandle) -> Result<(String, bool)> {
        let entry = TypedRegistryEntry::<F>::new(module)?;
        let full_name = entry.info().full_name().to_string();
        let added = self.registry.add_entry(entry);
        Ok((full_name, added))
    }

    /// Register a plug-in compiled into the host.
    pub fn register_static<F: PluginFamily>(
        &mut self,
        info: Info,
        creator: &'static Creator<F::Plugin>,
    ) -> bool {
        self.registry
            .add_entry(TypedRegistryEntry::<F>::from_creator(info, creator))
    }

    // === Lifecycle ===

    /// Instantiate `type_id`, initialise it with `viewer` and keep it active.
    pub fn activate(&mut self, type_id: &str, viewer: &ViewerPtr) -> Result<AbstractPluginPtr> {
        let plugin = self.registry.make_instance(type_id)?;
        self.start(None, plugin, viewer)
    }

    /// Like [`activate`](Self::activate), recording the instance under `name`.
    pub fn activate_named(
        &mut self,
        type_id: &str,
        name: &str,
        viewer: &ViewerPtr,
    ) -> Result<AbstractPluginPtr> {
        let plugin = self.registry.make_named_instance(type_id, name)?;
        self.start(Some(name.to_string()), plugin, viewer)
    }

    fn start(
        &mut self,
        name: Option<String>,
        plugin: AbstractPluginPtr,
        viewer: &ViewerPtr,
    ) -> Result<AbstractPluginPtr> {
        let full_name = plugin.info().full_name().to_string();
        plugin
            .init(viewer)
            .map_err(|source| HostError::InitFailed {
                plugin: full_name.clone(),
                source,
            })?;

        tracing::info!("Activated plug-in {}", full_name);
        self.active.push(ActivePlugin {
            name,
            plugin: Arc::clone(&plugin),
        });
        Ok(plugin)
    }

    /// Update all active plug-ins in activation order.
    pub fn update_all(&self, viewer: &ViewerPtr) {
        for active in &self.active {
            active.plugin.update(viewer);
        }
    }

    /// Active plug-in recorded under `name` by [`activate_named`](Self::activate_named).
    pub fn active_by_name(&self, name: &str) -> Option<&AbstractPluginPtr> {
        self.active
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.plugin)
    }

    pub fn active(&self) -> impl Iterator<Item = &AbstractPluginPtr> {
        self.active.iter().map(|a| &a.plugin)
    }

    /// Drop all active plug-ins, most recently activated first.
    pub fn deactivate_all(&mut self) {
        while let Some(active) = self.active.pop() {
            tracing::debug!("Deactivated plug-in {}", active.plugin.info().full_name());
        }
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.deactivate_all();
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new(PluginConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{GetCreatorFn, GetInfoFn};
    use crate::family::{AbstractPlugin, MoveStrategy, MoveStrategyFamily};
    use crate::module::Module;
    use crate::validation::{InterfaceVersionFn, INFO_SYMBOL, INTERFACE_VERSION_SYMBOL};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{LazyLock, Mutex};

    /// Frame log shared with the test plug-ins through the viewer handle.
    #[derive(Default)]
    struct FakeViewer {
        log: Mutex<Vec<String>>,
    }

    struct Follow {
        info: Info,
        updates: AtomicUsize,
        fail_init: bool,
    }

    impl AbstractPlugin for Follow {
        fn info(&self) -> &Info {
            &self.info
        }

        fn init(&self, viewer: &ViewerPtr) -> std::result::Result<(), crate::BoxError> {
            if self.fail_init {
                return Err("no device".into());
            }
            if let Some(viewer) = viewer.downcast_ref::<FakeViewer>() {
                viewer.log.lock().unwrap().push(format!("init {}", self.info.name()));
            }
            Ok(())
        }

        fn update(&self, viewer: &ViewerPtr) {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if let Some(viewer) = viewer.downcast_ref::<FakeViewer>() {
                viewer.log.lock().unwrap().push(format!("update {}", self.info.name()));
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl MoveStrategy for Follow {}

    fn creator(info: Info, fail_init: bool) -> &'static Creator<dyn MoveStrategy> {
        Box::leak(Box::new(Creator::<dyn MoveStrategy>::new(move || {
            Arc::new(Follow {
                info: info.clone(),
                updates: AtomicUsize::new(0),
                fail_init,
            })
        })))
    }

    fn viewer() -> (Arc<FakeViewer>, ViewerPtr) {
        let fake = Arc::new(FakeViewer::default());
        let ptr: ViewerPtr = fake.clone();
        (fake, ptr)
    }

    fn host() -> PluginHost {
        PluginHost::new(PluginConfig::new("/nonexistent/vrkit/plugins"))
    }

    #[test]
    fn test_activate_and_update_in_order() {
        let mut host = host();
        let a = Info::new("vrkit", "A", [1, 0, 0]);
        let b = Info::new("vrkit", "B", [1, 0, 0]);
        assert!(host.register_static::<MoveStrategyFamily>(a.clone(), creator(a, false)));
        assert!(host.register_static::<MoveStrategyFamily>(b.clone(), creator(b, false)));

        let (fake, viewer) = viewer();
        host.activate("vrkit.B", &viewer).unwrap();
        host.activate_named("vrkit.A", "primary", &viewer).unwrap();
        host.update_all(&viewer);

        assert_eq!(
            *fake.log.lock().unwrap(),
            vec!["init vrkit.B", "init vrkit.A", "update vrkit.B", "update vrkit.A"]
        );
        assert_eq!(
            host.active_by_name("primary").unwrap().info().name(),
            "vrkit.A"
        );
        assert!(host.registry().instance_by_name("primary").is_ok());

        host.deactivate_all();
        assert_eq!(host.active().count(), 0);
    }

    #[test]
    fn test_init_failure_is_not_activated() {
        let mut host = host();
        let info = Info::new("vrkit", "Broken", [1, 0, 0]);
        host.register_static::<MoveStrategyFamily>(info.clone(), creator(info, true));

        let (_fake, viewer) = viewer();
        let err = host.activate("vrkit.Broken", &viewer).err().unwrap();
        assert!(matches!(err, HostError::InitFailed { .. }));
        assert_eq!(host.active().count(), 0);
    }

    fn module_info() -> &'static Info {
        static INFO: LazyLock<Info> = LazyLock::new(|| Info::new("vrkit", "Loaded", [2, 0, 0]));
        &INFO
    }

    fn module_creator() -> &'static dyn crate::CreatorBase {
        static CREATOR: LazyLock<Creator<dyn MoveStrategy>> = LazyLock::new(|| {
            Creator::<dyn MoveStrategy>::new(|| {
                Arc::new(Follow {
                    info: module_info().clone(),
                    updates: AtomicUsize::new(0),
                    fail_init: false,
                })
            })
        });
        &*CREATOR
    }

    fn v2_1(major: &mut u32, minor: &mut u32) {
        *major = 2;
        *minor = 1;
    }

    fn v3_0(major: &mut u32, minor: &mut u32) {
        *major = 3;
        *minor = 0;
    }

    fn module(version: InterfaceVersionFn) -> ModuleHandle {
        unsafe {
            Module::from_symbols(
                "libfollow.so",
                [
                    (INFO_SYMBOL, module_info as GetInfoFn as *const ()),
                    (
                        MoveStrategyFamily::CREATOR_SYMBOL,
                        module_creator as GetCreatorFn as *const (),
                    ),
                    (INTERFACE_VERSION_SYMBOL, version as *const ()),
                ],
            )
        }
    }

    #[test]
    fn test_register_module() {
        let mut host = host();
        let registered = host.register_module::<MoveStrategyFamily>(module(v2_1)).unwrap();
        assert_eq!(registered.as_deref(), Some("vrkit.Loaded:2.0.0"));
        assert_eq!(
            host.register_module::<MoveStrategyFamily>(module(v2_1)).unwrap(),
            None
        );

        let err = host
            .register_module::<MoveStrategyFamily>(module(v3_0))
            .unwrap_err();
        assert!(err.is_interface_error());
        assert_eq!(host.registry().len(), 1);

        let (_fake, viewer) = viewer();
        let plugin = host.activate("vrkit.Loaded", &viewer).unwrap();
        host.update_all(&viewer);
        let follow = plugin.as_any().downcast_ref::<Follow>().unwrap();
        assert_eq!(follow.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scan_missing_directories() {
        let mut host = host();
        let report = unsafe { host.scan::<MoveStrategyFamily>("move") }.unwrap();
        assert!(report.registered.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_scan_policy() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("move");
        std::fs::create_dir(&dir).unwrap();
        let bogus = format!("bogus.{}", crate::search::library_extension());
        std::fs::write(dir.join(&bogus), b"not a library").unwrap();

        // A file that fails to open is dropped by discovery under either
        // policy; only validation failures reach the policy.
        let mut host = PluginHost::new(
            PluginConfig::new(temp.path())
                .with_base_dir(temp.path().join("none"))
                .with_load_policy(LoadPolicy::Abort),
        );
        let report = unsafe { host.scan::<MoveStrategyFamily>("move") }.unwrap();
        assert!(report.registered.is_empty());
        assert!(host.registry().is_empty());
    }

    type DropLog = Arc<Mutex<Vec<&'static str>>>;

    struct Tracked {
        info: Info,
        log: DropLog,
    }

    impl AbstractPlugin for Tracked {
        fn info(&self) -> &Info {
            &self.info
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("plugin");
        }
    }

    struct TrackedEntry {
        info: Info,
        log: DropLog,
    }

    impl RegistryEntry for TrackedEntry {
        fn info(&self) -> &Info {
            &self.info
        }

        fn module(&self) -> Option<&ModuleHandle> {
            None
        }

        fn create(&self) -> Result<AbstractPluginPtr> {
            Ok(Arc::new(Tracked {
                info: self.info.clone(),
                log: self.log.clone(),
            }))
        }
    }

    impl Drop for TrackedEntry {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("entry");
        }
    }

    #[test]
    fn test_dropping_host_releases_active_plugins_first() {
        let log = DropLog::default();
        let mut host = host();
        host.registry_mut().add_entry(TrackedEntry {
            info: Info::new("vrkit", "Tracked", [1, 0, 0]),
            log: log.clone(),
        });

        let (_fake, viewer) = viewer();
        host.activate("vrkit.Tracked", &viewer).unwrap();
        host.activate_named("vrkit.Tracked", "second", &viewer).unwrap();
        assert_eq!(host.active().count(), 2);

        drop(host);
        assert_eq!(*log.lock().unwrap(), vec!["plugin", "plugin", "entry"]);
    }
}
