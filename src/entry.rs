//! Registry entries: a validated module, its cached info and a way to create
//! plug-in instances from it.

use std::sync::Arc;

use crate::creator::{Creator, CreatorBase};
use crate::error::{BoxError, HostError, Result};
use crate::family::{AbstractPluginPtr, PluginFamily};
use crate::info::Info;
use crate::module::{Module, ModuleHandle};
use crate::validation::INFO_SYMBOL;

/// Signature of the info entry point.
pub type GetInfoFn = fn() -> &'static Info;

/// Signature of a family's creator entry point.
pub type GetCreatorFn = fn() -> &'static dyn CreatorBase;

type InitFn<P> = dyn Fn(&P) -> std::result::Result<(), BoxError> + Send + Sync;

/// Object-safe view of a registry entry, independent of its family.
pub trait RegistryEntry: Send + Sync {
    fn info(&self) -> &Info;

    /// The module the entry was built from, `None` for static entries.
    fn module(&self) -> Option<&ModuleHandle>;

    /// Create a new plug-in instance.
    fn create(&self) -> Result<AbstractPluginPtr>;
}

/// Resolve a module's creator entry point by name and return the creator it
/// hands out.
///
/// The creator lives in the module's memory, so it is borrowed from `module`.
pub fn get_creator_func<'m>(module: &'m Module, name: &str) -> Result<&'m dyn CreatorBase> {
    // SAFETY: creator entry points are generated with this signature by
    // `export_plugin!`.
    let get_creator = unsafe { module.get_function::<GetCreatorFn>(name)? };
    Ok(get_creator())
}

enum CreatorSource<P: ?Sized + 'static> {
    Module(ModuleHandle),
    Static(&'static Creator<P>),
}

/// Registry entry for plug-ins of family `F`.
///
/// Building the entry validates the module and reads its [`Info`] once.
/// The creator is looked up each time an instance is made, always from the
/// same module the info came from.
pub struct TypedRegistryEntry<F: PluginFamily> {
    info: Info,
    source: CreatorSource<F::Plugin>,
    init: Option<Box<InitFn<F::Plugin>>>,
}

impl<F: PluginFamily> TypedRegistryEntry<F> {
    /// Validate `module` for family `F` and cache its info.
    ///
    /// No entry is produced for a module that fails validation.
    pub fn new(module: ModuleHandle) -> Result<Self> {
        F::validate(&module)?;

        // SAFETY: `basic_validation` confirmed the symbol exists and the
        // info entry point signature is fixed by `export_plugin!`.
        let get_info: GetInfoFn = unsafe { module.get_function(INFO_SYMBOL)? };
        let info = get_info().clone();

        tracing::debug!(
            "Created {} registry entry {} from {}",
            F::NAME,
            info.full_name(),
            module.name()
        );

        Ok(Self {
            info,
            source: CreatorSource::Module(module),
            init: None,
        })
    }

    /// Entry for a plug-in compiled into the host, with no module behind it.
    pub fn from_creator(info: Info, creator: &'static Creator<F::Plugin>) -> Self {
        Self {
            info,
            source: CreatorSource::Static(creator),
            init: None,
        }
    }

    /// Run `init` on every instance before it is handed out.
    pub fn with_init<I>(mut self, init: I) -> Self
    where
        I: Fn(&F::Plugin) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }

    /// Create a new instance as the family's plug-in type.
    pub fn create_typed(&self) -> Result<Arc<F::Plugin>> {
        let creator = self.creator()?;
        let full_name = self.info.full_name();

        let plugin = creator
            .create_plugin()
            .map_err(|source| HostError::CreateFailed {
                plugin: full_name.to_string(),
                source,
            })?
            .ok_or_else(|| HostError::NullInstance(full_name.to_string()))?;

        if let Some(init) = &self.init {
            init(&plugin).map_err(|source| HostError::InitFailed {
                plugin: full_name.to_string(),
                source,
            })?;
        }

        Ok(plugin)
    }

    fn creator(&self) -> Result<&Creator<F::Plugin>> {
        match &self.source {
            CreatorSource::Static(creator) => Ok(*creator),
            CreatorSource::Module(module) => {
                let base = get_creator_func(module, F::CREATOR_SYMBOL)?;
                if base.plugin_type() != std::any::type_name::<F::Plugin>() {
                    return Err(HostError::CreatorTypeMismatch {
                        library: module.name().to_string(),
                        symbol: F::CREATOR_SYMBOL.to_string(),
                        family: F::NAME,
                    });
                }
                // SAFETY: the only `CreatorBase` implementor is `Creator<T>`,
                // and `plugin_type` names its `T`. Equal names mean the module
                // was built from the same plug-in interface as the host.
                Ok(unsafe { &*std::ptr::from_ref(base).cast::<Creator<F::Plugin>>() })
            }
        }
    }
}

impl<F: PluginFamily> RegistryEntry for TypedRegistryEntry<F> {
    fn info(&self) -> &Info {
        &self.info
    }

    fn module(&self) -> Option<&ModuleHandle> {
        match &self.source {
            CreatorSource::Module(module) => Some(module),
            CreatorSource::Static(_) => None,
        }
    }

    fn create(&self) -> Result<AbstractPluginPtr> {
        self.create_typed().map(F::into_abstract)
    }
}

impl<F: PluginFamily> std::fmt::Debug for TypedRegistryEntry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRegistryEntry")
            .field("family", &F::NAME)
            .field("info", &self.info.full_name())
            .field("module", &self.module().map(|m| m.name()))
            .finish()
    }
}
