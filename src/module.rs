//! Loaded plug-in modules and typed symbol lookup.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};

use crate::error::{HostError, Result};

/// Shared handle to a loaded module. The library stays loaded until the last
/// handle is dropped.
pub type ModuleHandle = Arc<Module>;

enum Backing {
    Native(Library),
    Static(HashMap<String, *const ()>),
}

/// A dynamically loaded code unit containing a vrkit plug-in.
///
/// Modules are either opened from a shared library on disk or built from a
/// static symbol table for plug-ins compiled into the host. Symbol lookup
/// behaves the same for both.
pub struct Module {
    name: String,
    path: Option<PathBuf>,
    backing: Backing,
}

// SAFETY: the static table only holds addresses of functions, and a native
// library handle may be shared across threads. All calls through resolved
// symbols are the caller's responsibility.
unsafe impl Send for Module {}
unsafe impl Sync for Module {}

impl Module {
    /// Open the shared library at `path`.
    ///
    /// # Safety
    /// Loading a library runs its initialisation code. Only load trusted
    /// plug-ins.
    pub unsafe fn open(path: impl AsRef<Path>) -> Result<ModuleHandle> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let library = Library::new(path).map_err(|e| HostError::LoadFailed {
            library: name.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!("Loaded plug-in module {} from {:?}", name, path);

        Ok(Arc::new(Self {
            name,
            path: Some(path.to_path_buf()),
            backing: Backing::Native(library),
        }))
    }

    /// Build a module from a table of in-process function addresses.
    ///
    /// Null addresses are treated as missing symbols.
    ///
    /// # Safety
    /// Every non-null address must be a function pointer cast to
    /// `*const ()`, e.g. `get_info as GetInfoFn as *const ()`, with the
    /// signature the plug-in contract gives its symbol name. Validation and
    /// entry construction call through these addresses.
    pub unsafe fn from_symbols<N, I>(name: impl Into<String>, symbols: I) -> ModuleHandle
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, *const ())>,
    {
        let table = symbols
            .into_iter()
            .map(|(symbol, addr)| (symbol.into(), addr))
            .collect();

        Arc::new(Self {
            name: name.into(),
            path: None,
            backing: Backing::Static(table),
        })
    }

    /// Identifying name of the module (the library file name for native
    /// modules).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File system path for native modules.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the module exports a symbol with exactly this name.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Address of the named symbol.
    pub fn symbol_address(&self, name: &str) -> Result<*const ()> {
        self.lookup(name).ok_or_else(|| HostError::MissingEntryPoint {
            library: self.name.clone(),
            symbol: name.to_string(),
        })
    }

    /// Resolve the named symbol as a function pointer of type `F`.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the signature the module
    /// actually exports. Nothing can verify this across a library boundary;
    /// a mismatch is undefined behaviour.
    pub unsafe fn get_function<F: Copy>(&self, name: &str) -> Result<F> {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const ()>(),
            "get_function requires a function pointer type"
        );
        let addr = self.symbol_address(name)?;
        Ok(std::mem::transmute_copy::<*const (), F>(&addr))
    }

    fn lookup(&self, name: &str) -> Option<*const ()> {
        match &self.backing {
            Backing::Native(library) => {
                // SAFETY: the symbol is read as a raw address and never
                // dereferenced here.
                let symbol: Symbol<*mut c_void> = unsafe { library.get(name.as_bytes()).ok()? };
                let addr = *symbol as *const ();
                (!addr.is_null()).then_some(addr)
            }
            Backing::Static(table) => table.get(name).copied().filter(|addr| !addr.is_null()),
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("path", &self.path)
            .field(
                "kind",
                &match self.backing {
                    Backing::Native(_) => "native",
                    Backing::Static(_) => "static",
                },
            )
            .finish()
    }
}
