//! Plug-in search paths and module discovery.

use std::path::{Path, PathBuf};

use crate::module::{Module, ModuleHandle};
use crate::vrkit_status;

/// Environment variable naming the installed plug-in base directory.
pub const PLUGINS_DIR_ENV: &str = "VRKIT_PLUGINS_DIR";

/// Directory searched relative to the working directory before the base
/// directory.
pub const LOCAL_PLUGINS_DIR: &str = "plugins";

const DEBUG_SUBDIR: &str = "debug";

/// The plug-in base directory from `VRKIT_PLUGINS_DIR`, if set.
pub fn plugin_base_dir() -> Option<PathBuf> {
    std::env::var_os(PLUGINS_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// File extension of loadable modules on this platform.
pub fn library_extension() -> &'static str {
    if cfg!(target_os = "macos") {
        "dylib"
    } else if cfg!(target_os = "windows") {
        "dll"
    } else {
        "so"
    }
}

/// Keep the roots that exist, adding each one's `debug` subdirectory when
/// `search_debug` is set.
///
/// Debug builds search `debug` before the root, release builds after it.
pub fn build_search_path<P: AsRef<Path>>(
    roots: impl IntoIterator<Item = P>,
    search_debug: bool,
) -> Vec<PathBuf> {
    let mut search_path = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            tracing::trace!("Plug-in path does not exist: {}", root.display());
            continue;
        }

        let debug_dir = root.join(DEBUG_SUBDIR);
        if search_debug && cfg!(debug_assertions) {
            search_path.push(debug_dir.clone());
        }
        search_path.push(root.to_path_buf());
        if search_debug && !cfg!(debug_assertions) {
            search_path.push(debug_dir);
        }
    }

    search_path
}

/// Search path for `subdirs` under each of `bases`, in order.
pub fn search_path_under<B, S>(
    bases: impl IntoIterator<Item = B>,
    subdirs: &[S],
    search_debug: bool,
) -> Vec<PathBuf>
where
    B: AsRef<Path>,
    S: AsRef<str>,
{
    let mut roots = Vec::new();
    for base in bases {
        for subdir in subdirs {
            let dir = base.as_ref().join(subdir.as_ref());
            if dir.is_dir() {
                roots.push(dir);
            }
        }
    }
    build_search_path(roots, search_debug)
}

/// Search path for `subdirs`: `plugins/<subdir>` first, then
/// `$VRKIT_PLUGINS_DIR/<subdir>`.
pub fn default_search_path<S: AsRef<str>>(subdirs: &[S], search_debug: bool) -> Vec<PathBuf> {
    let bases = std::iter::once(PathBuf::from(LOCAL_PLUGINS_DIR)).chain(plugin_base_dir());
    search_path_under(bases, subdirs, search_debug)
}

/// Whether a library file should be loaded by this build.
///
/// On Windows, debug-runtime builds only load `*_d.dll` and all other
/// builds skip them.
pub fn is_loadable_library(path: &Path) -> bool {
    let ext_matches = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(library_extension()));
    if !ext_matches {
        return false;
    }

    if cfg!(target_os = "windows") {
        let is_debug_runtime = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase().ends_with("_d.dll"))
            .unwrap_or(false);
        return is_debug_runtime == cfg!(debug_assertions);
    }

    true
}

/// Library files in the search path, in search order and sorted by name
/// within each directory.
pub fn find_libraries<P: AsRef<Path>>(search_path: &[P]) -> Vec<PathBuf> {
    let mut libraries = Vec::new();

    for dir in search_path {
        let dir = dir.as_ref();
        let read_dir = match std::fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                vrkit_status!("Exception scanning plug-in path: {}\n{}", dir.display(), e);
                continue;
            }
        };

        let mut found: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_loadable_library(path))
            .collect();
        found.sort();
        libraries.extend(found);
    }

    libraries
}

/// Open every library in the search path.
///
/// Libraries that fail to open are reported through the status sink and
/// skipped.
///
/// # Safety
/// Opening a library runs its initialisation code.
pub unsafe fn find_modules<P: AsRef<Path>>(search_path: &[P]) -> Vec<ModuleHandle> {
    let mut modules = Vec::new();

    for path in find_libraries(search_path) {
        match Module::open(&path) {
            Ok(module) => modules.push(module),
            Err(e) => vrkit_status!("{}", e),
        }
    }

    tracing::debug!("Found {} plug-in modules", modules.len());
    modules
}
