//! Plug-in host for vrkit applications.
//!
//! Loads plug-in modules, checks that they implement the plug-in interface
//! the host was built against, and keeps a registry of entries from which
//! plug-in instances are created on demand.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vrkit_plugin_host::{GrabStrategyFamily, PluginConfig, PluginHost, ViewerPtr};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PluginConfig::default().with_search_debug(true);
//!     let mut host = PluginHost::new(config);
//!
//!     // Register every grab strategy found under plugins/grab
//!     let report = unsafe { host.scan::<GrabStrategyFamily>("grab")? };
//!     for (library, error) in &report.failed {
//!         eprintln!("{library}: {error}");
//!     }
//!
//!     let viewer: ViewerPtr = Arc::new(());
//!     host.activate("com.infiscape.grab.DefaultGrabStrategy", &viewer)?;
//!     host.update_all(&viewer);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod creator;
mod entry;
mod error;
mod export;
mod family;
mod host;
mod info;
mod module;
mod registry;
mod search;
mod signal;
mod status;
mod validation;

pub use config::*;
pub use creator::*;
pub use entry::*;
pub use error::*;
pub use family::*;
pub use host::*;
pub use info::*;
pub use module::*;
pub use registry::*;
pub use search::*;
pub use signal::*;
pub use status::*;
pub use validation::*;
