//! Navigation strategy built as a standalone plug-in library.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vrkit_plugin_host::{export_plugin, AbstractPlugin, Info, NavStrategy, NavStrategyFamily, ViewerPtr};

static DROPS: AtomicUsize = AtomicUsize::new(0);

/// Number of `Walk` instances dropped while the library has been loaded.
#[no_mangle]
pub fn nav_fixture_drops() -> usize {
    DROPS.load(Ordering::SeqCst)
}

struct Walk;

impl AbstractPlugin for Walk {
    fn info(&self) -> &Info {
        get_plugin_info()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NavStrategy for Walk {
    fn update_nav(&self, _viewer: &ViewerPtr) {}
}

impl Drop for Walk {
    fn drop(&mut self) {
        DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

export_plugin! {
    family: NavStrategyFamily,
    info: Info::new("fixture", "Walk", [1, 0, 0]),
    creator: get_nav_strategy_creator => || Arc::new(Walk),
}
