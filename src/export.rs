//! Entry point generation for plug-in modules.

/// Declare the entry points of a plug-in module.
///
/// Generates `get_plugin_info`, the family's creator function and,
/// optionally, the interface version function, all as `#[no_mangle]`
/// exports. The info and creator are built on first use and live for the
/// lifetime of the module.
///
/// The creator and version function names must match the family's
/// `CREATOR_SYMBOL` and interface requirement.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use vrkit_plugin_host::{export_plugin, Info, NavStrategyFamily};
///
/// export_plugin! {
///     family: NavStrategyFamily,
///     info: Info::new("com.example.nav", "Walk", [1, 0, 0]),
///     creator: get_nav_strategy_creator => || Arc::new(Walk::default()),
/// }
/// ```
#[macro_export]
macro_rules! export_plugin {
    (
        family: $family:ty,
        info: $info:expr,
        creator: $creator_fn:ident => $factory:expr
        $(, version: $version_fn:ident => ($major:expr, $minor:expr))?
        $(,)?
    ) => {
        #[no_mangle]
        pub fn get_plugin_info() -> &'static $crate::Info {
            static INFO: ::std::sync::LazyLock<$crate::Info> = ::std::sync::LazyLock::new(|| $info);
            &INFO
        }

        #[no_mangle]
        pub fn $creator_fn() -> &'static dyn $crate::CreatorBase {
            type Plugin = <$family as $crate::PluginFamily>::Plugin;

            static CREATOR: ::std::sync::LazyLock<$crate::Creator<Plugin>> =
                ::std::sync::LazyLock::new(|| {
                    let factory = $factory;
                    $crate::Creator::<Plugin>::new(move || {
                        let plugin: ::std::sync::Arc<Plugin> = factory();
                        plugin
                    })
                });
            &*CREATOR
        }

        $(
            #[no_mangle]
            pub fn $version_fn(major: &mut u32, minor: &mut u32) {
                *major = $major;
                *minor = $minor;
            }
        )?
    };
}
