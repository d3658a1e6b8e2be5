//! Plug-in base interface and the plug-in families the host knows about.
//!
//! A family fixes the plug-in trait a module's creator produces, the name of
//! the creator entry point, and the interface version the host was compiled
//! against. Modules are validated per family before a registry entry is
//! built for them.

use std::any::Any;
use std::sync::Arc;

use crate::error::{BoxError, Result};
use crate::info::Info;
use crate::module::Module;
use crate::validation::{
    basic_validation, check_interface_version, InterfaceRequirement, INTERFACE_VERSION_SYMBOL,
};

/// Opaque handle to the viewer owned by the external scene/device runtime.
pub type ViewerPtr = Arc<dyn Any + Send + Sync>;

/// Shared handle to any plug-in instance.
pub type AbstractPluginPtr = Arc<dyn AbstractPlugin>;

/// Base interface of every plug-in.
pub trait AbstractPlugin: Any + Send + Sync {
    /// Metadata of the module this plug-in came from.
    fn info(&self) -> &Info;

    /// Called once after creation by the host.
    fn init(&self, _viewer: &ViewerPtr) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Called once per frame by the host.
    fn update(&self, _viewer: &ViewerPtr) {}

    fn as_any(&self) -> &dyn Any;
}

/// A category of plug-in with its own entry point and interface version.
pub trait PluginFamily: 'static {
    /// Plug-in trait object produced by this family's creators.
    type Plugin: ?Sized + Send + Sync + 'static;

    /// Human-readable family name.
    const NAME: &'static str;

    /// Entry point returning the family's creator.
    const CREATOR_SYMBOL: &'static str;

    /// Interface version check, if the family is versioned.
    const INTERFACE: Option<InterfaceRequirement> = None;

    /// Check that `module` can be used as a plug-in of this family.
    fn validate(module: &Module) -> Result<()> {
        basic_validation(module)?;
        if let Some(requirement) = Self::INTERFACE {
            check_interface_version(module, &requirement)?;
        }
        Ok(())
    }

    fn into_abstract(plugin: Arc<Self::Plugin>) -> AbstractPluginPtr;
}

/// Application-level plug-in driven by the viewer every frame.
pub trait ViewerPlugin: AbstractPlugin {
    fn description(&self) -> String;

    fn is_focused(&self) -> bool {
        true
    }

    fn set_focused(&self, _viewer: &ViewerPtr, _focused: bool) {}
}

/// Mode component activated and deactivated by a mode harness.
pub trait ModeComponent: AbstractPlugin {
    fn description(&self) -> String;

    fn activate(&self, viewer: &ViewerPtr) -> std::result::Result<(), BoxError>;

    fn deactivate(&self, viewer: &ViewerPtr) -> std::result::Result<(), BoxError>;

    fn is_active(&self) -> bool;
}

/// Decides when and what gets grabbed.
pub trait GrabStrategy: AbstractPlugin {
    fn set_focus(&self, viewer: &ViewerPtr, focused: bool);
}

/// Finds the scene object a device is pointing at.
pub trait IntersectionStrategy: AbstractPlugin {}

/// Computes how grabbed objects follow the device.
pub trait MoveStrategy: AbstractPlugin {}

/// Moves the view platform through the scene.
pub trait NavStrategy: AbstractPlugin {
    fn update_nav(&self, viewer: &ViewerPtr);
}

pub struct ViewerPluginFamily;

impl PluginFamily for ViewerPluginFamily {
    type Plugin = dyn ViewerPlugin;
    const NAME: &'static str = "viewer plug-in";
    const CREATOR_SYMBOL: &'static str = "get_creator";
    const INTERFACE: Option<InterfaceRequirement> =
        Some(InterfaceRequirement::new(INTERFACE_VERSION_SYMBOL, 2, 1));

    fn into_abstract(plugin: Arc<dyn ViewerPlugin>) -> AbstractPluginPtr {
        plugin
    }
}

pub struct ModeComponentFamily;

impl PluginFamily for ModeComponentFamily {
    type Plugin = dyn ModeComponent;
    const NAME: &'static str = "mode component";
    const CREATOR_SYMBOL: &'static str = "get_creator";
    const INTERFACE: Option<InterfaceRequirement> = Some(InterfaceRequirement::new(
        "get_component_interface_version",
        2,
        1,
    ));

    fn into_abstract(plugin: Arc<dyn ModeComponent>) -> AbstractPluginPtr {
        plugin
    }
}

pub struct GrabStrategyFamily;

impl PluginFamily for GrabStrategyFamily {
    type Plugin = dyn GrabStrategy;
    const NAME: &'static str = "grab strategy";
    const CREATOR_SYMBOL: &'static str = "get_grab_strategy_creator";
    const INTERFACE: Option<InterfaceRequirement> =
        Some(InterfaceRequirement::new(INTERFACE_VERSION_SYMBOL, 2, 1));

    fn into_abstract(plugin: Arc<dyn GrabStrategy>) -> AbstractPluginPtr {
        plugin
    }
}

pub struct IsectStrategyFamily;

impl PluginFamily for IsectStrategyFamily {
    type Plugin = dyn IntersectionStrategy;
    const NAME: &'static str = "intersection strategy";
    const CREATOR_SYMBOL: &'static str = "get_intersection_strategy_creator";
    const INTERFACE: Option<InterfaceRequirement> =
        Some(InterfaceRequirement::new(INTERFACE_VERSION_SYMBOL, 2, 1));

    fn into_abstract(plugin: Arc<dyn IntersectionStrategy>) -> AbstractPluginPtr {
        plugin
    }
}

pub struct MoveStrategyFamily;

impl PluginFamily for MoveStrategyFamily {
    type Plugin = dyn MoveStrategy;
    const NAME: &'static str = "move strategy";
    const CREATOR_SYMBOL: &'static str = "get_move_strategy_creator";
    const INTERFACE: Option<InterfaceRequirement> =
        Some(InterfaceRequirement::new(INTERFACE_VERSION_SYMBOL, 2, 1));

    fn into_abstract(plugin: Arc<dyn MoveStrategy>) -> AbstractPluginPtr {
        plugin
    }
}

/// Navigation strategies are only checked for the info entry point.
pub struct NavStrategyFamily;

impl PluginFamily for NavStrategyFamily {
    type Plugin = dyn NavStrategy;
    const NAME: &'static str = "navigation strategy";
    const CREATOR_SYMBOL: &'static str = "get_nav_strategy_creator";

    fn into_abstract(plugin: Arc<dyn NavStrategy>) -> AbstractPluginPtr {
        plugin
    }
}
