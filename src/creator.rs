//! Typed plug-in creators behind a type-erased base.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BoxError;

/// Type-erased creator returned by a module's creator entry point.
///
/// [`plugin_type`](Self::plugin_type) names the plug-in type the creator
/// produces. Unlike a `TypeId` it compares equal between the host and a
/// separately built module, so families check it before recovering the
/// concrete [`Creator`]. The trait is sealed: `Creator<T>` is its only
/// implementor.
pub trait CreatorBase: Any + Send + Sync + sealed::Sealed {
    /// Type name of the plug-ins this creator produces.
    fn plugin_type(&self) -> &'static str;

    /// In-process downcasting only; `TypeId` differs across module builds.
    fn as_any(&self) -> &dyn Any;
}

mod sealed {
    pub trait Sealed {}

    impl<T: ?Sized + 'static> Sealed for super::Creator<T> {}
}

type Factory<T> = dyn Fn() -> Result<Option<Arc<T>>, BoxError> + Send + Sync;

/// Creator for plug-ins of type `T`, wrapping a zero-argument factory bound
/// when the module is built.
pub struct Creator<T: ?Sized + 'static> {
    factory: Box<Factory<T>>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + 'static> Creator<T> {
    /// Wrap a factory that always produces an instance.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self::fallible(move || Ok(Some(factory())))
    }

    /// Wrap a factory that may fail or produce nothing.
    pub fn fallible<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Option<Arc<T>>, BoxError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            _marker: PhantomData,
        }
    }

    /// Invoke the factory. Every call yields an independent instance.
    pub fn create_plugin(&self) -> Result<Option<Arc<T>>, BoxError> {
        (self.factory)()
    }
}

impl<T: ?Sized + 'static> CreatorBase for Creator<T> {
    fn plugin_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: ?Sized + 'static> std::fmt::Debug for Creator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creator")
            .field("plugin_type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_each_call_is_a_new_instance() {
        let creator = Creator::<dyn Greeter>::new(|| Arc::new(Hello));
        let a = creator.create_plugin().unwrap().unwrap();
        let b = creator.create_plugin().unwrap().unwrap();
        assert_eq!(a.greet(), "hello");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_downcast_through_base() {
        let creator = Creator::<dyn Greeter>::new(|| Arc::new(Hello));
        let base: &dyn CreatorBase = &creator;
        assert!(base.as_any().downcast_ref::<Creator<dyn Greeter>>().is_some());
        assert!(base.as_any().downcast_ref::<Creator<Hello>>().is_none());
    }

    #[test]
    fn test_plugin_type_names_the_product() {
        let creator = Creator::<dyn Greeter>::new(|| Arc::new(Hello));
        let base: &dyn CreatorBase = &creator;
        assert_eq!(base.plugin_type(), std::any::type_name::<dyn Greeter>());
        assert!(base.plugin_type().ends_with("Greeter"));

        let concrete = Creator::<Hello>::new(|| Arc::new(Hello));
        assert_ne!(concrete.plugin_type(), base.plugin_type());
    }

    #[test]
    fn test_fallible_factory_passes_through() {
        let none = Creator::<dyn Greeter>::fallible(|| Ok(None));
        assert!(none.create_plugin().unwrap().is_none());

        let failing = Creator::<dyn Greeter>::fallible(|| Err("boom".into()));
        assert_eq!(failing.create_plugin().err().unwrap().to_string(), "boom");
    }
}
