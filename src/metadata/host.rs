//! The resolution host.
//!
//! [`MetadataHost`] is the environment every resolution runs in. It owns the name table, the
//! intern factory, the platform type references and the table of loaded units, and it carries
//! the per-host reentrant lock that guards lazily computed caches.
//!
//! # Unit Loading
//!
//! Units are registered explicitly with [`MetadataHost::register_unit`], or produced on demand
//! by a [`UnitLoader`] when a reference names a unit that is not loaded yet. Loader failures
//! are logged and surface as unresolved references.
//!
//! # Cache Discipline
//!
//! Every cache in the object model is a [`OnceLock`] filled through [`MetadataHost::lazily`]:
//! a warm read takes no lock, a cold computation runs under the reentrant host lock and is
//! published once. Resolution may recurse into other caches on the same thread while holding
//! the lock.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::for_32bit())?
//!     .with_loader(|host: &MetadataHost, identity: &UnitIdentity| -> dotmodel::Result<UnitRc> {
//!         Ok(Unit::new(host, identity.clone()))
//!     });
//!
//! let identity = UnitIdentity::from(AssemblyIdentity::simple("OnDemand"));
//! assert!(host.find_unit(&identity).is_none());
//! assert!(host.load_unit(&identity).is_some());
//! assert!(host.find_unit(&identity).is_some());
//! # Ok::<(), dotmodel::Error>(())
//! ```

use std::{cell::Cell, sync::OnceLock};

use crossbeam_skiplist::SkipMap;
use parking_lot::ReentrantMutex;
use tracing::{debug, trace};

use crate::{
    metadata::{
        config::HostConfig,
        identity::UnitIdentity,
        intern::{InternFactory, InternKey, StructuralKey},
        members::MethodReference,
        names::{Name, NameTable},
        platform::PlatformTypes,
        typesystem::TypeRefRc,
        units::{NamespaceRefRc, UnitRc},
    },
    Error, Result,
};

/// Produces units the host does not have yet
pub trait UnitLoader: Send + Sync {
    /// Builds the unit with the given identity.
    ///
    /// # Errors
    /// Implementations return an error (typically [`Error::UnitNotFound`]) if the unit cannot
    /// be produced.
    fn load(&self, host: &MetadataHost, identity: &UnitIdentity) -> Result<UnitRc>;
}

impl<F> UnitLoader for F
where
    F: Fn(&MetadataHost, &UnitIdentity) -> Result<UnitRc> + Send + Sync,
{
    fn load(&self, host: &MetadataHost, identity: &UnitIdentity) -> Result<UnitRc> {
        self(host, identity)
    }
}

thread_local! {
    static RESOLUTION_DEPTH: Cell<usize> = const { Cell::new(0) };
    static RESOLUTION_ABORTS: Cell<u64> = const { Cell::new(0) };
}

/// The number of depth-limit aborts on the current thread so far
pub(crate) fn resolution_aborts() -> u64 {
    RESOLUTION_ABORTS.with(Cell::get)
}

/// Marks one level of resolution recursion on the current thread
pub(crate) struct ResolutionGuard;

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// The environment resolution runs in
pub struct MetadataHost {
    config: HostConfig,
    names: NameTable,
    intern: InternFactory,
    platform: PlatformTypes,
    units: SkipMap<InternKey, UnitRc>,
    loader: Option<Box<dyn UnitLoader>>,
    lock: ReentrantMutex<()>,
}

impl MetadataHost {
    /// Create a host without a unit loader.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfiguration`] if `config` does not validate.
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;

        let names = NameTable::new();
        let platform = PlatformTypes::new(&names, &config.core_assembly);

        Ok(MetadataHost {
            config,
            names,
            intern: InternFactory::new(),
            platform,
            units: SkipMap::new(),
            loader: None,
            lock: ReentrantMutex::new(()),
        })
    }

    /// Installs a unit loader
    #[must_use]
    pub fn with_loader(mut self, loader: impl UnitLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// The configuration this host was created with
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Target pointer size in bytes
    #[must_use]
    pub fn pointer_size(&self) -> u8 {
        self.config.pointer_size
    }

    /// The name table
    #[must_use]
    pub fn name_table(&self) -> &NameTable {
        &self.names
    }

    /// Interns `value` in the name table
    #[must_use]
    pub fn name_for(&self, value: &str) -> Name {
        self.names.get_name_for(value)
    }

    /// The intern factory
    #[must_use]
    pub fn intern_factory(&self) -> &InternFactory {
        &self.intern
    }

    /// References to the well known types of the core assembly
    #[must_use]
    pub fn platform_types(&self) -> &PlatformTypes {
        &self.platform
    }

    /// The interned key of the unit with the given identity
    pub fn unit_key(&self, identity: &UnitIdentity) -> InternKey {
        self.intern
            .intern(StructuralKey::Unit(identity.strong_name()))
    }

    /// Registers a unit, replacing any unit with the same identity, and returns it
    pub fn register_unit(&self, unit: UnitRc) -> UnitRc {
        let key = self.unit_key(unit.identity());
        debug!(unit = %unit.identity(), "registering unit");
        self.units.insert(key, unit.clone());
        unit
    }

    /// The loaded unit with the given identity
    #[must_use]
    pub fn find_unit(&self, identity: &UnitIdentity) -> Option<UnitRc> {
        let key = self.unit_key(identity);
        self.units.get(&key).map(|entry| entry.value().clone())
    }

    /// The unit with the given identity, asking the loader if it is not loaded yet.
    ///
    /// Returns `None` if there is no loader or the loader fails.
    pub fn load_unit(&self, identity: &UnitIdentity) -> Option<UnitRc> {
        if let Some(unit) = self.find_unit(identity) {
            return Some(unit);
        }

        let loader = self.loader.as_ref()?;
        let _guard = self.lock.lock();
        if let Some(unit) = self.find_unit(identity) {
            return Some(unit);
        }

        match loader.load(self, identity) {
            Ok(unit) => Some(self.register_unit(unit)),
            Err(error) => {
                debug!(unit = %identity, "unit loader failed: {}", error);
                None
            }
        }
    }

    /// All loaded units
    pub fn units(&self) -> impl Iterator<Item = UnitRc> + '_ {
        self.units.iter().map(|entry| entry.value().clone())
    }

    /// The interned key of a method reference
    pub fn get_method_interned_key(&self, method: &MethodReference) -> InternKey {
        method.interned_key(self)
    }

    /// The interned key of the namespace type `name` with the given arity
    pub fn get_namespace_type_reference_interned_key(
        &self,
        namespace: &NamespaceRefRc,
        name: &Name,
        generic_parameter_count: u16,
    ) -> InternKey {
        self.intern.intern(StructuralKey::NamespaceType {
            namespace: namespace.interned_key(self),
            name: name.unique_key(),
            generic_parameter_count,
        })
    }

    /// The interned key of the nested type `name` with the given arity
    pub fn get_nested_type_reference_interned_key(
        &self,
        containing: &TypeRefRc,
        name: &Name,
        generic_parameter_count: u16,
    ) -> InternKey {
        self.intern.intern(StructuralKey::NestedType {
            containing: containing.interned_key(self),
            name: name.unique_key(),
            generic_parameter_count,
        })
    }

    /// Returns the value of `cell`, computing and publishing it first if it is empty.
    ///
    /// The empty case is double-checked under the host lock, so `compute` runs at most once
    /// per cell unless it recursively fills the same cell itself.
    ///
    /// A value computed while a nested resolution hit the depth limit is returned but not
    /// published; the next call computes it again.
    pub(crate) fn lazily<T: Clone>(&self, cell: &OnceLock<T>, compute: impl FnOnce() -> T) -> T {
        if let Some(value) = cell.get() {
            return value.clone();
        }

        let _guard = self.lock.lock();
        if let Some(value) = cell.get() {
            return value.clone();
        }

        let aborts = resolution_aborts();
        let value = compute();
        if resolution_aborts() != aborts {
            trace!("result computed under an aborted resolution is not cached");
            return value;
        }
        match cell.set(value.clone()) {
            Ok(()) => value,
            Err(_) => cell.get().cloned().unwrap_or(value),
        }
    }

    /// Enters one level of resolution recursion.
    ///
    /// # Errors
    /// Returns [`Error::RecursionLimit`] once the configured depth is reached.
    pub(crate) fn enter_resolution(&self) -> Result<ResolutionGuard> {
        let limit = self.config.max_resolution_depth;
        RESOLUTION_DEPTH.with(|depth| {
            if depth.get() >= limit {
                RESOLUTION_ABORTS.with(|aborts| aborts.set(aborts.get() + 1));
                return Err(Error::RecursionLimit(limit));
            }
            depth.set(depth.get() + 1);
            Ok(ResolutionGuard)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::metadata::{identity::AssemblyIdentity, units::Unit};

    #[test]
    fn test_register_and_find() {
        let host = MetadataHost::new(HostConfig::default()).unwrap();
        let identity = UnitIdentity::from(AssemblyIdentity::simple("A"));
        assert!(host.find_unit(&identity).is_none());

        let unit = host.register_unit(Unit::new(&host, identity.clone()));
        assert!(Arc::ptr_eq(&host.find_unit(&identity).unwrap(), &unit));
        assert_eq!(host.units().count(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            MetadataHost::new(HostConfig::default().with_pointer_size(3)),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_loader_runs_once_per_unit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let host = MetadataHost::new(HostConfig::default())
            .unwrap()
            .with_loader(move |host: &MetadataHost, identity: &UnitIdentity| -> Result<UnitRc> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Unit::new(host, identity.clone()))
            });

        let identity = UnitIdentity::from(AssemblyIdentity::simple("Lazy"));
        let first = host.load_unit(&identity).unwrap();
        let second = host.load_unit(&identity).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_errors_become_none() {
        let host = MetadataHost::new(HostConfig::default())
            .unwrap()
            .with_loader(|_: &MetadataHost, identity: &UnitIdentity| -> Result<UnitRc> {
                Err(Error::UnitNotFound(identity.strong_name()))
            });

        let identity = UnitIdentity::from(AssemblyIdentity::simple("Missing"));
        assert!(host.load_unit(&identity).is_none());
    }

    #[test]
    fn test_lazily_computes_once() {
        let host = MetadataHost::new(HostConfig::default()).unwrap();
        let cell = OnceLock::new();
        let mut runs = 0;
        assert_eq!(host.lazily(&cell, || { runs += 1; 7 }), 7);
        assert_eq!(host.lazily(&cell, || 8), 7);
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_resolution_depth_is_bounded() {
        let host = MetadataHost::new(HostConfig::default().with_max_resolution_depth(2)).unwrap();
        let first = host.enter_resolution().unwrap();
        let second = host.enter_resolution().unwrap();
        assert!(matches!(
            host.enter_resolution(),
            Err(Error::RecursionLimit(2))
        ));
        drop(second);
        assert!(host.enter_resolution().is_ok());
        drop(first);
    }

    #[test]
    fn test_aborted_computation_is_not_cached() {
        let host = MetadataHost::new(HostConfig::default().with_max_resolution_depth(1)).unwrap();
        let cell = OnceLock::new();

        let outer = host.enter_resolution().unwrap();
        let value = host.lazily(&cell, || host.enter_resolution().map(|_| 1).unwrap_or(0));
        assert_eq!(value, 0);
        assert!(cell.get().is_none());
        drop(outer);

        let value = host.lazily(&cell, || host.enter_resolution().map(|_| 1).unwrap_or(0));
        assert_eq!(value, 1);
        assert_eq!(cell.get(), Some(&1));
    }
}
