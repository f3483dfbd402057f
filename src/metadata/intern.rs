//! Structural interning of metadata identities.
//!
//! Every unit, namespace, type and member that the object model can talk about has a structural
//! identity: the chain of names, generic parameter counts and signatures that distinguishes it from
//! every other entity. [`InternFactory`] maps each distinct structural identity to an
//! [`InternKey`]. References and definitions that denote the same logical entity therefore obtain
//! the same key, no matter how or when they were constructed, and identity checks reduce to an
//! integer comparison.
//!
//! Keys are a pure function of the structural identity for the lifetime of the factory: the same
//! [`StructuralKey`] always maps to the same [`InternKey`]. They are not stable across factories
//! or processes.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::metadata::intern::{InternFactory, StructuralKey};
//!
//! let factory = InternFactory::new();
//! let a = factory.intern(StructuralKey::Unit("Sample".to_string()));
//! let b = factory.intern(StructuralKey::Unit("Sample".to_string()));
//! assert_eq!(a, b);
//! ```

use std::{
    fmt,
    num::NonZeroU32,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

/// Integer surrogate for a structural identity.
///
/// Never zero, so `Option<InternKey>` is the same size as the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternKey(NonZeroU32);

impl InternKey {
    /// The raw integer value of this key.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for InternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The structural part of a method or function pointer signature that takes part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    /// Raw calling convention bits
    pub calling_convention: u8,
    /// Return value is passed by reference
    pub return_by_ref: bool,
    /// Key of the return type
    pub return_type: InternKey,
    /// `(by_ref, type key)` for every parameter, in order
    pub parameters: Vec<(bool, InternKey)>,
}

/// A structural identity, built from the keys of its components.
///
/// Names enter keys through [`crate::metadata::names::Name::unique_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructuralKey {
    /// A unit, identified by its strong name
    Unit(String),
    /// The root namespace of a unit
    RootNamespace(InternKey),
    /// A namespace nested in another namespace
    NestedNamespace {
        /// Key of the containing namespace
        parent: InternKey,
        /// Name key
        name: u32,
    },
    /// A type that is a direct member of a namespace
    NamespaceType {
        /// Key of the containing namespace
        namespace: InternKey,
        /// Name key
        name: u32,
        /// Number of generic parameters
        generic_parameter_count: u16,
    },
    /// A type nested in another type, or in an instance of a generic type
    NestedType {
        /// Key of the containing type
        containing: InternKey,
        /// Name key
        name: u32,
        /// Number of generic parameters
        generic_parameter_count: u16,
    },
    /// An instantiation of a generic type
    GenericTypeInstance {
        /// Key of the generic type
        generic: InternKey,
        /// Keys of the type arguments
        arguments: Vec<InternKey>,
    },
    /// A generic parameter of a type
    GenericTypeParameter {
        /// Key of the defining type
        owner: InternKey,
        /// Position in the parameter list
        index: u16,
    },
    /// A generic parameter of a method.
    ///
    /// Keyed by the method's containing type, name and arity rather than the method key, as the
    /// method signature usually mentions the parameter itself.
    GenericMethodParameter {
        /// Key of the type declaring the method
        owner_type: InternKey,
        /// Name key of the method
        method_name: u32,
        /// Number of generic parameters of the method
        method_generic_parameter_count: u16,
        /// Position in the parameter list
        index: u16,
    },
    /// An unmanaged pointer
    Pointer(InternKey),
    /// A managed pointer
    ManagedPointer(InternKey),
    /// A single dimensional, zero based array
    Vector(InternKey),
    /// A general array
    Matrix {
        /// Key of the element type
        element: InternKey,
        /// Number of dimensions
        rank: u32,
        /// Declared sizes of the leading dimensions
        sizes: Vec<u64>,
        /// Declared lower bounds of the leading dimensions
        lower_bounds: Vec<i64>,
    },
    /// A type with custom modifiers
    Modified {
        /// Key of the unmodified type
        unmodified: InternKey,
        /// `(is_optional, modifier key)` pairs
        modifiers: Vec<(bool, InternKey)>,
    },
    /// A function pointer type
    FunctionPointer(SignatureKey),
    /// A method
    Method {
        /// Key of the containing type
        containing: InternKey,
        /// Name key
        name: u32,
        /// Number of generic parameters
        generic_parameter_count: u16,
        /// Signature
        signature: SignatureKey,
    },
    /// An instantiation of a generic method
    GenericMethodInstance {
        /// Key of the generic method
        generic: InternKey,
        /// Keys of the type arguments
        arguments: Vec<InternKey>,
    },
    /// A field
    Field {
        /// Key of the containing type
        containing: InternKey,
        /// Name key
        name: u32,
        /// Key of the field type
        field_type: InternKey,
    },
}

/// Thread-safe factory mapping structural identities to [`InternKey`]s.
pub struct InternFactory {
    keys: DashMap<StructuralKey, InternKey>,
    next_key: AtomicU32,
}

impl InternFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        InternFactory {
            keys: DashMap::new(),
            next_key: AtomicU32::new(1),
        }
    }

    /// Returns the key for `key`, allocating a new one on first use.
    pub fn intern(&self, key: StructuralKey) -> InternKey {
        if let Some(existing) = self.keys.get(&key) {
            return *existing;
        }

        *self.keys.entry(key).or_insert_with(|| self.allocate())
    }

    /// Returns a key that is not shared with any structural identity.
    ///
    /// Used for definitions that are not attached to any container and therefore have no
    /// structural identity.
    pub fn fresh(&self) -> InternKey {
        self.allocate()
    }

    /// Number of structural identities interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn allocate(&self) -> InternKey {
        let value = self.next_key.fetch_add(1, Ordering::Relaxed);
        InternKey(NonZeroU32::new(value).unwrap_or(NonZeroU32::MAX))
    }
}

impl Default for InternFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_structures_share_key() {
        let factory = InternFactory::new();
        let unit = factory.intern(StructuralKey::Unit("A".into()));
        let root = factory.intern(StructuralKey::RootNamespace(unit));

        let t1 = factory.intern(StructuralKey::NamespaceType {
            namespace: root,
            name: 7,
            generic_parameter_count: 0,
        });
        let t2 = factory.intern(StructuralKey::NamespaceType {
            namespace: root,
            name: 7,
            generic_parameter_count: 0,
        });
        let generic = factory.intern(StructuralKey::NamespaceType {
            namespace: root,
            name: 7,
            generic_parameter_count: 1,
        });

        assert_eq!(t1, t2);
        assert_ne!(t1, generic);
        assert_eq!(factory.len(), 4);
    }

    #[test]
    fn test_fresh_keys_are_unique() {
        let factory = InternFactory::new();
        let interned = factory.intern(StructuralKey::Unit("A".into()));
        let a = factory.fresh();
        let b = factory.fresh();

        assert_ne!(a, b);
        assert_ne!(a, interned);
        assert_ne!(b, interned);
    }

    #[test]
    fn test_keys_are_nonzero() {
        let factory = InternFactory::new();
        let key = factory.intern(StructuralKey::Pointer(factory.fresh()));
        assert!(key.value() > 0);
        assert_eq!(std::mem::size_of::<Option<InternKey>>(), 4);
    }
}
