use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::metadata::{
    host::MetadataHost,
    intern::{InternKey, StructuralKey},
    names::Name,
    signatures::MethodSignature,
    typesystem::{resolved::ResolvedType, PrimitiveTypeCode, TypeDefRc, TypeDefinition},
    units::{AliasRef, NamespaceRefRc},
};

/// Reference to a `TypeReference`
pub type TypeRefRc = Arc<TypeReference>;

/// A smart reference to a definition that holds a weak reference, so that caches and back
/// pointers never keep the owning unit alive or form reference cycles.
pub struct DefRef<T> {
    weak_ref: Weak<T>,
}

impl<T> DefRef<T> {
    /// Create a new `DefRef` from a strong reference
    pub fn new(strong_ref: &Arc<T>) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// A reference that never upgrades
    #[must_use]
    pub fn dangling() -> Self {
        Self {
            weak_ref: Weak::new(),
        }
    }

    /// Get a strong reference to the definition, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced definition is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Returns `true` if both refer to the same allocation
    #[must_use]
    pub fn ptr_eq(&self, other: &DefRef<T>) -> bool {
        Weak::ptr_eq(&self.weak_ref, &other.weak_ref)
    }

    /// Returns `true` if this refers to `strong_ref`
    #[must_use]
    pub fn is(&self, strong_ref: &Arc<T>) -> bool {
        std::ptr::eq(self.weak_ref.as_ptr(), Arc::as_ptr(strong_ref))
    }
}

impl<T> Clone for DefRef<T> {
    fn clone(&self) -> Self {
        Self {
            weak_ref: self.weak_ref.clone(),
        }
    }
}

impl<T> PartialEq for DefRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for DefRef<T> {}

impl<T> fmt::Debug for DefRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefRef")
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl<T> From<&Arc<T>> for DefRef<T> {
    fn from(strong_ref: &Arc<T>) -> Self {
        Self::new(strong_ref)
    }
}

/// Weak reference to a `TypeDefinition`
pub type TypeDefRef = DefRef<TypeDefinition>;

impl DefRef<TypeDefinition> {
    /// Get the name of the referenced type (if still alive)
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        self.upgrade().map(|t| t.name.clone())
    }
}

/// A custom modifier (`modopt` / `modreq`) attached to a type
#[derive(Debug, Clone)]
pub struct CustomModifier {
    /// `modopt` if true, `modreq` otherwise
    pub is_optional: bool,
    /// The modifier type, e.g. `System.Runtime.CompilerServices.IsVolatile`
    pub modifier: TypeRefRc,
}

impl CustomModifier {
    /// Create a required modifier
    #[must_use]
    pub fn required(modifier: TypeRefRc) -> Self {
        Self {
            is_optional: false,
            modifier,
        }
    }

    /// Create an optional modifier
    #[must_use]
    pub fn optional(modifier: TypeRefRc) -> Self {
        Self {
            is_optional: true,
            modifier,
        }
    }
}

/// The different shapes a type reference can take
#[derive(Debug, Clone)]
pub enum TypeReferenceKind {
    /// A type that is a direct member of a namespace
    Namespace {
        /// The containing namespace
        namespace: NamespaceRefRc,
        /// Simple name, without generic arity suffix
        name: Name,
        /// Number of generic parameters
        generic_parameter_count: u16,
    },
    /// A type nested in another type
    Nested {
        /// The containing type
        containing: TypeRefRc,
        /// Simple name
        name: Name,
        /// Number of generic parameters declared by the nested type itself
        generic_parameter_count: u16,
    },
    /// An instantiation of a generic type
    GenericInstance {
        /// The generic type
        generic: TypeRefRc,
        /// Type arguments, in order
        arguments: Vec<TypeRefRc>,
    },
    /// A nested type seen through an instance of its generic containing type
    SpecializedNested {
        /// The nested type as declared
        unspecialized: TypeRefRc,
        /// The generic instance (or specialized nested type) containing it
        containing: TypeRefRc,
    },
    /// A generic parameter of a type
    GenericTypeParameter {
        /// The type declaring the parameter
        defining_type: TypeRefRc,
        /// Position in the parameter list
        index: u16,
        /// Parameter name
        name: Name,
    },
    /// A generic parameter of a method
    GenericMethodParameter {
        /// The type declaring the method
        defining_type: TypeRefRc,
        /// Name of the method
        method_name: Name,
        /// Number of generic parameters of the method
        method_generic_parameter_count: u16,
        /// Position in the parameter list
        index: u16,
        /// Parameter name
        name: Name,
    },
    /// An unmanaged pointer
    Pointer(TypeRefRc),
    /// A managed pointer
    ManagedPointer(TypeRefRc),
    /// An array
    Array {
        /// Element type
        element: TypeRefRc,
        /// Number of dimensions
        rank: u32,
        /// Declared sizes of the leading dimensions
        sizes: Vec<u64>,
        /// Declared lower bounds of the leading dimensions
        lower_bounds: Vec<i64>,
        /// Single dimensional with zero lower bound
        is_vector: bool,
    },
    /// A type with custom modifiers
    Modified {
        /// The type without modifiers
        unmodified: TypeRefRc,
        /// Modifiers, in order
        modifiers: Vec<CustomModifier>,
    },
    /// A function pointer
    FunctionPointer(Arc<MethodSignature>),
    /// A reference obtained directly from a definition
    Definition(TypeDefRef),
}

/// A reference to a type.
///
/// References are immutable descriptions of where a type lives. Resolution to a
/// [`ResolvedType`], the interned key and the alias indirection are computed lazily and cached
/// on first use; every later call returns the cached value.
pub struct TypeReference {
    /// The shape of this reference
    pub kind: TypeReferenceKind,
    /// Primitive classification of the referenced type
    pub type_code: PrimitiveTypeCode,
    pub(crate) key: OnceLock<InternKey>,
    pub(crate) resolved: OnceLock<Option<ResolvedType>>,
    pub(crate) alias: OnceLock<Option<AliasRef>>,
}

impl TypeReference {
    /// Create a new reference of the given kind
    #[must_use]
    pub fn new(kind: TypeReferenceKind) -> TypeRefRc {
        Self::with_type_code(kind, PrimitiveTypeCode::NotPrimitive)
    }

    /// Create a new reference of the given kind and primitive classification
    #[must_use]
    pub fn with_type_code(kind: TypeReferenceKind, type_code: PrimitiveTypeCode) -> TypeRefRc {
        Arc::new(TypeReference {
            kind,
            type_code,
            key: OnceLock::new(),
            resolved: OnceLock::new(),
            alias: OnceLock::new(),
        })
    }

    /// Reference to a type in a namespace
    #[must_use]
    pub fn namespace_type(
        namespace: NamespaceRefRc,
        name: Name,
        generic_parameter_count: u16,
    ) -> TypeRefRc {
        Self::new(TypeReferenceKind::Namespace {
            namespace,
            name,
            generic_parameter_count,
        })
    }

    /// Reference to a type nested in `containing`
    #[must_use]
    pub fn nested_type(
        containing: TypeRefRc,
        name: Name,
        generic_parameter_count: u16,
    ) -> TypeRefRc {
        Self::new(TypeReferenceKind::Nested {
            containing,
            name,
            generic_parameter_count,
        })
    }

    /// Instantiation of `generic` with `arguments`
    #[must_use]
    pub fn generic_instance(generic: TypeRefRc, arguments: Vec<TypeRefRc>) -> TypeRefRc {
        Self::new(TypeReferenceKind::GenericInstance { generic, arguments })
    }

    /// A nested type seen through a generic instance of its container
    #[must_use]
    pub fn specialized_nested(unspecialized: TypeRefRc, containing: TypeRefRc) -> TypeRefRc {
        Self::new(TypeReferenceKind::SpecializedNested {
            unspecialized,
            containing,
        })
    }

    /// The `index`th generic parameter of `defining_type`
    #[must_use]
    pub fn generic_type_parameter(defining_type: TypeRefRc, index: u16, name: Name) -> TypeRefRc {
        Self::new(TypeReferenceKind::GenericTypeParameter {
            defining_type,
            index,
            name,
        })
    }

    /// The `index`th generic parameter of the method `method_name` of `defining_type`
    #[must_use]
    pub fn generic_method_parameter(
        defining_type: TypeRefRc,
        method_name: Name,
        method_generic_parameter_count: u16,
        index: u16,
        name: Name,
    ) -> TypeRefRc {
        Self::new(TypeReferenceKind::GenericMethodParameter {
            defining_type,
            method_name,
            method_generic_parameter_count,
            index,
            name,
        })
    }

    /// An unmanaged pointer to `target`
    #[must_use]
    pub fn pointer(target: TypeRefRc) -> TypeRefRc {
        Self::with_type_code(TypeReferenceKind::Pointer(target), PrimitiveTypeCode::Pointer)
    }

    /// A managed pointer to `target`
    #[must_use]
    pub fn managed_pointer(target: TypeRefRc) -> TypeRefRc {
        Self::with_type_code(
            TypeReferenceKind::ManagedPointer(target),
            PrimitiveTypeCode::Reference,
        )
    }

    /// A single dimensional, zero based array of `element`
    #[must_use]
    pub fn vector(element: TypeRefRc) -> TypeRefRc {
        Self::new(TypeReferenceKind::Array {
            element,
            rank: 1,
            sizes: Vec::new(),
            lower_bounds: Vec::new(),
            is_vector: true,
        })
    }

    /// A general array of `element`
    #[must_use]
    pub fn matrix(
        element: TypeRefRc,
        rank: u32,
        sizes: Vec<u64>,
        lower_bounds: Vec<i64>,
    ) -> TypeRefRc {
        Self::new(TypeReferenceKind::Array {
            element,
            rank,
            sizes,
            lower_bounds,
            is_vector: false,
        })
    }

    /// `unmodified` decorated with `modifiers`
    #[must_use]
    pub fn modified(unmodified: TypeRefRc, modifiers: Vec<CustomModifier>) -> TypeRefRc {
        let type_code = unmodified.type_code;
        Self::with_type_code(
            TypeReferenceKind::Modified {
                unmodified,
                modifiers,
            },
            type_code,
        )
    }

    /// A function pointer with the given signature
    #[must_use]
    pub fn function_pointer(signature: MethodSignature) -> TypeRefRc {
        Self::new(TypeReferenceKind::FunctionPointer(Arc::new(signature)))
    }

    /// A reference to an existing definition
    #[must_use]
    pub fn definition(definition: &TypeDefRc) -> TypeRefRc {
        Self::with_type_code(
            TypeReferenceKind::Definition(TypeDefRef::new(definition)),
            definition.type_code,
        )
    }

    /// The simple name of the referenced type, if it has one
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        match &self.kind {
            TypeReferenceKind::Namespace { name, .. }
            | TypeReferenceKind::Nested { name, .. }
            | TypeReferenceKind::GenericTypeParameter { name, .. }
            | TypeReferenceKind::GenericMethodParameter { name, .. } => Some(name.clone()),
            TypeReferenceKind::GenericInstance { generic, .. } => generic.name(),
            TypeReferenceKind::SpecializedNested { unspecialized, .. } => unspecialized.name(),
            TypeReferenceKind::Modified { unmodified, .. } => unmodified.name(),
            TypeReferenceKind::Definition(definition) => definition.name(),
            TypeReferenceKind::Pointer(_)
            | TypeReferenceKind::ManagedPointer(_)
            | TypeReferenceKind::Array { .. }
            | TypeReferenceKind::FunctionPointer(_) => None,
        }
    }

    /// The number of generic parameters the referenced type declares
    #[must_use]
    pub fn generic_parameter_count(&self) -> u16 {
        match &self.kind {
            TypeReferenceKind::Namespace {
                generic_parameter_count,
                ..
            }
            | TypeReferenceKind::Nested {
                generic_parameter_count,
                ..
            } => *generic_parameter_count,
            TypeReferenceKind::SpecializedNested { unspecialized, .. } => {
                unspecialized.generic_parameter_count()
            }
            TypeReferenceKind::Definition(definition) => definition
                .upgrade()
                .map_or(0, |d| d.generic_parameter_count()),
            _ => 0,
        }
    }

    /// The type arguments of a generic instance.
    ///
    /// A specialized nested type reports the arguments of its containing instance. Every
    /// other reference has none.
    #[must_use]
    pub fn generic_arguments(&self) -> Vec<TypeRefRc> {
        match &self.kind {
            TypeReferenceKind::GenericInstance { arguments, .. } => arguments.clone(),
            TypeReferenceKind::SpecializedNested { containing, .. } => {
                containing.generic_arguments()
            }
            TypeReferenceKind::Modified { unmodified, .. } => unmodified.generic_arguments(),
            _ => Vec::new(),
        }
    }

    /// Custom modifiers, empty unless this is a modified type
    #[must_use]
    pub fn custom_modifiers(&self) -> &[CustomModifier] {
        match &self.kind {
            TypeReferenceKind::Modified { modifiers, .. } => modifiers,
            _ => &[],
        }
    }

    /// Returns `true` for references to generic type or method parameters
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        matches!(
            self.kind,
            TypeReferenceKind::GenericTypeParameter { .. }
                | TypeReferenceKind::GenericMethodParameter { .. }
        )
    }

    /// The interned key of the structural identity of this reference.
    ///
    /// Two references denoting the same type by the same path always share a key. A reference
    /// that reaches a type through a forwarding alias keys by the alias path; compare
    /// [`ResolvedType::interned_key`]s to see through aliases.
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || self.compute_interned_key(host))
    }

    fn compute_interned_key(&self, host: &MetadataHost) -> InternKey {
        let structural = match &self.kind {
            TypeReferenceKind::Namespace {
                namespace,
                name,
                generic_parameter_count,
            } => StructuralKey::NamespaceType {
                namespace: namespace.interned_key(host),
                name: name.unique_key(),
                generic_parameter_count: *generic_parameter_count,
            },
            TypeReferenceKind::Nested {
                containing,
                name,
                generic_parameter_count,
            } => StructuralKey::NestedType {
                containing: containing.interned_key(host),
                name: name.unique_key(),
                generic_parameter_count: *generic_parameter_count,
            },
            TypeReferenceKind::GenericInstance { generic, arguments } => {
                StructuralKey::GenericTypeInstance {
                    generic: generic.interned_key(host),
                    arguments: arguments.iter().map(|a| a.interned_key(host)).collect(),
                }
            }
            TypeReferenceKind::SpecializedNested {
                unspecialized,
                containing,
            } => StructuralKey::NestedType {
                containing: containing.interned_key(host),
                name: unspecialized
                    .name()
                    .map_or(0, |n| n.unique_key()),
                generic_parameter_count: unspecialized.generic_parameter_count(),
            },
            TypeReferenceKind::GenericTypeParameter {
                defining_type,
                index,
                ..
            } => StructuralKey::GenericTypeParameter {
                owner: defining_type.interned_key(host),
                index: *index,
            },
            TypeReferenceKind::GenericMethodParameter {
                defining_type,
                method_name,
                method_generic_parameter_count,
                index,
                ..
            } => StructuralKey::GenericMethodParameter {
                owner_type: defining_type.interned_key(host),
                method_name: method_name.unique_key(),
                method_generic_parameter_count: *method_generic_parameter_count,
                index: *index,
            },
            TypeReferenceKind::Pointer(target) => StructuralKey::Pointer(target.interned_key(host)),
            TypeReferenceKind::ManagedPointer(target) => {
                StructuralKey::ManagedPointer(target.interned_key(host))
            }
            TypeReferenceKind::Array {
                element,
                rank,
                sizes,
                lower_bounds,
                is_vector,
            } => {
                if *is_vector {
                    StructuralKey::Vector(element.interned_key(host))
                } else {
                    StructuralKey::Matrix {
                        element: element.interned_key(host),
                        rank: *rank,
                        sizes: sizes.clone(),
                        lower_bounds: lower_bounds.clone(),
                    }
                }
            }
            TypeReferenceKind::Modified {
                unmodified,
                modifiers,
            } => StructuralKey::Modified {
                unmodified: unmodified.interned_key(host),
                modifiers: modifiers
                    .iter()
                    .map(|m| (m.is_optional, m.modifier.interned_key(host)))
                    .collect(),
            },
            TypeReferenceKind::FunctionPointer(signature) => {
                StructuralKey::FunctionPointer(signature.signature_key(host))
            }
            TypeReferenceKind::Definition(definition) => {
                return match definition.upgrade() {
                    Some(definition) => definition.interned_key(host),
                    None => host.intern_factory().fresh(),
                }
            }
        };

        host.intern_factory().intern(structural)
    }
}

impl fmt::Debug for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeReference")
            .field("kind", &self.kind)
            .field("type_code", &self.type_code)
            .finish_non_exhaustive()
    }
}
