use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::metadata::{
    host::MetadataHost,
    intern::{InternKey, StructuralKey},
    members::{MethodDefRc, MethodDefRef},
    names::Name,
    typesystem::{DefRef, TypeDefRc, TypeDefRef, TypeRefRc},
};

/// Reference to a `GenericParameter`
pub type GenericParamRc = Arc<GenericParameter>;
/// Weak reference to a `GenericParameter`
pub type GenericParamRef = DefRef<GenericParameter>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Variance and special constraints of a generic parameter
    pub struct GenericParameterAttributes: u16 {
        /// The parameter is covariant (`out T`)
        const COVARIANT = 0x0001;
        /// The parameter is contravariant (`in T`)
        const CONTRAVARIANT = 0x0002;
        /// The argument must be a reference type (`class`)
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// The argument must be a non-nullable value type (`struct`)
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// The argument must have a public default constructor (`new()`)
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

/// What declares a generic parameter
#[derive(Debug, Clone)]
pub enum GenericParameterOwner {
    /// A generic type
    Type(TypeDefRef),
    /// A generic method
    Method(MethodDefRef),
}

/// A generic parameter of a type or method definition
pub struct GenericParameter {
    /// Parameter name
    pub name: Name,
    /// Position in the owner's parameter list
    pub index: u16,
    /// Variance and special constraints
    pub flags: GenericParameterAttributes,
    /// Type constraints
    pub constraints: boxcar::Vec<TypeRefRc>,
    owner: OnceLock<GenericParameterOwner>,
    key: OnceLock<InternKey>,
}

impl GenericParameter {
    pub(crate) fn new(
        name: Name,
        index: u16,
        flags: GenericParameterAttributes,
        owner: GenericParameterOwner,
    ) -> Self {
        let owner_lock = OnceLock::new();
        owner_lock.set(owner).ok();

        GenericParameter {
            name,
            index,
            flags,
            constraints: boxcar::Vec::new(),
            owner: owner_lock,
            key: OnceLock::new(),
        }
    }

    /// Adds a type constraint
    pub fn add_constraint(&self, constraint: TypeRefRc) {
        self.constraints.push(constraint);
    }

    /// The declaring type or method
    #[must_use]
    pub fn owner(&self) -> Option<&GenericParameterOwner> {
        self.owner.get()
    }

    /// Returns `true` if a method declares this parameter
    #[must_use]
    pub fn is_method_parameter(&self) -> bool {
        matches!(self.owner.get(), Some(GenericParameterOwner::Method(_)))
    }

    /// The type declaring this parameter, or declaring the method that does
    #[must_use]
    pub fn defining_type(&self) -> Option<TypeDefRc> {
        match self.owner.get()? {
            GenericParameterOwner::Type(owner) => owner.upgrade(),
            GenericParameterOwner::Method(owner) => owner.upgrade()?.containing_type(),
        }
    }

    /// The method declaring this parameter
    #[must_use]
    pub fn defining_method(&self) -> Option<MethodDefRc> {
        match self.owner.get()? {
            GenericParameterOwner::Type(_) => None,
            GenericParameterOwner::Method(owner) => owner.upgrade(),
        }
    }

    /// The interned key, shared with every reference to this parameter
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            let structural = match self.owner.get() {
                Some(GenericParameterOwner::Type(owner)) => owner.upgrade().map(|owner| {
                    StructuralKey::GenericTypeParameter {
                        owner: owner.interned_key(host),
                        index: self.index,
                    }
                }),
                Some(GenericParameterOwner::Method(owner)) => owner.upgrade().map(|method| {
                    StructuralKey::GenericMethodParameter {
                        owner_type: method.containing_type_key(host),
                        method_name: method.name.unique_key(),
                        method_generic_parameter_count: method.generic_parameter_count(),
                        index: self.index,
                    }
                }),
                None => None,
            };

            match structural {
                Some(structural) => host.intern_factory().intern(structural),
                None => host.intern_factory().fresh(),
            }
        })
    }
}

impl std::fmt::Debug for GenericParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericParameter")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
