//! Type members: fields, methods, properties and events.
//!
//! Each member kind comes as a definition (owned by its declaring [`TypeDefinition`]) and, for
//! fields and methods, a reference that names the member by containing type, name and
//! signature. Members seen through an instance of a generic type are *specialized*: they keep
//! the declared definition together with the instance that supplies the type arguments.
//!
//! # Key Components
//!
//! - [`FieldDefinition`] / [`FieldReference`]
//! - [`MethodDefinition`] / [`MethodReference`] / [`ResolvedMethod`]
//! - [`PropertyDefinition`], [`EventDefinition`]
//! - [`Specializable`]: a definition, or a definition viewed through a generic instance
//! - [`MemberDefinition`]: the capability every member definition shares
//!
//! [`TypeDefinition`]: crate::metadata::typesystem::TypeDefinition

mod event;
mod field;
mod method;
mod property;

use std::sync::Arc;

use strum::Display;

pub use event::{EventDefRc, EventDefinition};
pub use field::{
    FieldAttributes, FieldDefRc, FieldDefinition, FieldRefRc, FieldReference, FieldReferenceKind,
};
pub use method::{
    MethodDefRc, MethodDefRef, MethodDefinition, MethodModifiers, MethodRefRc, MethodReference,
    MethodReferenceKind, ResolvedMethod,
};
pub use property::{PropertyDefRc, PropertyDefinition};

use crate::metadata::{
    names::Name,
    typesystem::{DefRef, ResolvedType, TypeDefRc, TypeDefRef},
};

/// Accessibility of a member or nested type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemberVisibility {
    /// Not specified, or a value this model does not know
    Other,
    /// Only the declaring type
    Private,
    /// Derived types in the same assembly (`private protected`)
    FamilyAndAssembly,
    /// The same assembly (`internal`)
    Assembly,
    /// Derived types (`protected`)
    Family,
    /// Derived types or the same assembly (`protected internal`)
    FamilyOrAssembly,
    /// Everyone
    Public,
}

/// What every member definition can tell about itself
pub trait MemberDefinition {
    /// Simple name
    fn member_name(&self) -> &Name;

    /// Declared visibility
    fn member_visibility(&self) -> MemberVisibility;

    /// The type declaring the member
    fn declaring_type(&self) -> Option<TypeDefRc>;
}

/// A member definition, or a member definition seen through a generic instance
#[derive(Debug)]
pub enum Specializable<T> {
    /// The member as declared
    Definition(DefRef<T>),
    /// The member of a generic instance or of a type nested in one
    Specialized {
        /// The member as declared on the generic type
        unspecialized: DefRef<T>,
        /// The instance supplying the type arguments
        containing: ResolvedType,
    },
}

impl<T> Clone for Specializable<T> {
    fn clone(&self) -> Self {
        match self {
            Specializable::Definition(definition) => Specializable::Definition(definition.clone()),
            Specializable::Specialized {
                unspecialized,
                containing,
            } => Specializable::Specialized {
                unspecialized: unspecialized.clone(),
                containing: containing.clone(),
            },
        }
    }
}

impl<T: MemberDefinition> Specializable<T> {
    /// The declared member.
    ///
    /// Applying this to an already unspecialized member returns it unchanged.
    #[must_use]
    pub fn unspecialize(&self) -> Option<Arc<T>> {
        match self {
            Specializable::Definition(definition) => definition.upgrade(),
            Specializable::Specialized { unspecialized, .. } => unspecialized.upgrade(),
        }
    }

    /// Returns `true` if the member is seen through a generic instance
    #[must_use]
    pub fn is_specialized(&self) -> bool {
        matches!(self, Specializable::Specialized { .. })
    }

    /// The type this member belongs to: the instance for specialized members, the declaring
    /// type otherwise
    #[must_use]
    pub fn containing_type(&self) -> Option<ResolvedType> {
        match self {
            Specializable::Definition(definition) => {
                let declaring = definition.upgrade()?.declaring_type()?;
                Some(ResolvedType::Named(TypeDefRef::new(&declaring)))
            }
            Specializable::Specialized { containing, .. } => Some(containing.clone()),
        }
    }

    /// Returns `true` if both denote the same declared member in the same instance
    #[must_use]
    pub fn same_as(&self, other: &Specializable<T>) -> bool {
        match (self, other) {
            (Specializable::Definition(a), Specializable::Definition(b)) => a.ptr_eq(b),
            (
                Specializable::Specialized {
                    unspecialized: a, ..
                },
                Specializable::Specialized {
                    unspecialized: b, ..
                },
            ) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A field as resolved from a reference
pub type ResolvedField = Specializable<FieldDefinition>;
/// A property as found by member lookup
pub type ResolvedProperty = Specializable<PropertyDefinition>;
/// An event as found by member lookup
pub type ResolvedEvent = Specializable<EventDefinition>;

/// A member found by name lookup on a resolved type
#[derive(Debug, Clone)]
pub enum ResolvedMember {
    /// A field
    Field(ResolvedField),
    /// A property
    Property(ResolvedProperty),
    /// An event
    Event(ResolvedEvent),
    /// A method
    Method(ResolvedMethod),
    /// A nested type
    NestedType(ResolvedType),
}

impl ResolvedMember {
    /// The field, if this is one
    #[must_use]
    pub fn as_field(&self) -> Option<&ResolvedField> {
        match self {
            ResolvedMember::Field(field) => Some(field),
            _ => None,
        }
    }

    /// The method, if this is one
    #[must_use]
    pub fn as_method(&self) -> Option<&ResolvedMethod> {
        match self {
            ResolvedMember::Method(method) => Some(method),
            _ => None,
        }
    }
}
