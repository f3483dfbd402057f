//! The type system of the object model.
//!
//! This module holds type definitions, the references that point at them and the algorithms
//! relating the two: resolution, structural equivalence and generic specialization.
//!
//! # Key Components
//!
//! - [`TypeDefinition`]: A type declared by a unit, with its members, bases and generic
//!   parameters
//! - [`TypeReference`]: A description of where a type lives, resolved lazily to a
//!   [`ResolvedType`]
//! - [`GenericParameter`]: A generic parameter of a type or method definition
//! - [`TypeResolver`]: Scoped resolution relative to a unit, namespace, type or method
//! - [`types_are_equivalent`] / [`types_are_equivalent_relaxed`]: Identity and structural
//!   equivalence
//! - [`specialize_type_reference`]: Substitution of generic arguments
//!
//! # Ownership
//!
//! Units own their namespaces, namespaces own their types and types own their members. Every
//! back pointer (member to type, type to container) and every resolution cache is a
//! [`DefRef`], so dropping a unit releases its whole graph.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Lib")));
//! let ns = unit.root().add_namespace(host.name_for("Collections"));
//!
//! let list = ns.add_type(TypeDefinition::new(host.name_for("List"), TypeAttributes::PUBLIC));
//! list.add_generic_parameter(host.name_for("T"));
//! assert!(list.is_generic());
//! assert!(list.containing_namespace().is_some());
//! # Ok::<(), dotmodel::Error>(())
//! ```

mod base;
mod equivalence;
mod generics;
mod primitives;
mod resolved;
mod resolver;
mod specialize;

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use bitflags::bitflags;
use strum::Display;

pub use base::{
    CustomModifier, DefRef, TypeDefRef, TypeRefRc, TypeReference, TypeReferenceKind,
};
pub use equivalence::{types_are_equivalent, types_are_equivalent_relaxed};
pub use generics::{
    GenericParamRc, GenericParamRef, GenericParameter, GenericParameterAttributes,
    GenericParameterOwner,
};
pub use primitives::PrimitiveTypeCode;
pub use resolved::ResolvedType;
pub use resolver::TypeResolver;
pub use specialize::{specialize_signature, specialize_type_reference};

use crate::metadata::{
    host::MetadataHost,
    intern::{InternKey, StructuralKey},
    members::{
        EventDefRc, EventDefinition, FieldDefRc, FieldDefinition, MemberVisibility,
        MethodDefRc, MethodDefinition, MethodRefRc, PropertyDefRc, PropertyDefinition,
    },
    names::Name,
    units::{NamespaceRc, UnitNamespace, UnitRc},
};

/// Reference to a `TypeDefinition`
pub type TypeDefRc = Arc<TypeDefinition>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Semantic attributes of a type definition
    pub struct TypeAttributes: u32 {
        /// The type is visible outside its assembly (namespace types only)
        const PUBLIC = 0x0001;
        /// The type is an interface
        const INTERFACE = 0x0020;
        /// The type cannot be instantiated
        const ABSTRACT = 0x0080;
        /// The type cannot be derived from
        const SEALED = 0x0100;
        /// The name is special
        const SPECIAL_NAME = 0x0400;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0800;
        /// Initialize the type before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// The type is a value type
        const VALUE_TYPE = 0x0100_0000;
        /// The type is an enumeration
        const ENUM = 0x0200_0000;
        /// The type is a delegate
        const DELEGATE = 0x0400_0000;
        /// The type is a static class
        const STATIC = 0x0800_0000;
    }
}

/// How the fields of a type are laid out in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum LayoutKind {
    /// The runtime chooses the layout
    #[default]
    Auto,
    /// Fields are laid out in declaration order
    Sequential,
    /// Every field carries an explicit offset
    Explicit,
}

/// The container of a type definition
#[derive(Debug, Clone)]
pub enum TypeContainer {
    /// A namespace
    Namespace(DefRef<UnitNamespace>),
    /// An enclosing type
    Type(TypeDefRef),
}

/// A member of a type definition
#[derive(Debug, Clone)]
pub enum TypeMember {
    /// A field
    Field(FieldDefRc),
    /// A method
    Method(MethodDefRc),
    /// A property
    Property(PropertyDefRc),
    /// An event
    Event(EventDefRc),
    /// A nested type
    NestedType(TypeDefRc),
}

impl TypeMember {
    /// The member name
    #[must_use]
    pub fn name(&self) -> &Name {
        match self {
            TypeMember::Field(field) => &field.name,
            TypeMember::Method(method) => &method.name,
            TypeMember::Property(property) => &property.name,
            TypeMember::Event(event) => &event.name,
            TypeMember::NestedType(nested) => &nested.name,
        }
    }

    /// The declared visibility of the member
    #[must_use]
    pub fn visibility(&self) -> MemberVisibility {
        match self {
            TypeMember::Field(field) => field.visibility,
            TypeMember::Method(method) => method.visibility,
            TypeMember::Property(property) => property.visibility,
            TypeMember::Event(event) => event.visibility,
            TypeMember::NestedType(nested) => nested.visibility,
        }
    }

    /// The type declaring the member
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        match self {
            TypeMember::Field(field) => field.containing_type(),
            TypeMember::Method(method) => method.containing_type(),
            TypeMember::Property(property) => property.containing_type(),
            TypeMember::Event(event) => event.containing_type(),
            TypeMember::NestedType(nested) => nested.containing_type(),
        }
    }

    /// The method, if this is one
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodDefRc> {
        match self {
            TypeMember::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The field, if this is one
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldDefRc> {
        match self {
            TypeMember::Field(field) => Some(field),
            _ => None,
        }
    }
}

/// An explicit `MethodImpl`: `implementing` provides the body for `implemented`
#[derive(Debug, Clone)]
pub struct MethodImplementation {
    /// The method in this type that provides the implementation
    pub implementing: MethodRefRc,
    /// The interface or base class method being implemented
    pub implemented: MethodRefRc,
}

/// A fixed argument of a custom attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArgument {
    /// A string
    String(String),
    /// An integer
    Int(i64),
    /// A boolean
    Bool(bool),
    /// A null reference
    Null,
}

/// A custom attribute applied to a type
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// The attribute type
    pub attribute_type: TypeRefRc,
    /// Fixed constructor arguments
    pub arguments: Vec<AttributeArgument>,
}

impl CustomAttribute {
    /// Create a new attribute
    #[must_use]
    pub fn new(attribute_type: TypeRefRc, arguments: Vec<AttributeArgument>) -> Self {
        Self {
            attribute_type,
            arguments,
        }
    }
}

/// A type declared by a unit.
///
/// Built in two steps: configure the value with the `with_*` builders, then attach it to a
/// namespace ([`UnitNamespace::add_type`]) or enclosing type
/// ([`TypeDefinition::add_nested_type`]) and populate members through the returned
/// [`TypeDefRc`].
pub struct TypeDefinition {
    /// Simple name
    pub name: Name,
    /// Semantic attributes
    pub flags: TypeAttributes,
    /// Visibility; namespace types are either `Public` or `Assembly`
    pub visibility: MemberVisibility,
    /// Field layout
    pub layout: LayoutKind,
    /// Declared instance size in bytes, 0 if unspecified
    pub size_of: u32,
    /// Declared field alignment in bytes, 0 if unspecified
    pub alignment: u16,
    /// Primitive classification
    pub type_code: PrimitiveTypeCode,
    /// Generic parameters, in order
    pub generic_parameters: boxcar::Vec<GenericParamRc>,
    /// Base class references (at most one for classes)
    pub base_classes: boxcar::Vec<TypeRefRc>,
    /// Directly implemented interfaces
    pub interfaces: boxcar::Vec<TypeRefRc>,
    /// Declared members, in declaration order
    pub members: boxcar::Vec<TypeMember>,
    /// Compiler generated members that are not part of the public member list
    pub private_helper_members: boxcar::Vec<TypeMember>,
    /// Explicit method implementations
    pub explicit_overrides: boxcar::Vec<MethodImplementation>,
    /// Custom attributes
    pub attributes: boxcar::Vec<CustomAttribute>,
    container: OnceLock<TypeContainer>,
    underlying_type: OnceLock<TypeRefRc>,
    key: OnceLock<InternKey>,
}

impl TypeDefinition {
    /// Create a new, detached type definition.
    ///
    /// Visibility is `Public` if `flags` contains [`TypeAttributes::PUBLIC`] and `Assembly`
    /// otherwise.
    #[must_use]
    pub fn new(name: Name, flags: TypeAttributes) -> Self {
        let visibility = if flags.contains(TypeAttributes::PUBLIC) {
            MemberVisibility::Public
        } else {
            MemberVisibility::Assembly
        };

        TypeDefinition {
            name,
            flags,
            visibility,
            layout: LayoutKind::Auto,
            size_of: 0,
            alignment: 0,
            type_code: PrimitiveTypeCode::NotPrimitive,
            generic_parameters: boxcar::Vec::new(),
            base_classes: boxcar::Vec::new(),
            interfaces: boxcar::Vec::new(),
            members: boxcar::Vec::new(),
            private_helper_members: boxcar::Vec::new(),
            explicit_overrides: boxcar::Vec::new(),
            attributes: boxcar::Vec::new(),
            container: OnceLock::new(),
            underlying_type: OnceLock::new(),
            key: OnceLock::new(),
        }
    }

    /// Sets the visibility, for nested types
    #[must_use]
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the field layout
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the declared instance size in bytes
    #[must_use]
    pub fn with_size(mut self, size_of: u32) -> Self {
        self.size_of = size_of;
        self
    }

    /// Sets the declared field alignment in bytes
    #[must_use]
    pub fn with_alignment(mut self, alignment: u16) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the primitive classification
    #[must_use]
    pub fn with_type_code(mut self, type_code: PrimitiveTypeCode) -> Self {
        self.type_code = type_code;
        self
    }

    pub(crate) fn set_container(&self, container: TypeContainer) {
        self.container.set(container).ok();
    }

    /// Adds a nested type and returns it
    pub fn add_nested_type(self: &Arc<Self>, nested: TypeDefinition) -> TypeDefRc {
        nested.set_container(TypeContainer::Type(TypeDefRef::new(self)));
        let nested = Arc::new(nested);
        self.members.push(TypeMember::NestedType(nested.clone()));
        nested
    }

    /// Adds a field and returns it.
    ///
    /// A field without an explicit sequence number is numbered after the fields already
    /// present.
    pub fn add_field(self: &Arc<Self>, mut field: FieldDefinition) -> FieldDefRc {
        if field.sequence_number.is_none() {
            field.sequence_number = Some(self.fields().count() as u32);
        }
        field.set_containing_type(TypeDefRef::new(self));
        let field = Arc::new(field);
        self.members.push(TypeMember::Field(field.clone()));
        field
    }

    /// Adds a method and returns it
    pub fn add_method(self: &Arc<Self>, method: MethodDefinition) -> MethodDefRc {
        method.set_containing_type(TypeDefRef::new(self));
        let method = Arc::new(method);
        self.members.push(TypeMember::Method(method.clone()));
        method
    }

    /// Adds a property and returns it
    pub fn add_property(self: &Arc<Self>, property: PropertyDefinition) -> PropertyDefRc {
        property.set_containing_type(TypeDefRef::new(self));
        let property = Arc::new(property);
        self.members.push(TypeMember::Property(property.clone()));
        property
    }

    /// Adds an event and returns it
    pub fn add_event(self: &Arc<Self>, event: EventDefinition) -> EventDefRc {
        event.set_containing_type(TypeDefRef::new(self));
        let event = Arc::new(event);
        self.members.push(TypeMember::Event(event.clone()));
        event
    }

    /// Adds a compiler generated field that is not listed among the members
    pub fn add_private_helper_field(self: &Arc<Self>, field: FieldDefinition) -> FieldDefRc {
        field.set_containing_type(TypeDefRef::new(self));
        let field = Arc::new(field);
        self.private_helper_members
            .push(TypeMember::Field(field.clone()));
        field
    }

    /// Adds a compiler generated method that is not listed among the members
    pub fn add_private_helper_method(self: &Arc<Self>, method: MethodDefinition) -> MethodDefRc {
        method.set_containing_type(TypeDefRef::new(self));
        let method = Arc::new(method);
        self.private_helper_members
            .push(TypeMember::Method(method.clone()));
        method
    }

    /// Appends a generic parameter and returns it
    pub fn add_generic_parameter(self: &Arc<Self>, name: Name) -> GenericParamRc {
        self.add_generic_parameter_with_flags(name, GenericParameterAttributes::empty())
    }

    /// Appends a generic parameter with variance or constraint flags and returns it
    pub fn add_generic_parameter_with_flags(
        self: &Arc<Self>,
        name: Name,
        flags: GenericParameterAttributes,
    ) -> GenericParamRc {
        let parameter = Arc::new(GenericParameter::new(
            name,
            self.generic_parameters.count() as u16,
            flags,
            GenericParameterOwner::Type(TypeDefRef::new(self)),
        ));
        self.generic_parameters.push(parameter.clone());
        parameter
    }

    /// Adds a base class
    pub fn add_base_class(&self, base: TypeRefRc) {
        self.base_classes.push(base);
    }

    /// Adds a directly implemented interface
    pub fn add_interface(&self, interface: TypeRefRc) {
        self.interfaces.push(interface);
    }

    /// Records that `implementing` explicitly implements `implemented`
    pub fn add_explicit_override(&self, implementing: MethodRefRc, implemented: MethodRefRc) {
        self.explicit_overrides.push(MethodImplementation {
            implementing,
            implemented,
        });
    }

    /// Applies a custom attribute
    pub fn add_attribute(&self, attribute: CustomAttribute) {
        self.attributes.push(attribute);
    }

    /// Sets the underlying type of an enumeration. Only the first call has an effect.
    pub fn set_underlying_type(&self, underlying: TypeRefRc) {
        self.underlying_type.set(underlying).ok();
    }

    /// The underlying type of an enumeration
    #[must_use]
    pub fn underlying_type(&self) -> Option<TypeRefRc> {
        self.underlying_type.get().cloned()
    }

    /// Number of generic parameters declared by this type
    #[must_use]
    pub fn generic_parameter_count(&self) -> u16 {
        self.generic_parameters.count() as u16
    }

    /// Returns `true` if the type declares generic parameters
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.generic_parameters.count() > 0
    }

    /// Returns `true` for interfaces
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Returns `true` for value types, including primitive value types
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.flags.contains(TypeAttributes::VALUE_TYPE) || self.type_code.is_value_type()
    }

    /// Returns `true` for enumerations
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.flags.contains(TypeAttributes::ENUM)
    }

    /// Returns `true` for delegates
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.flags.contains(TypeAttributes::DELEGATE)
    }

    /// Returns `true` if the type cannot be derived from
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
    }

    /// Returns `true` if the type cannot be instantiated
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT)
    }

    /// Returns `true` for static classes
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(TypeAttributes::STATIC)
    }

    /// Returns `true` for types whose values are object references
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        !self.is_value_type()
            && !self.is_enum()
            && !matches!(
                self.type_code,
                PrimitiveTypeCode::Pointer | PrimitiveTypeCode::Reference
            )
    }

    /// The namespace or type containing this definition
    #[must_use]
    pub fn container(&self) -> Option<&TypeContainer> {
        self.container.get()
    }

    /// The enclosing type of a nested type
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        match self.container.get()? {
            TypeContainer::Type(container) => container.upgrade(),
            TypeContainer::Namespace(_) => None,
        }
    }

    /// The namespace of a namespace type
    #[must_use]
    pub fn containing_namespace(&self) -> Option<NamespaceRc> {
        match self.container.get()? {
            TypeContainer::Namespace(namespace) => namespace.upgrade(),
            TypeContainer::Type(_) => None,
        }
    }

    /// Returns `true` for types nested in another type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self.container.get(), Some(TypeContainer::Type(_)))
    }

    /// The unit that declares this type
    #[must_use]
    pub fn defining_unit(&self) -> Option<UnitRc> {
        match self.container.get()? {
            TypeContainer::Namespace(namespace) => namespace.upgrade()?.unit(),
            TypeContainer::Type(container) => container.upgrade()?.defining_unit(),
        }
    }

    /// Declared members with the given name, in declaration order
    #[must_use]
    pub fn get_members_named(&self, name: &Name, ignore_case: bool) -> Vec<TypeMember> {
        self.members
            .iter()
            .filter(|(_, member)| member.name().matches(name, ignore_case))
            .map(|(_, member)| member.clone())
            .collect()
    }

    /// Private helper members with the given name
    #[must_use]
    pub fn get_private_helpers_named(&self, name: &Name) -> Vec<TypeMember> {
        self.private_helper_members
            .iter()
            .filter(|(_, member)| member.name() == name)
            .map(|(_, member)| member.clone())
            .collect()
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = FieldDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            TypeMember::Field(field) => Some(field.clone()),
            _ => None,
        })
    }

    /// Declared methods, in declaration order
    pub fn methods(&self) -> impl Iterator<Item = MethodDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            TypeMember::Method(method) => Some(method.clone()),
            _ => None,
        })
    }

    /// Declared properties, in declaration order
    pub fn properties(&self) -> impl Iterator<Item = PropertyDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            TypeMember::Property(property) => Some(property.clone()),
            _ => None,
        })
    }

    /// Declared events, in declaration order
    pub fn events(&self) -> impl Iterator<Item = EventDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            TypeMember::Event(event) => Some(event.clone()),
            _ => None,
        })
    }

    /// Nested types, in declaration order
    pub fn nested_types(&self) -> impl Iterator<Item = TypeDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            TypeMember::NestedType(nested) => Some(nested.clone()),
            _ => None,
        })
    }

    /// The nested type with the given name and arity
    #[must_use]
    pub fn find_nested_type(&self, name: &Name, generic_parameter_count: u16) -> Option<TypeDefRc> {
        self.nested_types().find(|nested| {
            nested.name == *name && nested.generic_parameter_count() == generic_parameter_count
        })
    }

    /// The interned key of this definition.
    ///
    /// Equal to the key of every namespace or nested type reference that names this type by
    /// the same path. A detached definition gets a key of its own.
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            let structural = match self.container.get() {
                Some(TypeContainer::Namespace(namespace)) => {
                    namespace.upgrade().map(|namespace| StructuralKey::NamespaceType {
                        namespace: namespace.interned_key(host),
                        name: self.name.unique_key(),
                        generic_parameter_count: self.generic_parameter_count(),
                    })
                }
                Some(TypeContainer::Type(container)) => {
                    container.upgrade().map(|container| StructuralKey::NestedType {
                        containing: container.interned_key(host),
                        name: self.name.unique_key(),
                        generic_parameter_count: self.generic_parameter_count(),
                    })
                }
                None => None,
            };

            match structural {
                Some(structural) => host.intern_factory().intern(structural),
                None => host.intern_factory().fresh(),
            }
        })
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("visibility", &self.visibility)
            .field("generic_parameters", &self.generic_parameter_count())
            .field("members", &self.members.count())
            .finish_non_exhaustive()
    }
}
