//! # dotmodel Prelude
//!
//! The types most code touching the object model needs: the host, units and namespaces,
//! type and member definitions with their references, and signatures.
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! assert_eq!(host.pointer_size(), 8);
//! # Ok::<(), dotmodel::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotmodel operations
pub use crate::Error;

/// The result type used throughout dotmodel
pub use crate::Result;

// ================================================================================================
// Host and Units
// ================================================================================================

/// The resolution environment and its configuration
pub use crate::metadata::{
    config::HostConfig,
    host::{MetadataHost, UnitLoader},
    platform::PlatformTypes,
};

/// Identities of assemblies and modules
pub use crate::metadata::identity::{
    AssemblyIdentity, AssemblyVersion, ModuleIdentity, StrongNameKey, UnitIdentity,
};

/// Names and interned keys
pub use crate::metadata::{intern::InternKey, names::Name};

/// Units, namespaces and aliases
pub use crate::metadata::units::{
    AliasForType, AliasKind, NamespaceRc, NamespaceRefRc, Unit, UnitNamespace,
    UnitNamespaceReference, UnitRc,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Type definitions, references and their resolution
pub use crate::metadata::typesystem::{
    types_are_equivalent, AttributeArgument, CustomAttribute, CustomModifier,
    GenericParameterAttributes, LayoutKind, PrimitiveTypeCode, ResolvedType, TypeAttributes,
    TypeDefRc, TypeDefinition, TypeMember, TypeRefRc, TypeReference,
};

// ================================================================================================
// Members and Signatures
// ================================================================================================

/// Fields, methods, properties and events
pub use crate::metadata::members::{
    EventDefinition, FieldAttributes, FieldDefRc, FieldDefinition, FieldReference,
    MemberVisibility, MethodDefRc, MethodDefinition, MethodModifiers, MethodRefRc,
    MethodReference, PropertyDefinition, ResolvedMember, ResolvedMethod,
};

/// Method signatures and their comparison
pub use crate::metadata::signatures::{
    signatures_are_equal, CallingConvention, MethodSignature, ParameterTypeInfo,
};
