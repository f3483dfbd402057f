//! Member resolution and the member helpers built on it.
//!
//! References to fields and methods name their target by containing type, name and type or
//! signature. Resolution turns them into [`ResolvedField`]s and [`ResolvedMethod`]s by
//! walking the containing type in a fixed order:
//!
//! 1. members with the requested name, in declaration order
//! 2. private helper members with that name
//! 3. base classes, in declaration order, recursively
//! 4. for interfaces only, base interfaces in declaration order, recursively (methods only)
//!
//! The first match wins. A reference that cannot be matched resolves to `None`.
//!
//! # Key Components
//!
//! - [`resolve_field`] / [`resolve_method`]: unscoped resolution, cached on the reference
//! - [`MemberResolver`]: resolution relative to a unit, namespace and type scope
//! - [`implicitly_overridden_base_class_method`] and friends: virtual dispatch helpers
//! - [`is_visible_outside_assembly`]: accessibility from other assemblies
//! - [`is_getter`], [`is_setter`], [`is_volatile`]: naming and modifier predicates
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Lib")));
//! let ns = unit.root().add_namespace(host.name_for("N"));
//! let point = ns.add_type(TypeDefinition::new(host.name_for("Point"), TypeAttributes::PUBLIC));
//! let int32 = host.platform_types().system_int32.clone();
//! point.add_field(FieldDefinition::new(host.name_for("x"), int32.clone()));
//!
//! let point_ref = TypeReference::namespace_type(
//!     UnitNamespaceReference::nested(
//!         UnitNamespaceReference::root(unit.identity().clone()),
//!         host.name_for("N"),
//!     ),
//!     host.name_for("Point"),
//!     0,
//! );
//! let x = FieldReference::new(point_ref, host.name_for("x"), int32);
//! let resolved = x.resolved_field(&host).and_then(|field| field.unspecialize());
//! assert_eq!(resolved.map(|field| field.name.clone()), Some(host.name_for("x")));
//! # Ok::<(), dotmodel::Error>(())
//! ```
//!
//! [`ResolvedField`]: crate::metadata::members::ResolvedField
//! [`ResolvedMethod`]: crate::metadata::members::ResolvedMethod

mod accessors;
mod members;
mod overrides;
mod visibility;

pub use accessors::{
    is_adder, is_caller, is_getter, is_remover, is_setter, is_volatile,
    qualified_method_name_begins_with,
};
pub use members::{resolve_field, resolve_method, MemberResolver};
pub use overrides::{
    explicitly_overridden_methods, implicitly_implemented_interface_methods,
    implicitly_overridden_base_class_method, implicitly_overriding_derived_class_method,
    methods_are_equivalent,
};
pub use visibility::{is_type_visible_outside_assembly, is_visible_outside_assembly};
