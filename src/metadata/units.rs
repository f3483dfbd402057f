//! Units, namespaces and type forwarding aliases.
//!
//! A [`Unit`] is an assembly or module. It owns a tree of [`UnitNamespace`]s rooted at an
//! unnamed namespace; namespaces own nested namespaces, type definitions and
//! [`AliasForType`]s. An alias stands in for a type that has moved to another unit (a type
//! forwarder): references that resolve through it land on the aliased type and remember the
//! alias.
//!
//! [`UnitNamespaceReference`] names a namespace by unit identity and dotted path, independent
//! of whether the unit is loaded.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Lib")));
//! let system = unit.root().add_namespace(host.name_for("System"));
//! let collections = system.add_namespace(host.name_for("Collections"));
//! collections.add_type(TypeDefinition::new(host.name_for("Stack"), TypeAttributes::PUBLIC));
//!
//! let found = unit.find_type(&host, "System.Collections.Stack", 0);
//! assert_eq!(found.unwrap().name.value(), "Stack");
//! # Ok::<(), dotmodel::Error>(())
//! ```

use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::metadata::{
    host::MetadataHost,
    identity::{AssemblyIdentity, ModuleIdentity, UnitIdentity},
    intern::{InternKey, StructuralKey},
    names::Name,
    typesystem::{DefRef, TypeContainer, TypeDefRc, TypeDefinition, TypeRefRc},
};

/// Reference to a `Unit`
pub type UnitRc = Arc<Unit>;
/// Reference to a `UnitNamespace`
pub type NamespaceRc = Arc<UnitNamespace>;
/// Reference to an `AliasForType`
pub type AliasRc = Arc<AliasForType>;
/// Weak reference to an `AliasForType`
pub type AliasRef = DefRef<AliasForType>;
/// Reference to a `UnitNamespaceReference`
pub type NamespaceRefRc = Arc<UnitNamespaceReference>;

/// An assembly or module together with its namespace tree
pub struct Unit {
    identity: UnitIdentity,
    root: NamespaceRc,
    /// All aliases declared by the unit, namespace level and nested
    pub exported_types: boxcar::Vec<AliasRc>,
    key: OnceLock<InternKey>,
}

impl Unit {
    /// Create an assembly with an empty root namespace
    #[must_use]
    pub fn new_assembly(host: &MetadataHost, identity: AssemblyIdentity) -> UnitRc {
        Self::new(host, UnitIdentity::Assembly(identity))
    }

    /// Create a module with an empty root namespace
    #[must_use]
    pub fn new_module(host: &MetadataHost, identity: ModuleIdentity) -> UnitRc {
        Self::new(host, UnitIdentity::Module(identity))
    }

    /// Create a unit with an empty root namespace
    #[must_use]
    pub fn new(host: &MetadataHost, identity: UnitIdentity) -> UnitRc {
        let empty = host.name_table().empty_name();
        Arc::new_cyclic(|unit| Unit {
            identity,
            root: Arc::new(UnitNamespace {
                name: empty,
                parent: None,
                unit: unit.clone(),
                members: boxcar::Vec::new(),
                key: OnceLock::new(),
            }),
            exported_types: boxcar::Vec::new(),
            key: OnceLock::new(),
        })
    }

    /// The identity of the unit
    #[must_use]
    pub fn identity(&self) -> &UnitIdentity {
        &self.identity
    }

    /// The unnamed root namespace
    #[must_use]
    pub fn root(&self) -> &NamespaceRc {
        &self.root
    }

    /// The interned key of the unit
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || host.unit_key(&self.identity))
    }

    /// Declares a nested type alias inside `containing`, for a nested type that has moved
    /// along with its forwarded container
    pub fn add_nested_alias(
        self: &Arc<Self>,
        containing: &AliasRc,
        name: Name,
        generic_parameter_count: u16,
        aliased_type: TypeRefRc,
    ) -> AliasRc {
        let alias = Arc::new(AliasForType {
            name,
            generic_parameter_count,
            aliased_type,
            kind: AliasKind::Nested {
                containing_alias: containing.clone(),
            },
            unit: Arc::downgrade(self),
        });
        self.exported_types.push(alias.clone());
        alias
    }

    /// Finds a type by dotted name.
    ///
    /// The leading segments are matched against namespaces, the remaining ones against
    /// namespace and nested types. `generic_parameter_count` is the total number of generic
    /// parameters along the chain of types; every enclosing type consumes its own share.
    #[must_use]
    pub fn find_type(
        &self,
        host: &MetadataHost,
        type_name: &str,
        generic_parameter_count: u16,
    ) -> Option<TypeDefRc> {
        let segments: Vec<&str> = type_name.split('.').collect();
        find_in_namespace(host, &self.root, &segments, generic_parameter_count)
    }
}

fn find_in_namespace(
    host: &MetadataHost,
    namespace: &NamespaceRc,
    segments: &[&str],
    generic_parameter_count: u16,
) -> Option<TypeDefRc> {
    let (first, rest) = segments.split_first()?;
    let name = host.name_for(first);

    if !rest.is_empty() {
        let nested = namespace.get_members_named(&name, false).into_iter().find_map(|m| match m {
            NamespaceMember::Namespace(nested) => Some(nested),
            _ => None,
        });
        if let Some(nested) = nested {
            if let Some(found) = find_in_namespace(host, &nested, rest, generic_parameter_count) {
                return Some(found);
            }
        }
    }

    for member in namespace.get_members_named(&name, false) {
        let NamespaceMember::Type(candidate) = member else {
            continue;
        };
        if let Some(found) = match_type_chain(host, &candidate, rest, generic_parameter_count) {
            return Some(found);
        }
    }
    None
}

fn match_type_chain(
    host: &MetadataHost,
    candidate: &TypeDefRc,
    rest: &[&str],
    generic_parameter_count: u16,
) -> Option<TypeDefRc> {
    let own = candidate.generic_parameter_count();
    let Some((next, tail)) = rest.split_first() else {
        return (own == generic_parameter_count).then(|| candidate.clone());
    };
    if own > generic_parameter_count {
        return None;
    }

    let name = host.name_for(next);
    candidate
        .nested_types()
        .filter(|nested| nested.name == name)
        .find_map(|nested| match_type_chain(host, &nested, tail, generic_parameter_count - own))
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("identity", &self.identity.strong_name())
            .finish_non_exhaustive()
    }
}

/// A member of a namespace
#[derive(Debug, Clone)]
pub enum NamespaceMember {
    /// A nested namespace
    Namespace(NamespaceRc),
    /// A type definition
    Type(TypeDefRc),
    /// A type forwarding alias
    Alias(AliasRc),
}

impl NamespaceMember {
    /// The member name
    #[must_use]
    pub fn name(&self) -> &Name {
        match self {
            NamespaceMember::Namespace(namespace) => &namespace.name,
            NamespaceMember::Type(definition) => &definition.name,
            NamespaceMember::Alias(alias) => &alias.name,
        }
    }
}

/// A namespace of a unit
pub struct UnitNamespace {
    /// Simple name; empty for the root namespace
    pub name: Name,
    parent: Option<Weak<UnitNamespace>>,
    unit: Weak<Unit>,
    /// Members, in the order they were added
    pub members: boxcar::Vec<NamespaceMember>,
    key: OnceLock<InternKey>,
}

impl UnitNamespace {
    /// Returns `true` for the root namespace of a unit
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The enclosing namespace
    #[must_use]
    pub fn parent(&self) -> Option<NamespaceRc> {
        self.parent.as_ref()?.upgrade()
    }

    /// The unit owning this namespace
    #[must_use]
    pub fn unit(&self) -> Option<UnitRc> {
        self.unit.upgrade()
    }

    /// Returns the nested namespace `name`, creating it if it does not exist yet
    pub fn add_namespace(self: &Arc<Self>, name: Name) -> NamespaceRc {
        let existing = self.members.iter().find_map(|(_, member)| match member {
            NamespaceMember::Namespace(nested) if nested.name == name => Some(nested.clone()),
            _ => None,
        });
        if let Some(existing) = existing {
            return existing;
        }

        let nested = Arc::new(UnitNamespace {
            name,
            parent: Some(Arc::downgrade(self)),
            unit: self.unit.clone(),
            members: boxcar::Vec::new(),
            key: OnceLock::new(),
        });
        self.members.push(NamespaceMember::Namespace(nested.clone()));
        nested
    }

    /// Adds a type definition and returns it
    pub fn add_type(self: &Arc<Self>, definition: TypeDefinition) -> TypeDefRc {
        definition.set_container(TypeContainer::Namespace(DefRef::new(self)));
        let definition = Arc::new(definition);
        self.members.push(NamespaceMember::Type(definition.clone()));
        definition
    }

    /// Declares that the type `name` of this namespace now lives at `aliased_type`
    pub fn add_alias(
        self: &Arc<Self>,
        name: Name,
        generic_parameter_count: u16,
        aliased_type: TypeRefRc,
    ) -> AliasRc {
        let alias = Arc::new(AliasForType {
            name,
            generic_parameter_count,
            aliased_type,
            kind: AliasKind::Namespace(Arc::downgrade(self)),
            unit: self.unit.clone(),
        });
        self.members.push(NamespaceMember::Alias(alias.clone()));
        if let Some(unit) = self.unit.upgrade() {
            unit.exported_types.push(alias.clone());
        }
        alias
    }

    /// Members with the given name, in the order they were added
    #[must_use]
    pub fn get_members_named(&self, name: &Name, ignore_case: bool) -> Vec<NamespaceMember> {
        self.members
            .iter()
            .filter(|(_, member)| member.name().matches(name, ignore_case))
            .map(|(_, member)| member.clone())
            .collect()
    }

    /// Type definitions directly in this namespace
    pub fn types(&self) -> impl Iterator<Item = TypeDefRc> + '_ {
        self.members.iter().filter_map(|(_, member)| match member {
            NamespaceMember::Type(definition) => Some(definition.clone()),
            _ => None,
        })
    }

    /// The dotted name from the root, empty for the root namespace
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.parent() {
            Some(parent) if !parent.is_root() => {
                format!("{}.{}", parent.full_name(), self.name)
            }
            _ => self.name.value().to_string(),
        }
    }

    /// The interned key of this namespace
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            let structural = match (&self.parent, self.unit.upgrade()) {
                (None, Some(unit)) => StructuralKey::RootNamespace(unit.interned_key(host)),
                (Some(parent), _) => match parent.upgrade() {
                    Some(parent) => StructuralKey::NestedNamespace {
                        parent: parent.interned_key(host),
                        name: self.name.unique_key(),
                    },
                    None => return host.intern_factory().fresh(),
                },
                (None, None) => return host.intern_factory().fresh(),
            };
            host.intern_factory().intern(structural)
        })
    }
}

impl fmt::Debug for UnitNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitNamespace")
            .field("name", &self.full_name())
            .field("members", &self.members.count())
            .finish_non_exhaustive()
    }
}

/// Where an alias is declared
#[derive(Debug, Clone)]
pub enum AliasKind {
    /// Directly in a namespace
    Namespace(Weak<UnitNamespace>),
    /// Inside another alias, for nested types of a forwarded type
    Nested {
        /// The alias of the containing type
        containing_alias: AliasRc,
    },
}

/// A type forwarder: a name in this unit that stands for a type defined elsewhere
#[derive(Debug)]
pub struct AliasForType {
    /// Simple name of the forwarded type
    pub name: Name,
    /// Number of generic parameters of the forwarded type
    pub generic_parameter_count: u16,
    /// Where the type lives now
    pub aliased_type: TypeRefRc,
    /// Where the alias is declared
    pub kind: AliasKind,
    unit: Weak<Unit>,
}

impl AliasForType {
    /// The unit declaring this alias
    #[must_use]
    pub fn defining_unit(&self) -> Option<UnitRc> {
        self.unit.upgrade()
    }

    /// The nested alias declared inside this one with the given name and arity
    #[must_use]
    pub fn find_nested_alias(
        self: &Arc<Self>,
        name: &Name,
        generic_parameter_count: u16,
    ) -> Option<AliasRc> {
        let unit = self.unit.upgrade()?;
        let found = unit.exported_types.iter().find_map(|(_, alias)| match &alias.kind {
            AliasKind::Nested { containing_alias }
                if Arc::ptr_eq(containing_alias, self)
                    && alias.name == *name
                    && alias.generic_parameter_count == generic_parameter_count =>
            {
                Some(alias.clone())
            }
            _ => None,
        });
        found
    }
}

/// The shape of a namespace reference
#[derive(Debug, Clone)]
pub enum NamespaceReferenceKind {
    /// The root namespace of a unit
    Root(UnitIdentity),
    /// A namespace nested in another
    Nested {
        /// The enclosing namespace
        containing: NamespaceRefRc,
        /// Simple name
        name: Name,
    },
}

/// A reference to a namespace of a unit, by unit identity and path
pub struct UnitNamespaceReference {
    /// The shape of this reference
    pub kind: NamespaceReferenceKind,
    key: OnceLock<InternKey>,
    resolved: OnceLock<Option<DefRef<UnitNamespace>>>,
}

impl UnitNamespaceReference {
    /// Reference to the root namespace of `unit`
    #[must_use]
    pub fn root(unit: UnitIdentity) -> NamespaceRefRc {
        Self::from_kind(NamespaceReferenceKind::Root(unit))
    }

    /// Reference to the namespace `name` inside `containing`
    #[must_use]
    pub fn nested(containing: NamespaceRefRc, name: Name) -> NamespaceRefRc {
        Self::from_kind(NamespaceReferenceKind::Nested { containing, name })
    }

    fn from_kind(kind: NamespaceReferenceKind) -> NamespaceRefRc {
        Arc::new(UnitNamespaceReference {
            kind,
            key: OnceLock::new(),
            resolved: OnceLock::new(),
        })
    }

    /// The identity of the referenced unit
    #[must_use]
    pub fn unit(&self) -> &UnitIdentity {
        match &self.kind {
            NamespaceReferenceKind::Root(unit) => unit,
            NamespaceReferenceKind::Nested { containing, .. } => containing.unit(),
        }
    }

    /// Returns `true` for a reference to a root namespace
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NamespaceReferenceKind::Root(_))
    }

    /// The dotted name from the root, empty for a root reference
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.kind {
            NamespaceReferenceKind::Root(_) => String::new(),
            NamespaceReferenceKind::Nested { containing, name } => {
                if containing.is_root() {
                    name.value().to_string()
                } else {
                    format!("{}.{}", containing.full_name(), name)
                }
            }
        }
    }

    /// The interned key; equal to the key of the namespace it names
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            let structural = match &self.kind {
                NamespaceReferenceKind::Root(unit) => {
                    StructuralKey::RootNamespace(host.unit_key(unit))
                }
                NamespaceReferenceKind::Nested { containing, name } => {
                    StructuralKey::NestedNamespace {
                        parent: containing.interned_key(host),
                        name: name.unique_key(),
                    }
                }
            };
            host.intern_factory().intern(structural)
        })
    }

    /// Locates the namespace, loading the unit through the host if necessary
    pub fn resolve(&self, host: &MetadataHost) -> Option<NamespaceRc> {
        host.lazily(&self.resolved, || {
            let namespace = match &self.kind {
                NamespaceReferenceKind::Root(unit) => host.load_unit(unit)?.root().clone(),
                NamespaceReferenceKind::Nested { containing, name } => containing
                    .resolve(host)?
                    .get_members_named(name, false)
                    .into_iter()
                    .find_map(|member| match member {
                        NamespaceMember::Namespace(nested) => Some(nested),
                        _ => None,
                    })?,
            };
            Some(DefRef::new(&namespace))
        })?
        .upgrade()
    }
}

impl fmt::Debug for UnitNamespaceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitNamespaceReference")
            .field("unit", &self.unit().name())
            .field("namespace", &self.full_name())
            .finish_non_exhaustive()
    }
}
