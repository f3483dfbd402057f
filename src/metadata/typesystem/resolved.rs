//! Resolution of type references to definitions.
//!
//! A [`ResolvedType`] is what a [`TypeReference`] denotes once the unit, namespace, container
//! and generic context it mentions have been located. Named types resolve to their
//! [`TypeDefinition`]; instances and nested types of instances keep the template definition
//! together with the instantiation context; structural types (pointers, arrays, function
//! pointers) carry their component references and always resolve.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::metadata::{
    host::{resolution_aborts, MetadataHost},
    intern::{InternKey, StructuralKey},
    members::{ResolvedMember, ResolvedMethod, Specializable},
    names::Name,
    signatures::MethodSignature,
    typesystem::{
        GenericParamRef, TypeDefRc, TypeDefRef, TypeMember, TypeRefRc, TypeReference,
        TypeReferenceKind,
    },
    units::{AliasRc, AliasRef, NamespaceMember, NamespaceRc},
};

/// The definition a type reference denotes
#[derive(Debug, Clone)]
pub enum ResolvedType {
    /// A type definition
    Named(TypeDefRef),
    /// An instance of a generic type
    GenericInstance {
        /// The resolved generic type
        generic: Box<ResolvedType>,
        /// The type arguments, as referenced
        arguments: Vec<TypeRefRc>,
    },
    /// A nested type of a generic instance
    SpecializedNested {
        /// The resolved containing instance
        containing: Box<ResolvedType>,
        /// The nested type as declared
        unspecialized: TypeDefRef,
    },
    /// A generic type or method parameter
    GenericParameter(GenericParamRef),
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
    /// A function pointer
    FunctionPointer(Arc<MethodSignature>),
}

impl ResolvedType {
    /// The type definition backing this type.
    ///
    /// For instances and nested types of instances this is the template definition. Structural
    /// types and generic parameters have none.
    #[must_use]
    pub fn definition(&self) -> Option<TypeDefRc> {
        match self {
            ResolvedType::Named(definition) => definition.upgrade(),
            ResolvedType::GenericInstance { generic, .. } => generic.definition(),
            ResolvedType::SpecializedNested { unspecialized, .. } => unspecialized.upgrade(),
            _ => None,
        }
    }

    /// Type arguments in scope for members of this type
    #[must_use]
    pub fn generic_arguments(&self) -> Vec<TypeRefRc> {
        match self {
            ResolvedType::GenericInstance { arguments, .. } => arguments.clone(),
            ResolvedType::SpecializedNested { containing, .. } => containing.generic_arguments(),
            _ => Vec::new(),
        }
    }

    /// Returns `true` for instances of generic types and types nested in them
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(
            self,
            ResolvedType::GenericInstance { .. } | ResolvedType::SpecializedNested { .. }
        )
    }

    /// Returns `true` if values of this type are copied rather than referenced
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self {
            ResolvedType::Pointer(_) | ResolvedType::FunctionPointer(_) => true,
            _ => self
                .definition()
                .is_some_and(|definition| definition.is_value_type() || definition.is_enum()),
        }
    }

    /// Returns `true` if this type is an object reference
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        match self {
            ResolvedType::Array { .. } => true,
            ResolvedType::Pointer(_)
            | ResolvedType::ManagedPointer(_)
            | ResolvedType::FunctionPointer(_)
            | ResolvedType::GenericParameter(_) => false,
            _ => self
                .definition()
                .is_some_and(|definition| definition.is_reference_type()),
        }
    }

    /// The interned key of the resolved identity
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        let factory = host.intern_factory();
        match self {
            ResolvedType::Named(definition) => match definition.upgrade() {
                Some(definition) => definition.interned_key(host),
                None => factory.fresh(),
            },
            ResolvedType::GenericInstance { generic, arguments } => {
                factory.intern(StructuralKey::GenericTypeInstance {
                    generic: generic.interned_key(host),
                    arguments: arguments.iter().map(|a| a.interned_key(host)).collect(),
                })
            }
            ResolvedType::SpecializedNested {
                containing,
                unspecialized,
            } => match unspecialized.upgrade() {
                Some(nested) => factory.intern(StructuralKey::NestedType {
                    containing: containing.interned_key(host),
                    name: nested.name.unique_key(),
                    generic_parameter_count: nested.generic_parameter_count(),
                }),
                None => factory.fresh(),
            },
            ResolvedType::GenericParameter(parameter) => match parameter.upgrade() {
                Some(parameter) => parameter.interned_key(host),
                None => factory.fresh(),
            },
            ResolvedType::Pointer(target) => {
                factory.intern(StructuralKey::Pointer(target.interned_key(host)))
            }
            ResolvedType::ManagedPointer(target) => {
                factory.intern(StructuralKey::ManagedPointer(target.interned_key(host)))
            }
            ResolvedType::Array {
                element,
                rank,
                sizes,
                lower_bounds,
                is_vector,
            } => {
                if *is_vector {
                    factory.intern(StructuralKey::Vector(element.interned_key(host)))
                } else {
                    factory.intern(StructuralKey::Matrix {
                        element: element.interned_key(host),
                        rank: *rank,
                        sizes: sizes.clone(),
                        lower_bounds: lower_bounds.clone(),
                    })
                }
            }
            ResolvedType::FunctionPointer(signature) => {
                factory.intern(StructuralKey::FunctionPointer(signature.signature_key(host)))
            }
        }
    }

    /// Members of this type with the given name.
    ///
    /// Members of instances come back specialized to the instance.
    #[must_use]
    pub fn get_members_named(&self, name: &Name, ignore_case: bool) -> Vec<ResolvedMember> {
        let Some(template) = self.definition() else {
            return Vec::new();
        };

        let specialize = self.is_instance();
        template
            .get_members_named(name, ignore_case)
            .into_iter()
            .map(|member| self.resolve_member(member, specialize))
            .collect()
    }

    /// Wraps a member of the template definition as a member of this type
    pub(crate) fn resolve_member(&self, member: TypeMember, specialize: bool) -> ResolvedMember {
        match member {
            TypeMember::Field(field) => {
                ResolvedMember::Field(self.specializable(&field, specialize))
            }
            TypeMember::Property(property) => {
                ResolvedMember::Property(self.specializable(&property, specialize))
            }
            TypeMember::Event(event) => {
                ResolvedMember::Event(self.specializable(&event, specialize))
            }
            TypeMember::Method(method) => ResolvedMember::Method(if specialize {
                ResolvedMethod::Specialized {
                    unspecialized: (&method).into(),
                    containing: self.clone(),
                }
            } else {
                ResolvedMethod::Definition((&method).into())
            }),
            TypeMember::NestedType(nested) => ResolvedMember::NestedType(if specialize {
                ResolvedType::SpecializedNested {
                    containing: Box::new(self.clone()),
                    unspecialized: TypeDefRef::new(&nested),
                }
            } else {
                ResolvedType::Named(TypeDefRef::new(&nested))
            }),
        }
    }

    fn specializable<T>(&self, member: &Arc<T>, specialize: bool) -> Specializable<T> {
        if specialize {
            Specializable::Specialized {
                unspecialized: member.into(),
                containing: self.clone(),
            }
        } else {
            Specializable::Definition(member.into())
        }
    }
}

impl TypeReference {
    /// Resolves this reference, caching the result.
    ///
    /// Returns `None` if any unit, namespace, container or parameter along the path cannot be
    /// found. Repeated calls return the cached outcome.
    pub fn resolved_type(&self, host: &MetadataHost) -> Option<ResolvedType> {
        host.lazily(&self.resolved, || self.resolve(host))
    }

    /// The forwarding alias this reference was resolved through, if any.
    ///
    /// Forces resolution.
    pub fn alias_for_type(&self, host: &MetadataHost) -> Option<AliasRc> {
        let _ = self.resolved_type(host);
        self.alias.get()?.as_ref()?.upgrade()
    }

    fn resolve(&self, host: &MetadataHost) -> Option<ResolvedType> {
        let _guard = match host.enter_resolution() {
            Ok(guard) => guard,
            Err(error) => {
                debug!(reference = ?self.name(), "type resolution aborted: {}", error);
                return None;
            }
        };

        let aborts = resolution_aborts();
        let resolved = self.resolve_kind(host);
        if resolution_aborts() == aborts {
            // No-op if resolution went through an alias
            let _ = self.alias.set(None);
        }
        trace!(reference = ?self.name(), found = resolved.is_some(), "type reference resolved");
        resolved
    }

    fn resolve_kind(&self, host: &MetadataHost) -> Option<ResolvedType> {
        match &self.kind {
            TypeReferenceKind::Namespace {
                namespace,
                name,
                generic_parameter_count,
            } => {
                let namespace = namespace.resolve(host)?;
                self.resolve_in_namespace(host, &namespace, name, *generic_parameter_count)
            }
            TypeReferenceKind::Nested {
                containing,
                name,
                generic_parameter_count,
            } => {
                let container = containing.resolved_type(host)?;
                let template = container.definition()?;
                let nested = template.find_nested_type(name, *generic_parameter_count)?;

                if let Some(containing_alias) = containing.alias_for_type(host) {
                    if let Some(nested_alias) =
                        containing_alias.find_nested_alias(name, *generic_parameter_count)
                    {
                        let _ = self.alias.set(Some(AliasRef::new(&nested_alias)));
                    }
                }

                Some(if container.is_instance() {
                    ResolvedType::SpecializedNested {
                        containing: Box::new(container),
                        unspecialized: TypeDefRef::new(&nested),
                    }
                } else {
                    ResolvedType::Named(TypeDefRef::new(&nested))
                })
            }
            TypeReferenceKind::GenericInstance { generic, arguments } => {
                let generic = generic.resolved_type(host)?;
                let template = generic.definition()?;
                if usize::from(template.generic_parameter_count()) != arguments.len() {
                    return None;
                }
                Some(ResolvedType::GenericInstance {
                    generic: Box::new(generic),
                    arguments: arguments.clone(),
                })
            }
            TypeReferenceKind::SpecializedNested {
                unspecialized,
                containing,
            } => {
                let container = containing.resolved_type(host)?;
                let nested = unspecialized.resolved_type(host)?.definition()?;
                Some(if container.is_instance() {
                    ResolvedType::SpecializedNested {
                        containing: Box::new(container),
                        unspecialized: TypeDefRef::new(&nested),
                    }
                } else {
                    ResolvedType::Named(TypeDefRef::new(&nested))
                })
            }
            TypeReferenceKind::GenericTypeParameter {
                defining_type,
                index,
                ..
            } => {
                let definition = defining_type.resolved_type(host)?.definition()?;
                let parameter = definition.generic_parameters.get(usize::from(*index))?;
                Some(ResolvedType::GenericParameter(parameter.into()))
            }
            TypeReferenceKind::GenericMethodParameter {
                defining_type,
                method_name,
                method_generic_parameter_count,
                index,
                ..
            } => {
                let definition = defining_type.resolved_type(host)?.definition()?;
                let method = definition.methods().find(|method| {
                    method.name == *method_name
                        && method.generic_parameter_count() == *method_generic_parameter_count
                })?;
                let parameter = method.generic_parameters.get(usize::from(*index))?;
                Some(ResolvedType::GenericParameter(parameter.into()))
            }
            TypeReferenceKind::Pointer(target) => Some(ResolvedType::Pointer(target.clone())),
            TypeReferenceKind::ManagedPointer(target) => {
                Some(ResolvedType::ManagedPointer(target.clone()))
            }
            TypeReferenceKind::Array {
                element,
                rank,
                sizes,
                lower_bounds,
                is_vector,
            } => Some(ResolvedType::Array {
                element: element.clone(),
                rank: *rank,
                sizes: sizes.clone(),
                lower_bounds: lower_bounds.clone(),
                is_vector: *is_vector,
            }),
            TypeReferenceKind::Modified { unmodified, .. } => unmodified.resolved_type(host),
            TypeReferenceKind::FunctionPointer(signature) => {
                Some(ResolvedType::FunctionPointer(signature.clone()))
            }
            TypeReferenceKind::Definition(definition) => {
                definition.upgrade().map(|_| ResolvedType::Named(definition.clone()))
            }
        }
    }

    /// Looks `name` up among the types and aliases of `namespace`.
    ///
    /// A type definition with matching arity wins. Otherwise the first alias with matching
    /// arity is followed and recorded.
    fn resolve_in_namespace(
        &self,
        host: &MetadataHost,
        namespace: &NamespaceRc,
        name: &Name,
        generic_parameter_count: u16,
    ) -> Option<ResolvedType> {
        let mut alias = None;
        for member in namespace.get_members_named(name, false) {
            match member {
                NamespaceMember::Type(definition)
                    if definition.generic_parameter_count() == generic_parameter_count =>
                {
                    return Some(ResolvedType::Named(TypeDefRef::new(&definition)));
                }
                NamespaceMember::Alias(candidate)
                    if alias.is_none()
                        && candidate.generic_parameter_count == generic_parameter_count =>
                {
                    alias = Some(candidate);
                }
                _ => {}
            }
        }

        let alias = alias?;
        let _ = self.alias.set(Some(AliasRef::new(&alias)));

        let target = alias.aliased_type.resolved_type(host)?;
        match target.definition() {
            Some(definition) if definition.generic_parameter_count() == generic_parameter_count => {
                Some(target)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::typesystem::{TypeAttributes, TypeDefinition},
        test::factories::TestModel,
    };

    #[test]
    fn test_namespace_type_arity_must_match() {
        let model = TestModel::new();
        let t = model.class("N", "T");

        let resolved = model.type_ref("N", "T", 0).resolved_type(&model.host).unwrap();
        let definition = resolved.definition().unwrap();
        assert!(Arc::ptr_eq(&definition, &t));
        assert_eq!(definition.name.value(), "T");
        assert_eq!(definition.generic_parameter_count(), 0);

        assert!(model.type_ref("N", "T", 1).resolved_type(&model.host).is_none());
    }

    #[test]
    fn test_alias_target_arity_is_rechecked() {
        let model = TestModel::new();
        let single = model.class("Real", "Single");
        let forwarder = model.namespace("Fwd");
        forwarder.add_alias(model.name("Single"), 0, model.type_ref("Real", "Single", 0));
        let mismatched =
            forwarder.add_alias(model.name("Single"), 1, model.type_ref("Real", "Single", 0));

        let through_alias = model.type_ref("Fwd", "Single", 0);
        let resolved = through_alias.resolved_type(&model.host).unwrap();
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &single));

        let wrong_arity = model.type_ref("Fwd", "Single", 1);
        assert!(wrong_arity.resolved_type(&model.host).is_none());
        assert!(Arc::ptr_eq(
            &wrong_arity.alias_for_type(&model.host).unwrap(),
            &mismatched
        ));
    }

    #[test]
    fn test_nested_type_through_forwarded_container_records_nested_alias() {
        let model = TestModel::new();
        let outer = model.class("Real", "Outer");
        let inner = outer.add_nested_type(TypeDefinition::new(
            model.name("Inner"),
            TypeAttributes::PUBLIC,
        ));

        let outer_alias = model.namespace("Fwd").add_alias(
            model.name("Outer"),
            0,
            model.type_ref("Real", "Outer", 0),
        );
        let inner_alias = model.unit.add_nested_alias(
            &outer_alias,
            model.name("Inner"),
            0,
            TypeReference::nested_type(model.type_ref("Real", "Outer", 0), model.name("Inner"), 0),
        );

        let forwarded = TypeReference::nested_type(
            model.type_ref("Fwd", "Outer", 0),
            model.name("Inner"),
            0,
        );
        let resolved = forwarded.resolved_type(&model.host).unwrap();
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &inner));
        assert!(Arc::ptr_eq(
            &forwarded.alias_for_type(&model.host).unwrap(),
            &inner_alias
        ));

        let direct =
            TypeReference::nested_type(model.type_ref("Real", "Outer", 0), model.name("Inner"), 0);
        assert!(direct.resolved_type(&model.host).is_some());
        assert!(direct.alias_for_type(&model.host).is_none());
    }
}
