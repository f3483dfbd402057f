//! Scoped type resolution.
//!
//! [`TypeReference::resolved_type`] always starts from the unit a reference names. Tools that
//! merge or rewrite units need to resolve a reference relative to the unit, namespace, type or
//! generic method they are currently working on instead. [`TypeResolver`] carries that scope:
//!
//! - root namespace references land on the scope namespace, else the scope unit's root, else
//!   the root of the unit the host loads
//! - nested type references are first looked up in the scope type
//! - generic method parameters are first looked up on the scope method
//!
//! Scoped results are not cached on the reference.

use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    members::MethodDefRc,
    names::Name,
    typesystem::{
        PrimitiveTypeCode, ResolvedType, TypeDefRc, TypeDefRef, TypeRefRc, TypeReference,
        TypeReferenceKind,
    },
    units::{NamespaceMember, NamespaceRc, NamespaceReferenceKind, UnitNamespaceReference, UnitRc},
};

/// Resolves references relative to a unit, namespace, type and generic method scope
#[derive(Clone)]
pub struct TypeResolver<'h> {
    host: &'h MetadataHost,
    unit: Option<UnitRc>,
    namespace: Option<NamespaceRc>,
    type_scope: Option<TypeDefRc>,
    method: Option<MethodDefRc>,
}

impl<'h> TypeResolver<'h> {
    /// A resolver without scope; behaves like unscoped resolution
    #[must_use]
    pub fn new(host: &'h MetadataHost) -> Self {
        TypeResolver {
            host,
            unit: None,
            namespace: None,
            type_scope: None,
            method: None,
        }
    }

    /// Scopes resolution to `unit`
    #[must_use]
    pub fn with_unit(mut self, unit: UnitRc) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Scopes resolution to `namespace`, and to its unit unless one is set already
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceRc) -> Self {
        if self.unit.is_none() {
            self.unit = namespace.unit();
        }
        self.namespace = Some(namespace);
        self
    }

    /// Scopes resolution to `type_scope`
    #[must_use]
    pub fn with_type(mut self, type_scope: TypeDefRc) -> Self {
        self.type_scope = Some(type_scope);
        self
    }

    /// Scopes generic method parameter resolution to `method`
    #[must_use]
    pub fn with_method(mut self, method: MethodDefRc) -> Self {
        self.method = Some(method);
        self
    }

    /// The host this resolver runs in
    #[must_use]
    pub fn host(&self) -> &'h MetadataHost {
        self.host
    }

    /// The scope unit
    #[must_use]
    pub fn unit(&self) -> Option<&UnitRc> {
        self.unit.as_ref()
    }

    /// The scope namespace
    #[must_use]
    pub fn namespace(&self) -> Option<&NamespaceRc> {
        self.namespace.as_ref()
    }

    /// The scope type
    #[must_use]
    pub fn type_scope(&self) -> Option<&TypeDefRc> {
        self.type_scope.as_ref()
    }

    /// Resolves a namespace reference within this scope
    #[must_use]
    pub fn resolve_namespace(&self, reference: &UnitNamespaceReference) -> Option<NamespaceRc> {
        match &reference.kind {
            NamespaceReferenceKind::Root(identity) => {
                if let Some(namespace) = &self.namespace {
                    return Some(namespace.clone());
                }
                if let Some(unit) = &self.unit {
                    return Some(unit.root().clone());
                }
                Some(self.host.load_unit(identity)?.root().clone())
            }
            NamespaceReferenceKind::Nested { containing, name } => self
                .resolve_namespace(containing)?
                .get_members_named(name, false)
                .into_iter()
                .find_map(|member| match member {
                    NamespaceMember::Namespace(nested) => Some(nested),
                    _ => None,
                }),
        }
    }

    /// Resolves `reference` within this scope.
    ///
    /// Returns `None` if the reference, or any component it is built from, does not resolve.
    #[tracing::instrument(level = "debug", skip_all, fields(reference = ?reference.name()))]
    pub fn resolve(&self, reference: &TypeRefRc) -> Option<ResolvedType> {
        let _guard = match self.host.enter_resolution() {
            Ok(guard) => guard,
            Err(error) => {
                debug!("scoped resolution aborted: {}", error);
                return None;
            }
        };

        match &reference.kind {
            TypeReferenceKind::Namespace {
                namespace,
                name,
                generic_parameter_count,
            } => {
                let namespace = self.resolve_namespace(namespace)?;
                self.resolve_namespace_type(reference, &namespace, name, *generic_parameter_count)
            }
            TypeReferenceKind::Nested {
                containing,
                name,
                generic_parameter_count,
            } => self.resolve_nested_type(reference, containing, name, *generic_parameter_count),
            TypeReferenceKind::GenericInstance { generic, arguments } => {
                let generic = self.resolve(generic)?;
                let template = generic.definition()?;
                if usize::from(template.generic_parameter_count()) != arguments.len() {
                    return None;
                }
                for argument in arguments {
                    self.resolve(argument)?;
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
                let container = self.resolve(containing)?;
                let nested = self.resolve(unspecialized)?.definition()?;
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
                let definition = self.resolve(defining_type)?.definition()?;
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
                if let Some(method) = &self.method {
                    if let Some(parameter) = method.generic_parameters.get(usize::from(*index)) {
                        return Some(ResolvedType::GenericParameter(parameter.into()));
                    }
                }

                let definition = self.resolve(defining_type)?.definition()?;
                let method = definition.methods().find(|method| {
                    method.name == *method_name
                        && method.generic_parameter_count() == *method_generic_parameter_count
                })?;
                let parameter = method.generic_parameters.get(usize::from(*index))?;
                Some(ResolvedType::GenericParameter(parameter.into()))
            }
            TypeReferenceKind::Pointer(target) => {
                self.resolve(target)?;
                Some(ResolvedType::Pointer(target.clone()))
            }
            TypeReferenceKind::ManagedPointer(target) => {
                self.resolve(target)?;
                Some(ResolvedType::ManagedPointer(target.clone()))
            }
            TypeReferenceKind::Array {
                element,
                rank,
                sizes,
                lower_bounds,
                is_vector,
            } => {
                self.resolve(element)?;
                Some(ResolvedType::Array {
                    element: element.clone(),
                    rank: *rank,
                    sizes: sizes.clone(),
                    lower_bounds: lower_bounds.clone(),
                    is_vector: *is_vector,
                })
            }
            TypeReferenceKind::Modified { unmodified, .. } => self.resolve(unmodified),
            TypeReferenceKind::FunctionPointer(signature) => {
                Some(ResolvedType::FunctionPointer(signature.clone()))
            }
            TypeReferenceKind::Definition(definition) => {
                definition.upgrade().map(|_| ResolvedType::Named(definition.clone()))
            }
        }
    }

    fn resolve_namespace_type(
        &self,
        reference: &TypeReference,
        namespace: &NamespaceRc,
        name: &Name,
        generic_parameter_count: u16,
    ) -> Option<ResolvedType> {
        for member in namespace.get_members_named(name, false) {
            match member {
                NamespaceMember::Type(definition)
                    if definition.generic_parameter_count() == generic_parameter_count
                        && type_code_matches(reference, &definition) =>
                {
                    return Some(ResolvedType::Named(TypeDefRef::new(&definition)));
                }
                NamespaceMember::Alias(alias)
                    if alias.generic_parameter_count == generic_parameter_count =>
                {
                    return self.resolve(&alias.aliased_type);
                }
                _ => {}
            }
        }
        None
    }

    fn resolve_nested_type(
        &self,
        reference: &TypeReference,
        containing: &TypeRefRc,
        name: &Name,
        generic_parameter_count: u16,
    ) -> Option<ResolvedType> {
        if let Some(scope) = &self.type_scope {
            let scoped = scope.nested_types().find(|nested| {
                nested.name == *name
                    && nested.generic_parameter_count() == generic_parameter_count
                    && type_code_matches(reference, nested)
            });
            if let Some(nested) = scoped {
                return Some(ResolvedType::Named(TypeDefRef::new(&nested)));
            }
        }

        let container = self.resolve(containing)?;
        let nested = container
            .definition()?
            .find_nested_type(name, generic_parameter_count)?;
        Some(if container.is_instance() {
            ResolvedType::SpecializedNested {
                containing: Box::new(container),
                unspecialized: TypeDefRef::new(&nested),
            }
        } else {
            ResolvedType::Named(TypeDefRef::new(&nested))
        })
    }
}

/// A reference without a primitive classification matches any definition
fn type_code_matches(reference: &TypeReference, definition: &TypeDefRc) -> bool {
    reference.type_code == PrimitiveTypeCode::NotPrimitive
        || reference.type_code == definition.type_code
}
