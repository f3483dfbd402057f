use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    intern::InternKey,
    members::{
        FieldDefRc, FieldReference, FieldReferenceKind, MethodDefRc, MethodReference,
        MethodReferenceKind, ResolvedField, ResolvedMethod, Specializable,
    },
    names::Name,
    signatures::{generic_method_signatures_are_equal, signatures_are_equal, MethodSignature},
    typesystem::{
        specialize_signature, specialize_type_reference, ResolvedType, TypeDefRc, TypeDefRef,
        TypeMember, TypeRefRc, TypeResolver,
    },
    units::{NamespaceRc, UnitRc},
};

/// What a method reference asks for
struct MethodQuery<'a> {
    name: &'a Name,
    generic_parameter_count: u16,
    signature: &'a MethodSignature,
}

/// Resolves a field reference against the type it names.
///
/// Matches by name and resolved field type, searching declared members, then private helper
/// members, then base classes. Returns `None` if the field type or containing type does not
/// resolve, or if no field matches.
#[tracing::instrument(level = "debug", skip_all, fields(field = %reference.name))]
pub fn resolve_field(host: &MetadataHost, reference: &FieldReference) -> Option<ResolvedField> {
    let containing = reference.containing_type.resolved_type(host)?;
    let wanted = wanted_field_types(host, reference, |t| t.resolved_type(host))?;

    let resolve = |t: &TypeRefRc| t.resolved_type(host);
    let found = search_hierarchy(host, &containing, false, &mut |ty, template| {
        field_in(host, ty, template, &reference.name, &wanted, &resolve)
    });
    if found.is_none() {
        debug!("no matching field");
    }
    found
}

/// Resolves a method reference against the type it names.
///
/// Generic method instances resolve their generic method first and then require every type
/// argument to resolve and the argument count to equal the arity.
#[tracing::instrument(level = "debug", skip_all, fields(method = ?reference.name()))]
pub fn resolve_method(host: &MetadataHost, reference: &MethodReference) -> Option<ResolvedMethod> {
    let found = match &reference.kind {
        MethodReferenceKind::Definition(definition) => definition
            .upgrade()
            .map(|_| ResolvedMethod::Definition(definition.clone())),
        MethodReferenceKind::GenericInstance { generic, arguments } => {
            let generic = generic.resolved_method(host)?;
            instantiate(generic, arguments, |argument| {
                argument.resolved_type(host).is_some()
            })
        }
        MethodReferenceKind::Plain {
            containing_type,
            name,
            generic_parameter_count,
            signature,
        } => {
            let containing = containing_type.resolved_type(host)?;
            let query = MethodQuery {
                name,
                generic_parameter_count: *generic_parameter_count,
                signature,
            };
            search_hierarchy(host, &containing, true, &mut |ty, template| {
                method_in(ty, template, &query, &|declared, wanted| {
                    declared_signature_matches(host, ty, &declared.signature, wanted, &query)
                })
            })
        }
        MethodReferenceKind::Specialized {
            unspecialized,
            containing_type,
        } => {
            let containing = containing_type.resolved_type(host)?;
            let (name, signature) = (unspecialized.name()?, unspecialized.signature()?);
            let query = MethodQuery {
                name: &name,
                generic_parameter_count: unspecialized.generic_parameter_count(),
                signature: &signature,
            };
            search_hierarchy(host, &containing, true, &mut |ty, template| {
                method_in(ty, template, &query, &|declared, wanted| {
                    declared_signature_matches(host, ty, &declared.signature, wanted, &query)
                })
            })
        }
    };

    if found.is_none() {
        debug!("no matching method");
    }
    found
}

/// Resolves member references relative to a unit, namespace and type scope.
///
/// Type references inside the member reference are resolved through a [`TypeResolver`] with
/// the same scope. The scope type is searched before the containing type the reference
/// names. Results are not cached on the reference.
#[derive(Clone)]
pub struct MemberResolver<'h> {
    types: TypeResolver<'h>,
}

impl<'h> MemberResolver<'h> {
    /// A resolver without scope
    #[must_use]
    pub fn new(host: &'h MetadataHost) -> Self {
        MemberResolver {
            types: TypeResolver::new(host),
        }
    }

    /// Scopes resolution to `unit`
    #[must_use]
    pub fn with_unit(mut self, unit: UnitRc) -> Self {
        self.types = self.types.with_unit(unit);
        self
    }

    /// Scopes resolution to `namespace`
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceRc) -> Self {
        self.types = self.types.with_namespace(namespace);
        self
    }

    /// Scopes resolution to `type_scope`
    #[must_use]
    pub fn with_type(mut self, type_scope: TypeDefRc) -> Self {
        self.types = self.types.with_type(type_scope);
        self
    }

    /// The type resolver carrying the same scope
    #[must_use]
    pub fn type_resolver(&self) -> &TypeResolver<'h> {
        &self.types
    }

    /// Resolves `reference` within this scope
    #[tracing::instrument(level = "debug", skip_all, fields(field = %reference.name))]
    pub fn resolve_field(&self, reference: &FieldReference) -> Option<ResolvedField> {
        let host = self.types.host();
        let resolve = |t: &TypeRefRc| self.types.resolve(t);
        let wanted = wanted_field_types(host, reference, resolve)?;
        let mut find = |ty: &ResolvedType, template: &TypeDefRc| {
            field_in(host, ty, template, &reference.name, &wanted, &resolve)
        };

        if let Some(scope) = self.types.type_scope() {
            let scope = ResolvedType::Named(TypeDefRef::new(scope));
            if let Some(found) = search_hierarchy(host, &scope, false, &mut find) {
                return Some(found);
            }
        }

        let containing = self.types.resolve(&reference.containing_type)?;
        search_hierarchy(host, &containing, false, &mut find)
    }

    /// Resolves `reference` within this scope
    #[tracing::instrument(level = "debug", skip_all, fields(method = ?reference.name()))]
    pub fn resolve_method(&self, reference: &MethodReference) -> Option<ResolvedMethod> {
        let (containing_type, name, generic_parameter_count, signature) = match &reference.kind {
            MethodReferenceKind::Definition(definition) => {
                return definition
                    .upgrade()
                    .map(|_| ResolvedMethod::Definition(definition.clone()));
            }
            MethodReferenceKind::GenericInstance { generic, arguments } => {
                let generic = self.resolve_method(generic)?;
                return instantiate(generic, arguments, |argument| {
                    self.types.resolve(argument).is_some()
                });
            }
            MethodReferenceKind::Plain {
                containing_type,
                name,
                generic_parameter_count,
                signature,
            } => (
                containing_type.clone(),
                name.clone(),
                *generic_parameter_count,
                signature.clone(),
            ),
            MethodReferenceKind::Specialized {
                unspecialized,
                containing_type,
            } => (
                containing_type.clone(),
                unspecialized.name()?,
                unspecialized.generic_parameter_count(),
                unspecialized.signature()?,
            ),
        };

        let host = self.types.host();
        let query = MethodQuery {
            name: &name,
            generic_parameter_count,
            signature: &signature,
        };
        let mut find = |ty: &ResolvedType, template: &TypeDefRc| {
            method_in(ty, template, &query, &|declared, wanted| {
                self.scoped_signature_matches(declared, wanted)
            })
        };

        if let Some(scope) = self.types.type_scope() {
            let scope = ResolvedType::Named(TypeDefRef::new(scope));
            if let Some(found) = search_hierarchy(host, &scope, true, &mut find) {
                return Some(found);
            }
        }

        let containing = self.types.resolve(&containing_type)?;
        search_hierarchy(host, &containing, true, &mut find)
    }

    /// Compares the signature of `declared` against a referenced one, resolving both sides in
    /// this scope. Generic methods also resolve method type parameters against `declared`.
    fn scoped_signature_matches(&self, declared: &MethodDefRc, wanted: &MethodSignature) -> bool {
        let types = if declared.is_generic() {
            self.types.clone().with_method(declared.clone())
        } else {
            self.types.clone()
        };
        let signature = &declared.signature;
        let same_type = |a: &TypeRefRc, b: &TypeRefRc| match (types.resolve(a), types.resolve(b)) {
            (Some(a), Some(b)) => a.interned_key(types.host()) == b.interned_key(types.host()),
            _ => false,
        };

        signature.calling_convention == wanted.calling_convention
            && signature.return_by_ref == wanted.return_by_ref
            && signature.return_is_modified() == wanted.return_is_modified()
            && signature.parameters.len() == wanted.parameters.len()
            && same_type(&signature.return_type, &wanted.return_type)
            && signature
                .parameters
                .iter()
                .zip(&wanted.parameters)
                .all(|(d, w)| {
                    d.index == w.index
                        && d.by_ref == w.by_ref
                        && d.is_modified() == w.is_modified()
                        && same_type(&d.param_type, &w.param_type)
                })
    }
}

/// The resolved keys a field's declared type may have to match `reference`
fn wanted_field_types(
    host: &MetadataHost,
    reference: &FieldReference,
    resolve: impl Fn(&TypeRefRc) -> Option<ResolvedType>,
) -> Option<Vec<InternKey>> {
    let mut wanted = vec![resolve(&reference.field_type)?.interned_key(host)];
    if let FieldReferenceKind::Specialized { unspecialized } = &reference.kind {
        let declared = &unspecialized.unspecialize().field_type;
        if let Some(declared) = resolve(declared) {
            wanted.push(declared.interned_key(host));
        }
    }
    Some(wanted)
}

/// Walks `start`, then its base classes in declaration order and, if `interfaces` is set and
/// the type is an interface, its base interfaces. Returns the first result of `find`.
///
/// Supertypes of generic instances are specialized to the instance before they are searched.
fn search_hierarchy<R>(
    host: &MetadataHost,
    start: &ResolvedType,
    interfaces: bool,
    find: &mut dyn FnMut(&ResolvedType, &TypeDefRc) -> Option<R>,
) -> Option<R> {
    let _guard = match host.enter_resolution() {
        Ok(guard) => guard,
        Err(error) => {
            debug!("member search aborted: {}", error);
            return None;
        }
    };

    let template = start.definition()?;
    if let Some(found) = find(start, &template) {
        return Some(found);
    }

    for (_, base) in template.base_classes.iter() {
        let Some(base) = supertype(host, start, base) else {
            continue;
        };
        if let Some(found) = search_hierarchy(host, &base, interfaces, find) {
            return Some(found);
        }
    }

    if interfaces && template.is_interface() {
        for (_, interface) in template.interfaces.iter() {
            let Some(interface) = supertype(host, start, interface) else {
                continue;
            };
            if let Some(found) = search_hierarchy(host, &interface, interfaces, find) {
                return Some(found);
            }
        }
    }

    None
}

pub(super) fn supertype(
    host: &MetadataHost,
    derived: &ResolvedType,
    reference: &TypeRefRc,
) -> Option<ResolvedType> {
    if derived.is_instance() {
        specialize_type_reference(reference, &derived.generic_arguments(), &[]).resolved_type(host)
    } else {
        reference.resolved_type(host)
    }
}

/// Declared members named `name` followed by private helpers named `name`
fn candidates(template: &TypeDefRc, name: &Name) -> impl Iterator<Item = TypeMember> {
    template
        .get_members_named(name, false)
        .into_iter()
        .chain(template.get_private_helpers_named(name))
}

fn field_in(
    host: &MetadataHost,
    ty: &ResolvedType,
    template: &TypeDefRc,
    name: &Name,
    wanted: &[InternKey],
    resolve: &dyn Fn(&TypeRefRc) -> Option<ResolvedType>,
) -> Option<ResolvedField> {
    candidates(template, name).find_map(|member| match member {
        TypeMember::Field(field) if field_type_matches(host, ty, &field, wanted, resolve) => {
            Some(specializable_field(ty, &field))
        }
        _ => None,
    })
}

fn field_type_matches(
    host: &MetadataHost,
    ty: &ResolvedType,
    field: &FieldDefRc,
    wanted: &[InternKey],
    resolve: &dyn Fn(&TypeRefRc) -> Option<ResolvedType>,
) -> bool {
    let matches = |declared: &TypeRefRc| {
        resolve(declared).is_some_and(|declared| wanted.contains(&declared.interned_key(host)))
    };

    matches(&field.field_type)
        || (ty.is_instance()
            && matches(&specialize_type_reference(
                &field.field_type,
                &ty.generic_arguments(),
                &[],
            )))
}

fn specializable_field(ty: &ResolvedType, field: &FieldDefRc) -> ResolvedField {
    if ty.is_instance() {
        Specializable::Specialized {
            unspecialized: field.into(),
            containing: ty.clone(),
        }
    } else {
        Specializable::Definition(field.into())
    }
}

fn method_in(
    ty: &ResolvedType,
    template: &TypeDefRc,
    query: &MethodQuery<'_>,
    signature_matches: &dyn Fn(&MethodDefRc, &MethodSignature) -> bool,
) -> Option<ResolvedMethod> {
    candidates(template, query.name).find_map(|member| match member {
        TypeMember::Method(method)
            if method.generic_parameter_count() == query.generic_parameter_count
                && method.parameter_count() == query.signature.parameter_count()
                && signature_matches(&method, query.signature) =>
        {
            Some(method_of(ty, &method))
        }
        _ => None,
    })
}

/// Compares with the resolving comparer, generic by index for generic methods. Members of
/// instances also match on their signature specialized to the instance.
fn declared_signature_matches(
    host: &MetadataHost,
    ty: &ResolvedType,
    declared: &MethodSignature,
    wanted: &MethodSignature,
    query: &MethodQuery<'_>,
) -> bool {
    let compare = |declared: &MethodSignature| {
        if query.generic_parameter_count > 0 {
            generic_method_signatures_are_equal(host, declared, wanted, true)
        } else {
            signatures_are_equal(host, declared, wanted, true)
        }
    };

    compare(declared)
        || (ty.is_instance()
            && compare(&specialize_signature(declared, &ty.generic_arguments(), &[])))
}

fn method_of(ty: &ResolvedType, method: &MethodDefRc) -> ResolvedMethod {
    if ty.is_instance() {
        ResolvedMethod::Specialized {
            unspecialized: method.into(),
            containing: ty.clone(),
        }
    } else {
        ResolvedMethod::Definition(method.into())
    }
}

fn instantiate(
    generic: ResolvedMethod,
    arguments: &[TypeRefRc],
    resolves: impl Fn(&TypeRefRc) -> bool,
) -> Option<ResolvedMethod> {
    let arity = generic.definition()?.generic_parameter_count();
    if usize::from(arity) != arguments.len() || !arguments.iter().all(resolves) {
        debug!(arity, arguments = arguments.len(), "generic method instance rejected");
        return None;
    }

    Some(ResolvedMethod::GenericInstance {
        generic: Box::new(generic),
        arguments: arguments.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::{
            identity::{AssemblyIdentity, UnitIdentity},
            members::{FieldDefinition, MethodDefinition, MethodModifiers},
            signatures::CallingConvention,
            typesystem::TypeReference,
            units::UnitNamespaceReference,
        },
        test::factories::TestModel,
    };

    #[test]
    fn test_field_found_in_base_class() {
        let model = TestModel::new();
        let int32 = model.platform().system_int32.clone();
        let base = model.class("N", "Base");
        let field = base.add_field(FieldDefinition::new(model.name("count"), int32.clone()));
        let derived = model.class("N", "Derived");
        derived.add_base_class(model.type_ref("N", "Base", 0));

        let reference =
            FieldReference::new(model.type_ref("N", "Derived", 0), model.name("count"), int32);
        let resolved = resolve_field(&model.host, &reference).unwrap();
        assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &field));
        assert!(!resolved.is_specialized());
    }

    #[test]
    fn test_field_type_must_match() {
        let model = TestModel::new();
        let holder = model.class("N", "Holder");
        holder.add_field(
            FieldDefinition::new(model.name("count"), model.platform().system_int32.clone()),
        );

        let reference = FieldReference::new(
            model.type_ref("N", "Holder", 0),
            model.name("count"),
            model.platform().system_int64.clone(),
        );
        assert!(resolve_field(&model.host, &reference).is_none());
    }

    #[test]
    fn test_private_helper_field() {
        let model = TestModel::new();
        let holder = model.class("N", "Holder");
        let int32 = model.platform().system_int32.clone();
        let helper = holder.add_private_helper_field(
            FieldDefinition::new(model.name("<>backing"), int32.clone()),
        );

        let reference =
            FieldReference::new(model.type_ref("N", "Holder", 0), model.name("<>backing"), int32);
        let resolved = resolve_field(&model.host, &reference).unwrap();
        assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &helper));
    }

    #[test]
    fn test_specialized_field_of_instance() {
        let model = TestModel::new();
        let boxed = model.class("N", "Box");
        boxed.add_generic_parameter(model.name("T"));
        let generic = model.type_ref("N", "Box", 1);
        let t = TypeReference::generic_type_parameter(generic.clone(), 0, model.name("T"));
        let value = boxed.add_field(FieldDefinition::new(model.name("value"), t.clone()));

        let instance = TypeReference::generic_instance(
            generic.clone(),
            vec![model.platform().system_int32.clone()],
        );
        let plain = FieldReference::new(generic, model.name("value"), t);
        let specialized = FieldReference::specialized(plain, instance);

        let resolved = resolve_field(&model.host, &specialized).unwrap();
        assert!(resolved.is_specialized());
        assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &value));
        assert!(resolved.containing_type().unwrap().is_instance());
    }

    #[test]
    fn test_method_lookup_continues_past_other_overloads() {
        let model = TestModel::new();
        let p = model.platform();
        let base = model.class("N", "Base");
        let target = base.add_method(MethodDefinition::new(
            model.name("Foo"),
            MethodSignature::new(p.system_void.clone()).with_parameter(p.system_int32.clone()),
        ));
        let derived = model.class("N", "Derived");
        derived.add_base_class(model.type_ref("N", "Base", 0));
        derived.add_method(
            MethodDefinition::new(
                model.name("Foo"),
                MethodSignature::new(p.system_void.clone()).with_parameter(p.system_string.clone()),
            )
            .with_flags(MethodModifiers::empty()),
        );

        let reference = MethodReference::new(
            model.type_ref("N", "Derived", 0),
            model.name("Foo"),
            0,
            MethodSignature::new(p.system_void.clone()).with_parameter(p.system_int32.clone()),
        );
        let resolved = resolve_method(&model.host, &reference).unwrap();
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &target));
    }

    #[test]
    fn test_interface_methods_are_searched_for_interfaces_only() {
        let model = TestModel::new();
        let p = model.platform();
        let parent = model.interface("N", "IParent");
        let run = parent.add_method(
            MethodDefinition::new(model.name("Run"), MethodSignature::new(p.system_void.clone())),
        );
        let child = model.interface("N", "IChild");
        child.add_interface(model.type_ref("N", "IParent", 0));
        let class = model.class("N", "Impl");
        class.add_interface(model.type_ref("N", "IParent", 0));

        let through_interface = MethodReference::new(
            model.type_ref("N", "IChild", 0),
            model.name("Run"),
            0,
            MethodSignature::new(p.system_void.clone()),
        );
        let resolved = resolve_method(&model.host, &through_interface).unwrap();
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &run));

        let through_class = MethodReference::new(
            model.type_ref("N", "Impl", 0),
            model.name("Run"),
            0,
            MethodSignature::new(p.system_void.clone()),
        );
        assert!(resolve_method(&model.host, &through_class).is_none());
    }

    #[test]
    fn test_generic_instance_arity_must_match() {
        let model = TestModel::new();
        let p = model.platform();
        let holder = model.class("N", "Holder");
        let map = holder.add_method(MethodDefinition::new(
            model.name("Map"),
            MethodSignature::new(p.system_void.clone())
                .with_calling_convention(CallingConvention::GENERIC),
        ));
        map.add_generic_parameter(model.name("U"));

        let generic = MethodReference::new(
            model.type_ref("N", "Holder", 0),
            model.name("Map"),
            1,
            MethodSignature::new(p.system_void.clone())
                .with_calling_convention(CallingConvention::GENERIC),
        );
        let good = MethodReference::generic_instance(generic.clone(), vec![p.system_int32.clone()]);
        let bad = MethodReference::generic_instance(
            generic.clone(),
            vec![p.system_int32.clone(), p.system_string.clone()],
        );
        let dangling = MethodReference::generic_instance(
            generic,
            vec![model.type_ref("Missing", "Nowhere", 0)],
        );

        let resolved = resolve_method(&model.host, &good).unwrap();
        assert!(resolved.is_generic_instance());
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &map));
        assert!(resolve_method(&model.host, &bad).is_none());
        assert!(resolve_method(&model.host, &dangling).is_none());
    }

    #[test]
    fn test_resolution_is_cached_and_stable() {
        let model = TestModel::new();
        let p = model.platform();
        let holder = model.class("N", "Holder");
        let run = holder.add_method(
            MethodDefinition::new(model.name("Run"), MethodSignature::new(p.system_void.clone())),
        );
        let reference = MethodReference::new(
            model.type_ref("N", "Holder", 0),
            model.name("Run"),
            0,
            MethodSignature::new(p.system_void.clone()),
        );

        let first = reference.resolved_definition(&model.host).unwrap();
        let second = reference.resolved_definition(&model.host).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &run));
    }

    #[test]
    fn test_scoped_resolution_prefers_type_scope() {
        let model = TestModel::new();
        let int32 = model.platform().system_int32.clone();
        let scope = model.class("Scope", "Local");
        let local = scope.add_field(FieldDefinition::new(model.name("value"), int32.clone()));
        let other = model.class("N", "Other");
        other.add_field(FieldDefinition::new(model.name("value"), int32.clone()));

        let reference =
            FieldReference::new(model.type_ref("N", "Other", 0), model.name("value"), int32);
        let resolver = MemberResolver::new(&model.host).with_type(scope);
        let resolved = resolver.resolve_field(&reference).unwrap();
        assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &local));
    }

    #[test]
    fn test_scoped_generic_method_resolution() {
        let model = TestModel::new();
        let p = model.platform();
        let holder = model.class("N", "Holder");
        let holder_ref = model.type_ref("N", "Holder", 0);
        let u = TypeReference::generic_method_parameter(
            holder_ref.clone(),
            model.name("Identity"),
            1,
            0,
            model.name("U"),
        );
        let signature = MethodSignature::new(u.clone())
            .with_calling_convention(CallingConvention::GENERIC)
            .with_parameter(u);
        let method = holder.add_method(
            MethodDefinition::new(model.name("Identity"), signature.clone()),
        );
        method.add_generic_parameter(model.name("U"));

        let generic = MethodReference::new(holder_ref, model.name("Identity"), 1, signature);
        let instance = MethodReference::generic_instance(generic, vec![p.system_int32.clone()]);

        let resolver = MemberResolver::new(&model.host).with_type(holder);
        let resolved = resolver.resolve_method(&instance).unwrap();
        assert!(resolved.is_generic_instance());
        assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &method));
    }

    #[test]
    fn test_unit_scope_replaces_referenced_unit() {
        let model = TestModel::new();
        let node = model.class("N", "Node");
        let next = node.add_field(
            FieldDefinition::new(model.name("next"), model.type_ref("N", "Node", 0)),
        );

        let elsewhere = UnitNamespaceReference::nested(
            UnitNamespaceReference::root(UnitIdentity::Assembly(AssemblyIdentity::simple(
                "Elsewhere",
            ))),
            model.name("N"),
        );
        let node_elsewhere = TypeReference::namespace_type(elsewhere, model.name("Node"), 0);
        let reference =
            FieldReference::new(node_elsewhere.clone(), model.name("next"), node_elsewhere);

        assert!(resolve_field(&model.host, &reference).is_none());
        let resolver = MemberResolver::new(&model.host).with_unit(model.unit.clone());
        let resolved = resolver.resolve_field(&reference).unwrap();
        assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &next));
    }
}
