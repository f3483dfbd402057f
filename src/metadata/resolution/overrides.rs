//! Virtual dispatch helpers: explicit and implicit overrides, and implicit interface
//! implementation.

use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    members::{MemberVisibility, MethodDefRc, MethodRefRc, ResolvedMember, ResolvedMethod},
    signatures::{generic_method_signatures_are_equal, signatures_are_equal, MethodSignature},
    typesystem::{ResolvedType, TypeDefRc, TypeDefRef, TypeMember},
};

use super::members::supertype;

/// The base class and interface methods `method` explicitly implements, as listed in the
/// explicit override table of its containing type
pub fn explicitly_overridden_methods(
    host: &MetadataHost,
    method: &MethodDefRc,
) -> Vec<MethodRefRc> {
    let Some(containing) = method.containing_type() else {
        return Vec::new();
    };

    let key = method.interned_key(host);
    containing
        .explicit_overrides
        .iter()
        .filter(|(_, implementation)| implementation.implementing.interned_key(host) == key)
        .map(|(_, implementation)| implementation.implemented.clone())
        .collect()
}

/// Returns `true` if both methods have the same signature.
///
/// Generic methods must have the same arity and are compared with method type parameters
/// matched by position.
#[must_use]
pub fn methods_are_equivalent(host: &MetadataHost, m1: &MethodDefRc, m2: &MethodDefRc) -> bool {
    signatures_are_equivalent(
        host,
        m1.generic_parameter_count(),
        &m1.signature,
        m2.generic_parameter_count(),
        &m2.signature,
    )
}

fn signatures_are_equivalent(
    host: &MetadataHost,
    arity1: u16,
    signature1: &MethodSignature,
    arity2: u16,
    signature2: &MethodSignature,
) -> bool {
    if arity1 > 0 {
        arity1 == arity2 && generic_method_signatures_are_equal(host, signature1, signature2, false)
    } else {
        signatures_are_equal(host, signature1, signature2, false)
    }
}

/// Interface methods `method` implicitly implements.
///
/// Only public virtual methods of classes qualify, and only interfaces listed directly on the
/// containing type are searched; interfaces of base classes are implemented there. Methods
/// named in the containing type's explicit override table are excluded. Members of generic
/// interface instances come back specialized.
pub fn implicitly_implemented_interface_methods(
    host: &MetadataHost,
    method: &MethodDefRc,
) -> Vec<ResolvedMethod> {
    let Some(containing) = method.containing_type() else {
        return Vec::new();
    };
    if !method.is_virtual()
        || method.visibility != MemberVisibility::Public
        || containing.is_interface()
    {
        return Vec::new();
    }

    let mut explicit: Vec<_> = containing
        .explicit_overrides
        .iter()
        .map(|(_, implementation)| implementation.implemented.interned_key(host))
        .collect();
    explicit.sort_unstable();

    let mut implemented = Vec::new();
    for (_, interface) in containing.interfaces.iter() {
        let Some(interface) = interface.resolved_type(host) else {
            debug!(method = %method.name, "interface did not resolve");
            continue;
        };

        for member in interface.get_members_named(&method.name, false) {
            let ResolvedMember::Method(candidate) = member else {
                continue;
            };
            let (Some(definition), Some(signature)) =
                (candidate.definition(), candidate.signature())
            else {
                continue;
            };

            if signatures_are_equivalent(
                host,
                method.generic_parameter_count(),
                &method.signature,
                definition.generic_parameter_count(),
                &signature,
            ) && explicit.binary_search(&candidate.interned_key(host)).is_err()
            {
                implemented.push(candidate);
            }
        }
    }
    implemented
}

/// The method of the closest base class that `method` implicitly overrides.
///
/// Only virtual methods that do not take a new slot override anything. Each base class is
/// searched for members with the same name:
///
/// - a signature match that is virtual and not sealed is the result
/// - a signature match that is not virtual, or is sealed, ends the search with `None`
/// - any other method of that name ends the search unless `method` hides by signature
///
/// Otherwise the search continues with the base classes of the base class.
pub fn implicitly_overridden_base_class_method(
    host: &MetadataHost,
    method: &MethodDefRc,
) -> Option<ResolvedMethod> {
    if !method.is_virtual() || method.is_new_slot() {
        return None;
    }

    let containing = method.containing_type()?;
    let derived = ResolvedType::Named(TypeDefRef::new(&containing));
    containing.base_classes.iter().find_map(|(_, base)| {
        let base = supertype(host, &derived, base)?;
        overridden_in(host, method, &base)
    })
}

fn overridden_in(
    host: &MetadataHost,
    method: &MethodDefRc,
    base: &ResolvedType,
) -> Option<ResolvedMethod> {
    let _guard = match host.enter_resolution() {
        Ok(guard) => guard,
        Err(error) => {
            debug!("override search aborted: {}", error);
            return None;
        }
    };

    for member in base.get_members_named(&method.name, false) {
        let ResolvedMember::Method(candidate) = member else {
            continue;
        };
        let (Some(definition), Some(signature)) = (candidate.definition(), candidate.signature())
        else {
            continue;
        };

        let matches = signatures_are_equal(host, &method.signature, &signature, false)
            || (method.is_generic()
                && method.generic_parameter_count() == definition.generic_parameter_count()
                && generic_method_signatures_are_equal(host, &method.signature, &signature, false));
        if matches {
            if !definition.is_virtual() || definition.is_sealed() {
                return None;
            }
            return Some(candidate);
        }
        if !method.hides_by_signature() {
            return None;
        }
    }

    let template = base.definition()?;
    template.base_classes.iter().find_map(|(_, next)| {
        let next = supertype(host, base, next)?;
        overridden_in(host, method, &next)
    })
}

/// The method of `derived` that implicitly overrides `base_method`.
///
/// Sealed methods have no overrides. Otherwise the first virtual method of `derived` with the
/// same name and an equivalent signature is the result, unless it takes a new slot.
pub fn implicitly_overriding_derived_class_method(
    host: &MetadataHost,
    base_method: &MethodDefRc,
    derived: &TypeDefRc,
) -> Option<MethodDefRc> {
    if base_method.is_sealed() {
        return None;
    }

    let candidate = derived
        .get_members_named(&base_method.name, false)
        .into_iter()
        .filter_map(|member| match member {
            TypeMember::Method(method) if method.is_virtual() => Some(method),
            _ => None,
        })
        .find(|method| methods_are_equivalent(host, base_method, method))?;

    (!candidate.is_new_slot()).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::{
            members::{MethodDefinition, MethodModifiers, MethodReference},
            signatures::{CallingConvention, MethodSignature},
            typesystem::TypeReference,
        },
        test::factories::TestModel,
    };

    fn void_method(model: &TestModel, name: &str, flags: MethodModifiers) -> MethodDefinition {
        MethodDefinition::new(
            model.name(name),
            MethodSignature::new(model.platform().system_void.clone()),
        )
        .with_flags(flags)
    }

    fn int_method(model: &TestModel, name: &str, flags: MethodModifiers) -> MethodDefinition {
        let p = model.platform();
        MethodDefinition::new(
            model.name(name),
            MethodSignature::new(p.system_void.clone()).with_parameter(p.system_int32.clone()),
        )
        .with_flags(flags)
    }

    const VIRTUAL: MethodModifiers = MethodModifiers::VIRTUAL.union(MethodModifiers::HIDE_BY_SIG);

    #[test]
    fn test_override_found_in_base() {
        let model = TestModel::new();
        let base = model.class("N", "Base");
        let run = base.add_method(void_method(&model, "Run", VIRTUAL));
        let derived = model.class("N", "Derived");
        derived.add_base_class(model.type_ref("N", "Base", 0));
        let over = derived.add_method(void_method(&model, "Run", VIRTUAL));

        let found = implicitly_overridden_base_class_method(&model.host, &over).unwrap();
        assert!(Arc::ptr_eq(&found.definition().unwrap(), &run));

        let back = implicitly_overriding_derived_class_method(&model.host, &run, &derived).unwrap();
        assert!(Arc::ptr_eq(&back, &over));
    }

    #[test]
    fn test_new_slot_and_sealed_block_overrides() {
        let model = TestModel::new();
        let base = model.class("N", "Base");
        let sealed = base.add_method(void_method(&model, "Run", VIRTUAL | MethodModifiers::FINAL));
        let derived = model.class("N", "Derived");
        derived.add_base_class(model.type_ref("N", "Base", 0));
        let over = derived.add_method(void_method(&model, "Run", VIRTUAL));
        let fresh = derived.add_method(
            void_method(&model, "Fresh", VIRTUAL | MethodModifiers::NEW_SLOT),
        );

        assert!(implicitly_overridden_base_class_method(&model.host, &over).is_none());
        assert!(implicitly_overridden_base_class_method(&model.host, &fresh).is_none());
        assert!(
            implicitly_overriding_derived_class_method(&model.host, &sealed, &derived).is_none()
        );
    }

    #[test]
    fn test_hide_by_name_stops_search() {
        let model = TestModel::new();
        let root = model.class("N", "Root");
        root.add_method(void_method(&model, "Run", VIRTUAL));
        let middle = model.class("N", "Middle");
        middle.add_base_class(model.type_ref("N", "Root", 0));
        middle.add_method(int_method(&model, "Run", VIRTUAL));
        let leaf = model.class("N", "Leaf");
        leaf.add_base_class(model.type_ref("N", "Middle", 0));

        let by_name = leaf.add_method(void_method(&model, "Run", MethodModifiers::VIRTUAL));
        assert!(implicitly_overridden_base_class_method(&model.host, &by_name).is_none());

        let other = model.class("N", "Other");
        other.add_base_class(model.type_ref("N", "Middle", 0));
        let by_signature = other.add_method(void_method(&model, "Run", VIRTUAL));
        assert!(implicitly_overridden_base_class_method(&model.host, &by_signature).is_some());
    }

    #[test]
    fn test_implicit_interface_implementation_skips_explicit() {
        let model = TestModel::new();
        let runnable = model.interface("N", "IRunnable");
        let run = runnable.add_method(
            void_method(&model, "Run", VIRTUAL | MethodModifiers::ABSTRACT),
        );
        let stoppable = model.interface("N", "IStoppable");
        let stop = stoppable.add_method(
            void_method(&model, "Stop", VIRTUAL | MethodModifiers::ABSTRACT),
        );

        let class = model.class("N", "Worker");
        class.add_interface(model.type_ref("N", "IRunnable", 0));
        class.add_interface(model.type_ref("N", "IStoppable", 0));
        let class_run = class.add_method(void_method(&model, "Run", VIRTUAL));
        let class_stop = class.add_method(void_method(&model, "Stop", VIRTUAL));
        class.add_explicit_override(
            MethodReference::definition(&class_stop), MethodReference::definition(&stop),
        );

        let implemented = implicitly_implemented_interface_methods(&model.host, &class_run);
        assert_eq!(implemented.len(), 1);
        assert!(Arc::ptr_eq(&implemented[0].definition().unwrap(), &run));
        assert!(implicitly_implemented_interface_methods(&model.host, &class_stop).is_empty());

        let explicit = explicitly_overridden_methods(&model.host, &class_stop);
        assert_eq!(explicit.len(), 1);
        assert!(Arc::ptr_eq(&explicit[0].resolved_definition(&model.host).unwrap(), &stop));
    }

    #[test]
    fn test_generic_methods_compare_by_position() {
        let model = TestModel::new();
        let first = model.class("N", "First");
        let second = model.class("N", "Second");
        let p = model.platform();

        let build = |owner: &str, method_name: &str, parameter_name: &str| {
            let u = TypeReference::generic_method_parameter(
                model.type_ref("N", owner, 0),
                model.name(method_name),
                1,
                0,
                model.name(parameter_name),
            );
            MethodDefinition::new(
                model.name(method_name),
                MethodSignature::new(p.system_void.clone())
                    .with_calling_convention(CallingConvention::GENERIC)
                    .with_parameter(u),
            )
        };

        let a = first.add_method(build("First", "M", "T"));
        a.add_generic_parameter(model.name("T"));
        let b = second.add_method(build("Second", "M", "U"));
        b.add_generic_parameter(model.name("U"));

        assert!(methods_are_equivalent(&model.host, &a, &b));
    }
}
