//! Accessibility from outside the declaring assembly.
//!
//! Friend assemblies are not considered: a member counts as visible when every other assembly
//! can see it.

use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    members::{MemberVisibility, MethodDefRc},
    typesystem::{TypeDefRc, TypeMember},
};

/// Returns `true` if `definition` is visible to every other assembly.
///
/// Namespace types must be public. Nested types must be public, or protected in an unsealed
/// container, and their container must be visible too.
#[must_use]
pub fn is_type_visible_outside_assembly(definition: &TypeDefRc) -> bool {
    match definition.containing_type() {
        None => definition.visibility == MemberVisibility::Public,
        Some(container) => {
            let own = match definition.visibility {
                MemberVisibility::Public => true,
                MemberVisibility::Family | MemberVisibility::FamilyOrAssembly => {
                    !container.is_sealed()
                }
                _ => false,
            };
            own && is_type_visible_outside_assembly(&container)
        }
    }
}

/// Returns `true` if `member` is visible to every other assembly.
///
/// Beyond its declared visibility, a method is visible if it explicitly implements a method
/// that is visible itself; properties and events are visible through such accessors. An
/// implemented method that does not resolve is assumed to be visible, as it most likely
/// lives in another assembly.
pub fn is_visible_outside_assembly(host: &MetadataHost, member: &TypeMember) -> bool {
    let Some(containing) = member.containing_type() else {
        return false;
    };
    if !is_type_visible_outside_assembly(&containing) {
        return false;
    }

    match member.visibility() {
        MemberVisibility::Public => return true,
        MemberVisibility::Family | MemberVisibility::FamilyOrAssembly => {
            return !containing.is_sealed()
        }
        _ => {}
    }

    let _guard = match host.enter_resolution() {
        Ok(guard) => guard,
        Err(error) => {
            debug!("visibility check aborted: {}", error);
            return false;
        }
    };

    match member {
        TypeMember::Method(method) => implements_visible_method(host, Some(method), &containing),
        TypeMember::Property(property) => {
            implements_visible_method(host, property.getter.as_ref(), &containing)
                || implements_visible_method(host, property.setter.as_ref(), &containing)
        }
        TypeMember::Event(event) => {
            implements_visible_method(host, event.adder.as_ref(), &containing)
                || implements_visible_method(host, event.remover.as_ref(), &containing)
        }
        TypeMember::Field(_) | TypeMember::NestedType(_) => false,
    }
}

fn implements_visible_method(
    host: &MetadataHost,
    method: Option<&MethodDefRc>,
    containing: &TypeDefRc,
) -> bool {
    let Some(method) = method else {
        return false;
    };

    let key = method.interned_key(host);
    containing
        .explicit_overrides
        .iter()
        .filter(|(_, implementation)| implementation.implementing.interned_key(host) == key)
        .any(|(_, implementation)| {
            match implementation.implemented.resolved_definition(host) {
                Some(implemented) => {
                    is_visible_outside_assembly(host, &TypeMember::Method(implemented))
                }
                None => true,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            members::{FieldDefinition, MethodDefinition, MethodModifiers, MethodReference},
            signatures::MethodSignature,
            typesystem::{TypeAttributes, TypeDefinition},
        },
        test::factories::TestModel,
    };

    #[test]
    fn test_nested_type_visibility() {
        let model = TestModel::new();
        let outer = model.class("N", "Outer");
        let public = outer.add_nested_type(
            TypeDefinition::new(model.name("Public"), TypeAttributes::PUBLIC),
        );
        let protected = outer.add_nested_type(
            TypeDefinition::new(model.name("Protected"), TypeAttributes::empty())
                .with_visibility(MemberVisibility::Family),
        );
        let private = outer.add_nested_type(
            TypeDefinition::new(model.name("Private"), TypeAttributes::empty())
                .with_visibility(MemberVisibility::Private),
        );

        assert!(is_type_visible_outside_assembly(&outer));
        assert!(is_type_visible_outside_assembly(&public));
        assert!(is_type_visible_outside_assembly(&protected));
        assert!(!is_type_visible_outside_assembly(&private));
    }

    #[test]
    fn test_protected_members_of_sealed_types_are_hidden() {
        let model = TestModel::new();
        let sealed = model.namespace("N").add_type(TypeDefinition::new(
            model.name("Sealed"),
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
        ));
        let field = sealed.add_field(
            FieldDefinition::new(model.name("f"), model.platform().system_int32.clone())
                .with_visibility(MemberVisibility::Family),
        );
        assert!(!is_visible_outside_assembly(&model.host, &TypeMember::Field(field)));
    }

    #[test]
    fn test_explicit_implementation_of_public_interface_is_visible() {
        let model = TestModel::new();
        let void = model.platform().system_void.clone();
        let interface = model.interface("N", "IRun");
        let run = interface.add_method(
            MethodDefinition::new(model.name("Run"), MethodSignature::new(void.clone()))
                .with_flags(MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT),
        );

        let class = model.class("N", "Runner");
        class.add_interface(model.type_ref("N", "IRun", 0));
        let explicit = class.add_method(
            MethodDefinition::new(model.name("N.IRun.Run"), MethodSignature::new(void.clone()))
                .with_flags(MethodModifiers::VIRTUAL | MethodModifiers::FINAL)
                .with_visibility(MemberVisibility::Private),
        );
        let hidden = class.add_method(
            MethodDefinition::new(model.name("Helper"), MethodSignature::new(void))
                .with_visibility(MemberVisibility::Private),
        );
        class.add_explicit_override(
            MethodReference::definition(&explicit),
            MethodReference::definition(&run),
        );

        assert!(is_visible_outside_assembly(&model.host, &TypeMember::Method(explicit)));
        assert!(!is_visible_outside_assembly(&model.host, &TypeMember::Method(hidden)));
    }

    #[test]
    fn test_unresolved_implemented_method_counts_as_visible() {
        let model = TestModel::new();
        let void = model.platform().system_void.clone();
        let class = model.class("N", "Runner");
        let explicit = class.add_method(
            MethodDefinition::new(model.name("Ext.IRun.Run"), MethodSignature::new(void.clone()))
                .with_visibility(MemberVisibility::Private),
        );
        let missing = MethodReference::new(
            model.type_ref("Ext", "IRun", 0),
            model.name("Run"),
            0,
            MethodSignature::new(void),
        );
        class.add_explicit_override(MethodReference::definition(&explicit), missing);

        assert!(is_visible_outside_assembly(&model.host, &TypeMember::Method(explicit)));
    }
}
