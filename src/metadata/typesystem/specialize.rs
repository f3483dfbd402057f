//! Substitution of generic arguments into type references and signatures.
//!
//! Specializing replaces every generic type parameter with the type argument at its index and
//! every generic method parameter with the method argument at its index. Parameters without a
//! corresponding argument are left in place. Subtrees that contain no substitutable parameter
//! are shared with the input rather than rebuilt, so specializing a closed type returns the
//! very same reference.

use std::sync::Arc;

use crate::metadata::{
    signatures::{MethodSignature, ParameterTypeInfo},
    typesystem::{CustomModifier, TypeRefRc, TypeReference, TypeReferenceKind},
};

/// Substitutes `type_arguments` and `method_arguments` into `reference`
#[must_use]
pub fn specialize_type_reference(
    reference: &TypeRefRc,
    type_arguments: &[TypeRefRc],
    method_arguments: &[TypeRefRc],
) -> TypeRefRc {
    Specializer {
        type_arguments,
        method_arguments,
    }
    .type_reference(reference)
}

/// Substitutes `type_arguments` and `method_arguments` into every type of `signature`
#[must_use]
pub fn specialize_signature(
    signature: &MethodSignature,
    type_arguments: &[TypeRefRc],
    method_arguments: &[TypeRefRc],
) -> MethodSignature {
    Specializer {
        type_arguments,
        method_arguments,
    }
    .signature(signature)
}

struct Specializer<'a> {
    type_arguments: &'a [TypeRefRc],
    method_arguments: &'a [TypeRefRc],
}

impl Specializer<'_> {
    fn type_reference(&self, reference: &TypeRefRc) -> TypeRefRc {
        match &reference.kind {
            TypeReferenceKind::GenericTypeParameter { index, .. } => self
                .type_arguments
                .get(usize::from(*index))
                .cloned()
                .unwrap_or_else(|| reference.clone()),
            TypeReferenceKind::GenericMethodParameter { index, .. } => self
                .method_arguments
                .get(usize::from(*index))
                .cloned()
                .unwrap_or_else(|| reference.clone()),
            TypeReferenceKind::GenericInstance { generic, arguments } => {
                let specialized = self.list(arguments);
                match specialized {
                    Some(arguments) => TypeReference::generic_instance(generic.clone(), arguments),
                    None => reference.clone(),
                }
            }
            TypeReferenceKind::SpecializedNested {
                unspecialized,
                containing,
            } => {
                let new_containing = self.type_reference(containing);
                if Arc::ptr_eq(&new_containing, containing) {
                    reference.clone()
                } else {
                    TypeReference::specialized_nested(unspecialized.clone(), new_containing)
                }
            }
            TypeReferenceKind::Nested {
                containing,
                name,
                generic_parameter_count,
            } => {
                let new_containing = self.type_reference(containing);
                if Arc::ptr_eq(&new_containing, containing) {
                    reference.clone()
                } else {
                    TypeReference::nested_type(
                        new_containing,
                        name.clone(),
                        *generic_parameter_count,
                    )
                }
            }
            TypeReferenceKind::Pointer(target) => {
                let target_new = self.type_reference(target);
                if Arc::ptr_eq(&target_new, target) {
                    reference.clone()
                } else {
                    TypeReference::pointer(target_new)
                }
            }
            TypeReferenceKind::ManagedPointer(target) => {
                let target_new = self.type_reference(target);
                if Arc::ptr_eq(&target_new, target) {
                    reference.clone()
                } else {
                    TypeReference::managed_pointer(target_new)
                }
            }
            TypeReferenceKind::Array {
                element,
                rank,
                sizes,
                lower_bounds,
                is_vector,
            } => {
                let element_new = self.type_reference(element);
                if Arc::ptr_eq(&element_new, element) {
                    reference.clone()
                } else if *is_vector {
                    TypeReference::vector(element_new)
                } else {
                    TypeReference::matrix(element_new, *rank, sizes.clone(), lower_bounds.clone())
                }
            }
            TypeReferenceKind::Modified {
                unmodified,
                modifiers,
            } => {
                let unmodified_new = self.type_reference(unmodified);
                let modifiers_new = self.modifiers(modifiers);
                if Arc::ptr_eq(&unmodified_new, unmodified) && modifiers_new.is_none() {
                    reference.clone()
                } else {
                    TypeReference::modified(
                        unmodified_new,
                        modifiers_new.unwrap_or_else(|| modifiers.clone()),
                    )
                }
            }
            TypeReferenceKind::FunctionPointer(signature) => {
                let specialized = self.signature(signature);
                TypeReference::function_pointer(specialized)
            }
            TypeReferenceKind::Namespace { .. } | TypeReferenceKind::Definition(_) => {
                reference.clone()
            }
        }
    }

    /// The specialized list, or `None` if no element changed
    fn list(&self, references: &[TypeRefRc]) -> Option<Vec<TypeRefRc>> {
        let specialized: Vec<TypeRefRc> =
            references.iter().map(|r| self.type_reference(r)).collect();
        let changed = specialized
            .iter()
            .zip(references)
            .any(|(new, old)| !Arc::ptr_eq(new, old));
        changed.then_some(specialized)
    }

    fn modifiers(&self, modifiers: &[CustomModifier]) -> Option<Vec<CustomModifier>> {
        let types: Vec<TypeRefRc> = modifiers.iter().map(|m| m.modifier.clone()).collect();
        let specialized = self.list(&types)?;
        Some(
            modifiers
                .iter()
                .zip(specialized)
                .map(|(m, modifier)| CustomModifier {
                    is_optional: m.is_optional,
                    modifier,
                })
                .collect(),
        )
    }

    fn parameter(&self, parameter: &ParameterTypeInfo) -> ParameterTypeInfo {
        ParameterTypeInfo {
            param_type: self.type_reference(&parameter.param_type),
            custom_modifiers: self
                .modifiers(&parameter.custom_modifiers)
                .unwrap_or_else(|| parameter.custom_modifiers.clone()),
            ..parameter.clone()
        }
    }

    fn signature(&self, signature: &MethodSignature) -> MethodSignature {
        MethodSignature {
            calling_convention: signature.calling_convention,
            return_by_ref: signature.return_by_ref,
            return_custom_modifiers: self
                .modifiers(&signature.return_custom_modifiers)
                .unwrap_or_else(|| signature.return_custom_modifiers.clone()),
            return_type: self.type_reference(&signature.return_type),
            parameters: signature.parameters.iter().map(|p| self.parameter(p)).collect(),
            extra_parameters: signature
                .extra_parameters
                .iter()
                .map(|p| self.parameter(p))
                .collect(),
        }
    }
}
