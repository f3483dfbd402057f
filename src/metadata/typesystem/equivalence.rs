//! Type equivalence.
//!
//! [`types_are_equivalent`] is identity: two references are equivalent if they share an
//! interned key, or in resolving mode if what they resolve to shares one.
//! [`types_are_equivalent_relaxed`] is used for generic method signature matching and
//! additionally considers two generic method parameters equal when their positions match,
//! recursing through the structural types that may contain them.

use std::sync::Arc;

use crate::metadata::{
    host::MetadataHost,
    intern::InternKey,
    signatures::{MethodSignature, SignatureComparer},
    typesystem::{ResolvedType, TypeRefRc, TypeReferenceKind},
};

/// Returns `true` if `a` and `b` denote the same type.
///
/// Without `resolve_types` only the structural identity of the references is compared, so a
/// reference through a forwarding alias differs from a direct one. With it, references that
/// both resolve to the same type are equivalent. An unresolved side is never equivalent to
/// anything but itself.
pub fn types_are_equivalent(
    host: &MetadataHost,
    a: &TypeRefRc,
    b: &TypeRefRc,
    resolve_types: bool,
) -> bool {
    if Arc::ptr_eq(a, b) || a.interned_key(host) == b.interned_key(host) {
        return true;
    }
    if !resolve_types {
        return false;
    }

    match (a.resolved_type(host), b.resolved_type(host)) {
        (Some(ra), Some(rb)) => ra.interned_key(host) == rb.interned_key(host),
        _ => false,
    }
}

/// Returns `true` if `a` and `b` are equivalent for generic method signature matching.
///
/// Differs from [`types_are_equivalent`] in that two generic method parameters are
/// equivalent if their indices in the parameter list match, wherever they occur inside
/// generic instances, arrays, pointers, managed pointers and function pointers.
pub fn types_are_equivalent_relaxed(
    host: &MetadataHost,
    a: &TypeRefRc,
    b: &TypeRefRc,
    resolve_types: bool,
) -> bool {
    if Arc::ptr_eq(a, b) || a.interned_key(host) == b.interned_key(host) {
        return true;
    }

    let (shape_a, shape_b) = if resolve_types {
        let ra = a.resolved_type(host);
        let rb = b.resolved_type(host);
        if let (Some(ra), Some(rb)) = (&ra, &rb) {
            if ra.interned_key(host) == rb.interned_key(host) {
                return true;
            }
        }
        (
            ra.map_or_else(|| Shape::of_reference(a), |r| Shape::of_resolved(host, &r)),
            rb.map_or_else(|| Shape::of_reference(b), |r| Shape::of_resolved(host, &r)),
        )
    } else {
        (Shape::of_reference(a), Shape::of_reference(b))
    };

    shape_a.matches(host, &shape_b, resolve_types)
}

/// The head of a generic instance: still a reference, or already resolved to a key
enum Head {
    Reference(TypeRefRc),
    Resolved(InternKey),
}

impl Head {
    fn matches(&self, host: &MetadataHost, other: &Head, resolve_types: bool) -> bool {
        match (self, other) {
            (Head::Reference(a), Head::Reference(b)) => {
                types_are_equivalent_relaxed(host, a, b, resolve_types)
            }
            (Head::Resolved(a), Head::Resolved(b)) => a == b,
            (Head::Reference(r), Head::Resolved(k)) | (Head::Resolved(k), Head::Reference(r)) => {
                r.interned_key(host) == *k
            }
        }
    }
}

/// The structural view of a type that relaxed equivalence recurses through
enum Shape {
    MethodParameter(u16),
    Instance {
        head: Head,
        arguments: Vec<TypeRefRc>,
    },
    Array(TypeRefRc),
    Pointer(TypeRefRc),
    ManagedPointer(TypeRefRc),
    FunctionPointer(Arc<MethodSignature>),
    Opaque,
}

impl Shape {
    fn of_reference(reference: &TypeRefRc) -> Shape {
        match &reference.kind {
            TypeReferenceKind::GenericMethodParameter { index, .. } => {
                Shape::MethodParameter(*index)
            }
            TypeReferenceKind::GenericInstance { generic, arguments } => Shape::Instance {
                head: Head::Reference(generic.clone()),
                arguments: arguments.clone(),
            },
            TypeReferenceKind::Array { element, .. } => Shape::Array(element.clone()),
            TypeReferenceKind::Pointer(target) => Shape::Pointer(target.clone()),
            TypeReferenceKind::ManagedPointer(target) => Shape::ManagedPointer(target.clone()),
            TypeReferenceKind::FunctionPointer(signature) => {
                Shape::FunctionPointer(signature.clone())
            }
            _ => Shape::Opaque,
        }
    }

    fn of_resolved(host: &MetadataHost, resolved: &ResolvedType) -> Shape {
        match resolved {
            ResolvedType::GenericParameter(parameter) => match parameter.upgrade() {
                Some(parameter) if parameter.is_method_parameter() => {
                    Shape::MethodParameter(parameter.index)
                }
                _ => Shape::Opaque,
            },
            ResolvedType::GenericInstance { generic, arguments } => Shape::Instance {
                head: Head::Resolved(generic.interned_key(host)),
                arguments: arguments.clone(),
            },
            ResolvedType::Array { element, .. } => Shape::Array(element.clone()),
            ResolvedType::Pointer(target) => Shape::Pointer(target.clone()),
            ResolvedType::ManagedPointer(target) => Shape::ManagedPointer(target.clone()),
            ResolvedType::FunctionPointer(signature) => Shape::FunctionPointer(signature.clone()),
            ResolvedType::Named(_) | ResolvedType::SpecializedNested { .. } => Shape::Opaque,
        }
    }

    fn matches(&self, host: &MetadataHost, other: &Shape, resolve_types: bool) -> bool {
        let relaxed =
            |a: &TypeRefRc, b: &TypeRefRc| types_are_equivalent_relaxed(host, a, b, resolve_types);

        match (self, other) {
            (Shape::MethodParameter(a), Shape::MethodParameter(b)) => a == b,
            (
                Shape::Instance {
                    head: head_a,
                    arguments: args_a,
                },
                Shape::Instance {
                    head: head_b,
                    arguments: args_b,
                },
            ) => {
                head_a.matches(host, head_b, resolve_types)
                    && args_a.len() == args_b.len()
                    && args_a.iter().zip(args_b).all(|(a, b)| relaxed(a, b))
            }
            (Shape::Array(a), Shape::Array(b))
            | (Shape::Pointer(a), Shape::Pointer(b))
            | (Shape::ManagedPointer(a), Shape::ManagedPointer(b)) => relaxed(a, b),
            (Shape::FunctionPointer(a), Shape::FunctionPointer(b)) => {
                let comparer = SignatureComparer::generic(host, resolve_types);
                Arc::ptr_eq(a, b)
                    || (comparer.signatures_are_equal(a, b)
                        && comparer
                            .parameter_lists_are_equal(&a.extra_parameters, &b.extra_parameters))
            }
            _ => false,
        }
    }
}
