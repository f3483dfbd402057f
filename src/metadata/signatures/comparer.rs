//! Signature equality by the rules of the CLR loader.
//!
//! Two signatures are equal when calling convention, return by-ref flag and return modifier
//! flag agree, the return types are equivalent, and the parameter lists are pairwise equal by
//! position. The generic variant additionally treats generic method parameters as equal when
//! their indices match, so `M<T>(T)` and `M<U>(U)` compare equal.
//!
//! Results are not memoized. Member resolution compares one reference against every
//! same-named candidate, so callers that repeat comparisons over large graphs should cache
//! on their side.

use crate::metadata::{
    host::MetadataHost,
    signatures::{MethodSignature, ParameterTypeInfo},
    typesystem::{types_are_equivalent, types_are_equivalent_relaxed, TypeRefRc},
};

/// Compares signatures and parameters, optionally resolving types along the way
#[derive(Clone, Copy)]
pub struct SignatureComparer<'h> {
    host: &'h MetadataHost,
    resolve_types: bool,
    generic_by_index: bool,
}

impl<'h> SignatureComparer<'h> {
    /// A comparer using plain type equivalence
    #[must_use]
    pub fn new(host: &'h MetadataHost, resolve_types: bool) -> Self {
        Self {
            host,
            resolve_types,
            generic_by_index: false,
        }
    }

    /// A comparer that treats generic method parameters as equal when their indices match
    #[must_use]
    pub fn generic(host: &'h MetadataHost, resolve_types: bool) -> Self {
        Self {
            host,
            resolve_types,
            generic_by_index: true,
        }
    }

    /// Returns `true` if this comparer resolves references before comparing
    #[must_use]
    pub fn resolves_types(&self) -> bool {
        self.resolve_types
    }

    /// Compares two types under this comparer's rules
    #[must_use]
    pub fn types_are_equal(&self, a: &TypeRefRc, b: &TypeRefRc) -> bool {
        if self.generic_by_index {
            types_are_equivalent_relaxed(self.host, a, b, self.resolve_types)
        } else {
            types_are_equivalent(self.host, a, b, self.resolve_types)
        }
    }

    /// Compares two parameters: index, then by-ref and modifier flags, then type
    #[must_use]
    pub fn parameters_are_equal(&self, a: &ParameterTypeInfo, b: &ParameterTypeInfo) -> bool {
        a.index == b.index
            && a.by_ref == b.by_ref
            && a.is_modified() == b.is_modified()
            && self.types_are_equal(&a.param_type, &b.param_type)
    }

    /// Positional comparison of two parameter lists, stopping at the first difference
    #[must_use]
    pub fn parameter_lists_are_equal(
        &self,
        a: &[ParameterTypeInfo],
        b: &[ParameterTypeInfo],
    ) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b.iter())
                .all(|(x, y)| self.parameters_are_equal(x, y))
    }

    /// Compares two signatures
    #[must_use]
    pub fn signatures_are_equal(&self, a: &MethodSignature, b: &MethodSignature) -> bool {
        a.calling_convention == b.calling_convention
            && a.return_by_ref == b.return_by_ref
            && a.return_is_modified() == b.return_is_modified()
            && self.types_are_equal(&a.return_type, &b.return_type)
            && self.parameter_lists_are_equal(&a.parameters, &b.parameters)
    }
}

/// Returns `true` if the two signatures match by the rules of the CLR loader
#[must_use]
pub fn signatures_are_equal(
    host: &MetadataHost,
    a: &MethodSignature,
    b: &MethodSignature,
    resolve_types: bool,
) -> bool {
    SignatureComparer::new(host, resolve_types).signatures_are_equal(a, b)
}

/// Returns `true` if the two generic method signatures match, treating generic method
/// parameters as equal by index
#[must_use]
pub fn generic_method_signatures_are_equal(
    host: &MetadataHost,
    a: &MethodSignature,
    b: &MethodSignature,
    resolve_types: bool,
) -> bool {
    SignatureComparer::generic(host, resolve_types).signatures_are_equal(a, b)
}
