//! Naming and modifier predicates for accessors and fields.

use crate::metadata::{
    host::MetadataHost,
    members::{FieldDefinition, MemberVisibility, MethodDefinition},
};

/// Returns `true` if the unqualified part of `name` starts with `prefix`.
///
/// Explicit interface implementations carry the interface name in front of the method name,
/// as in `System.Collections.IEnumerator.get_Current`; only the text after the last `.` is
/// checked.
///
/// # Examples
///
/// ```rust
/// use dotmodel::metadata::resolution::qualified_method_name_begins_with;
///
/// assert!(qualified_method_name_begins_with("get_Count", "get_"));
/// assert!(qualified_method_name_begins_with(
///     "System.Collections.IEnumerator.get_Current",
///     "get_"
/// ));
/// assert!(!qualified_method_name_begins_with("Reset", "get_"));
/// ```
#[must_use]
pub fn qualified_method_name_begins_with(name: &str, prefix: &str) -> bool {
    let unqualified = match name.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => name,
    };
    unqualified.starts_with(prefix)
}

fn is_accessor(method: &MethodDefinition, prefix: &str, ignore_visibility: bool) -> bool {
    (ignore_visibility || method.visibility == MemberVisibility::Public)
        && method.is_special_name()
        && qualified_method_name_begins_with(method.name.value(), prefix)
}

/// Returns `true` for property getters
#[must_use]
pub fn is_getter(method: &MethodDefinition, ignore_visibility: bool) -> bool {
    is_accessor(method, "get_", ignore_visibility)
}

/// Returns `true` for property setters
#[must_use]
pub fn is_setter(method: &MethodDefinition, ignore_visibility: bool) -> bool {
    is_accessor(method, "set_", ignore_visibility)
}

/// Returns `true` for event adders
#[must_use]
pub fn is_adder(method: &MethodDefinition, ignore_visibility: bool) -> bool {
    is_accessor(method, "add_", ignore_visibility)
}

/// Returns `true` for event removers
#[must_use]
pub fn is_remover(method: &MethodDefinition, ignore_visibility: bool) -> bool {
    is_accessor(method, "remove_", ignore_visibility)
}

/// Returns `true` for event raise methods, whatever their visibility
#[must_use]
pub fn is_caller(method: &MethodDefinition) -> bool {
    is_accessor(method, "raise_", true)
}

/// Returns `true` if `field` carries the `System.Runtime.CompilerServices.IsVolatile` modifier
pub fn is_volatile(host: &MetadataHost, field: &FieldDefinition) -> bool {
    if field.custom_modifiers.is_empty() {
        return false;
    }

    let volatile = host
        .platform_types()
        .system_runtime_compiler_services_is_volatile
        .interned_key(host);
    field
        .custom_modifiers
        .iter()
        .any(|modifier| modifier.modifier.interned_key(host) == volatile)
}
