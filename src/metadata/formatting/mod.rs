//! C#-like rendering of type names and member signatures.
//!
//! [`TypeNameFormatter`] renders type references and [`SignatureFormatter`] renders fields,
//! methods, properties and events on top of it. What ends up in the string is controlled by
//! [`NameFormattingOptions`]; [`NameFormattingOptions::DOCUMENTATION_ID`] produces the member
//! IDs used by XML documentation files.
//!
//! Formatting only reads the graph. References that do not resolve fall back to their raw
//! names.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//! use dotmodel::metadata::formatting::{type_name, NameFormattingOptions};
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let platform = host.platform_types();
//! let array = TypeReference::vector(platform.system_int32.clone());
//!
//! assert_eq!(type_name(&host, &array, NameFormattingOptions::USE_TYPE_KEYWORDS), "int[]");
//! assert_eq!(type_name(&host, &array, NameFormattingOptions::empty()), "System.Int32[]");
//! # Ok::<(), dotmodel::Error>(())
//! ```

mod signatures;
mod types;

use bitflags::bitflags;

pub use signatures::{FormattedMember, SignatureFormatter};
pub use types::TypeNameFormatter;

use crate::metadata::{
    host::MetadataHost,
    members::{MemberVisibility, MethodReference},
    typesystem::TypeRefRc,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// What to include in a formatted name
    pub struct NameFormattingOptions: u32 {
        /// Render `System.Nullable<T>` as `T?`
        const CONTRACT_NULLABLE = 0x0000_0001;
        /// Prefix documentation ID kinds: `T:`, `M:`, `F:`, `P:` and `E:`
        const DOCUMENTATION_ID_MEMBER_KIND = 0x0000_0002;
        /// Render generic parameter lists as `<,>`
        const EMPTY_TYPE_PARAMETER_LIST = 0x0000_0004;
        /// Escape names that are C# keywords, as in `@if`
        const ESCAPE_KEYWORD = 0x0000_0008;
        /// Documentation ID punctuation for generics, arrays and by-ref parameters
        const FORMATTING_FOR_DOCUMENTATION_ID = 0x0000_0010;
        /// Prefix the kind of type or member, as in `class N.T`
        const MEMBER_KIND = 0x0000_0020;
        /// Append the constraints of generic methods
        const METHOD_CONSTRAINTS = 0x0000_0040;
        /// Include modifiers such as `static`
        const MODIFIERS = 0x0000_0080;
        /// Leave out the namespace of namespace types
        const OMIT_CONTAINING_NAMESPACE = 0x0000_0100;
        /// Leave out the containing type of members and nested types
        const OMIT_CONTAINING_TYPE = 0x0000_0200;
        /// Leave out `modopt` and `modreq` modifiers
        const OMIT_CUSTOM_MODIFIERS = 0x0000_0400;
        /// Leave out the interface prefix of explicit implementations
        const OMIT_IMPLEMENTED_INTERFACE = 0x0000_0800;
        /// Leave out the type arguments of generic instances
        const OMIT_TYPE_ARGUMENTS = 0x0000_1000;
        /// Separate list items with `,` instead of `, `
        const OMIT_WHITE_SPACE_AFTER_LIST_DELIMITER = 0x0000_2000;
        /// Include parameter names
        const PARAMETER_NAME = 0x0000_4000;
        /// Include `ref`, `out` and `params`
        const PARAMETER_MODIFIERS = 0x0000_8000;
        /// Keep raw accessor names such as `get_Count`
        const PRESERVE_SPECIAL_NAMES = 0x0001_0000;
        /// Include the return type
        const RETURN_TYPE = 0x0002_0000;
        /// Include the parameter list
        const SIGNATURE = 0x0004_0000;
        /// Qualify types only where ambiguous; needs source information and is ignored here
        const SMART_TYPE_NAME = 0x0008_0000;
        /// Qualify namespaces only where ambiguous; needs source information and is ignored here
        const SMART_NAMESPACE_NAME = 0x0010_0000;
        /// Drop the `Attribute` suffix of attribute types
        const SUPPRESS_ATTRIBUTE_SUFFIX = 0x0020_0000;
        /// Append the constraints of generic types
        const TYPE_CONSTRAINTS = 0x0040_0000;
        /// Include generic parameter names
        const TYPE_PARAMETERS = 0x0080_0000;
        /// Append `` `n `` to generic type names
        const USE_GENERIC_TYPE_NAME_SUFFIX = 0x0100_0000;
        /// Prefix namespaces with `global::`
        const USE_GLOBAL_PREFIX = 0x0200_0000;
        /// Separate nested type names with `+`
        const USE_REFLECTION_STYLE_FOR_NESTED_TYPE_NAMES = 0x0400_0000;
        /// Use C# keywords such as `int` for primitives, `object` and `decimal`
        const USE_TYPE_KEYWORDS = 0x0800_0000;
        /// Include visibility
        const VISIBILITY = 0x1000_0000;

        /// XML documentation member IDs
        const DOCUMENTATION_ID = Self::FORMATTING_FOR_DOCUMENTATION_ID.bits()
            | Self::DOCUMENTATION_ID_MEMBER_KIND.bits()
            | Self::PRESERVE_SPECIAL_NAMES.bits()
            | Self::TYPE_PARAMETERS.bits()
            | Self::USE_GENERIC_TYPE_NAME_SUFFIX.bits()
            | Self::SIGNATURE.bits()
            | Self::OMIT_WHITE_SPACE_AFTER_LIST_DELIMITER.bits();
    }
}

impl NameFormattingOptions {
    pub(crate) fn list_delimiter(self) -> &'static str {
        if self.contains(Self::OMIT_WHITE_SPACE_AFTER_LIST_DELIMITER) {
            ","
        } else {
            ", "
        }
    }

    pub(crate) fn is_documentation_id(self) -> bool {
        self.contains(Self::FORMATTING_FOR_DOCUMENTATION_ID)
    }
}

/// The C# word for a visibility
#[must_use]
pub fn visibility_name(visibility: MemberVisibility) -> &'static str {
    match visibility {
        MemberVisibility::Assembly => "internal",
        MemberVisibility::Family => "protected",
        MemberVisibility::FamilyAndAssembly => "protected and internal",
        MemberVisibility::FamilyOrAssembly => "protected internal",
        MemberVisibility::Public => "public",
        MemberVisibility::Private | MemberVisibility::Other => "private",
    }
}

/// Replaces the characters documentation IDs reserve: `.` `<` `>` `,`
#[must_use]
pub fn map_to_documentation_id_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' => '#',
            '<' => '{',
            '>' => '}',
            ',' => '@',
            other => other,
        })
        .collect()
}

/// Formats `type_reference` with a default [`TypeNameFormatter`]
pub fn type_name(
    host: &MetadataHost,
    type_reference: &TypeRefRc,
    options: NameFormattingOptions,
) -> String {
    TypeNameFormatter::new(host).type_name(type_reference, options)
}

/// Formats `member` with a default [`SignatureFormatter`]
pub fn member_signature(
    host: &MetadataHost,
    member: FormattedMember<'_>,
    options: NameFormattingOptions,
) -> String {
    SignatureFormatter::new(host).member_signature(member, options)
}

/// Formats `method` with a default [`SignatureFormatter`]
pub fn method_signature(
    host: &MetadataHost,
    method: &MethodReference,
    options: NameFormattingOptions,
) -> String {
    SignatureFormatter::new(host).method_signature(method, options)
}
