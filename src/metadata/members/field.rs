use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use bitflags::bitflags;
use tracing::trace;

use crate::metadata::{
    host::MetadataHost,
    intern::{InternKey, StructuralKey},
    members::{MemberDefinition, MemberVisibility, ResolvedField},
    names::Name,
    resolution,
    typesystem::{
        specialize_type_reference, CustomModifier, TypeDefRc, TypeDefRef, TypeRefRc,
        TypeReference,
    },
};

/// Reference to a `FieldDefinition`
pub type FieldDefRc = Arc<FieldDefinition>;
/// Reference to a `FieldReference`
pub type FieldRefRc = Arc<FieldReference>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Semantic attributes of a field
    pub struct FieldAttributes: u16 {
        /// One value per type rather than per instance
        const STATIC = 0x0010;
        /// Assignable only in a constructor (`readonly`)
        const INIT_ONLY = 0x0020;
        /// A compile time constant
        const LITERAL = 0x0040;
        /// Not serialized when the type is remoted
        const NOT_SERIALIZED = 0x0080;
        /// The name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// The field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

/// A field declared by a type
pub struct FieldDefinition {
    /// Simple name
    pub name: Name,
    /// Declared type, without custom modifiers
    pub field_type: TypeRefRc,
    /// Semantic attributes
    pub flags: FieldAttributes,
    /// Declared visibility
    pub visibility: MemberVisibility,
    /// Position among the fields of the declaring type. Assigned on insertion if not set.
    pub sequence_number: Option<u32>,
    /// Number of bits, for bitfields
    pub bit_length: Option<u32>,
    /// Byte offset under explicit layout
    pub offset: u32,
    /// Custom modifiers on the field type
    pub custom_modifiers: Vec<CustomModifier>,
    containing: OnceLock<TypeDefRef>,
    key: OnceLock<InternKey>,
}

impl FieldDefinition {
    /// Create a public instance field of `field_type`
    #[must_use]
    pub fn new(name: Name, field_type: TypeRefRc) -> Self {
        FieldDefinition {
            name,
            field_type,
            flags: FieldAttributes::empty(),
            visibility: MemberVisibility::Public,
            sequence_number: None,
            bit_length: None,
            offset: 0,
            custom_modifiers: Vec::new(),
            containing: OnceLock::new(),
            key: OnceLock::new(),
        }
    }

    /// Sets the semantic attributes
    #[must_use]
    pub fn with_flags(mut self, flags: FieldAttributes) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the sequence number instead of numbering by insertion order
    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    /// Makes the field a bitfield of `bits` bits
    #[must_use]
    pub fn with_bit_length(mut self, bits: u32) -> Self {
        self.bit_length = Some(bits);
        self
    }

    /// Sets the byte offset used under explicit layout
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Adds a custom modifier to the field type
    #[must_use]
    pub fn with_modifier(mut self, modifier: CustomModifier) -> Self {
        self.custom_modifiers.push(modifier);
        self
    }

    pub(crate) fn set_containing_type(&self, containing: TypeDefRef) {
        self.containing.set(containing).ok();
    }

    /// The sequence number, 0 if the field was never attached
    #[must_use]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number.unwrap_or(0)
    }

    /// Returns `true` for bitfields
    #[must_use]
    pub fn is_bitfield(&self) -> bool {
        self.bit_length.is_some()
    }

    /// Returns `true` for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// Returns `true` for compile time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// Returns `true` for `readonly` fields
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(FieldAttributes::INIT_ONLY)
    }

    /// Returns `true` if the field type carries custom modifiers
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.custom_modifiers.is_empty()
    }

    /// The type declaring this field
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        self.containing.get()?.upgrade()
    }

    /// The interned key, shared with every reference naming this field by the same path
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || match self.containing_type() {
            Some(containing) => host.intern_factory().intern(StructuralKey::Field {
                containing: containing.interned_key(host),
                name: self.name.unique_key(),
                field_type: self.field_type.interned_key(host),
            }),
            None => host.intern_factory().fresh(),
        })
    }
}

impl MemberDefinition for FieldDefinition {
    fn member_name(&self) -> &Name {
        &self.name
    }

    fn member_visibility(&self) -> MemberVisibility {
        self.visibility
    }

    fn declaring_type(&self) -> Option<TypeDefRc> {
        self.containing_type()
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("visibility", &self.visibility)
            .field("sequence_number", &self.sequence_number)
            .field("bit_length", &self.bit_length)
            .finish_non_exhaustive()
    }
}

/// The shape of a field reference
#[derive(Debug, Clone)]
pub enum FieldReferenceKind {
    /// Names the field by containing type, name and type
    Plain,
    /// The field of a generic instance, derived from the field of the generic type
    Specialized {
        /// The field as referenced on the generic type
        unspecialized: FieldRefRc,
    },
}

/// A reference to a field
pub struct FieldReference {
    /// The shape of this reference
    pub kind: FieldReferenceKind,
    /// The type declaring the field, or the instance for specialized references
    pub containing_type: TypeRefRc,
    /// Simple name
    pub name: Name,
    /// Field type, specialized for specialized references
    pub field_type: TypeRefRc,
    key: OnceLock<InternKey>,
    resolved: OnceLock<Option<ResolvedField>>,
}

impl FieldReference {
    /// A reference to the field `name` of type `field_type` in `containing_type`
    #[must_use]
    pub fn new(containing_type: TypeRefRc, name: Name, field_type: TypeRefRc) -> FieldRefRc {
        Arc::new(FieldReference {
            kind: FieldReferenceKind::Plain,
            containing_type,
            name,
            field_type,
            key: OnceLock::new(),
            resolved: OnceLock::new(),
        })
    }

    /// The field `unspecialized` seen through the generic instance `instance`
    #[must_use]
    pub fn specialized(unspecialized: FieldRefRc, instance: TypeRefRc) -> FieldRefRc {
        let field_type = specialize_type_reference(
            &unspecialized.field_type,
            &instance.generic_arguments(),
            &[],
        );
        Arc::new(FieldReference {
            name: unspecialized.name.clone(),
            kind: FieldReferenceKind::Specialized { unspecialized },
            containing_type: instance,
            field_type,
            key: OnceLock::new(),
            resolved: OnceLock::new(),
        })
    }

    /// A reference naming an existing definition
    ///
    /// Returns `None` if the definition is not attached to a type.
    #[must_use]
    pub fn to_definition(definition: &FieldDefRc) -> Option<FieldRefRc> {
        let containing = definition.containing_type()?;
        Some(Self::new(
            TypeReference::definition(&containing),
            definition.name.clone(),
            definition.field_type.clone(),
        ))
    }

    /// The reference this one was specialized from, following the whole chain.
    ///
    /// Idempotent: a plain reference returns itself.
    #[must_use]
    pub fn unspecialize(self: &Arc<Self>) -> FieldRefRc {
        match &self.kind {
            FieldReferenceKind::Plain => self.clone(),
            FieldReferenceKind::Specialized { unspecialized } => unspecialized.unspecialize(),
        }
    }

    /// The interned key of the referenced field
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            host.intern_factory().intern(StructuralKey::Field {
                containing: self.containing_type.interned_key(host),
                name: self.name.unique_key(),
                field_type: self.field_type.interned_key(host),
            })
        })
    }

    /// Resolves this reference, caching the result
    pub fn resolved_field(&self, host: &MetadataHost) -> Option<ResolvedField> {
        host.lazily(&self.resolved, || {
            let resolved = resolution::resolve_field(host, self);
            trace!(field = %self.name, found = resolved.is_some(), "field reference resolved");
            resolved
        })
    }
}

impl fmt::Debug for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldReference")
            .field("name", &self.name)
            .field("containing_type", &self.containing_type)
            .field("specialized", &matches!(self.kind, FieldReferenceKind::Specialized { .. }))
            .finish_non_exhaustive()
    }
}
