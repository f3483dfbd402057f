//! Field layout: byte offsets, bit offsets, sizes and alignment.
//!
//! Offsets under [`LayoutKind::Explicit`] are the stored field offsets. Every other layout is
//! computed by walking the instance fields and packing them with natural alignment. Under
//! [`LayoutKind::Sequential`] fields are visited in sequence number order, otherwise in
//! declaration order.
//!
//! Bitfields share an alignment unit as long as they fit: a run of bitfields typed `int` packs
//! into 32 bits before a new unit is opened. A regular field closes the open run and is
//! aligned to the larger of its own alignment and the alignment of the run.
//!
//! Fields whose type is a reference type occupy one pointer. Types that do not resolve count
//! as one byte so that layout of incomplete graphs still makes progress.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//! use dotmodel::metadata::layout::{field_bit_offset, field_offset};
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Lib")));
//! let flags = unit.root().add_namespace(host.name_for("N")).add_type(
//!     TypeDefinition::new(
//!         host.name_for("Flags"),
//!         TypeAttributes::PUBLIC | TypeAttributes::VALUE_TYPE,
//!     )
//!     .with_layout(LayoutKind::Sequential),
//! );
//! let int32 = host.platform_types().system_int32.clone();
//! let low = flags.add_field(
//!     FieldDefinition::new(host.name_for("low"), int32.clone()).with_bit_length(3),
//! );
//! let high = flags.add_field(
//!     FieldDefinition::new(host.name_for("high"), int32).with_bit_length(5),
//! );
//!
//! assert_eq!(field_offset(&host, &low), field_offset(&host, &high));
//! assert_eq!(field_bit_offset(&host, &high), 3);
//! # Ok::<(), dotmodel::Error>(())
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    members::{FieldDefRc, FieldDefinition},
    typesystem::{
        specialize_type_reference, LayoutKind, ResolvedType, TypeDefRc, TypeMember, TypeRefRc,
        TypeReference,
    },
};

/// Byte offset of an instance field within its containing type
///
/// # Panics
///
/// Panics if `field` is static or not attached to a type.
pub fn field_offset(host: &MetadataHost, field: &FieldDefRc) -> u32 {
    assert!(!field.is_static(), "static field {} has no offset", field.name);
    let Some(containing) = field.containing_type() else {
        panic!("field {} is not attached to a type", field.name);
    };

    if containing.layout == LayoutKind::Explicit {
        return field.offset;
    }
    compute_member_offset(host, &TypeMember::Field(field.clone()), &containing)
}

/// Byte offset of `item` computed by walking the fields of `containing`.
///
/// `item` is an instance field or, outside of sequential layout, a nested type standing in for
/// an anonymous member. Fields typed with the nested type itself are skipped so that anonymous
/// structures do not measure themselves.
///
/// # Panics
///
/// Panics if the walk does not reach `item`.
pub fn compute_member_offset(
    host: &MetadataHost,
    item: &TypeMember,
    containing: &TypeDefRc,
) -> u32 {
    let measure = Measure::new(host);
    let mut walk = FieldWalk::default();

    for member in laid_out_members(containing) {
        match member {
            TypeMember::NestedType(nested) => {
                if let TypeMember::NestedType(target) = item {
                    if Arc::ptr_eq(&nested, target) {
                        let alignment =
                            type_alignment(host, &TypeReference::definition(&nested));
                        return bytes(round_up(walk.result, u64::from(alignment) * 8) / 8);
                    }
                }
            }
            TypeMember::Field(field) if !field.is_static() => {
                let field_type = field.field_type.clone();
                if let TypeMember::NestedType(target) = item {
                    let is_target = field_type
                        .resolved_type(host)
                        .and_then(|resolved| resolved.definition())
                        .is_some_and(|definition| Arc::ptr_eq(&definition, target));
                    if is_target {
                        continue;
                    }
                }

                let alignment = measure.field_alignment_bits(&field_type, containing);
                if let TypeMember::Field(target) = item {
                    if Arc::ptr_eq(&field, target) {
                        return walk.offset_of(&field, alignment);
                    }
                }
                walk.advance(&field, alignment, || {
                    measure.field_size_bits(&field_type, containing)
                });
            }
            _ => {}
        }
    }

    panic!("{} is not a member laid out by {}", item.name(), containing.name);
}

/// Number of low bits to skip when reading or writing a bitfield at its
/// [`field_offset`]
///
/// # Panics
///
/// Panics if `field` is not a bitfield, is not attached to a type, or is not reached by the
/// field walk of its containing type.
pub fn field_bit_offset(host: &MetadataHost, field: &FieldDefRc) -> u32 {
    let Some(bit_length) = field.bit_length else {
        panic!("field {} is not a bitfield", field.name);
    };
    let Some(containing) = field.containing_type() else {
        panic!("field {} is not attached to a type", field.name);
    };

    let measure = Measure::new(host);
    let mut walk = FieldWalk::default();
    for member in laid_out_members(&containing) {
        let TypeMember::Field(current) = member else {
            continue;
        };
        if current.is_static() {
            continue;
        }

        let alignment = measure.field_alignment_bits(&current.field_type, &containing);
        if Arc::ptr_eq(&current, field) {
            if walk.bit_offset > 0
                && walk.bit_offset + u64::from(bit_length) > walk.bit_field_alignment
            {
                return 0;
            }
            return bytes(walk.bit_offset);
        }
        walk.advance(&current, alignment, || {
            measure.field_size_bits(&current.field_type, &containing)
        });
    }

    panic!("{} is not a member laid out by {}", field.name, containing.name);
}

/// Size in bytes of a value of `type_reference`.
///
/// Primitives have their natural size and native integers and pointers the host pointer size.
/// Enums measure their underlying type. A declared size wins over the computed one, which is
/// padded to the type alignment.
pub fn size_of_type(host: &MetadataHost, type_reference: &TypeReference) -> u32 {
    Measure::new(host).size_of(type_reference, None)
}

/// Alignment in bytes of values of `type_reference`; always at least 1.
///
/// A declared packing wins; otherwise the largest alignment of any instance field.
pub fn type_alignment(host: &MetadataHost, type_reference: &TypeReference) -> u16 {
    Measure::new(host).alignment_of(type_reference, None)
}

#[derive(Default)]
struct FieldWalk {
    result: u64,
    bit_offset: u64,
    bit_field_alignment: u64,
}

impl FieldWalk {
    fn offset_of(&self, field: &FieldDefinition, alignment: u64) -> u32 {
        if let Some(bits) = field.bit_length {
            if self.bit_offset > 0 && self.bit_offset + u64::from(bits) <= self.bit_field_alignment
            {
                return bytes((self.result - self.bit_offset) / 8);
            }
        }
        bytes(round_up(self.result, alignment.max(self.bit_field_alignment)) / 8)
    }

    fn advance(&mut self, field: &FieldDefinition, alignment: u64, size: impl FnOnce() -> u64) {
        let size = match field.bit_length {
            Some(bits) => {
                let bits = u64::from(bits);
                self.bit_field_alignment = alignment;
                if self.bit_offset > 0 && self.bit_offset + bits > alignment {
                    self.bit_offset = 0;
                }
                if self.bit_offset == 0 || bits == 0 {
                    self.result = round_up(self.result, alignment);
                    self.bit_offset = 0;
                }
                self.bit_offset += bits;
                bits
            }
            None => {
                let alignment = alignment.max(self.bit_field_alignment);
                self.bit_field_alignment = 0;
                self.bit_offset = 0;
                self.result = round_up(self.result, alignment);
                size()
            }
        };
        self.result = self.result.saturating_add(size);
    }
}

struct Measure<'h> {
    host: &'h MetadataHost,
    pointer_size: u32,
}

/// What a field type measures as
enum Shape {
    Known(u32),
    Pointer,
    Unknown,
    Definition(TypeDefRc, Vec<TypeRefRc>),
}

impl<'h> Measure<'h> {
    fn new(host: &'h MetadataHost) -> Self {
        Measure {
            host,
            pointer_size: u32::from(host.pointer_size()),
        }
    }

    fn shape(&self, type_reference: &TypeReference) -> Shape {
        if let Some(size) = type_reference.type_code.size(self.host.pointer_size()) {
            return Shape::Known(size);
        }
        if type_reference.is_generic_parameter() {
            return Shape::Unknown;
        }

        let Some(resolved) = type_reference.resolved_type(self.host) else {
            debug!(type_name = ?type_reference.name(), "unresolved type measured as one byte");
            return Shape::Unknown;
        };
        match &resolved {
            ResolvedType::Pointer(_)
            | ResolvedType::ManagedPointer(_)
            | ResolvedType::FunctionPointer(_)
            | ResolvedType::Array { .. } => Shape::Pointer,
            ResolvedType::GenericParameter(_) => Shape::Unknown,
            _ => match resolved.definition() {
                Some(definition) => Shape::Definition(definition, resolved.generic_arguments()),
                None => Shape::Unknown,
            },
        }
    }

    fn size_of(&self, type_reference: &TypeReference, root: Option<&TypeDefRc>) -> u32 {
        let (definition, arguments) = match self.shape(type_reference) {
            Shape::Known(size) => return size,
            Shape::Pointer => return self.pointer_size,
            Shape::Unknown => return 1,
            Shape::Definition(definition, arguments) => (definition, arguments),
        };

        if definition.is_enum() {
            if let Some(underlying) = definition.underlying_type() {
                if root.is_some_and(|root| self.is_definition(&underlying, root)) {
                    return 0;
                }
                return self.size_of(&underlying, root);
            }
        }
        if definition.size_of > 0 {
            return definition.size_of;
        }

        let _guard = match self.host.enter_resolution() {
            Ok(guard) => guard,
            Err(error) => {
                debug!("size computation aborted: {}", error);
                return 1;
            }
        };

        let root = root.unwrap_or(&definition);
        let mut walk = FieldWalk::default();
        for member in laid_out_members(&definition) {
            let TypeMember::Field(field) = member else {
                continue;
            };
            if field.is_static() {
                continue;
            }
            let field_type = instance_field_type(&field, &arguments);
            let alignment = self.field_alignment_bits(&field_type, root);
            walk.advance(&field, alignment, || self.field_size_bits(&field_type, root));
        }

        let alignment = u64::from(self.alignment_of(type_reference, Some(root)));
        bytes(round_up(walk.result.div_ceil(8), alignment))
    }

    fn alignment_of(&self, type_reference: &TypeReference, root: Option<&TypeDefRc>) -> u16 {
        let (definition, arguments) = match self.shape(type_reference) {
            Shape::Known(size) => return u16::try_from(size).unwrap_or(u16::MAX),
            Shape::Pointer => return u16::from(self.host.pointer_size()),
            Shape::Unknown => return 1,
            Shape::Definition(definition, arguments) => (definition, arguments),
        };

        if definition.is_enum() {
            if let Some(underlying) = definition.underlying_type() {
                if root.is_some_and(|root| self.is_definition(&underlying, root)) {
                    return 1;
                }
                return self.alignment_of(&underlying, root);
            }
        }
        if definition.alignment > 0 {
            return definition.alignment;
        }

        let _guard = match self.host.enter_resolution() {
            Ok(guard) => guard,
            Err(error) => {
                debug!("alignment computation aborted: {}", error);
                return 1;
            }
        };

        let root = root.unwrap_or(&definition);
        definition
            .fields()
            .filter(|field| !field.is_static())
            .map(|field| {
                let field_type = instance_field_type(&field, &arguments);
                if self.occupies_pointer(&field_type, root) {
                    u16::from(self.host.pointer_size())
                } else {
                    self.alignment_of(&field_type, Some(root))
                }
            })
            .max()
            .unwrap_or(1)
            .max(1)
    }

    fn field_alignment_bits(&self, field_type: &TypeRefRc, root: &TypeDefRc) -> u64 {
        if self.occupies_pointer(field_type, root) {
            return u64::from(self.pointer_size) * 8;
        }
        u64::from(self.alignment_of(field_type, Some(root))) * 8
    }

    fn field_size_bits(&self, field_type: &TypeRefRc, root: &TypeDefRc) -> u64 {
        if self.occupies_pointer(field_type, root) {
            return u64::from(self.pointer_size) * 8;
        }
        u64::from(self.size_of(field_type, Some(root))) * 8
    }

    /// Reference typed fields, and fields typed with the type being measured, hold a pointer
    fn occupies_pointer(&self, field_type: &TypeReference, root: &TypeDefRc) -> bool {
        if field_type.type_code.size(self.host.pointer_size()).is_some() {
            return false;
        }
        field_type.resolved_type(self.host).is_some_and(|resolved| {
            resolved.is_reference_type()
                || resolved
                    .definition()
                    .is_some_and(|definition| Arc::ptr_eq(&definition, root))
        })
    }

    fn is_definition(&self, type_reference: &TypeReference, definition: &TypeDefRc) -> bool {
        type_reference
            .resolved_type(self.host)
            .and_then(|resolved| resolved.definition())
            .is_some_and(|resolved| Arc::ptr_eq(&resolved, definition))
    }
}

/// Members in layout order: fields by sequence number under sequential layout, every member in
/// declaration order otherwise
fn laid_out_members(definition: &TypeDefRc) -> Vec<TypeMember> {
    if definition.layout == LayoutKind::Sequential {
        let mut fields: Vec<FieldDefRc> = definition.fields().collect();
        fields.sort_by_key(|field| field.sequence_number());
        return fields.into_iter().map(TypeMember::Field).collect();
    }
    definition.members.iter().map(|(_, member)| member.clone()).collect()
}

fn instance_field_type(field: &FieldDefinition, arguments: &[TypeRefRc]) -> TypeRefRc {
    if arguments.is_empty() {
        field.field_type.clone()
    } else {
        specialize_type_reference(&field.field_type, arguments, &[])
    }
}

fn round_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment).saturating_mul(alignment)
}

/// Narrows a layout quantity, saturating at `u32::MAX`
fn bytes(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
