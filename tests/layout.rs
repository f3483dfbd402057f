//! Integration tests for field layout on 32-bit and 64-bit hosts.

mod common;

use common::Model;
use dotmodel::{
    metadata::layout::{field_bit_offset, field_offset, size_of_type, type_alignment},
    prelude::*,
};

/// `struct Mixed { byte tag; object payload; short count; }`
fn mixed_struct(model: &Model) -> (TypeDefRc, Vec<FieldDefRc>) {
    let unit = model.assembly("Layouts");
    let p = model.platform();
    let mixed = model.namespace(&unit, "Layouts").add_type(
        TypeDefinition::new(
            model.name("Mixed"),
            TypeAttributes::PUBLIC | TypeAttributes::VALUE_TYPE,
        )
        .with_layout(LayoutKind::Sequential),
    );
    let fields = vec![
        mixed.add_field(FieldDefinition::new(model.name("tag"), p.system_uint8.clone())),
        mixed.add_field(FieldDefinition::new(model.name("payload"), p.system_object.clone())),
        mixed.add_field(FieldDefinition::new(model.name("count"), p.system_int16.clone())),
    ];
    (mixed, fields)
}

#[test]
fn test_pointer_size_drives_reference_fields() {
    let wide = Model::with_config(HostConfig::for_64bit());
    let (mixed, fields) = mixed_struct(&wide);
    let offsets: Vec<u32> = fields.iter().map(|field| field_offset(&wide.host, field)).collect();
    assert_eq!(offsets, vec![0, 8, 16]);
    assert_eq!(size_of_type(&wide.host, &TypeReference::definition(&mixed)), 24);
    assert_eq!(type_alignment(&wide.host, &TypeReference::definition(&mixed)), 8);

    let narrow = Model::with_config(HostConfig::for_32bit());
    let (mixed, fields) = mixed_struct(&narrow);
    let offsets: Vec<u32> = fields.iter().map(|field| field_offset(&narrow.host, field)).collect();
    assert_eq!(offsets, vec![0, 4, 8]);
    assert_eq!(size_of_type(&narrow.host, &TypeReference::definition(&mixed)), 12);
}

#[test]
fn test_generic_instances_measure_their_arguments() {
    let model = Model::new();
    let unit = model.assembly("Layouts");
    let p = model.platform();
    let pair = model.namespace(&unit, "Layouts").add_type(
        TypeDefinition::new(model.name("Pair"), TypeAttributes::PUBLIC | TypeAttributes::VALUE_TYPE)
            .with_layout(LayoutKind::Sequential),
    );
    pair.add_generic_parameter(model.name("T"));
    let generic = model.type_ref(&unit, "Layouts", "Pair", 1);
    let t = TypeReference::generic_type_parameter(generic.clone(), 0, model.name("T"));
    pair.add_field(FieldDefinition::new(model.name("first"), t.clone()));
    pair.add_field(FieldDefinition::new(model.name("second"), t));

    let of_long = TypeReference::generic_instance(generic.clone(), vec![p.system_int64.clone()]);
    let of_byte = TypeReference::generic_instance(generic, vec![p.system_uint8.clone()]);
    assert_eq!(size_of_type(&model.host, &of_long), 16);
    assert_eq!(size_of_type(&model.host, &of_byte), 2);
    assert_eq!(type_alignment(&model.host, &of_long), 8);
}

#[test]
fn test_enums_and_explicit_layout() {
    let model = Model::new();
    let unit = model.assembly("Layouts");
    let p = model.platform();
    let namespace = model.namespace(&unit, "Layouts");

    let color = namespace.add_type(TypeDefinition::new(
        model.name("Color"),
        TypeAttributes::PUBLIC
            | TypeAttributes::SEALED
            | TypeAttributes::VALUE_TYPE
            | TypeAttributes::ENUM,
    ));
    color.set_underlying_type(p.system_uint8.clone());
    assert_eq!(size_of_type(&model.host, &TypeReference::definition(&color)), 1);

    let union = namespace.add_type(
        TypeDefinition::new(
            model.name("Union"),
            TypeAttributes::PUBLIC | TypeAttributes::VALUE_TYPE,
        )
        .with_layout(LayoutKind::Explicit)
        .with_size(8),
    );
    let as_long = union.add_field(
        FieldDefinition::new(model.name("asLong"), p.system_int64.clone()).with_offset(0),
    );
    let high = union.add_field(
        FieldDefinition::new(model.name("high"), p.system_int32.clone()).with_offset(4),
    );
    assert_eq!(field_offset(&model.host, &as_long), 0);
    assert_eq!(field_offset(&model.host, &high), 4);
    assert_eq!(size_of_type(&model.host, &TypeReference::definition(&union)), 8);
}

#[test]
fn test_bitfield_runs() {
    let model = Model::new();
    let unit = model.assembly("Layouts");
    let p = model.platform();
    let packed = model.namespace(&unit, "Layouts").add_type(
        TypeDefinition::new(
            model.name("Packed"),
            TypeAttributes::PUBLIC | TypeAttributes::VALUE_TYPE,
        )
        .with_layout(LayoutKind::Sequential),
    );
    let a = packed.add_field(
        FieldDefinition::new(model.name("a"), p.system_uint16.clone()).with_bit_length(10),
    );
    let b = packed.add_field(
        FieldDefinition::new(model.name("b"), p.system_uint16.clone()).with_bit_length(6),
    );
    let c = packed.add_field(
        FieldDefinition::new(model.name("c"), p.system_uint16.clone()).with_bit_length(4),
    );

    assert_eq!((field_offset(&model.host, &a), field_bit_offset(&model.host, &a)), (0, 0));
    assert_eq!((field_offset(&model.host, &b), field_bit_offset(&model.host, &b)), (0, 10));
    assert_eq!((field_offset(&model.host, &c), field_bit_offset(&model.host, &c)), (2, 0));
    assert_eq!(size_of_type(&model.host, &TypeReference::definition(&packed)), 4);
}
