//! A stub core library defining the types [`PlatformTypes`] refers to.
//!
//! [`PlatformTypes`]: crate::metadata::platform::PlatformTypes

use crate::metadata::{
    host::MetadataHost,
    typesystem::{LayoutKind, PrimitiveTypeCode, TypeAttributes, TypeDefinition, TypeRefRc},
    units::{NamespaceRc, Unit, UnitRc},
};

const PRIMITIVES: &[PrimitiveTypeCode] = &[
    PrimitiveTypeCode::Boolean,
    PrimitiveTypeCode::Char,
    PrimitiveTypeCode::Int8,
    PrimitiveTypeCode::Int16,
    PrimitiveTypeCode::Int32,
    PrimitiveTypeCode::Int64,
    PrimitiveTypeCode::UInt8,
    PrimitiveTypeCode::UInt16,
    PrimitiveTypeCode::UInt32,
    PrimitiveTypeCode::UInt64,
    PrimitiveTypeCode::Float32,
    PrimitiveTypeCode::Float64,
    PrimitiveTypeCode::IntPtr,
    PrimitiveTypeCode::UIntPtr,
];

/// Registers the configured core assembly with `System.Object` and friends
pub fn build_core_library(host: &MetadataHost) -> UnitRc {
    let core = host.register_unit(Unit::new_assembly(host, host.config().core_assembly.clone()));
    let platform = host.platform_types();
    let system = core.root().add_namespace(host.name_for("System"));

    let public = TypeAttributes::PUBLIC;
    let value_type = public | TypeAttributes::SEALED | TypeAttributes::VALUE_TYPE;
    let define = |namespace: &NamespaceRc,
                  name: &str,
                  flags: TypeAttributes,
                  base: Option<&TypeRefRc>| {
        let definition = namespace.add_type(TypeDefinition::new(host.name_for(name), flags));
        if let Some(base) = base {
            definition.add_base_class(base.clone());
        }
        definition
    };

    define(&system, "Object", public, None);
    define(&system, "ValueType", public | TypeAttributes::ABSTRACT, Some(&platform.system_object));
    define(&system, "Enum", public | TypeAttributes::ABSTRACT, Some(&platform.system_value_type));
    define(&system, "Delegate", public | TypeAttributes::ABSTRACT, Some(&platform.system_object));
    define(
        &system,
        "MulticastDelegate",
        public | TypeAttributes::ABSTRACT,
        Some(&platform.system_delegate),
    );
    define(&system, "Array", public | TypeAttributes::ABSTRACT, Some(&platform.system_object));
    define(&system, "Attribute", public | TypeAttributes::ABSTRACT, Some(&platform.system_object));
    define(&system, "Type", public | TypeAttributes::ABSTRACT, Some(&platform.system_object));

    let string = system.add_type(
        TypeDefinition::new(host.name_for("String"), public | TypeAttributes::SEALED)
            .with_type_code(PrimitiveTypeCode::String),
    );
    string.add_base_class(platform.system_object.clone());
    system.add_type(
        TypeDefinition::new(host.name_for("Void"), value_type)
            .with_type_code(PrimitiveTypeCode::Void),
    );

    for &code in PRIMITIVES {
        let Some(name) = code.system_type_name() else {
            continue;
        };
        let pointer_size = host.pointer_size();
        let primitive = system.add_type(
            TypeDefinition::new(host.name_for(name), value_type)
                .with_type_code(code)
                .with_layout(LayoutKind::Sequential)
                .with_size(code.size(pointer_size).unwrap_or(0))
                .with_alignment(code.alignment(pointer_size).unwrap_or(0)),
        );
        primitive.add_base_class(platform.system_value_type.clone());
    }

    let decimal = system.add_type(
        TypeDefinition::new(host.name_for("Decimal"), value_type)
            .with_layout(LayoutKind::Sequential)
            .with_size(16)
            .with_alignment(8),
    );
    decimal.add_base_class(platform.system_value_type.clone());

    let nullable = system.add_type(
        TypeDefinition::new(host.name_for("Nullable"), value_type)
            .with_layout(LayoutKind::Sequential),
    );
    nullable.add_generic_parameter(host.name_for("T"));
    nullable.add_base_class(platform.system_value_type.clone());

    let reflection = system.add_namespace(host.name_for("Reflection"));
    define(
        &reflection,
        "DefaultMemberAttribute",
        public | TypeAttributes::SEALED,
        Some(&platform.system_attribute),
    );

    let compiler_services = system
        .add_namespace(host.name_for("Runtime"))
        .add_namespace(host.name_for("CompilerServices"));
    define(
        &compiler_services,
        "IsVolatile",
        public | TypeAttributes::ABSTRACT | TypeAttributes::SEALED | TypeAttributes::STATIC,
        None,
    );

    core
}
