//! References to the well known types of the core assembly.
//!
//! The host builds one [`PlatformTypes`] at construction time. Each entry is a namespace type
//! reference into the configured core assembly, so it resolves once that assembly is
//! registered or loadable, and it carries the [`PrimitiveTypeCode`] of the type it names.

use crate::metadata::{
    identity::{AssemblyIdentity, UnitIdentity},
    names::NameTable,
    typesystem::{PrimitiveTypeCode, TypeRefRc, TypeReference, TypeReferenceKind},
    units::{NamespaceRefRc, UnitNamespaceReference},
};

/// Well known type references of the core assembly
#[derive(Debug)]
pub struct PlatformTypes {
    /// The root namespace of the core assembly
    pub core_root: NamespaceRefRc,
    /// `System`
    pub system_namespace: NamespaceRefRc,
    /// `System.Object`
    pub system_object: TypeRefRc,
    /// `System.ValueType`
    pub system_value_type: TypeRefRc,
    /// `System.Enum`
    pub system_enum: TypeRefRc,
    /// `System.Delegate`
    pub system_delegate: TypeRefRc,
    /// `System.MulticastDelegate`
    pub system_multicast_delegate: TypeRefRc,
    /// `System.Array`
    pub system_array: TypeRefRc,
    /// `System.Attribute`
    pub system_attribute: TypeRefRc,
    /// `System.Type`
    pub system_type: TypeRefRc,
    /// `System.String`
    pub system_string: TypeRefRc,
    /// `System.Void`
    pub system_void: TypeRefRc,
    /// `System.Boolean`
    pub system_boolean: TypeRefRc,
    /// `System.Char`
    pub system_char: TypeRefRc,
    /// `System.SByte`
    pub system_int8: TypeRefRc,
    /// `System.Int16`
    pub system_int16: TypeRefRc,
    /// `System.Int32`
    pub system_int32: TypeRefRc,
    /// `System.Int64`
    pub system_int64: TypeRefRc,
    /// `System.Byte`
    pub system_uint8: TypeRefRc,
    /// `System.UInt16`
    pub system_uint16: TypeRefRc,
    /// `System.UInt32`
    pub system_uint32: TypeRefRc,
    /// `System.UInt64`
    pub system_uint64: TypeRefRc,
    /// `System.Single`
    pub system_float32: TypeRefRc,
    /// `System.Double`
    pub system_float64: TypeRefRc,
    /// `System.IntPtr`
    pub system_int_ptr: TypeRefRc,
    /// `System.UIntPtr`
    pub system_uint_ptr: TypeRefRc,
    /// `System.Decimal`
    pub system_decimal: TypeRefRc,
    /// `System.Nullable<T>`
    pub system_nullable: TypeRefRc,
    /// `System.Reflection.DefaultMemberAttribute`
    pub system_reflection_default_member_attribute: TypeRefRc,
    /// `System.Runtime.CompilerServices.IsVolatile`
    pub system_runtime_compiler_services_is_volatile: TypeRefRc,
}

impl PlatformTypes {
    /// Builds the references against `core_assembly`
    #[must_use]
    pub fn new(names: &NameTable, core_assembly: &AssemblyIdentity) -> Self {
        let core_root = UnitNamespaceReference::root(UnitIdentity::Assembly(core_assembly.clone()));
        let system =
            UnitNamespaceReference::nested(core_root.clone(), names.get_name_for("System"));
        let reflection =
            UnitNamespaceReference::nested(system.clone(), names.get_name_for("Reflection"));
        let compiler_services = UnitNamespaceReference::nested(
            UnitNamespaceReference::nested(system.clone(), names.get_name_for("Runtime")),
            names.get_name_for("CompilerServices"),
        );

        let named = |namespace: &NamespaceRefRc, name: &str, generic_parameter_count: u16| {
            TypeReference::namespace_type(
                namespace.clone(),
                names.get_name_for(name),
                generic_parameter_count,
            )
        };
        let primitive = |code: PrimitiveTypeCode| {
            let name = code.system_type_name().unwrap_or_default();
            TypeReference::with_type_code(
                TypeReferenceKind::Namespace {
                    namespace: system.clone(),
                    name: names.get_name_for(name),
                    generic_parameter_count: 0,
                },
                code,
            )
        };

        PlatformTypes {
            system_object: named(&system, "Object", 0),
            system_value_type: named(&system, "ValueType", 0),
            system_enum: named(&system, "Enum", 0),
            system_delegate: named(&system, "Delegate", 0),
            system_multicast_delegate: named(&system, "MulticastDelegate", 0),
            system_array: named(&system, "Array", 0),
            system_attribute: named(&system, "Attribute", 0),
            system_type: named(&system, "Type", 0),
            system_string: primitive(PrimitiveTypeCode::String),
            system_void: primitive(PrimitiveTypeCode::Void),
            system_boolean: primitive(PrimitiveTypeCode::Boolean),
            system_char: primitive(PrimitiveTypeCode::Char),
            system_int8: primitive(PrimitiveTypeCode::Int8),
            system_int16: primitive(PrimitiveTypeCode::Int16),
            system_int32: primitive(PrimitiveTypeCode::Int32),
            system_int64: primitive(PrimitiveTypeCode::Int64),
            system_uint8: primitive(PrimitiveTypeCode::UInt8),
            system_uint16: primitive(PrimitiveTypeCode::UInt16),
            system_uint32: primitive(PrimitiveTypeCode::UInt32),
            system_uint64: primitive(PrimitiveTypeCode::UInt64),
            system_float32: primitive(PrimitiveTypeCode::Float32),
            system_float64: primitive(PrimitiveTypeCode::Float64),
            system_int_ptr: primitive(PrimitiveTypeCode::IntPtr),
            system_uint_ptr: primitive(PrimitiveTypeCode::UIntPtr),
            system_decimal: named(&system, "Decimal", 0),
            system_nullable: named(&system, "Nullable", 1),
            system_reflection_default_member_attribute: named(
                &reflection,
                "DefaultMemberAttribute",
                0,
            ),
            system_runtime_compiler_services_is_volatile: named(
                &compiler_services,
                "IsVolatile",
                0,
            ),
            core_root,
            system_namespace: system,
        }
    }

    /// The reference for a primitive type code
    #[must_use]
    pub fn primitive(&self, code: PrimitiveTypeCode) -> Option<&TypeRefRc> {
        Some(match code {
            PrimitiveTypeCode::Boolean => &self.system_boolean,
            PrimitiveTypeCode::Char => &self.system_char,
            PrimitiveTypeCode::Int8 => &self.system_int8,
            PrimitiveTypeCode::Int16 => &self.system_int16,
            PrimitiveTypeCode::Int32 => &self.system_int32,
            PrimitiveTypeCode::Int64 => &self.system_int64,
            PrimitiveTypeCode::UInt8 => &self.system_uint8,
            PrimitiveTypeCode::UInt16 => &self.system_uint16,
            PrimitiveTypeCode::UInt32 => &self.system_uint32,
            PrimitiveTypeCode::UInt64 => &self.system_uint64,
            PrimitiveTypeCode::Float32 => &self.system_float32,
            PrimitiveTypeCode::Float64 => &self.system_float64,
            PrimitiveTypeCode::IntPtr => &self.system_int_ptr,
            PrimitiveTypeCode::UIntPtr => &self.system_uint_ptr,
            PrimitiveTypeCode::String => &self.system_string,
            PrimitiveTypeCode::Void => &self.system_void,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{config::HostConfig, host::MetadataHost};

    #[test]
    fn test_primitives_carry_type_codes() {
        let host = MetadataHost::new(HostConfig::default()).unwrap();
        let platform = host.platform_types();

        assert_eq!(platform.system_int32.type_code, PrimitiveTypeCode::Int32);
        assert_eq!(platform.system_object.type_code, PrimitiveTypeCode::NotPrimitive);
        assert_eq!(
            platform.system_int32.name().unwrap().value(),
            "Int32"
        );
        assert!(platform.primitive(PrimitiveTypeCode::NotPrimitive).is_none());
        assert_eq!(platform.system_nullable.generic_parameter_count(), 1);
    }

    #[test]
    fn test_same_path_same_key() {
        let host = MetadataHost::new(HostConfig::default()).unwrap();
        let platform = host.platform_types();
        let again = TypeReference::namespace_type(
            platform.system_namespace.clone(),
            host.name_for("Int32"),
            0,
        );

        assert_eq!(
            platform.system_int32.interned_key(&host),
            again.interned_key(&host)
        );
        assert_eq!(
            platform.system_namespace.full_name(),
            "System"
        );
    }
}
