//! Primitive type codes.
//!
//! Every type definition and reference carries a [`PrimitiveTypeCode`]. It is
//! [`PrimitiveTypeCode::NotPrimitive`] for ordinary types and identifies the built-in value
//! types, `System.String`, `System.Void` and the pointer kinds otherwise. Layout uses the code to
//! short-circuit size and alignment, and the formatter uses it to choose C# keywords.

use strum::{Display, EnumCount, EnumIter};

/// Primitive type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumCount)]
pub enum PrimitiveTypeCode {
    /// Not a primitive type
    #[default]
    NotPrimitive,
    /// System.Boolean
    Boolean,
    /// System.Char
    Char,
    /// System.SByte
    Int8,
    /// System.Int16
    Int16,
    /// System.Int32
    Int32,
    /// System.Int64
    Int64,
    /// System.Byte
    UInt8,
    /// System.UInt16
    UInt16,
    /// System.UInt32
    UInt32,
    /// System.UInt64
    UInt64,
    /// System.Single
    Float32,
    /// System.Double
    Float64,
    /// System.IntPtr
    IntPtr,
    /// System.UIntPtr
    UIntPtr,
    /// An unmanaged pointer
    Pointer,
    /// A managed pointer
    Reference,
    /// System.String
    String,
    /// System.Void
    Void,
    /// A type that could not be classified
    Invalid,
}

impl PrimitiveTypeCode {
    /// Size in bytes of a value of this type, or `None` for non-primitive types.
    ///
    /// Native integers and pointers take `pointer_size`. [`PrimitiveTypeCode::Invalid`] is one
    /// byte so that layout of broken metadata still makes progress.
    #[must_use]
    pub fn size(self, pointer_size: u8) -> Option<u32> {
        match self {
            PrimitiveTypeCode::Boolean
            | PrimitiveTypeCode::Int8
            | PrimitiveTypeCode::UInt8
            | PrimitiveTypeCode::Invalid => Some(1),
            PrimitiveTypeCode::Char | PrimitiveTypeCode::Int16 | PrimitiveTypeCode::UInt16 => {
                Some(2)
            }
            PrimitiveTypeCode::Int32 | PrimitiveTypeCode::UInt32 | PrimitiveTypeCode::Float32 => {
                Some(4)
            }
            PrimitiveTypeCode::Int64 | PrimitiveTypeCode::UInt64 | PrimitiveTypeCode::Float64 => {
                Some(8)
            }
            PrimitiveTypeCode::IntPtr | PrimitiveTypeCode::UIntPtr | PrimitiveTypeCode::Pointer => {
                Some(u32::from(pointer_size))
            }
            PrimitiveTypeCode::NotPrimitive
            | PrimitiveTypeCode::Reference
            | PrimitiveTypeCode::String
            | PrimitiveTypeCode::Void => None,
        }
    }

    /// Natural alignment in bytes; equal to the size for every sized primitive.
    #[must_use]
    pub fn alignment(self, pointer_size: u8) -> Option<u16> {
        self.size(pointer_size).map(|size| size as u16)
    }

    /// The C# keyword for this type, if there is one.
    #[must_use]
    pub fn keyword(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveTypeCode::Boolean => "bool",
            PrimitiveTypeCode::Char => "char",
            PrimitiveTypeCode::Int8 => "sbyte",
            PrimitiveTypeCode::Int16 => "short",
            PrimitiveTypeCode::Int32 => "int",
            PrimitiveTypeCode::Int64 => "long",
            PrimitiveTypeCode::UInt8 => "byte",
            PrimitiveTypeCode::UInt16 => "ushort",
            PrimitiveTypeCode::UInt32 => "uint",
            PrimitiveTypeCode::UInt64 => "ulong",
            PrimitiveTypeCode::Float32 => "float",
            PrimitiveTypeCode::Float64 => "double",
            PrimitiveTypeCode::String => "string",
            PrimitiveTypeCode::Void => "void",
            _ => return None,
        })
    }

    /// Name of the `System` type backing this code, if there is one.
    #[must_use]
    pub fn system_type_name(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveTypeCode::Boolean => "Boolean",
            PrimitiveTypeCode::Char => "Char",
            PrimitiveTypeCode::Int8 => "SByte",
            PrimitiveTypeCode::Int16 => "Int16",
            PrimitiveTypeCode::Int32 => "Int32",
            PrimitiveTypeCode::Int64 => "Int64",
            PrimitiveTypeCode::UInt8 => "Byte",
            PrimitiveTypeCode::UInt16 => "UInt16",
            PrimitiveTypeCode::UInt32 => "UInt32",
            PrimitiveTypeCode::UInt64 => "UInt64",
            PrimitiveTypeCode::Float32 => "Single",
            PrimitiveTypeCode::Float64 => "Double",
            PrimitiveTypeCode::IntPtr => "IntPtr",
            PrimitiveTypeCode::UIntPtr => "UIntPtr",
            PrimitiveTypeCode::String => "String",
            PrimitiveTypeCode::Void => "Void",
            _ => return None,
        })
    }

    /// Returns `true` for the built-in value types (integers, floats, bool, char, native ints).
    #[must_use]
    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            PrimitiveTypeCode::NotPrimitive
                | PrimitiveTypeCode::Pointer
                | PrimitiveTypeCode::Reference
                | PrimitiveTypeCode::String
                | PrimitiveTypeCode::Void
                | PrimitiveTypeCode::Invalid
        )
    }
}
