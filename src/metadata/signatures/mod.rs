//! Method signatures and their comparison.
//!
//! A [`MethodSignature`] is the part of a method, property or function pointer that takes
//! part in overload identity: calling convention, return type with its by-ref and modifier
//! flags, and the ordered parameter types. [`SignatureComparer`] decides signature equality
//! by the rules of the CLR loader.
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let platform = host.platform_types();
//!
//! let a = MethodSignature::new(platform.system_void.clone())
//!     .with_parameter(platform.system_int32.clone());
//! let b = MethodSignature::new(platform.system_void.clone())
//!     .with_parameter(platform.system_int32.clone());
//!
//! assert!(signatures_are_equal(&host, &a, &b, false));
//! # Ok::<(), dotmodel::Error>(())
//! ```

mod comparer;

use bitflags::bitflags;

pub use comparer::{
    generic_method_signatures_are_equal, signatures_are_equal, SignatureComparer,
};

use crate::metadata::{
    host::MetadataHost,
    intern::SignatureKey,
    names::Name,
    typesystem::{CustomModifier, TypeRefRc},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Calling convention of a method or function pointer.
    ///
    /// The low three bits are the call kind, the high bits are flags.
    pub struct CallingConvention: u8 {
        /// Managed default convention
        const DEFAULT = 0x00;
        /// C convention
        const C = 0x01;
        /// Standard call
        const STANDARD = 0x02;
        /// `this` call
        const THIS_CALL = 0x03;
        /// Fast call
        const FAST_CALL = 0x04;
        /// Variable arguments (`__arglist`)
        const EXTRA_ARGUMENTS = 0x05;
        /// The method has generic parameters
        const GENERIC = 0x10;
        /// The method has an implicit `this` parameter
        const HAS_THIS = 0x20;
        /// The `this` parameter is explicit in the parameter list
        const EXPLICIT_THIS = 0x40;
    }
}

impl CallingConvention {
    /// The call kind bits
    #[must_use]
    pub fn kind(self) -> u8 {
        self.bits() & 0x07
    }

    /// Returns `true` if the method accepts a variable argument list
    #[must_use]
    pub fn accepts_extra_arguments(self) -> bool {
        self.kind() == Self::EXTRA_ARGUMENTS.bits()
    }

    /// Returns `true` for instance methods
    #[must_use]
    pub fn has_this(self) -> bool {
        self.contains(Self::HAS_THIS)
    }

    /// Returns `true` for generic methods
    #[must_use]
    pub fn is_generic(self) -> bool {
        self.contains(Self::GENERIC)
    }
}

/// The type information of one parameter
#[derive(Debug, Clone)]
pub struct ParameterTypeInfo {
    /// Position in the parameter list
    pub index: u16,
    /// Passed by reference
    pub by_ref: bool,
    /// Custom modifiers on the parameter type
    pub custom_modifiers: Vec<CustomModifier>,
    /// The parameter type
    pub param_type: TypeRefRc,
    /// Name, for definitions
    pub name: Option<Name>,
    /// An `out` parameter
    pub is_out: bool,
    /// A `params` array
    pub is_param_array: bool,
}

impl ParameterTypeInfo {
    /// Create a by-value parameter at `index`
    #[must_use]
    pub fn new(index: u16, param_type: TypeRefRc) -> Self {
        Self {
            index,
            by_ref: false,
            custom_modifiers: Vec::new(),
            param_type,
            name: None,
            is_out: false,
            is_param_array: false,
        }
    }

    /// Marks the parameter as passed by reference
    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    /// Marks the parameter as `out`, which implies by reference
    #[must_use]
    pub fn out(mut self) -> Self {
        self.by_ref = true;
        self.is_out = true;
        self
    }

    /// Marks the parameter as a `params` array
    #[must_use]
    pub fn param_array(mut self) -> Self {
        self.is_param_array = true;
        self
    }

    /// Names the parameter
    #[must_use]
    pub fn named(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    /// Adds a custom modifier
    #[must_use]
    pub fn with_modifier(mut self, modifier: CustomModifier) -> Self {
        self.custom_modifiers.push(modifier);
        self
    }

    /// Returns `true` if the parameter type carries custom modifiers
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.custom_modifiers.is_empty()
    }
}

/// The signature of a method, property or function pointer
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Calling convention
    pub calling_convention: CallingConvention,
    /// The return value is a managed pointer
    pub return_by_ref: bool,
    /// Custom modifiers on the return type
    pub return_custom_modifiers: Vec<CustomModifier>,
    /// Return type (`System.Void` for none)
    pub return_type: TypeRefRc,
    /// Fixed parameters, in order
    pub parameters: Vec<ParameterTypeInfo>,
    /// Arguments after the sentinel of a vararg call site
    pub extra_parameters: Vec<ParameterTypeInfo>,
}

impl MethodSignature {
    /// A parameterless signature with the default calling convention
    #[must_use]
    pub fn new(return_type: TypeRefRc) -> Self {
        Self {
            calling_convention: CallingConvention::DEFAULT,
            return_by_ref: false,
            return_custom_modifiers: Vec::new(),
            return_type,
            parameters: Vec::new(),
            extra_parameters: Vec::new(),
        }
    }

    /// Sets the calling convention
    #[must_use]
    pub fn with_calling_convention(mut self, calling_convention: CallingConvention) -> Self {
        self.calling_convention = calling_convention;
        self
    }

    /// Appends a by-value parameter of type `param_type`
    #[must_use]
    pub fn with_parameter(mut self, param_type: TypeRefRc) -> Self {
        let index = self.parameters.len() as u16;
        self.parameters.push(ParameterTypeInfo::new(index, param_type));
        self
    }

    /// Appends a fully described parameter
    #[must_use]
    pub fn with_parameter_info(mut self, parameter: ParameterTypeInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends an extra (vararg) argument
    #[must_use]
    pub fn with_extra_parameter(mut self, parameter: ParameterTypeInfo) -> Self {
        self.extra_parameters.push(parameter);
        self
    }

    /// Marks the return value as returned by reference
    #[must_use]
    pub fn with_return_by_ref(mut self) -> Self {
        self.return_by_ref = true;
        self
    }

    /// Adds a custom modifier to the return type
    #[must_use]
    pub fn with_return_modifier(mut self, modifier: CustomModifier) -> Self {
        self.return_custom_modifiers.push(modifier);
        self
    }

    /// Number of fixed parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Returns `true` if the return type carries custom modifiers
    #[must_use]
    pub fn return_is_modified(&self) -> bool {
        !self.return_custom_modifiers.is_empty()
    }

    /// The structural key of this signature; modifiers do not take part
    pub fn signature_key(&self, host: &MetadataHost) -> SignatureKey {
        SignatureKey {
            calling_convention: self.calling_convention.bits(),
            return_by_ref: self.return_by_ref,
            return_type: self.return_type.interned_key(host),
            parameters: self
                .parameters
                .iter()
                .map(|p| (p.by_ref, p.param_type.interned_key(host)))
                .collect(),
        }
    }
}
