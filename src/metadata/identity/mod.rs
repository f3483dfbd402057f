//! Unit identities.
//!
//! A unit is either an assembly or a module. Assemblies are identified by an
//! [`AssemblyIdentity`] (name, version, culture and strong name key), modules by their name and
//! the identity of the assembly that contains them, if any. [`UnitIdentity`] unifies both and is
//! what unit references and the host's unit table are keyed by.
//!
//! # Module Structure
//!
//! - [`assembly`] - [`AssemblyIdentity`] and [`AssemblyVersion`], display name parsing
//! - [`strongname`] - [`StrongNameKey`] and public key token computation

pub mod assembly;
pub mod strongname;

use std::fmt;

pub use assembly::{AssemblyIdentity, AssemblyVersion};
pub use strongname::{compute_public_key_token, StrongNameKey};

/// The identity of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentity {
    /// Module name, usually the file name
    pub name: String,
    /// The assembly this module belongs to, if any
    pub containing_assembly: Option<AssemblyIdentity>,
}

impl ModuleIdentity {
    /// Create a new module identity.
    #[must_use]
    pub fn new(name: impl Into<String>, containing_assembly: Option<AssemblyIdentity>) -> Self {
        Self {
            name: name.into(),
            containing_assembly,
        }
    }

    /// Normalized name used for identity comparisons.
    #[must_use]
    pub fn strong_name(&self) -> String {
        match &self.containing_assembly {
            Some(assembly) => format!("{}, Module={}", assembly.strong_name(), self.name),
            None => self.name.clone(),
        }
    }
}

/// Identity of either kind of unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitIdentity {
    /// An assembly
    Assembly(AssemblyIdentity),
    /// A module
    Module(ModuleIdentity),
}

impl UnitIdentity {
    /// The simple name of the unit.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            UnitIdentity::Assembly(assembly) => &assembly.name,
            UnitIdentity::Module(module) => &module.name,
        }
    }

    /// Normalized name used for identity comparisons and interning.
    #[must_use]
    pub fn strong_name(&self) -> String {
        match self {
            UnitIdentity::Assembly(assembly) => assembly.strong_name(),
            UnitIdentity::Module(module) => module.strong_name(),
        }
    }

    /// The assembly identity, if this is an assembly.
    #[must_use]
    pub fn as_assembly(&self) -> Option<&AssemblyIdentity> {
        match self {
            UnitIdentity::Assembly(assembly) => Some(assembly),
            UnitIdentity::Module(_) => None,
        }
    }
}

impl From<AssemblyIdentity> for UnitIdentity {
    fn from(identity: AssemblyIdentity) -> Self {
        UnitIdentity::Assembly(identity)
    }
}

impl From<ModuleIdentity> for UnitIdentity {
    fn from(identity: ModuleIdentity) -> Self {
        UnitIdentity::Module(identity)
    }
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.strong_name())
    }
}
