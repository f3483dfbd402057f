//! Resolution host configuration.
//!
//! [`HostConfig`] carries the few environmental facts the object model cannot derive from the
//! metadata graph itself: the target pointer size (used by layout), the depth bound for
//! recursive resolution walks, and the identity of the core assembly that platform type
//! references point at.

use crate::{
    metadata::identity::{AssemblyIdentity, AssemblyVersion, StrongNameKey},
    Error, Result,
};

/// Configuration for a [`crate::metadata::host::MetadataHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Size of a pointer on the target platform, in bytes (4 or 8)
    pub pointer_size: u8,

    /// Maximum nesting of resolution calls before giving up.
    /// Bounds alias cycles and self-referential generic instantiations in malformed metadata.
    pub max_resolution_depth: usize,

    /// Identity of the assembly that defines `System.Object` and friends
    pub core_assembly: AssemblyIdentity,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            pointer_size: 8,
            max_resolution_depth: 64,
            core_assembly: Self::default_core_assembly(),
        }
    }
}

impl HostConfig {
    /// Configuration for 64-bit targets. Same as [`HostConfig::default`].
    #[must_use]
    pub fn for_64bit() -> Self {
        Self::default()
    }

    /// Configuration for 32-bit targets
    #[must_use]
    pub fn for_32bit() -> Self {
        Self {
            pointer_size: 4,
            ..Self::default()
        }
    }

    /// Configuration with a shallow resolution depth, for untrusted metadata
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_resolution_depth: 16,
            ..Self::default()
        }
    }

    /// Sets the pointer size in bytes.
    #[must_use]
    pub fn with_pointer_size(mut self, pointer_size: u8) -> Self {
        self.pointer_size = pointer_size;
        self
    }

    /// Sets the maximum resolution depth.
    #[must_use]
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// Sets the core assembly identity.
    #[must_use]
    pub fn with_core_assembly(mut self, core_assembly: AssemblyIdentity) -> Self {
        self.core_assembly = core_assembly;
        self
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfiguration`] if the pointer size is not 4 or 8, the resolution
    /// depth is zero, or the core assembly has no name.
    pub fn validate(&self) -> Result<()> {
        if self.pointer_size != 4 && self.pointer_size != 8 {
            return Err(Error::InvalidConfiguration(format!(
                "pointer size must be 4 or 8 bytes, got {}",
                self.pointer_size
            )));
        }
        if self.max_resolution_depth == 0 {
            return Err(Error::InvalidConfiguration(
                "maximum resolution depth must be at least 1".to_string(),
            ));
        }
        if self.core_assembly.name.is_empty() {
            return Err(Error::InvalidConfiguration(
                "core assembly name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn default_core_assembly() -> AssemblyIdentity {
        AssemblyIdentity::new(
            "mscorlib",
            AssemblyVersion::new(4, 0, 0, 0),
            None,
            Some(StrongNameKey::Token([
                0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89,
            ])),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_config_presets() {
        let default = HostConfig::default();
        assert_eq!(default.pointer_size, 8);
        assert_eq!(default.max_resolution_depth, 64);
        assert_eq!(default.core_assembly.name, "mscorlib");
        assert_eq!(default, HostConfig::for_64bit());

        let x86 = HostConfig::for_32bit();
        assert_eq!(x86.pointer_size, 4);
        assert_eq!(x86.max_resolution_depth, 64);

        let strict = HostConfig::strict();
        assert_eq!(strict.max_resolution_depth, 16);
        assert_eq!(strict.pointer_size, 8);
    }

    #[test]
    fn test_host_config_validation() {
        assert!(HostConfig::default().validate().is_ok());
        assert!(HostConfig::for_32bit().validate().is_ok());

        assert!(matches!(
            HostConfig::default().with_pointer_size(2).validate(),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(HostConfig::default()
            .with_max_resolution_depth(0)
            .validate()
            .is_err());
        assert!(HostConfig::default()
            .with_core_assembly(AssemblyIdentity::simple(""))
            .validate()
            .is_err());
    }

    #[test]
    fn test_host_config_builders() {
        let config = HostConfig::default()
            .with_pointer_size(4)
            .with_max_resolution_depth(8)
            .with_core_assembly(AssemblyIdentity::simple("System.Runtime"));

        assert_eq!(config.pointer_size, 4);
        assert_eq!(config.max_resolution_depth, 8);
        assert_eq!(config.core_assembly.name, "System.Runtime");
    }
}
