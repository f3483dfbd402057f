//! Assembly identity: name, version, culture and strong name.
//!
//! # Display Name Format
//!
//! ```text
//! Name[, Version=a.b.c.d][, Culture=neutral|culture][, PublicKeyToken=hex|null][, PublicKey=hex]
//!     [, Retargetable=Yes][, ContentType=WindowsRuntime]
//! ```
//!
//! [`AssemblyIdentity::strong_name`] always renders version, culture and token, and is the
//! string the host interns units by.

use std::{fmt, str::FromStr};

use crate::{
    metadata::identity::strongname::StrongNameKey,
    Error, Result,
};

/// Four-part assembly version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssemblyVersion {
    /// Major version number
    pub major: u16,
    /// Minor version number
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a new assembly version with the specified components.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotmodel::metadata::identity::AssemblyVersion;
    ///
    /// let version = AssemblyVersion::new(4, 0, 0, 0);
    /// assert_eq!(version.to_string(), "4.0.0.0");
    /// ```
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse assembly version from string representation.
    ///
    /// Supports one to four dot-separated components; missing components default to 0.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if there are more than four components or a component is
    /// not a 16-bit unsigned integer.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.trim().split('.').collect();

        if parts.is_empty() || parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The identity of an assembly.
///
/// Two identities are equal when all of their components are equal. The host keys units by
/// [`AssemblyIdentity::strong_name`], which normalizes a full public key to its token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple assembly name, e.g. `mscorlib`
    pub name: String,
    /// Four-part version
    pub version: AssemblyVersion,
    /// Culture for satellite assemblies; `None` is culture neutral
    pub culture: Option<String>,
    /// Public key or public key token, for strong-named assemblies
    pub strong_name_key: Option<StrongNameKey>,
    /// The assembly reference may be retargeted to another publisher
    pub retargetable: bool,
    /// The assembly is a Windows Runtime assembly
    pub content_type_windows_runtime: bool,
}

impl AssemblyIdentity {
    /// Create a new assembly identity.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        strong_name_key: Option<StrongNameKey>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            strong_name_key,
            retargetable: false,
            content_type_windows_runtime: false,
        }
    }

    /// A culture neutral, unsigned identity with version 0.0.0.0.
    #[must_use]
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, AssemblyVersion::default(), None, None)
    }

    /// Marks the identity as retargetable.
    #[must_use]
    pub fn with_retargetable(mut self, retargetable: bool) -> Self {
        self.retargetable = retargetable;
        self
    }

    /// Marks the identity as a Windows Runtime assembly.
    #[must_use]
    pub fn with_windows_runtime_content(mut self, windows_runtime: bool) -> Self {
        self.content_type_windows_runtime = windows_runtime;
        self
    }

    /// Parse an assembly display name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotmodel::metadata::identity::AssemblyIdentity;
    ///
    /// let mscorlib = AssemblyIdentity::parse(
    ///     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
    /// )?;
    /// assert_eq!(mscorlib.name, "mscorlib");
    /// assert_eq!(mscorlib.public_key_token().unwrap()[0], 0xb7);
    /// # Ok::<(), dotmodel::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if the name is empty, the version is invalid, or a key or
    /// token is not valid hex. A token must be exactly 8 bytes.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = Self::simple(name);
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!(
                    "Display name component '{}' is not a key=value pair",
                    part
                ));
            };
            let value = value.trim();

            match key.trim() {
                "Version" => identity.version = AssemblyVersion::parse(value)?,
                "Culture" => {
                    if !value.eq_ignore_ascii_case("neutral") && !value.is_empty() {
                        identity.culture = Some(value.to_string());
                    }
                }
                "PublicKeyToken" => {
                    if value != "null" && !value.is_empty() {
                        let bytes = hex::decode(value).map_err(|e| {
                            malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                        })?;
                        let token: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                            malformed_error!(
                                "PublicKeyToken must be exactly 8 bytes, got {} bytes from '{}'",
                                bytes.len(),
                                value
                            )
                        })?;
                        identity.strong_name_key = Some(StrongNameKey::Token(token));
                    }
                }
                "PublicKey" => {
                    if value != "null" && !value.is_empty() {
                        let key = hex::decode(value).map_err(|e| {
                            malformed_error!("Invalid hex in PublicKey '{}': {}", value, e)
                        })?;
                        identity.strong_name_key = Some(StrongNameKey::PublicKey(key));
                    }
                }
                "Retargetable" => identity.retargetable = value.eq_ignore_ascii_case("yes"),
                "ContentType" => {
                    identity.content_type_windows_runtime = value == "WindowsRuntime";
                }
                // ProcessorArchitecture and unknown keys do not take part in identity
                _ => {}
            }
        }

        Ok(identity)
    }

    /// The public key token, derived from the public key when only the key is known.
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        self.strong_name_key.as_ref().and_then(StrongNameKey::token)
    }

    /// Returns `true` if the identity carries a public key or token.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_token().is_some()
    }

    /// The normalized display name used for identity comparisons.
    ///
    /// Format: `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=hex|null`, followed by
    /// `, Retargetable=Yes` and `, ContentType=WindowsRuntime` when set.
    #[must_use]
    pub fn strong_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);
        result.push_str(&self.name);
        result.push_str(", Version=");
        result.push_str(&self.version.to_string());
        result.push_str(", Culture=");
        result.push_str(self.culture.as_deref().unwrap_or("neutral"));
        result.push_str(", PublicKeyToken=");
        match self.public_key_token() {
            Some(token) => result.push_str(&hex::encode(token)),
            None => result.push_str("null"),
        }
        if self.retargetable {
            result.push_str(", Retargetable=Yes");
        }
        if self.content_type_windows_runtime {
            result.push_str(", ContentType=WindowsRuntime");
        }
        result
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.strong_name())
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::identity::compute_public_key_token;

    #[test]
    fn test_version_parse_partial() {
        assert_eq!(
            AssemblyVersion::parse("2.1").unwrap(),
            AssemblyVersion::new(2, 1, 0, 0)
        );
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("1.x").is_err());
        assert!(AssemblyVersion::parse("70000").is_err());
    }

    #[test]
    fn test_parse_full_display_name() {
        let identity = AssemblyIdentity::parse(
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap();

        assert_eq!(identity.name, "mscorlib");
        assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
        assert!(identity.culture.is_none());
        assert_eq!(
            identity.public_key_token(),
            Some([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89])
        );
        assert_eq!(
            identity.strong_name(),
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );
    }

    #[test]
    fn test_strong_name_flags() {
        let identity = AssemblyIdentity::parse(
            "Windows, Version=255.255.255.255, Culture=en-US, Retargetable=Yes, ContentType=WindowsRuntime",
        )
        .unwrap();

        assert_eq!(
            identity.strong_name(),
            "Windows, Version=255.255.255.255, Culture=en-US, PublicKeyToken=null, Retargetable=Yes, ContentType=WindowsRuntime"
        );
    }

    #[test]
    fn test_public_key_normalizes_to_token() {
        let key = vec![0x00, 0x24, 0x00, 0x00, 0x04, 0x80];
        let from_key = AssemblyIdentity::new(
            "Signed",
            AssemblyVersion::new(1, 0, 0, 0),
            None,
            Some(StrongNameKey::PublicKey(key.clone())),
        );
        let from_token = AssemblyIdentity::new(
            "Signed",
            AssemblyVersion::new(1, 0, 0, 0),
            None,
            Some(StrongNameKey::Token(
                compute_public_key_token(&key).unwrap(),
            )),
        );

        assert_ne!(from_key, from_token);
        assert_eq!(from_key.strong_name(), from_token.strong_name());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            AssemblyIdentity::parse(""),
            Err(Error::Malformed { .. })
        ));
        assert!(AssemblyIdentity::parse("A, PublicKeyToken=xyz").is_err());
        assert!(AssemblyIdentity::parse("A, PublicKeyToken=b77a").is_err());
        assert!(AssemblyIdentity::parse("A, Version").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let text = "System.Core, Version=3.5.0.0, Culture=neutral, PublicKeyToken=null";
        let identity: AssemblyIdentity = text.parse().unwrap();
        assert_eq!(identity.to_string(), text);
    }
}
