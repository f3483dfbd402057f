//! Strong name keys and public key token derivation.
//!
//! A strong-named assembly is identified by its public key, or more compactly by the 8-byte
//! public key token derived from it. The token is the last 8 bytes of the SHA-1 hash of the
//! public key, in reverse order (ECMA-335 II.6.2.1.3).

use sha1::{Digest, Sha1};

/// The cryptographic part of an assembly identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrongNameKey {
    /// The full public key blob
    PublicKey(Vec<u8>),
    /// The 8-byte public key token
    Token([u8; 8]),
}

impl StrongNameKey {
    /// Returns the public key token, deriving it from the public key when necessary.
    ///
    /// Returns `None` for an empty public key.
    #[must_use]
    pub fn token(&self) -> Option<[u8; 8]> {
        match self {
            StrongNameKey::PublicKey(key) => compute_public_key_token(key),
            StrongNameKey::Token(token) => Some(*token),
        }
    }

    /// Returns the full public key, if known.
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        match self {
            StrongNameKey::PublicKey(key) => Some(key),
            StrongNameKey::Token(_) => None,
        }
    }
}

/// Computes the public key token of `public_key`.
///
/// The token is the last 8 bytes of the SHA-1 digest of the key, reversed. An empty key has no
/// token.
///
/// # Examples
///
/// ```rust
/// use dotmodel::metadata::identity::compute_public_key_token;
///
/// assert!(compute_public_key_token(&[]).is_none());
/// assert!(compute_public_key_token(&[0x00, 0x24, 0x00, 0x00]).is_some());
/// ```
#[must_use]
pub fn compute_public_key_token(public_key: &[u8]) -> Option<[u8; 8]> {
    if public_key.is_empty() {
        return None;
    }

    let mut hasher = Sha1::new();
    hasher.update(public_key);
    let digest = hasher.finalize();

    let mut token = [0u8; 8];
    for (slot, byte) in token.iter_mut().zip(digest.iter().rev()) {
        *slot = *byte;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_reversed_sha1_tail() {
        let key = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let digest = Sha1::digest(key);
        let token = compute_public_key_token(&key).unwrap();

        let tail = &digest[digest.len() - 8..];
        let mut expected: Vec<u8> = tail.to_vec();
        expected.reverse();
        assert_eq!(token.to_vec(), expected);
    }

    #[test]
    fn test_empty_key_has_no_token() {
        assert!(compute_public_key_token(&[]).is_none());
        assert!(StrongNameKey::PublicKey(Vec::new()).token().is_none());
    }

    #[test]
    fn test_token_variant_passes_through() {
        let token = [0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89];
        assert_eq!(StrongNameKey::Token(token).token(), Some(token));
        assert!(StrongNameKey::Token(token).public_key().is_none());
    }
}
