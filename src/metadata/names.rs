//! Interned identifier strings.
//!
//! Every identifier that appears in the object model (namespace names, type names, member
//! names, parameter names) is represented as a [`Name`] obtained from the host's [`NameTable`].
//! Two names with the same text obtained from the same table carry the same
//! [`Name::unique_key`], so name comparisons during member lookup are integer comparisons.
//! A second key, [`Name::unique_key_ignoring_case`], is shared by all spellings that differ only
//! in ASCII case and backs case-insensitive lookups.
//!
//! # Thread Safety
//!
//! [`NameTable`] is backed by [`DashMap`] and can be shared across threads. Interning the same
//! string concurrently from several threads always yields the same key.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use dashmap::DashMap;

/// An interned identifier.
///
/// Cheap to clone (one `Arc` bump). Equality and hashing use the unique key only, so two
/// `Name`s compare equal iff they were interned from the same text by the same table.
#[derive(Clone)]
pub struct Name {
    value: Arc<str>,
    unique_key: u32,
    unique_key_ignoring_case: u32,
}

impl Name {
    /// The text of this name.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// An integer that is unique to this text within the owning [`NameTable`].
    #[must_use]
    pub fn unique_key(&self) -> u32 {
        self.unique_key
    }

    /// An integer shared by all names whose text differs only in ASCII case.
    #[must_use]
    pub fn unique_key_ignoring_case(&self) -> u32 {
        self.unique_key_ignoring_case
    }

    /// Compares two names, optionally ignoring case.
    #[must_use]
    pub fn matches(&self, other: &Name, ignore_case: bool) -> bool {
        if ignore_case {
            self.unique_key_ignoring_case == other.unique_key_ignoring_case
        } else {
            self.unique_key == other.unique_key
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.unique_key == other.unique_key
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_key.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", &*self.value, self.unique_key)
    }
}

/// Maps strings to [`Name`] instances.
///
/// Keys start at 1; 0 is never handed out so that it can never collide with a real name in
/// structural intern keys.
pub struct NameTable {
    names: DashMap<Arc<str>, Name>,
    case_insensitive: DashMap<String, u32>,
    next_key: AtomicU32,
    empty: Name,
}

impl NameTable {
    /// Creates an empty name table.
    #[must_use]
    pub fn new() -> Self {
        let names = DashMap::new();
        let case_insensitive = DashMap::new();
        let empty = Name {
            value: Arc::from(""),
            unique_key: 1,
            unique_key_ignoring_case: 1,
        };
        names.insert(empty.value.clone(), empty.clone());
        case_insensitive.insert(String::new(), 1);

        NameTable {
            names,
            case_insensitive,
            next_key: AtomicU32::new(2),
            empty,
        }
    }

    /// The name with empty text. Used for root namespaces and anonymous entities.
    #[must_use]
    pub fn empty_name(&self) -> Name {
        self.empty.clone()
    }

    /// Returns the interned [`Name`] for `value`, creating it on first use.
    pub fn get_name_for(&self, value: &str) -> Name {
        if let Some(existing) = self.names.get(value) {
            return existing.clone();
        }

        let lowered = value.to_ascii_lowercase();
        self.names
            .entry(Arc::from(value))
            .or_insert_with(|| {
                let unique_key = self.next_key.fetch_add(1, Ordering::Relaxed);
                let unique_key_ignoring_case = *self
                    .case_insensitive
                    .entry(lowered)
                    .or_insert(unique_key)
                    .value();
                Name {
                    value: Arc::from(value),
                    unique_key,
                    unique_key_ignoring_case,
                }
            })
            .clone()
    }

    /// Number of distinct names interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if only the empty name has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
