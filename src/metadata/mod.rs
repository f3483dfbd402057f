//! The metadata object model.
//!
//! Units, namespaces, types and members form a graph owned top-down: a [`units::Unit`] owns its
//! namespaces, a namespace owns its types, a type owns its members. Back pointers and every
//! cache are weak, so dropping a unit releases the whole subgraph.
//!
//! References name entities structurally and resolve lazily against a
//! [`host::MetadataHost`], which owns the loaded units, the name table and the intern factory.
//!
//! # Key Components
//!
//! - [`host`] - [`host::MetadataHost`], the resolution environment, configured by [`config`]
//! - [`identity`] - assembly and module identities, strong name tokens
//! - [`names`] and [`intern`] - interned names and structural identity keys
//! - [`units`] - units, namespaces and type aliases
//! - [`typesystem`] - type definitions, type references and their resolution
//! - [`members`] - fields, methods, properties and events
//! - [`signatures`] - method signatures and their comparison
//! - [`resolution`] - member lookup, override search and visibility rules
//! - [`layout`] - field offsets and type sizes
//! - [`formatting`] - C#-like names and documentation IDs
//!
//! # Examples
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Sample")));
//!
//! let ns = unit.root().add_namespace(host.name_for("Sample"));
//! let widget = ns.add_type(TypeDefinition::new(host.name_for("Widget"), TypeAttributes::PUBLIC));
//! assert_eq!(widget.name.value(), "Widget");
//! # Ok::<(), dotmodel::Error>(())
//! ```

pub mod config;
pub mod formatting;
pub mod host;
pub mod identity;
pub mod intern;
pub mod layout;
pub mod members;
pub mod names;
pub mod platform;
pub mod resolution;
pub mod signatures;
pub mod typesystem;
pub mod units;
