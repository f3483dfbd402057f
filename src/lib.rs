// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # dotmodel
//!
//! An in-memory object model for .NET metadata: assemblies, modules, namespaces, types and
//! their members, together with the algorithms that make such a graph useful for analysis
//! tooling.
//!
//! ## Features
//!
//! - **🔗 Reference resolution** - Namespace, nested, generic-instance and specialized references
//!   resolve lazily to canonical definitions, including type-forwarding aliases
//! - **🔑 Interned identity** - Every structural identity maps to an [`metadata::intern::InternKey`]
//!   for O(1) equality across independently constructed references
//! - **⚖️ Signature comparison** - CLR loader rules for plain and generic method signatures, with
//!   resolving and non-resolving modes
//! - **🧭 Member resolution** - Declared members, private helper members, base classes and base
//!   interfaces, plus implicit override and interface implementation discovery
//! - **📐 Field layout** - Sequential and explicit layouts with bitfield packing
//! - **📝 Signature formatting** - C#-like signatures and documentation IDs
//!
//! ## Quick Start
//!
//! ```rust
//! use dotmodel::prelude::*;
//!
//! let host = MetadataHost::new(HostConfig::default())?;
//! let unit = host.register_unit(Unit::new_assembly(&host, AssemblyIdentity::simple("Sample")));
//!
//! // namespace N { class T {} }
//! let ns = unit.root().add_namespace(host.name_for("N"));
//! ns.add_type(TypeDefinition::new(host.name_for("T"), TypeAttributes::PUBLIC));
//!
//! // A reference to N.T, built independently of the definition
//! let ns_ref = UnitNamespaceReference::nested(
//!     UnitNamespaceReference::root(unit.identity().clone()),
//!     host.name_for("N"),
//! );
//! let reference = TypeReference::namespace_type(ns_ref, host.name_for("T"), 0);
//!
//! let resolved = reference.resolved_type(&host).expect("N.T resolves");
//! assert_eq!(resolved.definition().unwrap().name.value(), "T");
//! # Ok::<(), dotmodel::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata::names`] and [`metadata::intern`] - name table and structural interning
//! - [`metadata::host`] - the resolution host: units, loader seam, per-host lock
//! - [`metadata::typesystem`] - type references, definitions and type equivalence
//! - [`metadata::members`] - fields, methods, properties and events
//! - [`metadata::signatures`] - method signatures and the signature comparator
//! - [`metadata::resolution`] - member resolution, override and visibility analysis
//! - [`metadata::layout`] - field offsets, bit offsets, sizes and alignment
//! - [`metadata::formatting`] - type name and signature rendering
//!
//! ## Error Handling
//!
//! Failing to resolve is not an error: resolution APIs return `Option` and `None` is the
//! unresolved sentinel. [`Error`] covers the outer boundaries only (identity parsing,
//! configuration and unit loading). Precondition violations such as asking for the layout of
//! a field that does not belong to the walked type panic.
//!
//! ## Thread Safety
//!
//! Definitions and references are `Send + Sync`. Lazily computed caches (interned keys,
//! resolved definitions, alias indirections) are double-checked: read without locking when
//! warm, computed under the host's reentrant lock when cold.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Metadata object model, resolution, layout and formatting.
pub mod metadata;

#[cfg(test)]
mod test;

pub use error::Error;

/// `dotmodel` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
