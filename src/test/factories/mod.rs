//! Factories for in-memory object models.

mod corlib;

use crate::metadata::{
    config::HostConfig,
    host::MetadataHost,
    identity::AssemblyIdentity,
    names::Name,
    platform::PlatformTypes,
    typesystem::{TypeAttributes, TypeDefRc, TypeDefinition, TypeRefRc, TypeReference},
    units::{NamespaceRc, NamespaceRefRc, Unit, UnitNamespaceReference, UnitRc},
};

pub use corlib::build_core_library;

/// A host with a core library and one empty assembly, `TestAssembly`
pub struct TestModel {
    pub host: MetadataHost,
    pub unit: UnitRc,
}

impl TestModel {
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    pub fn with_config(config: HostConfig) -> Self {
        let host = MetadataHost::new(config).expect("test host configuration is valid");
        build_core_library(&host);
        let unit = host.register_unit(Unit::new_assembly(
            &host,
            AssemblyIdentity::simple("TestAssembly"),
        ));
        TestModel { host, unit }
    }

    pub fn name(&self, value: &str) -> Name {
        self.host.name_for(value)
    }

    pub fn platform(&self) -> &PlatformTypes {
        self.host.platform_types()
    }

    /// The namespace at the dotted path, created on demand. `""` is the root namespace.
    pub fn namespace(&self, dotted: &str) -> NamespaceRc {
        segments(dotted).fold(self.unit.root().clone(), |namespace, segment| {
            namespace.add_namespace(self.name(segment))
        })
    }

    /// A reference to the namespace at the dotted path of the test assembly
    pub fn namespace_ref(&self, dotted: &str) -> NamespaceRefRc {
        segments(dotted).fold(
            UnitNamespaceReference::root(self.unit.identity().clone()),
            |namespace, segment| UnitNamespaceReference::nested(namespace, self.name(segment)),
        )
    }

    /// Adds a public class to the namespace at the dotted path
    pub fn class(&self, namespace: &str, name: &str) -> TypeDefRc {
        self.namespace(namespace)
            .add_type(TypeDefinition::new(self.name(name), TypeAttributes::PUBLIC))
    }

    /// Adds a public interface to the namespace at the dotted path
    pub fn interface(&self, namespace: &str, name: &str) -> TypeDefRc {
        self.namespace(namespace).add_type(TypeDefinition::new(
            self.name(name),
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
        ))
    }

    /// A reference to a namespace type of the test assembly
    pub fn type_ref(&self, namespace: &str, name: &str, generic_parameter_count: u16) -> TypeRefRc {
        TypeReference::namespace_type(
            self.namespace_ref(namespace),
            self.name(name),
            generic_parameter_count,
        )
    }
}

fn segments(dotted: &str) -> impl Iterator<Item = &str> {
    dotted.split('.').filter(|segment| !segment.is_empty())
}
