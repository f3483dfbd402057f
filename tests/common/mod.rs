//! Shared fixture for the integration tests: a host with a stub core library.

#![allow(dead_code)]

use dotmodel::prelude::*;

/// A host with `System.Object` and the primitive types defined
pub struct Model {
    pub host: MetadataHost,
    pub core: UnitRc,
}

impl Model {
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    pub fn with_config(config: HostConfig) -> Self {
        let host = MetadataHost::new(config).expect("valid host configuration");
        let core =
            host.register_unit(Unit::new_assembly(&host, host.config().core_assembly.clone()));
        define_core_types(&host, &core);
        Model { host, core }
    }

    pub fn name(&self, value: &str) -> Name {
        self.host.name_for(value)
    }

    pub fn platform(&self) -> &PlatformTypes {
        self.host.platform_types()
    }

    /// Registers an empty assembly
    pub fn assembly(&self, name: &str) -> UnitRc {
        self.host
            .register_unit(Unit::new_assembly(&self.host, AssemblyIdentity::simple(name)))
    }

    /// The namespace at the dotted path of `unit`, created on demand
    pub fn namespace(&self, unit: &UnitRc, dotted: &str) -> NamespaceRc {
        dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(unit.root().clone(), |namespace, segment| {
                namespace.add_namespace(self.name(segment))
            })
    }

    /// A reference to a namespace type of `unit`
    pub fn type_ref(
        &self,
        unit: &UnitRc,
        dotted_namespace: &str,
        name: &str,
        generic_parameter_count: u16,
    ) -> TypeRefRc {
        let namespace = dotted_namespace
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(UnitNamespaceReference::root(unit.identity().clone()), |namespace, segment| {
                UnitNamespaceReference::nested(namespace, self.name(segment))
            });
        TypeReference::namespace_type(namespace, self.name(name), generic_parameter_count)
    }
}

fn define_core_types(host: &MetadataHost, core: &UnitRc) {
    let platform = host.platform_types();
    let system = core.root().add_namespace(host.name_for("System"));
    let value_type = TypeAttributes::PUBLIC | TypeAttributes::SEALED | TypeAttributes::VALUE_TYPE;

    system.add_type(TypeDefinition::new(host.name_for("Object"), TypeAttributes::PUBLIC));
    for name in ["ValueType", "Enum", "Attribute", "Delegate", "MulticastDelegate"] {
        let definition = system.add_type(TypeDefinition::new(
            host.name_for(name),
            TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT,
        ));
        definition.add_base_class(platform.system_object.clone());
    }
    system
        .add_type(
            TypeDefinition::new(
                host.name_for("String"),
                TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            )
            .with_type_code(PrimitiveTypeCode::String),
        )
        .add_base_class(platform.system_object.clone());
    system.add_type(
        TypeDefinition::new(host.name_for("Void"), value_type)
            .with_type_code(PrimitiveTypeCode::Void),
    );

    for code in [
        PrimitiveTypeCode::Boolean,
        PrimitiveTypeCode::Char,
        PrimitiveTypeCode::Int8,
        PrimitiveTypeCode::Int16,
        PrimitiveTypeCode::Int32,
        PrimitiveTypeCode::Int64,
        PrimitiveTypeCode::UInt8,
        PrimitiveTypeCode::UInt16,
        PrimitiveTypeCode::UInt32,
        PrimitiveTypeCode::UInt64,
        PrimitiveTypeCode::Float32,
        PrimitiveTypeCode::Float64,
        PrimitiveTypeCode::IntPtr,
        PrimitiveTypeCode::UIntPtr,
    ] {
        let name = code.system_type_name().expect("primitive has a System name");
        system
            .add_type(TypeDefinition::new(host.name_for(name), value_type).with_type_code(code))
            .add_base_class(platform.system_value_type.clone());
    }

    let nullable = system.add_type(TypeDefinition::new(host.name_for("Nullable"), value_type));
    nullable.add_generic_parameter(host.name_for("T"));
}
