//! Integration tests for reference resolution across units.

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use common::Model;
use dotmodel::{
    metadata::{members::Specializable, resolution::MemberResolver},
    prelude::*,
    Error,
};
use rayon::prelude::*;

#[test]
fn test_forwarded_type_resolves_to_new_home() {
    let model = Model::new();
    let old = model.assembly("Widgets.Legacy");
    let new = model.assembly("Widgets");

    let widget = model
        .namespace(&new, "Widgets")
        .add_type(TypeDefinition::new(model.name("Widget"), TypeAttributes::PUBLIC));
    let part = widget.add_nested_type(
        TypeDefinition::new(model.name("Part"), TypeAttributes::empty()),
    );

    let forwarded = model.namespace(&old, "Widgets").add_alias(
        model.name("Widget"),
        0,
        model.type_ref(&new, "Widgets", "Widget", 0),
    );

    let through_old = model.type_ref(&old, "Widgets", "Widget", 0);
    let resolved = through_old.resolved_type(&model.host).expect("forwarded type resolves");
    assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &widget));
    assert!(Arc::ptr_eq(&through_old.alias_for_type(&model.host).unwrap(), &forwarded));

    let nested = TypeReference::nested_type(through_old, model.name("Part"), 0);
    let resolved =
        nested.resolved_type(&model.host).expect("nested type of forwarded type resolves");
    assert!(Arc::ptr_eq(&resolved.definition().unwrap(), &part));
}

#[test]
fn test_unknown_units_resolve_to_none() {
    let model = Model::new();
    let ghost = Unit::new_assembly(&model.host, AssemblyIdentity::simple("Ghost"));
    let reference = model.type_ref(&ghost, "N", "Missing", 0);

    assert!(reference.resolved_type(&model.host).is_none());
    assert!(reference.resolved_type(&model.host).is_none());
    assert!(reference.alias_for_type(&model.host).is_none());
}

#[test]
fn test_unit_loader_runs_once_per_unit() -> dotmodel::Result<()> {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let host = MetadataHost::new(HostConfig::default())?.with_loader(
        move |host: &MetadataHost, identity: &UnitIdentity| -> dotmodel::Result<UnitRc> {
            if identity.name() != "Plugins" {
                return Err(Error::UnitNotFound(identity.strong_name()));
            }
            counter.fetch_add(1, Ordering::SeqCst);
            let unit = Unit::new(host, identity.clone());
            unit.root()
                .add_namespace(host.name_for("Plugins"))
                .add_type(TypeDefinition::new(host.name_for("Plugin"), TypeAttributes::PUBLIC));
            Ok(unit)
        },
    );

    let plugins = UnitIdentity::Assembly(AssemblyIdentity::simple("Plugins"));
    let namespace = UnitNamespaceReference::nested(
        UnitNamespaceReference::root(plugins.clone()),
        host.name_for("Plugins"),
    );
    let first = TypeReference::namespace_type(namespace.clone(), host.name_for("Plugin"), 0);
    let second = TypeReference::namespace_type(namespace, host.name_for("Plugin"), 0);

    assert!(first.resolved_type(&host).is_some());
    assert!(second.resolved_type(&host).is_some());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(host.find_unit(&plugins).is_some());

    let missing = UnitIdentity::Assembly(AssemblyIdentity::simple("Missing"));
    assert!(host.load_unit(&missing).is_none());
    Ok(())
}

#[test]
fn test_field_of_generic_instance_is_specialized() {
    let model = Model::new();
    let unit = model.assembly("Collections");
    let boxed = model
        .namespace(&unit, "Collections")
        .add_type(TypeDefinition::new(model.name("Box"), TypeAttributes::PUBLIC));
    boxed.add_generic_parameter(model.name("T"));

    let generic = model.type_ref(&unit, "Collections", "Box", 1);
    let t = TypeReference::generic_type_parameter(generic.clone(), 0, model.name("T"));
    let value = boxed.add_field(FieldDefinition::new(model.name("value"), t.clone()));

    let plain = FieldReference::new(generic.clone(), model.name("value"), t);
    let instance =
        TypeReference::generic_instance(generic, vec![model.platform().system_int32.clone()]);
    let specialized = FieldReference::specialized(plain.clone(), instance);

    let resolved = specialized.resolved_field(&model.host).expect("specialized field resolves");
    assert!(resolved.is_specialized());
    assert!(Arc::ptr_eq(&resolved.unspecialize().unwrap(), &value));
    assert!(matches!(
        plain.resolved_field(&model.host),
        Some(Specializable::Definition(_))
    ));
}

#[test]
fn test_methods_resolve_through_base_classes() {
    let model = Model::new();
    let unit = model.assembly("App");
    let namespace = model.namespace(&unit, "App");
    let p = model.platform();

    let base = namespace.add_type(TypeDefinition::new(model.name("Base"), TypeAttributes::PUBLIC));
    base.add_base_class(p.system_object.clone());
    let run = base.add_method(
        MethodDefinition::new(
            model.name("Run"),
            MethodSignature::new(p.system_void.clone()).with_parameter(p.system_string.clone()),
        )
        .with_flags(MethodModifiers::VIRTUAL | MethodModifiers::HIDE_BY_SIG),
    );
    let derived = namespace.add_type(
        TypeDefinition::new(model.name("Derived"), TypeAttributes::PUBLIC),
    );
    derived.add_base_class(model.type_ref(&unit, "App", "Base", 0));

    let reference = MethodReference::new(
        model.type_ref(&unit, "App", "Derived", 0),
        model.name("Run"),
        0,
        MethodSignature::new(p.system_void.clone()).with_parameter(p.system_string.clone()),
    );
    let resolved = reference.resolved_definition(&model.host).expect("inherited method resolves");
    assert!(Arc::ptr_eq(&resolved, &run));

    let wrong_signature = MethodReference::new(
        model.type_ref(&unit, "App", "Derived", 0),
        model.name("Run"),
        0,
        MethodSignature::new(p.system_void.clone()).with_parameter(p.system_int32.clone()),
    );
    assert!(wrong_signature.resolved_definition(&model.host).is_none());

    let scoped = MemberResolver::new(&model.host).with_unit(unit.clone());
    assert!(scoped.resolve_method(&reference).is_some());
}

#[test]
fn test_concurrent_resolution_agrees() {
    let model = Model::new();
    let unit = model.assembly("Shared");
    let namespace = model.namespace(&unit, "Shared");
    let definitions: Vec<TypeDefRc> = (0..64)
        .map(|i| {
            let name = model.name(&format!("T{i}"));
            namespace.add_type(TypeDefinition::new(name, TypeAttributes::PUBLIC))
        })
        .collect();
    let references: Vec<TypeRefRc> = (0..64)
        .map(|i| model.type_ref(&unit, "Shared", &format!("T{i}"), 0))
        .collect();

    let found: Vec<Option<TypeDefRc>> = (0..references.len() * 8)
        .into_par_iter()
        .map(|i| {
            references[i % references.len()]
                .resolved_type(&model.host)
                .and_then(|resolved| resolved.definition())
        })
        .collect();

    for (i, definition) in found.into_iter().enumerate() {
        let definition = definition.expect("every reference resolves");
        assert!(Arc::ptr_eq(&definition, &definitions[i % definitions.len()]));
    }

    let keys: Vec<InternKey> = references
        .par_iter()
        .map(|reference| reference.interned_key(&model.host))
        .collect();
    for (reference, key) in references.iter().zip(keys) {
        assert_eq!(reference.interned_key(&model.host), key);
    }
}
