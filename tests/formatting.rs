//! Integration tests for type names, member signatures and documentation IDs.

mod common;

use common::Model;
use dotmodel::{
    metadata::formatting::{
        member_signature, method_signature, type_name, FormattedMember, NameFormattingOptions,
    },
    prelude::*,
};

type Options = NameFormattingOptions;

/// `namespace Docs { public class Cache<K> { public class Entry { } ... } }`
fn cache_model() -> (Model, UnitRc, TypeDefRc) {
    let model = Model::new();
    let unit = model.assembly("Docs");
    let cache = model
        .namespace(&unit, "Docs")
        .add_type(TypeDefinition::new(model.name("Cache"), TypeAttributes::PUBLIC));
    cache.add_generic_parameter(model.name("K"));
    cache.add_nested_type(
        TypeDefinition::new(model.name("Entry"), TypeAttributes::empty())
            .with_visibility(MemberVisibility::Public),
    );
    (model, unit, cache)
}

#[test]
fn test_nested_type_of_generic_instance() {
    let (model, unit, _) = cache_model();
    let generic = model.type_ref(&unit, "Docs", "Cache", 1);
    let instance = TypeReference::generic_instance(
        generic.clone(),
        vec![model.platform().system_string.clone()],
    );
    let entry = TypeReference::nested_type(generic, model.name("Entry"), 0);
    let specialized = TypeReference::specialized_nested(entry.clone(), instance.clone());

    assert_eq!(type_name(&model.host, &instance, Options::USE_TYPE_KEYWORDS), "Docs.Cache<string>");
    assert_eq!(type_name(&model.host, &entry, Options::TYPE_PARAMETERS), "Docs.Cache<K>.Entry");
    assert_eq!(type_name(&model.host, &entry, Options::DOCUMENTATION_ID), "T:Docs.Cache`1.Entry");
    assert_eq!(
        type_name(
            &model.host,
            &specialized,
            Options::USE_TYPE_KEYWORDS | Options::USE_REFLECTION_STYLE_FOR_NESTED_TYPE_NAMES,
        ),
        "Docs.Cache<string>+Entry"
    );
}

#[test]
fn test_method_documentation_ids() {
    let (model, unit, cache) = cache_model();
    let p = model.platform();
    let generic = model.type_ref(&unit, "Docs", "Cache", 1);
    let k = TypeReference::generic_type_parameter(generic.clone(), 0, model.name("K"));

    let lookup = cache.add_method(MethodDefinition::new(
        model.name("TryGet"),
        MethodSignature::new(p.system_boolean.clone())
            .with_parameter_info(ParameterTypeInfo::new(0, k.clone()).named(model.name("key")))
            .with_parameter_info(
                ParameterTypeInfo::new(1, p.system_object.clone()).out().named(model.name("value")),
            ),
    ));
    let constructor = cache.add_method(
        MethodDefinition::new(model.name(".ctor"), MethodSignature::new(p.system_void.clone()))
            .with_flags(MethodModifiers::SPECIAL_NAME | MethodModifiers::RT_SPECIAL_NAME),
    );
    let reference = MethodReference::definition(&lookup);

    assert_eq!(
        method_signature(&model.host, &reference, Options::DOCUMENTATION_ID),
        "M:Docs.Cache`1.TryGet(`0,System.Object@)"
    );
    assert_eq!(
        method_signature(
            &model.host,
            &reference,
            Options::RETURN_TYPE
                | Options::SIGNATURE
                | Options::PARAMETER_NAME
                | Options::PARAMETER_MODIFIERS
                | Options::USE_TYPE_KEYWORDS
                | Options::OMIT_CONTAINING_TYPE
        ),
        "bool TryGet(K key, out object value)"
    );
    assert_eq!(
        method_signature(
            &model.host,
            &MethodReference::definition(&constructor),
            Options::DOCUMENTATION_ID,
        ),
        "M:Docs.Cache`1.#ctor"
    );
}

#[test]
fn test_member_signature_dispatch() {
    let (model, unit, cache) = cache_model();
    let p = model.platform();
    cache.add_field(FieldDefinition::new(model.name("count"), p.system_int32.clone()));
    let changed = cache.add_event(
        EventDefinition::new(model.name("Changed"), p.system_object.clone()),
    );
    let generic = model.type_ref(&unit, "Docs", "Cache", 1);
    let field = FieldReference::new(generic.clone(), model.name("count"), p.system_int32.clone());

    assert_eq!(
        member_signature(&model.host, FormattedMember::Field(&field), Options::DOCUMENTATION_ID),
        "F:Docs.Cache`1.count"
    );
    assert_eq!(
        member_signature(&model.host, FormattedMember::Event(&changed), Options::DOCUMENTATION_ID),
        "E:Docs.Cache`1.Changed"
    );
    assert_eq!(
        member_signature(&model.host, FormattedMember::Type(&generic), Options::DOCUMENTATION_ID),
        "T:Docs.Cache`1"
    );
}
