use tracing::trace;

use crate::metadata::{
    host::MetadataHost,
    members::{
        EventDefinition, FieldReference, MemberVisibility, MethodDefRc, MethodModifiers,
        MethodReference, PropertyDefinition,
    },
    resolution::qualified_method_name_begins_with,
    signatures::{MethodSignature, ParameterTypeInfo},
    typesystem::{types_are_equivalent, AttributeArgument, TypeDefRc, TypeRefRc, TypeReference},
};

use super::{
    map_to_documentation_id_name, visibility_name, NameFormattingOptions, TypeNameFormatter,
};

/// A member to format
#[derive(Debug, Clone, Copy)]
pub enum FormattedMember<'a> {
    /// A type
    Type(&'a TypeRefRc),
    /// A field
    Field(&'a FieldReference),
    /// A method
    Method(&'a MethodReference),
    /// A property
    Property(&'a PropertyDefinition),
    /// An event
    Event(&'a EventDefinition),
}

/// Accessor prefixes and the suffix each one is rendered with
const ACCESSOR_NAMES: &[(&str, &str)] = &[
    ("get_", "get"),
    ("set_", "set"),
    ("add_", "add"),
    ("remove_", "remove"),
    ("raise_", "raise"),
];

/// Renders member signatures as C#-like strings
pub struct SignatureFormatter<'h> {
    types: TypeNameFormatter<'h>,
}

impl<'h> SignatureFormatter<'h> {
    /// Create a formatter reading from `host`
    #[must_use]
    pub fn new(host: &'h MetadataHost) -> Self {
        SignatureFormatter {
            types: TypeNameFormatter::new(host),
        }
    }

    fn host(&self) -> &'h MetadataHost {
        self.types.host()
    }

    /// Formats any member
    pub fn member_signature(
        &self,
        member: FormattedMember<'_>,
        options: NameFormattingOptions,
    ) -> String {
        match member {
            FormattedMember::Type(type_reference) => self.types.type_name(type_reference, options),
            FormattedMember::Field(field) => self.field_signature(field, options),
            FormattedMember::Method(method) => self.method_signature(method, options),
            FormattedMember::Property(property) => self.property_signature(property, options),
            FormattedMember::Event(event) => self.event_signature(event, options),
        }
    }

    /// Formats a method: modifiers, return type, qualified name, generic arguments,
    /// parameters and constraints, as selected by `options`
    pub fn method_signature(
        &self,
        method: &MethodReference,
        options: NameFormattingOptions,
    ) -> String {
        let definition = method.resolved_definition(self.host());
        let signature = method.signature();
        let mut out = String::new();

        if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
            out.push_str("M:");
        }
        if let Some(definition) = &definition {
            if options.contains(NameFormattingOptions::VISIBILITY) {
                out.push_str(self.visibility(definition.visibility));
                out.push(' ');
            }
            if options.contains(NameFormattingOptions::MODIFIERS) {
                append_method_modifiers(&mut out, definition);
            }
        }
        if let Some(signature) = &signature {
            if options.contains(NameFormattingOptions::RETURN_TYPE)
                && !options.is_documentation_id()
            {
                self.append_return_type(&mut out, signature, options);
                out.push(' ');
            }
        }

        if !options.contains(NameFormattingOptions::OMIT_CONTAINING_TYPE) {
            if let Some(containing) = method.containing_type() {
                out.push_str(&self.types.type_name(&containing, containing_options(options)));
                out.push('.');
            }
        }
        self.append_method_name(&mut out, method, definition.as_ref(), options);
        self.append_generic_arguments(&mut out, method, definition.as_ref(), options);

        if let Some(signature) = &signature {
            if options.contains(NameFormattingOptions::SIGNATURE) {
                self.append_method_parameters(&mut out, signature, definition.as_ref(), options);
            }
            if options.is_documentation_id() {
                let name = method.name();
                let name = name.as_ref().map_or("", |name| name.value());
                if name == "op_Implicit" || name == "op_Explicit" {
                    out.push('~');
                    out.push_str(
                        &self
                            .types
                            .type_name(&signature.return_type, component_options(options)),
                    );
                }
            }
        }

        if options.contains(NameFormattingOptions::METHOD_CONSTRAINTS) {
            if let Some(definition) = &definition {
                self.types.append_constraints(
                    &mut out,
                    definition.generic_parameters.iter().map(|(_, parameter)| parameter.clone()),
                    options.list_delimiter(),
                );
            }
        }

        trace!(formatted = %out, "method signature");
        out
    }

    /// Formats a field
    pub fn field_signature(
        &self,
        field: &FieldReference,
        options: NameFormattingOptions,
    ) -> String {
        let definition = field.resolved_field(self.host()).and_then(|field| field.unspecialize());
        let mut out = String::new();

        if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
            out.push_str("F:");
        }
        if let Some(definition) = &definition {
            if options.contains(NameFormattingOptions::VISIBILITY) {
                out.push_str(self.visibility(definition.visibility));
                out.push(' ');
            }
            if options.contains(NameFormattingOptions::MODIFIERS) {
                if definition.is_static() {
                    out.push_str("static ");
                }
                if definition.is_read_only() {
                    out.push_str("readonly ");
                }
            }
        }
        if options.contains(NameFormattingOptions::RETURN_TYPE) && !options.is_documentation_id() {
            out.push_str(&self.types.type_name(&field.field_type, component_options(options)));
            out.push(' ');
        }

        if !options.contains(NameFormattingOptions::OMIT_CONTAINING_TYPE) {
            out.push_str(
                &self
                    .types
                    .type_name(&field.containing_type, containing_options(options)),
            );
            out.push('.');
        }
        out.push_str(&self.member_name(field.name.value(), options));
        out
    }

    /// Formats a property, rendering indexers with their parameters
    pub fn property_signature(
        &self,
        property: &PropertyDefinition,
        options: NameFormattingOptions,
    ) -> String {
        let containing = property.containing_type();
        let mut out = String::new();

        if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
            out.push_str("P:");
        }
        if options.contains(NameFormattingOptions::VISIBILITY) {
            out.push_str(self.visibility(property.visibility));
            out.push(' ');
        }
        if options.contains(NameFormattingOptions::MEMBER_KIND) {
            out.push_str("property ");
        }
        if options.contains(NameFormattingOptions::RETURN_TYPE) && !options.is_documentation_id() {
            self.append_return_type(&mut out, &property.signature, options);
            out.push(' ');
        }

        if !options.contains(NameFormattingOptions::OMIT_CONTAINING_TYPE) {
            if let Some(containing) = &containing {
                out.push_str(
                    &self
                        .types
                        .type_name(
                            &TypeReference::definition(containing),
                            containing_options(options),
                        ),
                );
                out.push('.');
            }
        }

        let is_default_member = !options.is_documentation_id()
            && property.is_indexer()
            && containing
                .as_ref()
                .is_some_and(|containing| self.is_default_member(containing, property));
        if is_default_member {
            out.push_str("this");
        } else {
            out.push_str(&self.member_name(property.name.value(), options));
        }

        if options.contains(NameFormattingOptions::SIGNATURE) && property.is_indexer() {
            let (open, close) = if options.is_documentation_id() { ('(', ')') } else { ('[', ']') };
            let named = property
                .getter
                .as_ref()
                .or(property.setter.as_ref())
                .map(|accessor| accessor.signature.clone());
            out.push(open);
            for (index, parameter) in property.signature.parameters.iter().enumerate() {
                if index > 0 {
                    out.push_str(options.list_delimiter());
                }
                let name = parameter.name.as_ref().or_else(|| {
                    named
                        .as_ref()
                        .and_then(|signature| signature.parameters.get(index))
                        .and_then(|parameter| parameter.name.as_ref())
                });
                self.append_parameter(&mut out, parameter, name.map(|name| name.value()), options);
            }
            out.push(close);
        }
        out
    }

    /// Formats an event
    pub fn event_signature(
        &self,
        event: &EventDefinition,
        options: NameFormattingOptions,
    ) -> String {
        let mut out = String::new();

        if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
            out.push_str("E:");
        }
        if options.contains(NameFormattingOptions::VISIBILITY) {
            out.push_str(self.visibility(event.visibility));
            out.push(' ');
        }
        if options.contains(NameFormattingOptions::MEMBER_KIND) {
            out.push_str("event ");
        }
        if options.contains(NameFormattingOptions::RETURN_TYPE) && !options.is_documentation_id() {
            out.push_str(&self.types.type_name(&event.event_type, component_options(options)));
            out.push(' ');
        }

        if !options.contains(NameFormattingOptions::OMIT_CONTAINING_TYPE) {
            if let Some(containing) = event.containing_type() {
                out.push_str(
                    &self
                        .types
                        .type_name(
                            &TypeReference::definition(&containing),
                            containing_options(options),
                        ),
                );
                out.push('.');
            }
        }
        out.push_str(&self.member_name(event.name.value(), options));
        out
    }

    /// The C# word for `visibility`
    #[must_use]
    pub fn visibility(&self, visibility: MemberVisibility) -> &'static str {
        visibility_name(visibility)
    }

    fn member_name(&self, name: &str, options: NameFormattingOptions) -> String {
        let name = if options.contains(NameFormattingOptions::OMIT_IMPLEMENTED_INTERFACE) {
            match name.rfind('.') {
                Some(pos) if pos > 0 && pos < name.len() - 1 => &name[pos + 1..],
                _ => name,
            }
        } else {
            name
        };

        if options.is_documentation_id() {
            map_to_documentation_id_name(name)
        } else if options.contains(NameFormattingOptions::ESCAPE_KEYWORD) {
            TypeNameFormatter::escape_keyword(name).into_owned()
        } else {
            name.to_string()
        }
    }

    fn append_return_type(
        &self,
        out: &mut String,
        signature: &MethodSignature,
        options: NameFormattingOptions,
    ) {
        if signature.return_by_ref {
            out.push_str("ref ");
        }
        out.push_str(&self.types.type_name(&signature.return_type, component_options(options)));
    }

    fn append_method_name(
        &self,
        out: &mut String,
        method: &MethodReference,
        definition: Option<&MethodDefRc>,
        options: NameFormattingOptions,
    ) {
        let Some(name) = method.name() else {
            return;
        };
        let name = name.value();

        let special = !options.contains(NameFormattingOptions::PRESERVE_SPECIAL_NAMES)
            && definition.is_some_and(|definition| definition.is_special_name());
        if special {
            let accessor = ACCESSOR_NAMES
                .iter()
                .find(|(prefix, _)| qualified_method_name_begins_with(name, prefix));
            if let Some((prefix, suffix)) = accessor {
                let split = name.rfind('.').map_or(0, |pos| pos + 1);
                let member = format!("{}{}", &name[..split], &name[split + prefix.len()..]);
                out.push_str(&self.member_name(&member, options));
                out.push('.');
                out.push_str(suffix);
                return;
            }
        }
        out.push_str(&self.member_name(name, options));
    }

    fn append_generic_arguments(
        &self,
        out: &mut String,
        method: &MethodReference,
        definition: Option<&MethodDefRc>,
        options: NameFormattingOptions,
    ) {
        let documentation_id = options.is_documentation_id();
        if method.is_generic_instance() {
            if options.contains(NameFormattingOptions::OMIT_TYPE_ARGUMENTS) {
                return;
            }
            let arguments: Vec<String> = method
                .generic_arguments()
                .iter()
                .map(|argument| self.types.type_name(argument, component_options(options)))
                .collect();
            out.push(if documentation_id { '{' } else { '<' });
            out.push_str(&arguments.join(options.list_delimiter()));
            out.push(if documentation_id { '}' } else { '>' });
            return;
        }

        let count = method.generic_parameter_count();
        if count == 0 {
            return;
        }
        if documentation_id {
            out.push_str(&format!("``{count}"));
        } else if options.contains(NameFormattingOptions::TYPE_PARAMETERS) {
            // Parameter names live on the definition
            let Some(definition) = definition else {
                return;
            };
            let names: Vec<&str> = definition
                .generic_parameters
                .iter()
                .map(|(_, parameter)| parameter.name.value())
                .collect();
            out.push('<');
            out.push_str(&names.join(options.list_delimiter()));
            out.push('>');
        }
    }

    fn append_method_parameters(
        &self,
        out: &mut String,
        signature: &MethodSignature,
        definition: Option<&MethodDefRc>,
        options: NameFormattingOptions,
    ) {
        let documentation_id = options.is_documentation_id();
        let varargs = signature.calling_convention.accepts_extra_arguments();
        if documentation_id && signature.parameters.is_empty() && !varargs {
            return;
        }

        out.push('(');
        for (index, parameter) in signature.parameters.iter().enumerate() {
            if index > 0 {
                out.push_str(options.list_delimiter());
            }
            let name = parameter.name.as_ref().or_else(|| {
                definition
                    .and_then(|definition| definition.signature.parameters.get(index))
                    .and_then(|parameter| parameter.name.as_ref())
            });
            self.append_parameter(out, parameter, name.map(|name| name.value()), options);
        }
        if varargs && !documentation_id {
            if !signature.parameters.is_empty() {
                out.push_str(options.list_delimiter());
            }
            out.push_str("__arglist");
        }
        out.push(')');
    }

    fn append_parameter(
        &self,
        out: &mut String,
        parameter: &ParameterTypeInfo,
        name: Option<&str>,
        options: NameFormattingOptions,
    ) {
        if options.contains(NameFormattingOptions::PARAMETER_MODIFIERS)
            && !options.is_documentation_id()
        {
            if parameter.is_out {
                out.push_str("out ");
            } else if parameter.is_param_array {
                out.push_str("params ");
            } else if parameter.by_ref {
                out.push_str("ref ");
            }
        }

        out.push_str(&self.types.type_name(&parameter.param_type, component_options(options)));
        if options.is_documentation_id() && parameter.by_ref {
            out.push('@');
        }

        if options.contains(NameFormattingOptions::PARAMETER_NAME)
            && !options.is_documentation_id()
        {
            if let Some(name) = name {
                out.push(' ');
                out.push_str(name);
            }
        }
    }

    /// Returns `true` if `containing` names `property` in a `DefaultMemberAttribute`
    fn is_default_member(&self, containing: &TypeDefRc, property: &PropertyDefinition) -> bool {
        let default_member =
            &self.host().platform_types().system_reflection_default_member_attribute;
        containing.attributes.iter().any(|(_, attribute)| {
            matches!(
                attribute.arguments.as_slice(),
                [AttributeArgument::String(name)] if name == property.name.value()
            ) && types_are_equivalent(self.host(), &attribute.attribute_type, default_member, true)
        })
    }
}

fn append_method_modifiers(out: &mut String, definition: &MethodDefRc) {
    if definition.is_static() {
        out.push_str("static ");
    }
    if definition.flags.contains(MethodModifiers::PINVOKE_IMPL) {
        out.push_str("extern ");
    }
    if definition.is_abstract() {
        out.push_str("abstract ");
    } else if definition.is_virtual() && !definition.is_sealed() {
        out.push_str("virtual ");
    }
}

fn component_options(options: NameFormattingOptions) -> NameFormattingOptions {
    options
        - (NameFormattingOptions::MEMBER_KIND
            | NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND
            | NameFormattingOptions::VISIBILITY
            | NameFormattingOptions::MODIFIERS)
}

fn containing_options(options: NameFormattingOptions) -> NameFormattingOptions {
    component_options(options)
        - (NameFormattingOptions::TYPE_CONSTRAINTS | NameFormattingOptions::METHOD_CONSTRAINTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            members::{EventDefinition, FieldAttributes, FieldDefinition, MethodDefinition},
            signatures::CallingConvention,
            typesystem::CustomAttribute,
        },
        test::factories::TestModel,
    };

    type Options = NameFormattingOptions;

    const CSHARP: Options = Options::RETURN_TYPE
        .union(Options::SIGNATURE)
        .union(Options::PARAMETER_NAME)
        .union(Options::PARAMETER_MODIFIERS)
        .union(Options::USE_TYPE_KEYWORDS);

    #[test]
    fn test_method_in_csharp_and_documentation_form() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        let run = class.add_method(MethodDefinition::new(
            model.name("Run"),
            MethodSignature::new(p.system_void.clone())
                .with_parameter_info(
                    ParameterTypeInfo::new(0, p.system_int32.clone()).named(model.name("count")),
                )
                .with_parameter_info(
                    ParameterTypeInfo::new(1, p.system_string.clone())
                        .by_ref()
                        .named(model.name("name")),
                ),
        ));
        let reference = MethodReference::definition(&run);
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.method_signature(&reference, CSHARP),
            "void N.C.Run(int count, ref string name)"
        );
        assert_eq!(
            formatter.method_signature(&reference, Options::DOCUMENTATION_ID),
            "M:N.C.Run(System.Int32,System.String@)"
        );
        assert_eq!(
            formatter.method_signature(&reference, CSHARP | Options::OMIT_CONTAINING_TYPE),
            "void Run(int count, ref string name)"
        );
    }

    #[test]
    fn test_generic_method_documentation_id() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        let t = TypeReference::generic_method_parameter(
            model.type_ref("N", "C", 0),
            model.name("Map"),
            1,
            0,
            model.name("T"),
        );
        let map = class.add_method(MethodDefinition::new(
            model.name("Map"),
            MethodSignature::new(p.system_void.clone())
                .with_calling_convention(CallingConvention::GENERIC)
                .with_parameter(t),
        ));
        map.add_generic_parameter(model.name("T"));
        let reference = MethodReference::definition(&map);
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.method_signature(&reference, Options::DOCUMENTATION_ID),
            "M:N.C.Map``1(``0)"
        );
        assert_eq!(
            formatter.method_signature(&reference, CSHARP | Options::TYPE_PARAMETERS),
            "void N.C.Map<T>(T)"
        );

        let instance = MethodReference::generic_instance(reference, vec![p.system_int32.clone()]);
        assert_eq!(formatter.method_signature(&instance, CSHARP), "void N.C.Map<int>(int)");
    }

    #[test]
    fn test_conversion_operator_and_accessor_names() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        let implicit = class.add_method(
            MethodDefinition::new(
                model.name("op_Implicit"),
                MethodSignature::new(p.system_int32.clone())
                    .with_parameter(model.type_ref("N", "C", 0)),
            )
            .with_flags(MethodModifiers::STATIC | MethodModifiers::SPECIAL_NAME),
        );
        let getter = class.add_method(
            MethodDefinition::new(
                model.name("get_Count"),
                MethodSignature::new(p.system_int32.clone()),
            )
            .with_flags(MethodModifiers::SPECIAL_NAME),
        );
        let explicit = class.add_method(
            MethodDefinition::new(
                model.name("N.IBag.get_Size"),
                MethodSignature::new(p.system_int32.clone()),
            )
            .with_flags(MethodModifiers::SPECIAL_NAME)
            .with_visibility(MemberVisibility::Private),
        );
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.method_signature(
                &MethodReference::definition(&implicit),
                Options::DOCUMENTATION_ID
            ),
            "M:N.C.op_Implicit(N.C)~System.Int32"
        );
        assert_eq!(
            formatter.method_signature(&MethodReference::definition(&getter), Options::empty()),
            "N.C.Count.get"
        );
        assert_eq!(
            formatter.method_signature(
                &MethodReference::definition(&getter),
                Options::PRESERVE_SPECIAL_NAMES
            ),
            "N.C.get_Count"
        );
        assert_eq!(
            formatter.method_signature(
                &MethodReference::definition(&explicit),
                Options::OMIT_IMPLEMENTED_INTERFACE | Options::OMIT_CONTAINING_TYPE
            ),
            "Size.get"
        );
        assert_eq!(
            formatter.method_signature(
                &MethodReference::definition(&implicit),
                Options::MODIFIERS | Options::VISIBILITY | CSHARP
            ),
            "public static int N.C.op_Implicit(N.C)"
        );
    }

    #[test]
    fn test_varargs_parameter_list() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        let log = class.add_method(MethodDefinition::new(
            model.name("Log"),
            MethodSignature::new(p.system_void.clone())
                .with_calling_convention(CallingConvention::EXTRA_ARGUMENTS)
                .with_parameter(p.system_string.clone()),
        ));
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.method_signature(&MethodReference::definition(&log), CSHARP),
            "void N.C.Log(string, __arglist)"
        );
    }

    #[test]
    fn test_fields_and_events() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        class.add_field(
            FieldDefinition::new(model.name("count"), p.system_int32.clone())
                .with_flags(FieldAttributes::STATIC),
        );
        let changed =
            class.add_event(EventDefinition::new(model.name("Changed"), p.system_object.clone()));
        let field = FieldReference::new(
            model.type_ref("N", "C", 0),
            model.name("count"),
            p.system_int32.clone(),
        );
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.field_signature(
                &field,
                Options::MODIFIERS | Options::RETURN_TYPE | Options::USE_TYPE_KEYWORDS
            ),
            "static int N.C.count"
        );
        assert_eq!(formatter.field_signature(&field, Options::DOCUMENTATION_ID), "F:N.C.count");
        assert_eq!(formatter.event_signature(&changed, Options::DOCUMENTATION_ID), "E:N.C.Changed");
        assert_eq!(
            formatter.member_signature(
                FormattedMember::Event(&changed),
                Options::VISIBILITY
                    | Options::MEMBER_KIND
                    | Options::RETURN_TYPE
                    | Options::USE_TYPE_KEYWORDS
            ),
            "public event object N.C.Changed"
        );
    }

    #[test]
    fn test_indexer_uses_default_member() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        class.add_attribute(CustomAttribute::new(
            p.system_reflection_default_member_attribute.clone(),
            vec![AttributeArgument::String("Item".to_string())],
        ));
        let getter = class.add_method(
            MethodDefinition::new(
                model.name("get_Item"),
                MethodSignature::new(p.system_string.clone()).with_parameter_info(
                    ParameterTypeInfo::new(0, p.system_int32.clone()).named(model.name("index")),
                ),
            )
            .with_flags(MethodModifiers::SPECIAL_NAME),
        );
        let item = class.add_property(
            PropertyDefinition::new(
                model.name("Item"),
                MethodSignature::new(p.system_string.clone())
                    .with_parameter(p.system_int32.clone()),
            )
            .with_getter(getter),
        );
        let formatter = SignatureFormatter::new(&model.host);

        assert_eq!(
            formatter.property_signature(
                &item,
                Options::SIGNATURE | Options::PARAMETER_NAME | Options::USE_TYPE_KEYWORDS
            ),
            "N.C.this[int index]"
        );
        assert_eq!(
            formatter.property_signature(&item, Options::DOCUMENTATION_ID),
            "P:N.C.Item(System.Int32)"
        );
    }

    #[test]
    fn test_default_member_needs_a_single_string_argument() {
        let model = TestModel::new();
        let p = model.platform();
        let class = model.class("N", "C");
        class.add_attribute(CustomAttribute::new(
            p.system_reflection_default_member_attribute.clone(),
            vec![
                AttributeArgument::String("Item".to_string()),
                AttributeArgument::Bool(true),
            ],
        ));
        let item = class.add_property(PropertyDefinition::new(
            model.name("Item"),
            MethodSignature::new(p.system_string.clone()).with_parameter(p.system_int32.clone()),
        ));

        let formatted = SignatureFormatter::new(&model.host)
            .property_signature(&item, Options::SIGNATURE | Options::USE_TYPE_KEYWORDS);
        assert!(formatted.starts_with("N.C.Item"));
        assert!(!formatted.contains("this"));
    }
}
