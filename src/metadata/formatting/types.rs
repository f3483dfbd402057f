use std::borrow::Cow;

use tracing::debug;

use crate::metadata::{
    host::MetadataHost,
    members::MemberVisibility,
    names::Name,
    typesystem::{
        types_are_equivalent, GenericParamRc, GenericParameterAttributes, TypeContainer,
        TypeDefRc, TypeRefRc, TypeReference, TypeReferenceKind,
    },
    units::{NamespaceReferenceKind, UnitNamespace, UnitNamespaceReference},
};

use super::{visibility_name, NameFormattingOptions};

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "in", "int", "interface", "internal", "is", "lock", "long",
    "namespace", "new", "null", "object", "operator", "out", "override", "params", "private",
    "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof",
    "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true", "try",
    "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual", "void",
    "volatile", "while",
];

/// Renders type references as C#-like strings.
///
/// Namespace and nested types print their qualified names, generic instances their type
/// arguments, and arrays, pointers and modified types their decorations. Documentation ID
/// options switch to the punctuation of XML documentation member IDs.
pub struct TypeNameFormatter<'h> {
    host: &'h MetadataHost,
}

/// Where a named type lives
enum Container {
    Namespace(Vec<Name>),
    Type(TypeRefRc),
}

impl<'h> TypeNameFormatter<'h> {
    /// Create a formatter reading from `host`
    #[must_use]
    pub fn new(host: &'h MetadataHost) -> Self {
        TypeNameFormatter { host }
    }

    /// The host this formatter reads from
    #[must_use]
    pub fn host(&self) -> &'h MetadataHost {
        self.host
    }

    /// Prefixes `@` to C# keywords
    #[must_use]
    pub fn escape_keyword(name: &str) -> Cow<'_, str> {
        if CSHARP_KEYWORDS.contains(&name) {
            Cow::Owned(format!("@{name}"))
        } else {
            Cow::Borrowed(name)
        }
    }

    /// Formats `type_reference` under `options`
    pub fn type_name(&self, type_reference: &TypeRefRc, options: NameFormattingOptions) -> String {
        if let TypeReferenceKind::Modified {
            unmodified,
            modifiers,
        } = &type_reference.kind
        {
            let mut name = self.type_name(unmodified, options);
            if !options.contains(NameFormattingOptions::OMIT_CUSTOM_MODIFIERS) {
                for modifier in modifiers {
                    name.push_str(if modifier.is_optional { " optmod " } else { " reqmod " });
                    name.push_str(&self.type_name(&modifier.modifier, component_options(options)));
                }
            }
            return name;
        }

        if options.contains(NameFormattingOptions::USE_TYPE_KEYWORDS) {
            if let Some(keyword) = self.type_keyword(type_reference) {
                return keyword.to_string();
            }
        }

        match &type_reference.kind {
            TypeReferenceKind::Array { element, .. } => {
                let mut innermost = element;
                while let TypeReferenceKind::Array { element, .. } = &innermost.kind {
                    innermost = element;
                }
                let mut name = self.type_name(innermost, component_options(options));
                self.append_array_dimensions(&mut name, type_reference, options);
                name
            }
            TypeReferenceKind::FunctionPointer(signature) => {
                let delimiter = options.list_delimiter();
                let component = component_options(options);
                let parameters: Vec<String> = signature
                    .parameters
                    .iter()
                    .map(|parameter| self.type_name(&parameter.param_type, component))
                    .collect();
                format!(
                    "function {} ({})",
                    self.type_name(&signature.return_type, component),
                    parameters.join(delimiter)
                )
            }
            TypeReferenceKind::GenericTypeParameter { index, name, .. } => {
                if options.is_documentation_id() {
                    format!("`{index}")
                } else {
                    name.value().to_string()
                }
            }
            TypeReferenceKind::GenericMethodParameter { index, name, .. } => {
                if options.is_documentation_id() {
                    format!("``{index}")
                } else {
                    name.value().to_string()
                }
            }
            TypeReferenceKind::GenericInstance { generic, arguments } => {
                self.generic_instance_name(generic, arguments, options)
            }
            TypeReferenceKind::Nested {
                containing,
                name,
                generic_parameter_count,
            } => self.named_type_name(
                type_reference,
                Container::Type(containing.clone()),
                name,
                *generic_parameter_count,
                options,
            ),
            TypeReferenceKind::SpecializedNested {
                unspecialized,
                containing,
            } => match unspecialized.name() {
                Some(name) => self.named_type_name(
                    type_reference,
                    Container::Type(containing.clone()),
                    &name,
                    unspecialized.generic_parameter_count(),
                    options,
                ),
                None => self.type_name(unspecialized, options),
            },
            TypeReferenceKind::Namespace {
                namespace,
                name,
                generic_parameter_count,
            } => self.named_type_name(
                type_reference,
                Container::Namespace(namespace_reference_path(namespace)),
                name,
                *generic_parameter_count,
                options,
            ),
            TypeReferenceKind::Pointer(target) => {
                format!("{}*", self.type_name(target, component_options(options)))
            }
            TypeReferenceKind::ManagedPointer(target) => {
                format!("{}&", self.type_name(target, component_options(options)))
            }
            TypeReferenceKind::Definition(definition) => match definition.upgrade() {
                Some(definition) => self.definition_name(type_reference, &definition, options),
                None => {
                    debug!("formatting a reference to a dropped definition");
                    "unknown type".to_string()
                }
            },
            TypeReferenceKind::Modified { .. } => unreachable!("modified types are handled first"),
        }
    }

    /// The namespace path of `namespace`, dotted, honoring `global::` and namespace omission
    pub fn namespace_name(
        &self,
        namespace: &UnitNamespaceReference,
        options: NameFormattingOptions,
    ) -> String {
        let path = namespace_reference_path(namespace);
        if options.contains(NameFormattingOptions::OMIT_CONTAINING_NAMESPACE) {
            return path.last().map(|name| prefixed(name.value(), options)).unwrap_or_default();
        }
        render_path(&path, options)
    }

    /// The kind word of a type: `enum`, `struct`, `delegate`, `interface`, `class` or `type`
    pub fn type_kind(&self, type_reference: &TypeReference) -> &'static str {
        let Some(definition) = type_reference
            .resolved_type(self.host)
            .and_then(|resolved| resolved.definition())
        else {
            return "type";
        };

        if definition.is_enum() {
            "enum"
        } else if definition.is_value_type() {
            "struct"
        } else if definition.is_delegate() {
            "delegate"
        } else if definition.is_interface() {
            "interface"
        } else if definition.is_reference_type() {
            "class"
        } else {
            "type"
        }
    }

    /// Appends ` where T : ...` clauses for every constrained parameter
    pub(crate) fn append_constraints(
        &self,
        out: &mut String,
        parameters: impl Iterator<Item = GenericParamRc>,
        delimiter: &str,
    ) {
        for parameter in parameters {
            let mut clauses = Vec::new();
            if parameter.flags.contains(GenericParameterAttributes::REFERENCE_TYPE_CONSTRAINT) {
                clauses.push("class".to_string());
            }
            if parameter
                .flags
                .contains(GenericParameterAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
            {
                clauses.push("struct".to_string());
            }
            for (_, constraint) in parameter.constraints.iter() {
                clauses.push(self.type_name(constraint, NameFormattingOptions::empty()));
            }
            if parameter
                .flags
                .contains(GenericParameterAttributes::DEFAULT_CONSTRUCTOR_CONSTRAINT)
            {
                clauses.push("new ()".to_string());
            }

            if !clauses.is_empty() {
                out.push_str(" where ");
                out.push_str(parameter.name.value());
                out.push_str(" : ");
                out.push_str(&clauses.join(delimiter));
            }
        }
    }

    fn type_keyword(&self, type_reference: &TypeRefRc) -> Option<&'static str> {
        if let Some(keyword) = type_reference.type_code.keyword() {
            return Some(keyword);
        }
        if type_reference.type_code.size(self.host.pointer_size()).is_some() {
            return None;
        }

        let platform = self.host.platform_types();
        if types_are_equivalent(self.host, type_reference, &platform.system_decimal, false) {
            Some("decimal")
        } else if types_are_equivalent(self.host, type_reference, &platform.system_object, false) {
            Some("object")
        } else {
            None
        }
    }

    fn definition_name(
        &self,
        type_reference: &TypeReference,
        definition: &TypeDefRc,
        options: NameFormattingOptions,
    ) -> String {
        let container = match definition.container() {
            Some(TypeContainer::Type(containing)) => match containing.upgrade() {
                Some(containing) => Container::Type(TypeReference::definition(&containing)),
                None => Container::Namespace(Vec::new()),
            },
            Some(TypeContainer::Namespace(namespace)) => {
                Container::Namespace(
                    namespace
                        .upgrade()
                        .map(|ns| namespace_path(&ns))
                        .unwrap_or_default(),
                )
            }
            None => Container::Namespace(Vec::new()),
        };
        self.named_type_name(
            type_reference,
            container,
            &definition.name,
            definition.generic_parameter_count(),
            options,
        )
    }

    fn named_type_name(
        &self,
        type_reference: &TypeReference,
        container: Container,
        name: &Name,
        generic_parameter_count: u16,
        options: NameFormattingOptions,
    ) -> String {
        let definition = type_reference
            .resolved_type(self.host)
            .and_then(|resolved| resolved.definition());

        let mut type_name = if options.contains(NameFormattingOptions::ESCAPE_KEYWORD) {
            Self::escape_keyword(name.value()).into_owned()
        } else {
            name.value().to_string()
        };
        if options.contains(NameFormattingOptions::SUPPRESS_ATTRIBUTE_SUFFIX)
            && type_name.ends_with("Attribute")
            && definition
                .as_ref()
                .is_some_and(|definition| self.is_attribute_type(definition))
        {
            type_name.truncate(type_name.len() - "Attribute".len());
        }
        let mut type_name = self.add_generic_parameters(
            definition.as_ref(),
            generic_parameter_count,
            options,
            type_name,
        );

        match container {
            Container::Namespace(path) => {
                if !options.contains(NameFormattingOptions::OMIT_CONTAINING_NAMESPACE)
                    && !path.is_empty()
                {
                    type_name = format!("{}.{}", render_path(&path, options), type_name);
                }
                if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
                    type_name = format!("T:{type_name}");
                } else if options.contains(NameFormattingOptions::MEMBER_KIND) {
                    type_name = format!("{} {}", self.type_kind(type_reference), type_name);
                }
                if options.contains(NameFormattingOptions::VISIBILITY) {
                    let public = definition
                        .as_ref()
                        .is_some_and(|definition| {
                            definition.visibility == MemberVisibility::Public
                        });
                    let visibility = if public { "public" } else { "internal" };
                    type_name = format!("{} {}", visibility, type_name);
                }
            }
            Container::Type(containing) => {
                if !options.contains(NameFormattingOptions::OMIT_CONTAINING_TYPE) {
                    let delimiter = if options
                        .contains(NameFormattingOptions::USE_REFLECTION_STYLE_FOR_NESTED_TYPE_NAMES)
                    {
                        '+'
                    } else {
                        '.'
                    };
                    let containing_options =
                        component_options(options) - NameFormattingOptions::TYPE_CONSTRAINTS;
                    type_name = format!(
                        "{}{}{}",
                        self.type_name(&containing, containing_options),
                        delimiter,
                        type_name
                    );
                }
                if options.contains(NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND) {
                    type_name = format!("T:{type_name}");
                } else if options.contains(NameFormattingOptions::MEMBER_KIND) {
                    type_name = format!("{} {}", self.type_kind(type_reference), type_name);
                }
                if options.contains(NameFormattingOptions::VISIBILITY) {
                    let visibility = definition
                        .as_ref()
                        .map_or("private", |definition| visibility_name(definition.visibility));
                    type_name = format!("{visibility} {type_name}");
                }
            }
        }
        type_name
    }

    fn add_generic_parameters(
        &self,
        definition: Option<&TypeDefRc>,
        generic_parameter_count: u16,
        options: NameFormattingOptions,
        mut type_name: String,
    ) -> String {
        if generic_parameter_count == 0 {
            return type_name;
        }

        match definition {
            Some(definition)
                if options.contains(NameFormattingOptions::TYPE_PARAMETERS)
                    && !options.is_documentation_id() =>
            {
                type_name.push('<');
                if options.contains(NameFormattingOptions::EMPTY_TYPE_PARAMETER_LIST) {
                    type_name.push_str(&",".repeat(usize::from(generic_parameter_count) - 1));
                } else {
                    let names: Vec<&str> = definition
                        .generic_parameters
                        .iter()
                        .map(|(_, parameter)| parameter.name.value())
                        .collect();
                    type_name.push_str(&names.join(options.list_delimiter()));
                }
                type_name.push('>');
                if options.contains(NameFormattingOptions::TYPE_CONSTRAINTS) {
                    self.append_constraints(
                        &mut type_name,
                        definition
                            .generic_parameters
                            .iter()
                            .map(|(_, parameter)| parameter.clone()),
                        options.list_delimiter(),
                    );
                }
            }
            _ if options.contains(NameFormattingOptions::USE_GENERIC_TYPE_NAME_SUFFIX) => {
                type_name.push('`');
                type_name.push_str(&generic_parameter_count.to_string());
            }
            _ => {}
        }
        type_name
    }

    fn generic_instance_name(
        &self,
        generic: &TypeRefRc,
        arguments: &[TypeRefRc],
        options: NameFormattingOptions,
    ) -> String {
        if options.contains(NameFormattingOptions::CONTRACT_NULLABLE)
            && types_are_equivalent(
                self.host,
                generic,
                &self.host.platform_types().system_nullable,
                false,
            )
        {
            if let Some(argument) = arguments.first() {
                return format!("{}?", self.type_name(argument, options));
            }
        }

        if options.contains(NameFormattingOptions::OMIT_TYPE_ARGUMENTS) {
            return self.type_name(generic, options - NameFormattingOptions::TYPE_PARAMETERS);
        }

        let documentation_id = options.is_documentation_id();
        let mut generic_options = options - NameFormattingOptions::TYPE_PARAMETERS;
        if documentation_id {
            generic_options -= NameFormattingOptions::USE_GENERIC_TYPE_NAME_SUFFIX;
        }
        let argument_options = component_options(options);

        let mut name = self.type_name(generic, generic_options);
        name.push(if documentation_id { '{' } else { '<' });
        let arguments: Vec<String> = arguments
            .iter()
            .map(|argument| self.type_name(argument, argument_options))
            .collect();
        name.push_str(&arguments.join(options.list_delimiter()));
        name.push(if documentation_id { '}' } else { '>' });
        name
    }

    fn append_array_dimensions(
        &self,
        out: &mut String,
        array: &TypeReference,
        options: NameFormattingOptions,
    ) {
        let TypeReferenceKind::Array {
            element,
            rank,
            sizes,
            lower_bounds,
            is_vector,
        } = &array.kind
        else {
            return;
        };

        let documentation_id = options.is_documentation_id();
        let element_is_array = matches!(element.kind, TypeReferenceKind::Array { .. });
        if documentation_id && element_is_array {
            self.append_array_dimensions(out, element, options);
        }

        out.push('[');
        if !is_vector {
            if documentation_id {
                for dimension in 0..*rank as usize {
                    if dimension > 0 {
                        out.push(',');
                    }
                    match (lower_bounds.get(dimension), sizes.get(dimension)) {
                        (Some(lower), size) => {
                            out.push_str(&format!("{lower}:"));
                            if let Some(size) = size {
                                out.push_str(&size.to_string());
                            }
                        }
                        (None, Some(size)) => out.push_str(&format!("0:{size}")),
                        (None, None) => {}
                    }
                }
            } else {
                out.push_str(&",".repeat((*rank as usize).saturating_sub(1)));
            }
        }
        out.push(']');

        if !documentation_id && element_is_array {
            self.append_array_dimensions(out, element, options);
        }
    }

    fn is_attribute_type(&self, definition: &TypeDefRc) -> bool {
        let _guard = match self.host.enter_resolution() {
            Ok(guard) => guard,
            Err(error) => {
                debug!("attribute check aborted: {}", error);
                return false;
            }
        };

        let attribute = &self.host.platform_types().system_attribute;
        definition.base_classes.iter().any(|(_, base)| {
            types_are_equivalent(self.host, base, attribute, false)
                || base
                    .resolved_type(self.host)
                    .and_then(|resolved| resolved.definition())
                    .is_some_and(|base| self.is_attribute_type(&base))
        })
    }
}

/// Options for the parts of a composite type, which never carry a kind or visibility
fn component_options(options: NameFormattingOptions) -> NameFormattingOptions {
    options
        - (NameFormattingOptions::MEMBER_KIND
            | NameFormattingOptions::DOCUMENTATION_ID_MEMBER_KIND
            | NameFormattingOptions::VISIBILITY)
}

fn namespace_reference_path(namespace: &UnitNamespaceReference) -> Vec<Name> {
    match &namespace.kind {
        NamespaceReferenceKind::Root(_) => Vec::new(),
        NamespaceReferenceKind::Nested { containing, name } => {
            let mut path = namespace_reference_path(containing);
            path.push(name.clone());
            path
        }
    }
}

fn namespace_path(namespace: &UnitNamespace) -> Vec<Name> {
    let mut path = Vec::new();
    if namespace.is_root() {
        return path;
    }
    path.push(namespace.name.clone());
    let mut current = namespace.parent();
    while let Some(parent) = current {
        if parent.is_root() {
            break;
        }
        path.push(parent.name.clone());
        current = parent.parent();
    }
    path.reverse();
    path
}

fn prefixed(name: &str, options: NameFormattingOptions) -> String {
    if options.contains(NameFormattingOptions::USE_GLOBAL_PREFIX) {
        format!("global::{name}")
    } else {
        name.to_string()
    }
}

fn render_path(path: &[Name], options: NameFormattingOptions) -> String {
    let Some((first, rest)) = path.split_first() else {
        return String::new();
    };
    let mut rendered = prefixed(first.value(), options);
    for segment in rest {
        rendered.push('.');
        rendered.push_str(segment.value());
    }
    rendered
}
