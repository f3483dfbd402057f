use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use bitflags::bitflags;
use tracing::trace;

use crate::metadata::{
    host::MetadataHost,
    intern::{InternKey, StructuralKey},
    members::{MemberDefinition, MemberVisibility},
    names::Name,
    resolution,
    signatures::MethodSignature,
    typesystem::{
        specialize_signature, DefRef, GenericParamRc, GenericParameter,
        GenericParameterAttributes, GenericParameterOwner, ResolvedType, TypeDefRc, TypeDefRef,
        TypeRefRc, TypeReference,
    },
};

/// Reference to a `MethodDefinition`
pub type MethodDefRc = Arc<MethodDefinition>;
/// Weak reference to a `MethodDefinition`
pub type MethodDefRef = DefRef<MethodDefinition>;
/// Reference to a `MethodReference`
pub type MethodRefRc = Arc<MethodReference>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Semantic attributes of a method
    pub struct MethodModifiers: u16 {
        /// No `this` parameter
        const STATIC = 0x0010;
        /// Cannot be overridden (`sealed`)
        const FINAL = 0x0020;
        /// Dispatched through the vtable
        const VIRTUAL = 0x0040;
        /// Hides base methods by name and signature rather than by name only
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Overridable only where the method is accessible
        const STRICT = 0x0200;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// The name is special, e.g. a property accessor
        const SPECIAL_NAME = 0x0800;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x1000;
        /// Implemented in native code through platform invoke
        const PINVOKE_IMPL = 0x2000;
    }
}

/// A method declared by a type
pub struct MethodDefinition {
    /// Simple name; explicit implementations embed the interface name (`IFoo.Bar`)
    pub name: Name,
    /// Semantic attributes
    pub flags: MethodModifiers,
    /// Declared visibility
    pub visibility: MemberVisibility,
    /// The declared signature
    pub signature: Arc<MethodSignature>,
    /// Generic parameters, in order
    pub generic_parameters: boxcar::Vec<GenericParamRc>,
    containing: OnceLock<TypeDefRef>,
    key: OnceLock<InternKey>,
}

impl MethodDefinition {
    /// Create a public, non-virtual method
    #[must_use]
    pub fn new(name: Name, signature: MethodSignature) -> Self {
        MethodDefinition {
            name,
            flags: MethodModifiers::HIDE_BY_SIG,
            visibility: MemberVisibility::Public,
            signature: Arc::new(signature),
            generic_parameters: boxcar::Vec::new(),
            containing: OnceLock::new(),
            key: OnceLock::new(),
        }
    }

    /// Sets the semantic attributes
    #[must_use]
    pub fn with_flags(mut self, flags: MethodModifiers) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub(crate) fn set_containing_type(&self, containing: TypeDefRef) {
        self.containing.set(containing).ok();
    }

    /// Appends a generic parameter and returns it
    pub fn add_generic_parameter(self: &Arc<Self>, name: Name) -> GenericParamRc {
        let parameter = Arc::new(GenericParameter::new(
            name,
            self.generic_parameters.count() as u16,
            GenericParameterAttributes::empty(),
            GenericParameterOwner::Method(MethodDefRef::new(self)),
        ));
        self.generic_parameters.push(parameter.clone());
        parameter
    }

    /// Number of generic parameters
    #[must_use]
    pub fn generic_parameter_count(&self) -> u16 {
        self.generic_parameters.count() as u16
    }

    /// Returns `true` if the method declares generic parameters
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.generic_parameters.count() > 0
    }

    /// Number of fixed parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.signature.parameter_count()
    }

    /// Returns `true` for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodModifiers::VIRTUAL)
    }

    /// Returns `true` if the method always takes a new vtable slot
    #[must_use]
    pub fn is_new_slot(&self) -> bool {
        self.flags.contains(MethodModifiers::NEW_SLOT)
    }

    /// Returns `true` if the method cannot be overridden further
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(MethodModifiers::FINAL)
    }

    /// Returns `true` for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodModifiers::ABSTRACT)
    }

    /// Returns `true` for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodModifiers::STATIC)
    }

    /// Returns `true` if the method hides by name and signature
    #[must_use]
    pub fn hides_by_signature(&self) -> bool {
        self.flags.contains(MethodModifiers::HIDE_BY_SIG)
    }

    /// Returns `true` for accessors, operators and other specially named methods
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.flags.contains(MethodModifiers::SPECIAL_NAME)
    }

    /// Returns `true` for instance constructors
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodModifiers::RT_SPECIAL_NAME)
            && !self.is_static()
            && self.name.value() == ".ctor"
    }

    /// Returns `true` for static constructors
    #[must_use]
    pub fn is_static_constructor(&self) -> bool {
        self.flags.contains(MethodModifiers::RT_SPECIAL_NAME)
            && self.is_static()
            && self.name.value() == ".cctor"
    }

    /// The type declaring this method
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        self.containing.get()?.upgrade()
    }

    /// The interned key of the declaring type, or a fresh key for a detached method
    pub fn containing_type_key(&self, host: &MetadataHost) -> InternKey {
        match self.containing_type() {
            Some(containing) => containing.interned_key(host),
            None => host.intern_factory().fresh(),
        }
    }

    /// The interned key, shared with every reference naming this method by the same path
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || match self.containing_type() {
            Some(containing) => host.intern_factory().intern(StructuralKey::Method {
                containing: containing.interned_key(host),
                name: self.name.unique_key(),
                generic_parameter_count: self.generic_parameter_count(),
                signature: self.signature.signature_key(host),
            }),
            None => host.intern_factory().fresh(),
        })
    }
}

impl MemberDefinition for MethodDefinition {
    fn member_name(&self) -> &Name {
        &self.name
    }

    fn member_visibility(&self) -> MemberVisibility {
        self.visibility
    }

    fn declaring_type(&self) -> Option<TypeDefRc> {
        self.containing_type()
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("visibility", &self.visibility)
            .field("generic_parameters", &self.generic_parameter_count())
            .field("parameters", &self.parameter_count())
            .finish_non_exhaustive()
    }
}

/// The shape of a method reference
#[derive(Debug, Clone)]
pub enum MethodReferenceKind {
    /// Names the method by containing type, name, arity and signature
    Plain {
        /// The declaring type
        containing_type: TypeRefRc,
        /// Simple name
        name: Name,
        /// Number of generic parameters
        generic_parameter_count: u16,
        /// Signature as declared
        signature: Arc<MethodSignature>,
    },
    /// The method of a generic type instance
    Specialized {
        /// The method as referenced on the generic type
        unspecialized: MethodRefRc,
        /// The generic instance (or type nested in one)
        containing_type: TypeRefRc,
    },
    /// An instantiation of a generic method
    GenericInstance {
        /// The generic method
        generic: MethodRefRc,
        /// Method type arguments
        arguments: Vec<TypeRefRc>,
    },
    /// A reference obtained directly from a definition
    Definition(MethodDefRef),
}

/// A reference to a method
pub struct MethodReference {
    /// The shape of this reference
    pub kind: MethodReferenceKind,
    signature: OnceLock<Option<Arc<MethodSignature>>>,
    key: OnceLock<InternKey>,
    resolved: OnceLock<Option<ResolvedMethod>>,
}

impl MethodReference {
    fn from_kind(kind: MethodReferenceKind) -> MethodRefRc {
        Arc::new(MethodReference {
            kind,
            signature: OnceLock::new(),
            key: OnceLock::new(),
            resolved: OnceLock::new(),
        })
    }

    /// A reference to the method `name` of `containing_type`
    #[must_use]
    pub fn new(
        containing_type: TypeRefRc,
        name: Name,
        generic_parameter_count: u16,
        signature: MethodSignature,
    ) -> MethodRefRc {
        Self::from_kind(MethodReferenceKind::Plain {
            containing_type,
            name,
            generic_parameter_count,
            signature: Arc::new(signature),
        })
    }

    /// The method `unspecialized` seen through the generic instance `instance`
    #[must_use]
    pub fn specialized(unspecialized: MethodRefRc, instance: TypeRefRc) -> MethodRefRc {
        Self::from_kind(MethodReferenceKind::Specialized {
            unspecialized,
            containing_type: instance,
        })
    }

    /// The generic method `generic` instantiated with `arguments`
    #[must_use]
    pub fn generic_instance(generic: MethodRefRc, arguments: Vec<TypeRefRc>) -> MethodRefRc {
        Self::from_kind(MethodReferenceKind::GenericInstance { generic, arguments })
    }

    /// A reference to an existing definition
    #[must_use]
    pub fn definition(definition: &MethodDefRc) -> MethodRefRc {
        Self::from_kind(MethodReferenceKind::Definition(MethodDefRef::new(definition)))
    }

    /// Simple name of the referenced method
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        match &self.kind {
            MethodReferenceKind::Plain { name, .. } => Some(name.clone()),
            MethodReferenceKind::Specialized { unspecialized, .. } => unspecialized.name(),
            MethodReferenceKind::GenericInstance { generic, .. } => generic.name(),
            MethodReferenceKind::Definition(definition) => {
                definition.upgrade().map(|d| d.name.clone())
            }
        }
    }

    /// The type the method is referenced on
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeRefRc> {
        match &self.kind {
            MethodReferenceKind::Plain {
                containing_type, ..
            }
            | MethodReferenceKind::Specialized {
                containing_type, ..
            } => Some(containing_type.clone()),
            MethodReferenceKind::GenericInstance { generic, .. } => generic.containing_type(),
            MethodReferenceKind::Definition(definition) => definition
                .upgrade()?
                .containing_type()
                .map(|containing| TypeReference::definition(&containing)),
        }
    }

    /// Number of generic parameters of the (uninstantiated) method
    #[must_use]
    pub fn generic_parameter_count(&self) -> u16 {
        match &self.kind {
            MethodReferenceKind::Plain {
                generic_parameter_count,
                ..
            } => *generic_parameter_count,
            MethodReferenceKind::Specialized { unspecialized, .. } => {
                unspecialized.generic_parameter_count()
            }
            MethodReferenceKind::GenericInstance { generic, .. } => {
                generic.generic_parameter_count()
            }
            MethodReferenceKind::Definition(definition) => definition
                .upgrade()
                .map_or(0, |d| d.generic_parameter_count()),
        }
    }

    /// Method type arguments of a generic method instance
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeRefRc] {
        match &self.kind {
            MethodReferenceKind::GenericInstance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Returns `true` for generic method instances
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        matches!(self.kind, MethodReferenceKind::GenericInstance { .. })
    }

    /// The signature at this reference, with type and method arguments substituted
    #[must_use]
    pub fn signature(&self) -> Option<Arc<MethodSignature>> {
        self.signature
            .get_or_init(|| match &self.kind {
                MethodReferenceKind::Plain { signature, .. } => Some(signature.clone()),
                MethodReferenceKind::Specialized {
                    unspecialized,
                    containing_type,
                } => {
                    let declared = unspecialized.signature()?;
                    Some(Arc::new(specialize_signature(
                        &declared,
                        &containing_type.generic_arguments(),
                        &[],
                    )))
                }
                MethodReferenceKind::GenericInstance { generic, arguments } => {
                    let declared = generic.signature()?;
                    Some(Arc::new(specialize_signature(&declared, &[], arguments)))
                }
                MethodReferenceKind::Definition(definition) => {
                    definition.upgrade().map(|d| d.signature.clone())
                }
            })
            .clone()
    }

    /// Number of fixed parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.signature().map_or(0, |s| s.parameter_count())
    }

    /// The reference this one was instantiated or specialized from, following the whole chain.
    ///
    /// Idempotent, and never stops at a partially specialized form.
    #[must_use]
    pub fn uninstantiate_and_unspecialize(self: &Arc<Self>) -> MethodRefRc {
        match &self.kind {
            MethodReferenceKind::GenericInstance { generic, .. } => {
                generic.uninstantiate_and_unspecialize()
            }
            MethodReferenceKind::Specialized { unspecialized, .. } => {
                unspecialized.uninstantiate_and_unspecialize()
            }
            MethodReferenceKind::Plain { .. } | MethodReferenceKind::Definition(_) => self.clone(),
        }
    }

    /// The interned key of the referenced method
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        host.lazily(&self.key, || {
            let factory = host.intern_factory();
            match &self.kind {
                MethodReferenceKind::GenericInstance { generic, arguments } => {
                    factory.intern(StructuralKey::GenericMethodInstance {
                        generic: generic.interned_key(host),
                        arguments: arguments.iter().map(|a| a.interned_key(host)).collect(),
                    })
                }
                MethodReferenceKind::Definition(definition) => match definition.upgrade() {
                    Some(definition) => definition.interned_key(host),
                    None => factory.fresh(),
                },
                MethodReferenceKind::Plain { .. } | MethodReferenceKind::Specialized { .. } => {
                    let (Some(containing), Some(name), Some(signature)) =
                        (self.containing_type(), self.name(), self.signature())
                    else {
                        return factory.fresh();
                    };
                    factory.intern(StructuralKey::Method {
                        containing: containing.interned_key(host),
                        name: name.unique_key(),
                        generic_parameter_count: self.generic_parameter_count(),
                        signature: signature.signature_key(host),
                    })
                }
            }
        })
    }

    /// Resolves this reference, caching the result
    pub fn resolved_method(&self, host: &MetadataHost) -> Option<ResolvedMethod> {
        host.lazily(&self.resolved, || {
            let resolved = resolution::resolve_method(host, self);
            trace!(method = ?self.name(), found = resolved.is_some(), "method reference resolved");
            resolved
        })
    }

    /// The declared method this reference resolves to
    pub fn resolved_definition(&self, host: &MetadataHost) -> Option<MethodDefRc> {
        self.resolved_method(host)?.definition()
    }
}

impl fmt::Debug for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodReference")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The method a reference denotes
#[derive(Debug, Clone)]
pub enum ResolvedMethod {
    /// A method definition
    Definition(MethodDefRef),
    /// The method of a generic type instance
    Specialized {
        /// The method as declared
        unspecialized: MethodDefRef,
        /// The instance supplying the type arguments
        containing: ResolvedType,
    },
    /// An instantiation of a generic method
    GenericInstance {
        /// The resolved generic method
        generic: Box<ResolvedMethod>,
        /// Method type arguments
        arguments: Vec<TypeRefRc>,
    },
}

impl ResolvedMethod {
    /// The declared method
    #[must_use]
    pub fn definition(&self) -> Option<MethodDefRc> {
        match self {
            ResolvedMethod::Definition(definition)
            | ResolvedMethod::Specialized {
                unspecialized: definition,
                ..
            } => definition.upgrade(),
            ResolvedMethod::GenericInstance { generic, .. } => generic.definition(),
        }
    }

    /// The declared method as a resolved method. Idempotent.
    #[must_use]
    pub fn uninstantiate_and_unspecialize(&self) -> ResolvedMethod {
        match self {
            ResolvedMethod::Definition(_) => self.clone(),
            ResolvedMethod::Specialized { unspecialized, .. } => {
                ResolvedMethod::Definition(unspecialized.clone())
            }
            ResolvedMethod::GenericInstance { generic, .. } => {
                generic.uninstantiate_and_unspecialize()
            }
        }
    }

    /// Returns `true` if the method is seen through a generic type instance
    #[must_use]
    pub fn is_specialized(&self) -> bool {
        match self {
            ResolvedMethod::Specialized { .. } => true,
            ResolvedMethod::GenericInstance { generic, .. } => generic.is_specialized(),
            ResolvedMethod::Definition(_) => false,
        }
    }

    /// Returns `true` for generic method instances
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        matches!(self, ResolvedMethod::GenericInstance { .. })
    }

    /// Method type arguments of a generic method instance
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeRefRc] {
        match self {
            ResolvedMethod::GenericInstance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// The type this method belongs to: the instance for specialized methods
    #[must_use]
    pub fn containing_type(&self) -> Option<ResolvedType> {
        match self {
            ResolvedMethod::Definition(definition) => {
                let containing = definition.upgrade()?.containing_type()?;
                Some(ResolvedType::Named(TypeDefRef::new(&containing)))
            }
            ResolvedMethod::Specialized { containing, .. } => Some(containing.clone()),
            ResolvedMethod::GenericInstance { generic, .. } => generic.containing_type(),
        }
    }

    /// The signature with type and method arguments substituted
    #[must_use]
    pub fn signature(&self) -> Option<MethodSignature> {
        match self {
            ResolvedMethod::Definition(definition) => {
                definition.upgrade().map(|d| (*d.signature).clone())
            }
            ResolvedMethod::Specialized {
                unspecialized,
                containing,
            } => {
                let definition = unspecialized.upgrade()?;
                Some(specialize_signature(
                    &definition.signature,
                    &containing.generic_arguments(),
                    &[],
                ))
            }
            ResolvedMethod::GenericInstance { generic, arguments } => {
                Some(specialize_signature(&generic.signature()?, &[], arguments))
            }
        }
    }

    /// The interned key of the resolved identity
    pub fn interned_key(&self, host: &MetadataHost) -> InternKey {
        let factory = host.intern_factory();
        match self {
            ResolvedMethod::Definition(definition) => match definition.upgrade() {
                Some(definition) => definition.interned_key(host),
                None => factory.fresh(),
            },
            ResolvedMethod::Specialized {
                unspecialized,
                containing,
            } => {
                let (Some(definition), Some(signature)) =
                    (unspecialized.upgrade(), self.signature())
                else {
                    return factory.fresh();
                };
                factory.intern(StructuralKey::Method {
                    containing: containing.interned_key(host),
                    name: definition.name.unique_key(),
                    generic_parameter_count: definition.generic_parameter_count(),
                    signature: signature.signature_key(host),
                })
            }
            ResolvedMethod::GenericInstance { generic, arguments } => {
                factory.intern(StructuralKey::GenericMethodInstance {
                    generic: generic.interned_key(host),
                    arguments: arguments.iter().map(|a| a.interned_key(host)).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::signatures::CallingConvention, test::factories::TestModel};

    #[test]
    fn test_reference_and_definition_share_key() {
        let model = TestModel::new();
        let holder = model.class("N", "Holder");
        let p = model.platform();
        let signature =
            MethodSignature::new(p.system_void.clone()).with_parameter(p.system_int32.clone());
        let method = holder.add_method(MethodDefinition::new(model.name("Run"), signature.clone()));

        let reference =
            MethodReference::new(model.type_ref("N", "Holder", 0), model.name("Run"), 0, signature);
        assert_eq!(method.interned_key(&model.host), reference.interned_key(&model.host));
        assert_eq!(
            model.host.get_method_interned_key(&reference),
            MethodReference::definition(&method).interned_key(&model.host)
        );
    }

    #[test]
    fn test_uninstantiate_and_unspecialize_is_idempotent() {
        let model = TestModel::new();
        let p = model.platform();
        let generic_type = model.type_ref("N", "List", 1);
        let plain = MethodReference::new(
            generic_type.clone(),
            model.name("Map"),
            1,
            MethodSignature::new(p.system_void.clone())
                .with_calling_convention(CallingConvention::GENERIC),
        );
        let instance_type =
            TypeReference::generic_instance(generic_type, vec![p.system_int32.clone()]);
        let specialized = MethodReference::specialized(plain.clone(), instance_type);
        let instantiated =
            MethodReference::generic_instance(specialized, vec![p.system_string.clone()]);

        let once = instantiated.uninstantiate_and_unspecialize();
        let twice = once.uninstantiate_and_unspecialize();
        assert!(Arc::ptr_eq(&once, &plain));
        assert!(Arc::ptr_eq(&twice, &plain));
        assert_eq!(instantiated.generic_parameter_count(), 1);
        assert_eq!(instantiated.generic_arguments().len(), 1);
    }

    #[test]
    fn test_specialized_signature_substitutes_arguments() {
        let model = TestModel::new();
        let p = model.platform();
        let generic_type = model.type_ref("N", "Box", 1);
        let t = TypeReference::generic_type_parameter(generic_type.clone(), 0, model.name("T"));
        let plain = MethodReference::new(
            generic_type.clone(),
            model.name("Get"),
            0,
            MethodSignature::new(t),
        );
        let instance_type =
            TypeReference::generic_instance(generic_type, vec![p.system_int64.clone()]);
        let specialized = MethodReference::specialized(plain, instance_type);

        let signature = specialized.signature().unwrap();
        assert!(Arc::ptr_eq(&signature.return_type, &p.system_int64));
    }
}
