use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::metadata::{
    members::{MemberDefinition, MemberVisibility, MethodDefRc},
    names::Name,
    signatures::MethodSignature,
    typesystem::{TypeDefRc, TypeDefRef, TypeRefRc},
};

/// Reference to a `PropertyDefinition`
pub type PropertyDefRc = Arc<PropertyDefinition>;

/// A property declared by a type.
///
/// The signature's return type is the property type and its parameters are the indexer
/// parameters. Accessors are ordinary methods of the same type.
pub struct PropertyDefinition {
    /// Simple name
    pub name: Name,
    /// Declared visibility, usually that of the most visible accessor
    pub visibility: MemberVisibility,
    /// Property type and indexer parameters
    pub signature: Arc<MethodSignature>,
    /// The `get_` accessor
    pub getter: Option<MethodDefRc>,
    /// The `set_` accessor
    pub setter: Option<MethodDefRc>,
    /// Other accessor methods
    pub accessors: Vec<MethodDefRc>,
    containing: OnceLock<TypeDefRef>,
}

impl PropertyDefinition {
    /// Create a public property with the given signature
    #[must_use]
    pub fn new(name: Name, signature: MethodSignature) -> Self {
        PropertyDefinition {
            name,
            visibility: MemberVisibility::Public,
            signature: Arc::new(signature),
            getter: None,
            setter: None,
            accessors: Vec::new(),
            containing: OnceLock::new(),
        }
    }

    /// Sets the visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the getter
    #[must_use]
    pub fn with_getter(mut self, getter: MethodDefRc) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Sets the setter
    #[must_use]
    pub fn with_setter(mut self, setter: MethodDefRc) -> Self {
        self.setter = Some(setter);
        self
    }

    pub(crate) fn set_containing_type(&self, containing: TypeDefRef) {
        self.containing.set(containing).ok();
    }

    /// The property type
    #[must_use]
    pub fn property_type(&self) -> &TypeRefRc {
        &self.signature.return_type
    }

    /// Returns `true` for indexers
    #[must_use]
    pub fn is_indexer(&self) -> bool {
        !self.signature.parameters.is_empty()
    }

    /// The type declaring this property
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        self.containing.get()?.upgrade()
    }
}

impl MemberDefinition for PropertyDefinition {
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

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish_non_exhaustive()
    }
}
