use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::metadata::{
    members::{MemberDefinition, MemberVisibility, MethodDefRc},
    names::Name,
    typesystem::{TypeDefRc, TypeDefRef, TypeRefRc},
};

/// Reference to an `EventDefinition`
pub type EventDefRc = Arc<EventDefinition>;

/// An event declared by a type
pub struct EventDefinition {
    /// Simple name
    pub name: Name,
    /// Declared visibility
    pub visibility: MemberVisibility,
    /// The delegate type of the event
    pub event_type: TypeRefRc,
    /// The `add_` accessor
    pub adder: Option<MethodDefRc>,
    /// The `remove_` accessor
    pub remover: Option<MethodDefRc>,
    /// The `raise_` accessor
    pub caller: Option<MethodDefRc>,
    containing: OnceLock<TypeDefRef>,
}

impl EventDefinition {
    /// Create a public event of the given delegate type
    #[must_use]
    pub fn new(name: Name, event_type: TypeRefRc) -> Self {
        EventDefinition {
            name,
            visibility: MemberVisibility::Public,
            event_type,
            adder: None,
            remover: None,
            caller: None,
            containing: OnceLock::new(),
        }
    }

    /// Sets the visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the add and remove accessors
    #[must_use]
    pub fn with_accessors(mut self, adder: MethodDefRc, remover: MethodDefRc) -> Self {
        self.adder = Some(adder);
        self.remover = Some(remover);
        self
    }

    /// Sets the raise accessor
    #[must_use]
    pub fn with_caller(mut self, caller: MethodDefRc) -> Self {
        self.caller = Some(caller);
        self
    }

    pub(crate) fn set_containing_type(&self, containing: TypeDefRef) {
        self.containing.set(containing).ok();
    }

    /// The type declaring this event
    #[must_use]
    pub fn containing_type(&self) -> Option<TypeDefRc> {
        self.containing.get()?.upgrade()
    }
}

impl MemberDefinition for EventDefinition {
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

impl fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDefinition")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}
