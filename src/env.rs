//! Environment records
//!
//! An environment maps binding names to values and links to its enclosing
//! environment. Environments are shared (`Rc`) by every closure created while
//! they were the running lexical scope, so an activation's environment may
//! outlive the call that created it. Outer links always point at an
//! environment that existed first, so the graph is a forest rooted at the
//! realm's global environment.

use crate::error::{ErrorType, JsError, invariant_violation};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::prelude::*;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

/// Shared reference to an environment record
pub type EnvRef = Rc<RefCell<Environment>>;

/// A single binding record
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub initialized: bool,
    /// Assignments to an immutable strict binding throw even in sloppy code
    pub strict: bool,
}

/// State machine of a function environment's `this` binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisBindingStatus {
    /// Arrow functions: `this` comes from the enclosing scope
    Lexical,
    Uninitialized,
    Initialized,
}

/// Function-environment specific slots
#[derive(Debug)]
pub struct FunctionSlots {
    pub this_binding_status: ThisBindingStatus,
    pub this_value: JsValue,
    pub function_object: JsObjectRef,
    pub new_target: JsValue,
}

#[derive(Debug)]
pub enum EnvironmentKind {
    Declarative,
    Function(FunctionSlots),
    Global {
        global_this: JsObjectRef,
        /// Names bound by `var` and function declarations (VarNames)
        var_names: FxHashSet<JsString>,
    },
}

#[derive(Debug)]
pub struct Environment {
    bindings: IndexMap<JsString, Binding>,
    outer: Option<EnvRef>,
    kind: EnvironmentKind,
}

impl Environment {
    /// NewDeclarativeEnvironment
    pub fn new_declarative(outer: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Self {
            bindings: index_map_new(),
            outer,
            kind: EnvironmentKind::Declarative,
        }))
    }

    /// NewFunctionEnvironment
    pub fn new_function(
        function_object: JsObjectRef,
        outer: Option<EnvRef>,
        lexical_this: bool,
        new_target: JsValue,
    ) -> EnvRef {
        let this_binding_status = if lexical_this {
            ThisBindingStatus::Lexical
        } else {
            ThisBindingStatus::Uninitialized
        };
        Rc::new(RefCell::new(Self {
            bindings: index_map_new(),
            outer,
            kind: EnvironmentKind::Function(FunctionSlots {
                this_binding_status,
                this_value: JsValue::Undefined,
                function_object,
                new_target,
            }),
        }))
    }

    /// NewGlobalEnvironment
    pub fn new_global(global_this: JsObjectRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            bindings: index_map_new(),
            outer: None,
            kind: EnvironmentKind::Global {
                global_this,
                var_names: FxHashSet::default(),
            },
        }))
    }

    pub fn outer(&self) -> Option<EnvRef> {
        self.outer.clone()
    }

    pub fn kind(&self) -> &EnvironmentKind {
        &self.kind
    }

    pub fn is_function_environment(&self) -> bool {
        matches!(self.kind, EnvironmentKind::Function(_))
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Binding names in creation order
    pub fn binding_names(&self) -> Vec<JsString> {
        self.bindings.keys().cloned().collect()
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// HasLexicalDeclaration: a global binding not created by `var` or a
    /// function declaration
    pub fn has_lexical_declaration(&self, name: &str) -> bool {
        match &self.kind {
            EnvironmentKind::Global { var_names, .. } => {
                self.bindings.contains_key(name) && !var_names.contains(name)
            }
            _ => false,
        }
    }

    /// Record `name` as var-declared in a global environment
    pub fn record_var_name(&mut self, name: JsString) {
        if let EnvironmentKind::Global { var_names, .. } = &mut self.kind {
            var_names.insert(name);
        }
    }

    pub fn create_mutable_binding(&mut self, name: JsString) {
        debug_assert!(!self.bindings.contains_key(&name), "duplicate binding {name}");
        self.bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: true,
                initialized: false,
                strict: false,
            },
        );
    }

    pub fn create_immutable_binding(&mut self, name: JsString, strict: bool) {
        debug_assert!(!self.bindings.contains_key(&name), "duplicate binding {name}");
        self.bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                initialized: false,
                strict,
            },
        );
    }

    /// InitializeBinding: the binding must already exist
    pub fn initialize_binding(&mut self, name: &str, value: JsValue) {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.initialized = true;
            }
            None => invariant_violation(&format!("initializing missing binding {name}")),
        }
    }

    /// SetMutableBinding
    pub fn set_mutable_binding(
        &mut self,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Result<(), JsError> {
        let Some(binding) = self.bindings.get_mut(name) else {
            if strict {
                return Err(JsError::reference_error(ErrorType::UnknownIdentifier, name));
            }
            self.create_mutable_binding(JsString::from(name));
            self.initialize_binding(name, value);
            return Ok(());
        };

        if !binding.initialized {
            return Err(JsError::reference_error(ErrorType::BindingNotInitialized, name));
        }
        if binding.mutable {
            binding.value = value;
        } else if strict || binding.strict {
            return Err(JsError::type_error(ErrorType::InvalidAssignToConst, name));
        }
        Ok(())
    }

    /// GetBindingValue
    pub fn get_binding_value(&self, name: &str, _strict: bool) -> Result<JsValue, JsError> {
        match self.bindings.get(name) {
            Some(binding) if binding.initialized => Ok(binding.value.clone()),
            Some(_) => Err(JsError::reference_error(ErrorType::BindingNotInitialized, name)),
            None => Err(JsError::reference_error(ErrorType::UnknownIdentifier, name)),
        }
    }

    /// HasThisBinding
    pub fn has_this_binding(&self) -> bool {
        match &self.kind {
            EnvironmentKind::Declarative => false,
            EnvironmentKind::Function(slots) => {
                slots.this_binding_status != ThisBindingStatus::Lexical
            }
            EnvironmentKind::Global { .. } => true,
        }
    }

    /// BindThisValue: a second bind is a ReferenceError
    pub fn bind_this_value(&mut self, value: JsValue) -> Result<(), JsError> {
        let EnvironmentKind::Function(slots) = &mut self.kind else {
            invariant_violation("binding this on a non-function environment");
        };
        match slots.this_binding_status {
            ThisBindingStatus::Lexical => {
                invariant_violation("binding this on a lexical-this environment")
            }
            ThisBindingStatus::Initialized => {
                Err(JsError::reference_error(ErrorType::ThisIsAlreadyInitialized, ""))
            }
            ThisBindingStatus::Uninitialized => {
                slots.this_value = value;
                slots.this_binding_status = ThisBindingStatus::Initialized;
                Ok(())
            }
        }
    }

    /// GetThisBinding
    pub fn get_this_binding(&self) -> Result<JsValue, JsError> {
        match &self.kind {
            EnvironmentKind::Function(slots) => match slots.this_binding_status {
                ThisBindingStatus::Initialized => Ok(slots.this_value.clone()),
                ThisBindingStatus::Uninitialized => Err(JsError::reference_error(
                    ErrorType::ThisHasNotBeenInitialized,
                    "",
                )),
                ThisBindingStatus::Lexical => {
                    invariant_violation("reading this from a lexical-this environment")
                }
            },
            EnvironmentKind::Global { global_this, .. } => Ok(JsValue::Object(global_this.cheap_clone())),
            EnvironmentKind::Declarative => {
                invariant_violation("reading this from a declarative environment")
            }
        }
    }

    pub fn this_binding_status(&self) -> Option<ThisBindingStatus> {
        match &self.kind {
            EnvironmentKind::Function(slots) => Some(slots.this_binding_status),
            _ => None,
        }
    }

    pub fn function_object(&self) -> Option<JsObjectRef> {
        match &self.kind {
            EnvironmentKind::Function(slots) => Some(slots.function_object.cheap_clone()),
            _ => None,
        }
    }

    pub fn new_target(&self) -> JsValue {
        match &self.kind {
            EnvironmentKind::Function(slots) => slots.new_target.clone(),
            _ => JsValue::Undefined,
        }
    }
}

/// Find the innermost environment in the chain that binds `name`.
pub fn resolve_binding(env: &EnvRef, name: &str) -> Option<EnvRef> {
    let mut current = Some(env.cheap_clone());
    while let Some(e) = current {
        if e.borrow().has_binding(name) {
            return Some(e);
        }
        current = e.borrow().outer();
    }
    None
}

/// GetIdentifierReference + GetValue
pub fn get_identifier_value(env: &EnvRef, name: &str, strict: bool) -> Result<JsValue, JsError> {
    match resolve_binding(env, name) {
        Some(found) => found.borrow().get_binding_value(name, strict),
        None => Err(JsError::reference_error(ErrorType::UnknownIdentifier, name)),
    }
}

/// GetIdentifierReference + PutValue.
///
/// Unresolvable names throw in strict code and create a global binding
/// otherwise.
pub fn set_identifier_value(
    env: &EnvRef,
    name: &str,
    value: JsValue,
    strict: bool,
) -> Result<(), JsError> {
    if let Some(found) = resolve_binding(env, name) {
        return found.borrow_mut().set_mutable_binding(name, value, strict);
    }
    if strict {
        return Err(JsError::reference_error(ErrorType::UnknownIdentifier, name));
    }
    let global = outermost(env);
    global.borrow_mut().set_mutable_binding(name, value, false)
}

fn outermost(env: &EnvRef) -> EnvRef {
    let mut current = env.cheap_clone();
    loop {
        let outer = current.borrow().outer();
        match outer {
            Some(o) => current = o,
            None => return current,
        }
    }
}

/// GetThisEnvironment: the innermost environment with a `this` binding
pub fn get_this_environment(env: &EnvRef) -> EnvRef {
    let mut current = env.cheap_clone();
    loop {
        if current.borrow().has_this_binding() {
            return current;
        }
        let outer = current.borrow().outer();
        match outer {
            Some(o) => current = o,
            None => invariant_violation("environment chain without a this binding"),
        }
    }
}

/// Private names of a class body
#[derive(Debug, Default)]
pub struct PrivateEnvironment {
    pub outer: Option<Rc<PrivateEnvironment>>,
    pub names: Vec<JsString>,
}

impl Trace for Environment {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(outer) = &self.outer {
            visitor.visit(GcEdge::Environment(outer.cheap_clone()));
        }
        for binding in self.bindings.values() {
            binding.value.visit_references(visitor);
        }
        match &self.kind {
            EnvironmentKind::Declarative => {}
            EnvironmentKind::Function(slots) => {
                visitor.visit(GcEdge::Object(slots.function_object.cheap_clone()));
                slots.this_value.visit_references(visitor);
                slots.new_target.visit_references(visitor);
            }
            EnvironmentKind::Global { global_this, .. } => {
                visitor.visit(GcEdge::Object(global_this.cheap_clone()));
            }
        }
    }
}

impl Trace for PrivateEnvironment {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(outer) = &self.outer {
            visitor.visit(GcEdge::PrivateEnvironment(outer.cheap_clone()));
        }
    }
}
