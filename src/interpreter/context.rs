//! Execution contexts

use crate::env::{EnvRef, PrivateEnvironment};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

/// One activation record.
///
/// Created right before a call, mutated in place by declaration
/// instantiation (its environment pointers move), and popped exactly once.
/// Generator and async bodies run on copies of it.
#[derive(Clone)]
pub struct ExecutionContext {
    /// `None` for script code
    pub function: Option<JsObjectRef>,
    pub function_name: JsString,
    pub realm: Rc<Realm>,
    pub private_environment: Option<Rc<PrivateEnvironment>>,
    pub lexical_environment: EnvRef,
    pub variable_environment: EnvRef,
    /// Snapshot of the arguments passed in
    pub arguments: Vec<JsValue>,
    /// The bound `this`, once OrdinaryCallBindThis has run
    pub this_value: Option<JsValue>,
    pub is_strict: bool,
}

impl ExecutionContext {
    /// A context for top-level code running in the realm's global environment
    pub fn for_script(realm: Rc<Realm>, is_strict: bool) -> Self {
        let global_env = realm.global_env().cheap_clone();
        let global_this = JsValue::Object(realm.global_this().cheap_clone());
        Self {
            function: None,
            function_name: JsString::default(),
            realm,
            private_environment: None,
            lexical_environment: global_env.cheap_clone(),
            variable_environment: global_env,
            arguments: Vec::new(),
            this_value: Some(global_this),
            is_strict,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("function_name", &self.function_name)
            .field("arguments", &self.arguments)
            .field("this_value", &self.this_value)
            .field("is_strict", &self.is_strict)
            .field(
                "separate_var_env",
                &!Rc::ptr_eq(&self.lexical_environment, &self.variable_environment),
            )
            .finish()
    }
}

impl Trace for ExecutionContext {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(function) = &self.function {
            visitor.visit(GcEdge::Object(function.cheap_clone()));
        }
        visitor.visit(GcEdge::Realm(self.realm.cheap_clone()));
        if let Some(private_env) = &self.private_environment {
            visitor.visit(GcEdge::PrivateEnvironment(private_env.cheap_clone()));
        }
        visitor.visit(GcEdge::Environment(self.lexical_environment.cheap_clone()));
        visitor.visit(GcEdge::Environment(self.variable_environment.cheap_clone()));
        for arg in &self.arguments {
            arg.visit_references(visitor);
        }
        if let Some(this_value) = &self.this_value {
            this_value.visit_references(visitor);
        }
    }
}
