//! Runtime helpers shared by the tree evaluator and the bytecode VM

use super::Interpreter;
use super::function::{self, ClosureParts};
use crate::ast::{BinaryOp, FunctionNode, UnaryOp};
use crate::env::{
    EnvRef, Environment, get_identifier_value, get_this_environment, resolve_binding,
    set_identifier_value,
};
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{
    CheapClone, ExoticObject, JsObject, JsObjectRef, JsString, JsValue, Property, PropertyKey,
    array_index_length, array_like_to_vec, get, set,
};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Running context accessors
    // ═══════════════════════════════════════════════════════════════════════════════

    pub(crate) fn lexical_environment(&self) -> EnvRef {
        match self.running_context() {
            Some(context) => context.lexical_environment.cheap_clone(),
            None => invariant_violation("no running execution context"),
        }
    }

    pub(crate) fn variable_environment(&self) -> EnvRef {
        match self.running_context() {
            Some(context) => context.variable_environment.cheap_clone(),
            None => invariant_violation("no running execution context"),
        }
    }

    pub(crate) fn set_lexical_environment(&mut self, env: EnvRef) {
        match self.running_context_mut() {
            Some(context) => context.lexical_environment = env,
            None => invariant_violation("no running execution context"),
        }
    }

    pub(crate) fn set_variable_environment(&mut self, env: EnvRef) {
        match self.running_context_mut() {
            Some(context) => context.variable_environment = env,
            None => invariant_violation("no running execution context"),
        }
    }

    /// Strictness of the running code; host code counts as sloppy
    pub(crate) fn is_strict(&self) -> bool {
        self.running_context().is_some_and(|context| context.is_strict)
    }

    pub(crate) fn realm_or_fatal(&self) -> Rc<Realm> {
        self.current_realm()
            .unwrap_or_else(|| invariant_violation("no realm available"))
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Identifiers and `this`
    // ═══════════════════════════════════════════════════════════════════════════════

    pub(crate) fn identifier_value(&self, name: &str) -> Result<JsValue, JsError> {
        get_identifier_value(&self.lexical_environment(), name, self.is_strict())
    }

    pub(crate) fn assign_identifier(&self, name: &str, value: JsValue) -> Result<(), JsError> {
        set_identifier_value(&self.lexical_environment(), name, value, self.is_strict())
    }

    /// `typeof name`: unresolvable names are "undefined" instead of throwing
    pub(crate) fn typeof_identifier(&self, name: &str) -> Result<JsValue, JsError> {
        let Some(env) = resolve_binding(&self.lexical_environment(), name) else {
            return Ok(JsValue::from("undefined"));
        };
        let value = env.borrow().get_binding_value(name, self.is_strict())?;
        Ok(JsValue::from(value.type_of()))
    }

    /// Initialize a `let`/`const`/`class` binding of the current scope
    pub(crate) fn initialize_lexical_binding(&self, name: &str, value: JsValue) {
        self.lexical_environment()
            .borrow_mut()
            .initialize_binding(name, value);
    }

    /// Annex B: copy a block function's binding to the var scope
    pub(crate) fn copy_annex_b_function(&self, name: &str) -> Result<(), JsError> {
        let value = self.lexical_environment().borrow().get_binding_value(name, false)?;
        self.variable_environment()
            .borrow_mut()
            .set_mutable_binding(name, value, false)
    }

    /// ResolveThisBinding
    pub(crate) fn resolve_this_binding(&self) -> Result<JsValue, JsError> {
        get_this_environment(&self.lexical_environment())
            .borrow()
            .get_this_binding()
    }

    /// GetNewTarget
    pub(crate) fn new_target_value(&self) -> JsValue {
        get_this_environment(&self.lexical_environment())
            .borrow()
            .new_target()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Objects
    // ═══════════════════════════════════════════════════════════════════════════════

    /// ToObject: primitives are wrapped, nullish values throw
    pub fn to_object(&self, value: &JsValue) -> Result<JsObjectRef, JsError> {
        let realm = self.realm_or_fatal();
        let intrinsics = realm.intrinsics();
        let prototype = match value {
            JsValue::Object(obj) => return Ok(obj.cheap_clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(ErrorType::ToObjectNullOrUndefined, ""));
            }
            JsValue::Boolean(_) => &intrinsics.boolean_prototype,
            JsValue::Number(_) => &intrinsics.number_prototype,
            JsValue::String(_) => &intrinsics.string_prototype,
        };
        let mut wrapper = JsObject::with_prototype(prototype.cheap_clone());
        wrapper.exotic = ExoticObject::Primitive(value.clone());
        if let JsValue::String(s) = value {
            wrapper.define_property(
                PropertyKey::from("length"),
                Property::with_attributes(
                    JsValue::Number(s.as_str().chars().count() as f64),
                    false,
                    false,
                    false,
                ),
            );
        }
        Ok(wrapper.into_ref())
    }

    /// GetValue on a property reference
    pub(crate) fn get_value_property(&self, base: &JsValue, key: &PropertyKey) -> Result<JsValue, JsError> {
        match base {
            JsValue::Object(obj) => get(obj, key),
            JsValue::String(s) if matches!(key, PropertyKey::String(k) if k.as_str() == "length") => {
                Ok(JsValue::Number(s.as_str().chars().count() as f64))
            }
            JsValue::Undefined | JsValue::Null => {
                Err(JsError::type_error(ErrorType::ToObjectNullOrUndefined, key.to_string()))
            }
            primitive => get(&self.to_object(primitive)?, key),
        }
    }

    /// PutValue on a property reference; writes to primitives are dropped
    pub(crate) fn put_value_property(
        &self,
        base: &JsValue,
        key: PropertyKey,
        value: JsValue,
    ) -> Result<(), JsError> {
        match base {
            JsValue::Object(obj) => set(obj, key, value, self.is_strict()),
            JsValue::Undefined | JsValue::Null => {
                Err(JsError::type_error(ErrorType::ToObjectNullOrUndefined, key.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Append to an array object
    pub(crate) fn array_push(&self, array: &JsObjectRef, value: JsValue) -> Result<(), JsError> {
        let length = array_index_length(get(array, &PropertyKey::from("length"))?.to_number())?;
        set(array, PropertyKey::Index(length), value, true)
    }

    /// Append every element of an array-like value
    pub(crate) fn array_spread(&self, array: &JsObjectRef, source: &JsValue) -> Result<(), JsError> {
        let JsValue::Object(source) = source else {
            return Err(JsError::type_error(ErrorType::NotAnObject, source.to_js_string()));
        };
        for item in array_like_to_vec(source)? {
            self.array_push(array, item)?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════════════════════

    /// InstantiateOrdinaryFunctionExpression (and the arrow variant)
    ///
    /// A named function expression sees its own name through an extra
    /// immutable binding.
    pub(crate) fn instantiate_function_expression(&self, node: &Rc<FunctionNode>) -> JsObjectRef {
        let env = self.lexical_environment();
        let strict = self.is_strict();
        let private_environment = self.running_context().and_then(|c| c.private_environment.clone());

        match &node.name {
            Some(name) if !node.is_arrow => {
                let func_env = Environment::new_declarative(Some(env));
                func_env
                    .borrow_mut()
                    .create_immutable_binding(name.cheap_clone(), false);
                let closure = self.create_closure(
                    ClosureParts::new(node.cheap_clone(), func_env.cheap_clone())
                        .private_environment(private_environment)
                        .strict(strict),
                );
                func_env
                    .borrow_mut()
                    .initialize_binding(name, JsValue::Object(closure.cheap_clone()));
                closure
            }
            _ => self.create_closure(
                ClosureParts::new(node.cheap_clone(), env)
                    .private_environment(private_environment)
                    .strict(strict),
            ),
        }
    }

    /// GetSuperBase + GetValue for `super.name`
    pub(crate) fn super_property(&self, name: &JsString) -> Result<JsValue, JsError> {
        let this_env = get_this_environment(&self.lexical_environment());
        // `this` must be initialized before super property access
        this_env.borrow().get_this_binding()?;

        let home_object = this_env
            .borrow()
            .function_object()
            .and_then(|f| f.borrow().as_script_function())
            .and_then(|f| f.home_object().cloned());
        let Some(home_object) = home_object else {
            return Err(JsError::syntax_error(ErrorType::SuperCallOutsideDerivedConstructor, ""));
        };
        let base = home_object.borrow().prototype.clone();
        match base {
            Some(base) => get(&base, &PropertyKey::from(name.cheap_clone())),
            None => Err(JsError::type_error(ErrorType::ToObjectNullOrUndefined, name)),
        }
    }
}

/// NamedEvaluation fix-up: give a freshly created anonymous function its
/// binding name
pub(crate) fn name_anonymous_function(value: &JsValue, name: &JsString) {
    if name.is_empty() {
        return;
    }
    let JsValue::Object(obj) = value else {
        return;
    };
    let unnamed = obj
        .borrow()
        .as_script_function()
        .is_some_and(|f| f.name().is_empty());
    if unnamed {
        function::rename(obj, name.cheap_clone());
    }
}

pub(crate) fn unary_operation(op: UnaryOp, value: &JsValue) -> JsValue {
    match op {
        UnaryOp::Not => JsValue::Boolean(!value.to_boolean()),
        UnaryOp::Minus => JsValue::Number(-value.to_number()),
        UnaryOp::Typeof => JsValue::from(value.type_of()),
    }
}

pub(crate) fn binary_operation(op: BinaryOp, left: &JsValue, right: &JsValue) -> JsValue {
    match op {
        BinaryOp::Add => match (left, right) {
            (JsValue::String(_), _) | (_, JsValue::String(_)) => {
                JsValue::String(left.to_js_string() + &right.to_js_string())
            }
            _ => JsValue::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => JsValue::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => JsValue::Number(left.to_number() * right.to_number()),
        BinaryOp::Lt => match (left, right) {
            (JsValue::String(a), JsValue::String(b)) => JsValue::Boolean(a < b),
            _ => JsValue::Boolean(left.to_number() < right.to_number()),
        },
        BinaryOp::StrictEq => JsValue::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEq => JsValue::Boolean(!left.strict_equals(right)),
    }
}

/// Describe a callee for NotAFunction / NotAConstructor messages
pub(crate) fn describe_value(value: &JsValue) -> JsString {
    match value {
        JsValue::String(s) => JsString::from(format!("\"{s}\"")),
        JsValue::Object(obj) => match &obj.borrow().exotic {
            ExoticObject::Function(f) => f.name(),
            _ => JsString::from("object"),
        },
        other => other.to_js_string(),
    }
}
