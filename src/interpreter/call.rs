//! [[Call]] and [[Construct]] for function objects
//!
//! The ordinary call protocol: prepare a callee context, bind `this`,
//! evaluate the body with the active strategy, pop the context. Every path
//! that pushes a context pops it before returning, including error paths.

use super::bytecode_vm::{Frame, VmResult};
use super::context::ExecutionContext;
use super::function::{ConstructorKind, ScriptFunction, ThisMode};
use super::{Completion, ContextId, Interpreter};
use crate::ast::FunctionKind;
use crate::compiler::Compiler;
use crate::config::EvaluationStrategy;
use crate::env::Environment;
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::prelude::*;
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObjectRef, JsValue, PropertyKey, create_object, get,
};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Call `function` with the given receiver and arguments
    pub fn call(&mut self, function: &JsValue, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = function else {
            return Err(JsError::type_error(ErrorType::NotAFunction, function.to_js_string()));
        };
        let callee = match &obj.borrow().exotic {
            ExoticObject::Function(f) => Some(f.clone()),
            _ => None,
        };
        let Some(callee) = callee else {
            return Err(JsError::type_error(ErrorType::NotAFunction, function.to_js_string()));
        };

        match callee {
            JsFunction::Script(func) => self.internal_call(obj, &func, this, args),
            // Native functions run on the caller's context
            JsFunction::Native(native) => (native.func)(self, this, args),
            JsFunction::PromiseResolve(resolving) => {
                let resolution = args.first().cloned().unwrap_or_default();
                self.resolve_promise_function(&resolving, resolution)?;
                Ok(JsValue::Undefined)
            }
            JsFunction::PromiseReject(resolving) => {
                let reason = args.first().cloned().unwrap_or_default();
                self.reject_promise_function(&resolving, reason);
                Ok(JsValue::Undefined)
            }
        }
    }

    /// Construct with `constructor`; `new_target` defaults to the constructor
    pub fn construct(
        &mut self,
        constructor: &JsValue,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> Result<JsValue, JsError> {
        let target = constructor
            .as_object()
            .and_then(|obj| obj.borrow().as_script_function().map(|f| (obj.cheap_clone(), f)))
            .filter(|(_, f)| f.is_constructor());
        let Some((obj, func)) = target else {
            return Err(JsError::type_error(ErrorType::NotAConstructor, constructor.to_js_string()));
        };
        let new_target = new_target.cloned().unwrap_or_else(|| constructor.clone());
        self.internal_construct(&obj, &func, args, new_target)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Ordinary [[Call]] / [[Construct]]
    // ═══════════════════════════════════════════════════════════════════════════════

    fn internal_call(
        &mut self,
        function_object: &JsObjectRef,
        func: &Rc<ScriptFunction>,
        this: JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let _span = tracing::debug_span!("call", function = %func.name()).entered();
        let id = self.prepare_for_ordinary_call(function_object, func, JsValue::Undefined, args)?;

        if func.is_class_constructor() {
            let error = JsError::type_error(ErrorType::ClassConstructorWithoutNew, func.name());
            self.pop_execution_context(id);
            return Err(error);
        }

        self.ordinary_call_bind_this(func, this);
        let result = self.ordinary_call_evaluate_body(function_object, func, args);
        self.pop_execution_context(id);
        Ok(result?.into_return_value())
    }

    fn internal_construct(
        &mut self,
        function_object: &JsObjectRef,
        func: &Rc<ScriptFunction>,
        args: &[JsValue],
        new_target: JsValue,
    ) -> Result<JsValue, JsError> {
        let _span = tracing::debug_span!("construct", function = %func.name()).entered();
        let kind = func.constructor_kind();

        let this_argument = match kind {
            ConstructorKind::Base => Some(self.ordinary_create_from_constructor(&new_target)?),
            ConstructorKind::Derived => None,
        };

        let id = self.prepare_for_ordinary_call(function_object, func, new_target.clone(), args)?;

        if let Some(this_argument) = &this_argument {
            self.ordinary_call_bind_this(func, JsValue::Object(this_argument.cheap_clone()));
            if let Err(error) = self.initialize_instance_elements(this_argument, function_object) {
                self.pop_execution_context(id);
                return Err(error);
            }
        }

        let constructor_env = self.lexical_environment();
        let result = self.ordinary_call_evaluate_body(function_object, func, args);
        self.pop_execution_context(id);

        if let Completion::Return(value) = result? {
            if let JsValue::Object(obj) = &value {
                if kind == ConstructorKind::Derived
                    && let JsValue::Object(target) = &new_target
                    && let JsValue::Object(proto) = get(target, &PropertyKey::from("prototype"))?
                {
                    obj.borrow_mut().prototype = Some(proto);
                }
                return Ok(value);
            }
            if let Some(this_argument) = this_argument {
                return Ok(JsValue::Object(this_argument));
            }
            if !value.is_undefined() {
                return Err(JsError::type_error(
                    ErrorType::DerivedConstructorReturningInvalidValue,
                    "",
                ));
            }
        }

        constructor_env.borrow().get_this_binding()
    }

    /// PrepareForOrdinaryCall: push a fresh callee context.
    ///
    /// The callee runs in its own realm; a function without one falls back
    /// to the running realm.
    fn prepare_for_ordinary_call(
        &mut self,
        function_object: &JsObjectRef,
        func: &ScriptFunction,
        new_target: JsValue,
        args: &[JsValue],
    ) -> Result<ContextId, JsError> {
        let realm = match func.realm() {
            Some(realm) => realm.cheap_clone(),
            None => match self.current_realm() {
                Some(realm) => {
                    tracing::warn!(function = %func.name(), "function has no realm, using the running realm");
                    realm
                }
                None => invariant_violation("calling a function with no realm available"),
            },
        };

        let local_env = Environment::new_function(
            function_object.cheap_clone(),
            Some(func.environment().cheap_clone()),
            func.this_mode() == ThisMode::Lexical,
            new_target,
        );

        let context = ExecutionContext {
            function: Some(function_object.cheap_clone()),
            function_name: func.name(),
            realm,
            private_environment: func.private_environment().cloned(),
            lexical_environment: local_env.cheap_clone(),
            variable_environment: local_env,
            arguments: args.to_vec(),
            this_value: None,
            is_strict: func.is_strict(),
        };
        self.push_execution_context(context)
    }

    /// OrdinaryCallBindThis on the running (callee) context
    fn ordinary_call_bind_this(&mut self, func: &ScriptFunction, this: JsValue) {
        let this_value = match func.this_mode() {
            ThisMode::Lexical => return,
            ThisMode::Strict => this,
            ThisMode::Global if this.is_null_or_undefined() => {
                JsValue::Object(self.realm_or_fatal().global_this().cheap_clone())
            }
            ThisMode::Global => match self.to_object(&this) {
                Ok(obj) => JsValue::Object(obj),
                Err(_) => invariant_violation("ToObject failed on a non-nullish this"),
            },
        };

        let env = self.lexical_environment();
        if env.borrow_mut().bind_this_value(this_value.clone()).is_err() {
            invariant_violation("this bound twice on a fresh function environment");
        }
        if let Some(context) = self.running_context_mut() {
            context.this_value = Some(this_value);
        }
    }

    /// OrdinaryCreateFromConstructor with %Object.prototype% as the fallback
    fn ordinary_create_from_constructor(&mut self, new_target: &JsValue) -> Result<JsObjectRef, JsError> {
        let prototype = match new_target {
            JsValue::Object(target) => get(target, &PropertyKey::from("prototype"))?,
            _ => JsValue::Undefined,
        };
        let prototype = match prototype {
            JsValue::Object(proto) => proto,
            _ => {
                // GetFunctionRealm of the new target
                let realm = new_target
                    .as_object()
                    .and_then(|t| t.borrow().as_script_function())
                    .and_then(|f| f.realm().cloned())
                    .unwrap_or_else(|| self.realm_or_fatal());
                realm.intrinsics().object_prototype.cheap_clone()
            }
        };
        Ok(create_object(Some(prototype)))
    }

    /// InitializeInstanceElements: define the constructor's fields on `instance`
    pub(crate) fn initialize_instance_elements(
        &mut self,
        instance: &JsObjectRef,
        constructor: &JsObjectRef,
    ) -> Result<(), JsError> {
        let Some(func) = constructor.borrow().as_script_function() else {
            return Ok(());
        };
        for field in func.fields() {
            let value = match &field.initializer {
                Some(init) => self.call(
                    &JsValue::Object(init.cheap_clone()),
                    JsValue::Object(instance.cheap_clone()),
                    &[],
                )?,
                None => JsValue::Undefined,
            };
            instance.borrow_mut().set_property(field.key, value);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Body evaluation
    // ═══════════════════════════════════════════════════════════════════════════════

    /// OrdinaryCallEvaluateBody, dispatching on strategy and function kind
    fn ordinary_call_evaluate_body(
        &mut self,
        function_object: &JsObjectRef,
        func: &Rc<ScriptFunction>,
        args: &[JsValue],
    ) -> Result<Completion, JsError> {
        match self.config.strategy {
            EvaluationStrategy::Compiled => {
                if func.kind() == FunctionKind::Async {
                    return Err(JsError::not_implemented("async function bodies in compiled mode"));
                }

                self.function_declaration_instantiation(function_object, func, args)?;

                let dump = self.config.dump_bytecode;
                let stats = &mut self.stats;
                let executable = func.executable_or_compile(|| {
                    stats.compilations += 1;
                    let executable = Compiler::compile_function(func.node(), func.name())?;
                    tracing::debug!(
                        name = %executable.name,
                        ops = executable.code.len(),
                        registers = executable.register_count,
                        "compiled function body"
                    );
                    if dump {
                        tracing::debug!(bytecode = %executable.to_json(), "bytecode dump");
                    }
                    Ok(executable)
                })?;

                if func.kind() == FunctionKind::Generator {
                    let generator = self.create_generator_object(function_object, executable)?;
                    return Ok(Completion::Return(JsValue::Object(generator)));
                }

                let frame = Frame::new(&executable);
                match self.run_executable(&executable, frame)? {
                    VmResult::Complete(value) => Ok(Completion::Return(value)),
                    VmResult::Yield { .. } => invariant_violation("yield from a non-generator body"),
                }
            }

            EvaluationStrategy::TreeWalking => match func.kind() {
                FunctionKind::Generator => Err(JsError::not_implemented(
                    "generator function bodies in tree-walking mode",
                )),
                FunctionKind::Regular => {
                    self.function_declaration_instantiation(function_object, func, args)?;
                    let completion = self.evaluate_function_body(func)?;
                    Ok(Completion::Return(completion.into_return_value()))
                }
                FunctionKind::Async => self.async_function_body(function_object, func, args),
            },
        }
    }
}
