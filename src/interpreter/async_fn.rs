//! Async function bootstrap
//!
//! An async call creates a promise capability, runs the body on a copy of
//! the callee context and routes the completion into the capability. The
//! caller always receives the promise. `await` drains the job queue and reads
//! the awaited promise's settled state; there is no suspension.

use super::function::ScriptFunction;
use super::promise::{PromiseCapability, PromiseStatus, promise_status};
use super::{Completion, Interpreter};
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::prelude::*;
use crate::value::{CheapClone, JsObjectRef, JsValue};

impl Interpreter {
    /// Body evaluation for async functions
    pub(crate) fn async_function_body(
        &mut self,
        function_object: &JsObjectRef,
        func: &Rc<ScriptFunction>,
        args: &[JsValue],
    ) -> Result<Completion, JsError> {
        let capability = self.new_promise_capability();

        match self.function_declaration_instantiation(function_object, func, args) {
            Ok(()) => self.async_function_start(&capability, func)?,
            Err(error) => self.reject_capability(&capability, &error)?,
        }

        Ok(Completion::Return(JsValue::Object(capability.promise)))
    }

    /// AsyncFunctionStart: evaluate on a copy of the running context, then
    /// settle the capability
    fn async_function_start(
        &mut self,
        capability: &PromiseCapability,
        func: &ScriptFunction,
    ) -> Result<(), JsError> {
        let Some(async_context) = self.running_context().cloned() else {
            invariant_violation("async function started without a running context");
        };
        let id = self.push_execution_context(async_context)?;
        let result = self.evaluate_function_body(func);
        self.pop_execution_context(id);

        match result {
            Ok(completion) => {
                let value = completion.into_return_value();
                self.call(
                    &JsValue::Object(capability.resolve.cheap_clone()),
                    JsValue::Undefined,
                    &[value],
                )?;
            }
            Err(error) => self.reject_capability(capability, &error)?,
        }
        tracing::trace!(function = %func.name(), "async function body settled");
        Ok(())
    }

    fn reject_capability(&mut self, capability: &PromiseCapability, error: &JsError) -> Result<(), JsError> {
        let reason = error.to_value(&self.realm_or_fatal());
        self.call(
            &JsValue::Object(capability.reject.cheap_clone()),
            JsValue::Undefined,
            &[reason],
        )?;
        Ok(())
    }

    /// Await: settle through the job queue, then unwrap the promise
    pub(crate) fn await_value(&mut self, value: JsValue) -> Result<JsValue, JsError> {
        let promise = match &value {
            JsValue::Object(obj) if promise_status(obj).is_some() => obj.cheap_clone(),
            _ => {
                let capability = self.new_promise_capability();
                self.call(&JsValue::Object(capability.resolve), JsValue::Undefined, &[value])?;
                capability.promise
            }
        };
        self.run_jobs()?;

        match promise_status(&promise) {
            Some((PromiseStatus::Fulfilled, result)) => Ok(result),
            Some((PromiseStatus::Rejected, reason)) => Err(JsError::thrown(reason)),
            _ => Err(JsError::internal_error(ErrorType::AwaitOnPendingPromise, "")),
        }
    }
}
