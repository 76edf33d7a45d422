//! Generator objects
//!
//! A generator owns the suspended activation explicitly: the execution
//! context copied from the call that created it plus the VM frame. Resuming
//! pushes that context again, runs the executable from the saved program
//! counter and stores the context back on the next suspension.

use super::bytecode_vm::{Frame, VmResult};
use super::context::ExecutionContext;
use super::Interpreter;
use crate::compiler::{Executable, Register};
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::gc::{Trace, Visitor};
use crate::prelude::*;
use crate::value::{
    CheapClone, ExoticObject, JsObject, JsObjectRef, JsValue, PropertyKey, create_object, get,
};

/// [[GeneratorState]]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    SuspendedStart,
    SuspendedYield,
    Executing,
    Completed,
}

pub struct GeneratorState {
    pub status: GeneratorStatus,
    /// The suspended activation; taken while executing, dropped on completion
    context: Option<ExecutionContext>,
    executable: Rc<Executable>,
    frame: Option<Frame>,
    /// Where the value passed to `next` lands on resumption
    resume_register: Option<Register>,
}

impl fmt::Debug for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorState")
            .field("status", &self.status)
            .field("function", &self.executable.name)
            .field("pc", &self.frame.as_ref().map(Frame::pc))
            .finish()
    }
}

impl Trace for GeneratorState {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(context) = &self.context {
            context.visit_references(visitor);
        }
        if let Some(frame) = &self.frame {
            frame.visit_references(visitor);
        }
    }
}

fn generator_state(obj: &JsObjectRef) -> Option<Rc<RefCell<GeneratorState>>> {
    match &obj.borrow().exotic {
        ExoticObject::Generator(state) => Some(state.cheap_clone()),
        _ => None,
    }
}

impl Interpreter {
    /// Create the generator object for a call of a generator function.
    ///
    /// Runs after declaration instantiation, so the running context already
    /// holds the parameter bindings.
    pub(crate) fn create_generator_object(
        &mut self,
        function_object: &JsObjectRef,
        executable: Rc<Executable>,
    ) -> Result<JsObjectRef, JsError> {
        let prototype = match get(function_object, &PropertyKey::from("prototype"))? {
            JsValue::Object(proto) => proto,
            _ => self.realm_or_fatal().intrinsics().generator_prototype.cheap_clone(),
        };
        let Some(context) = self.running_context().cloned() else {
            invariant_violation("creating a generator without a running context");
        };

        let state = GeneratorState {
            status: GeneratorStatus::SuspendedStart,
            context: Some(context),
            frame: Some(Frame::new(&executable)),
            executable,
            resume_register: None,
        };
        let mut generator = JsObject::with_prototype(prototype);
        generator.exotic = ExoticObject::Generator(Rc::new(RefCell::new(state)));
        Ok(generator.into_ref())
    }

    /// GeneratorResume: run until the next yield or completion and return an
    /// iterator result
    pub fn generator_resume(&mut self, generator: &JsObjectRef, sent: JsValue) -> Result<JsValue, JsError> {
        let Some(state) = generator_state(generator) else {
            return Err(JsError::type_error(ErrorType::NotAnObject, "generator"));
        };

        let (context, mut frame, executable, suspended) = {
            let mut state = state.borrow_mut();
            let suspended = state.status;
            match suspended {
                GeneratorStatus::Executing => {
                    return Err(JsError::type_error(ErrorType::GeneratorAlreadyRunning, ""));
                }
                GeneratorStatus::Completed => {
                    drop(state);
                    return Ok(self.create_iter_result(JsValue::Undefined, true));
                }
                GeneratorStatus::SuspendedStart | GeneratorStatus::SuspendedYield => {}
            }
            let (Some(context), Some(frame)) = (state.context.take(), state.frame.take()) else {
                invariant_violation("suspended generator without a saved activation");
            };
            state.status = GeneratorStatus::Executing;
            (context, frame, state.executable.cheap_clone(), suspended)
        };
        if let Some(reg) = state.borrow_mut().resume_register.take() {
            frame.set(reg, sent);
        }

        let id = match self.push_execution_context(context.clone()) {
            Ok(id) => id,
            Err(error) => {
                let mut state = state.borrow_mut();
                state.status = suspended;
                state.context = Some(context);
                state.frame = Some(frame);
                return Err(error);
            }
        };
        let result = self.run_executable(&executable, frame);
        let context = self.pop_execution_context(id);

        let mut state = state.borrow_mut();
        match result {
            Ok(VmResult::Yield {
                value,
                frame,
                resume_register,
            }) => {
                state.status = GeneratorStatus::SuspendedYield;
                state.context = Some(context);
                state.frame = Some(frame);
                state.resume_register = Some(resume_register);
                drop(state);
                Ok(self.create_iter_result(value, false))
            }
            Ok(VmResult::Complete(value)) => {
                state.status = GeneratorStatus::Completed;
                drop(state);
                Ok(self.create_iter_result(value, true))
            }
            Err(error) => {
                state.status = GeneratorStatus::Completed;
                Err(error)
            }
        }
    }

    /// CreateIterResultObject
    fn create_iter_result(&self, value: JsValue, done: bool) -> JsValue {
        let realm = self.realm_or_fatal();
        let result = create_object(Some(realm.intrinsics().object_prototype.cheap_clone()));
        {
            let mut result = result.borrow_mut();
            result.set_property(PropertyKey::from("value"), value);
            result.set_property(PropertyKey::from("done"), JsValue::Boolean(done));
        }
        JsValue::Object(result)
    }
}

/// Status of a generator object; `None` for other values
pub fn generator_status(value: &JsValue) -> Option<GeneratorStatus> {
    let state = generator_state(value.as_object()?)?;
    let status = state.borrow().status;
    Some(status)
}

/// %GeneratorPrototype%.next
pub fn generator_prototype_next(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let JsValue::Object(generator) = &this else {
        return Err(JsError::type_error(ErrorType::NotAnObject, this.to_js_string()));
    };
    interp.generator_resume(generator, args.first().cloned().unwrap_or_default())
}
