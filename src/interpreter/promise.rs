//! Promise capability and job queue
//!
//! Only the surface the async bootstrap needs: capabilities, the resolving
//! function pair with its shared already-resolved flag, thenable adoption and
//! a FIFO job queue. There is no `then` chaining API for user code.

use super::Interpreter;
use crate::error::{ErrorType, JsError};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::prelude::*;
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsValue, Property, PropertyKey,
    get,
};

/// Promise state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    Pending,
    Fulfilled,
    Rejected,
}

/// [[PromiseState]] and [[PromiseResult]] of a promise object
#[derive(Debug)]
pub struct PromiseState {
    pub status: PromiseStatus,
    pub result: Option<JsValue>,
    /// Promises that adopted this one while it was pending
    dependents: Vec<JsObjectRef>,
}

impl PromiseState {
    fn pending() -> Self {
        Self {
            status: PromiseStatus::Pending,
            result: None,
            dependents: Vec::new(),
        }
    }
}

impl Trace for PromiseState {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(result) = &self.result {
            result.visit_references(visitor);
        }
        for dependent in &self.dependents {
            visitor.visit(GcEdge::Object(dependent.cheap_clone()));
        }
    }
}

/// [[Promise]] and [[AlreadyResolved]] slots shared by a resolve/reject pair
#[derive(Debug, Clone)]
pub struct ResolvingFunction {
    pub promise: JsObjectRef,
    pub already_resolved: Rc<Cell<bool>>,
}

/// PromiseCapability record
#[derive(Debug, Clone)]
pub struct PromiseCapability {
    pub promise: JsObjectRef,
    pub resolve: JsObjectRef,
    pub reject: JsObjectRef,
}

/// Queued promise work
#[derive(Debug)]
pub(crate) enum Job {
    /// Settle `promise` like `source` once `source` settles
    Adopt { promise: JsObjectRef, source: JsObjectRef },
    /// PromiseResolveThenableJob
    CallThen {
        promise: JsObjectRef,
        thenable: JsValue,
        then: JsValue,
    },
}

impl Job {
    pub(crate) fn visit_references(&self, visitor: &mut dyn Visitor) {
        match self {
            Job::Adopt { promise, source } => {
                visitor.visit(GcEdge::Object(promise.cheap_clone()));
                visitor.visit(GcEdge::Object(source.cheap_clone()));
            }
            Job::CallThen { promise, thenable, then } => {
                visitor.visit(GcEdge::Object(promise.cheap_clone()));
                thenable.visit_references(visitor);
                then.visit_references(visitor);
            }
        }
    }
}

fn promise_state(obj: &JsObjectRef) -> Option<Rc<RefCell<PromiseState>>> {
    match &obj.borrow().exotic {
        ExoticObject::Promise(state) => Some(state.cheap_clone()),
        _ => None,
    }
}

/// Status and result of a promise object; `None` for non-promises
pub fn promise_status(obj: &JsObjectRef) -> Option<(PromiseStatus, JsValue)> {
    let state = promise_state(obj)?;
    let state = state.borrow();
    Some((state.status, state.result.clone().unwrap_or_default()))
}

impl Interpreter {
    /// NewPromiseCapability(%Promise%)
    pub fn new_promise_capability(&mut self) -> PromiseCapability {
        let realm = self.realm_or_fatal();
        let intrinsics = realm.intrinsics();
        let mut promise = JsObject::with_prototype(intrinsics.promise_prototype.cheap_clone());
        promise.exotic = ExoticObject::Promise(Rc::new(RefCell::new(PromiseState::pending())));
        let promise = promise.into_ref();
        let (resolve, reject) = create_resolving_functions(&intrinsics.function_prototype, &promise);
        PromiseCapability {
            promise,
            resolve,
            reject,
        }
    }

    /// Promise resolve function steps
    pub(crate) fn resolve_promise_function(
        &mut self,
        resolving: &ResolvingFunction,
        resolution: JsValue,
    ) -> Result<(), JsError> {
        if resolving.already_resolved.replace(true) {
            return Ok(());
        }
        let promise = &resolving.promise;

        let JsValue::Object(target) = &resolution else {
            self.settle(promise, PromiseStatus::Fulfilled, resolution);
            return Ok(());
        };
        if Rc::ptr_eq(target, promise) {
            let realm = self.realm_or_fatal();
            let error = JsError::type_error(ErrorType::PromiseSelfResolution, "").to_value(&realm);
            self.settle(promise, PromiseStatus::Rejected, error);
            return Ok(());
        }
        if promise_state(target).is_some() {
            self.enqueue_job(Job::Adopt {
                promise: promise.cheap_clone(),
                source: target.cheap_clone(),
            });
            return Ok(());
        }

        let then = match get(target, &PropertyKey::from("then")) {
            Ok(then) => then,
            Err(error) => {
                let realm = self.realm_or_fatal();
                self.settle(promise, PromiseStatus::Rejected, error.to_value(&realm));
                return Ok(());
            }
        };
        if then.is_callable() {
            self.enqueue_job(Job::CallThen {
                promise: promise.cheap_clone(),
                thenable: resolution.clone(),
                then,
            });
        } else {
            self.settle(promise, PromiseStatus::Fulfilled, resolution);
        }
        Ok(())
    }

    /// Promise reject function steps
    pub(crate) fn reject_promise_function(&mut self, resolving: &ResolvingFunction, reason: JsValue) {
        if resolving.already_resolved.replace(true) {
            return;
        }
        self.settle(&resolving.promise, PromiseStatus::Rejected, reason);
    }

    /// FulfillPromise / RejectPromise; pending adopters are queued
    fn settle(&mut self, promise: &JsObjectRef, status: PromiseStatus, value: JsValue) {
        let Some(state) = promise_state(promise) else {
            return;
        };
        let dependents = {
            let mut state = state.borrow_mut();
            if state.status != PromiseStatus::Pending {
                return;
            }
            state.status = status;
            state.result = Some(value);
            std::mem::take(&mut state.dependents)
        };
        tracing::trace!(?status, adopters = dependents.len(), "promise settled");
        for dependent in dependents {
            self.enqueue_job(Job::Adopt {
                promise: dependent,
                source: promise.cheap_clone(),
            });
        }
    }

    fn enqueue_job(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Drain the job queue in FIFO order, including jobs queued while running
    pub fn run_jobs(&mut self) -> Result<(), JsError> {
        while let Some(job) = self.jobs.pop_front() {
            match job {
                Job::Adopt { promise, source } => {
                    let Some(source_state) = promise_state(&source) else {
                        continue;
                    };
                    let settled = {
                        let mut state = source_state.borrow_mut();
                        if state.status == PromiseStatus::Pending {
                            state.dependents.push(promise.cheap_clone());
                            None
                        } else {
                            Some((state.status, state.result.clone().unwrap_or_default()))
                        }
                    };
                    if let Some((status, value)) = settled {
                        self.settle(&promise, status, value);
                    }
                }
                Job::CallThen { promise, thenable, then } => {
                    let realm = self.realm_or_fatal();
                    let (resolve, reject) =
                        create_resolving_functions(&realm.intrinsics().function_prototype, &promise);
                    let result = self.call(
                        &then,
                        thenable,
                        &[JsValue::Object(resolve), JsValue::Object(reject.cheap_clone())],
                    );
                    if let Err(error) = result {
                        let reason = error.to_value(&realm);
                        self.call(&JsValue::Object(reject), JsValue::Undefined, &[reason])?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// CreateResolvingFunctions: the pair shares one already-resolved flag
fn create_resolving_functions(
    function_prototype: &JsObjectRef,
    promise: &JsObjectRef,
) -> (JsObjectRef, JsObjectRef) {
    let slots = ResolvingFunction {
        promise: promise.cheap_clone(),
        already_resolved: Rc::new(Cell::new(false)),
    };
    let make = |function: JsFunction| {
        let mut obj = JsObject::with_prototype(function_prototype.cheap_clone());
        obj.define_property(PropertyKey::from("length"), Property::readonly(JsValue::Number(1.0)));
        obj.exotic = ExoticObject::Function(function);
        obj.into_ref()
    };
    (
        make(JsFunction::PromiseResolve(slots.clone())),
        make(JsFunction::PromiseReject(slots)),
    )
}
