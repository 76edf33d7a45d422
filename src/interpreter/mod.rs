//! The interpreter: execution context stack, realm and evaluation strategy
//!
//! `Interpreter` plays the role of the agent. It owns the stack of execution
//! contexts, the default realm, the promise job queue and the process-wide
//! choice of body evaluator. Function invocation itself lives in [`call`],
//! declaration instantiation in [`instantiation`].

pub mod arguments;
pub mod async_fn;
pub mod bytecode_vm;
mod call;
pub mod class;
pub mod context;
pub mod function;
pub mod generator;
pub mod instantiation;
pub mod promise;
mod runtime;
mod tree;

pub use bytecode_vm::{Frame, VmResult};
pub use context::ExecutionContext;
pub use function::{ClassFieldDefinition, ClosureParts, ConstructorKind, ScriptFunction, ThisMode};
pub use generator::{GeneratorState, GeneratorStatus};
pub use promise::{PromiseCapability, PromiseState, PromiseStatus};

use crate::ast::Script;
use crate::config::{Config, EvaluationStrategy};
use crate::env::EnvRef;
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};
use promise::Job;

/// Completion record of body evaluation.
///
/// A throw completion is the `Err` side of the surrounding `Result`.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Fell off the end; carries the value of the last expression statement
    Normal(Option<JsValue>),
    Return(JsValue),
}

impl Completion {
    /// The value seen at a function boundary: `Normal` becomes undefined
    pub fn into_return_value(self) -> JsValue {
        match self {
            Completion::Normal(_) => JsValue::Undefined,
            Completion::Return(value) => value,
        }
    }
}

/// Counters exposed for introspection and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    /// Function bodies compiled to bytecode
    pub compilations: usize,
    /// Execution contexts pushed since creation
    pub contexts_pushed: usize,
}

/// Identifies one pushed execution context so pops can be checked
pub type ContextId = u64;

/// The interpreter state
pub struct Interpreter {
    /// Default realm; `None` only for detached interpreters
    realm: Option<Rc<Realm>>,
    /// Execution context stack, running context last
    context_stack: Vec<(ContextId, ExecutionContext)>,
    next_context_id: ContextId,
    config: Config,
    /// Pending promise jobs, drained by `run_jobs`
    jobs: VecDeque<Job>,
    stats: InterpreterStats,
}

impl Interpreter {
    /// Create an interpreter with a fresh realm and default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            realm: Some(Realm::new()),
            ..Self::detached(config)
        }
    }

    /// An interpreter without a default realm.
    ///
    /// Calls then rely on the realm each function carries.
    pub fn detached(config: Config) -> Self {
        Self {
            realm: None,
            context_stack: Vec::new(),
            next_context_id: 0,
            config,
            jobs: VecDeque::new(),
            stats: InterpreterStats::default(),
        }
    }

    /// The default realm
    pub fn realm(&self) -> Option<&Rc<Realm>> {
        self.realm.as_ref()
    }

    /// The running context's realm, or the default realm when idle
    pub fn current_realm(&self) -> Option<Rc<Realm>> {
        match self.context_stack.last() {
            Some((_, context)) => Some(context.realm.cheap_clone()),
            None => self.realm.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn evaluation_strategy(&self) -> EvaluationStrategy {
        self.config.strategy
    }

    /// Switch the body evaluator used by subsequent calls
    pub fn set_evaluation_strategy(&mut self, strategy: EvaluationStrategy) {
        self.config.strategy = strategy;
    }

    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Execution context stack
    // ═══════════════════════════════════════════════════════════════════════════════

    pub fn context_depth(&self) -> usize {
        self.context_stack.len()
    }

    pub fn running_context(&self) -> Option<&ExecutionContext> {
        self.context_stack.last().map(|(_, context)| context)
    }

    pub fn running_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.context_stack.last_mut().map(|(_, context)| context)
    }

    /// Push a context, making it the running one.
    ///
    /// Exceeding `max_call_depth` is a RangeError throw completion.
    pub fn push_execution_context(&mut self, context: ExecutionContext) -> Result<ContextId, JsError> {
        if self.context_stack.len() >= self.config.max_call_depth {
            return Err(JsError::range_error(ErrorType::CallStackSizeExceeded, ""));
        }
        let id = self.next_context_id;
        self.next_context_id += 1;
        self.stats.contexts_pushed += 1;
        tracing::trace!(
            depth = self.context_stack.len() + 1,
            function = %context.function_name,
            "push execution context"
        );
        self.context_stack.push((id, context));
        Ok(id)
    }

    /// Pop the running context, which must be the one pushed as `id`
    pub fn pop_execution_context(&mut self, id: ContextId) -> ExecutionContext {
        match self.context_stack.pop() {
            Some((top, context)) if top == id => {
                tracing::trace!(
                    depth = self.context_stack.len(),
                    function = %context.function_name,
                    "pop execution context"
                );
                context
            }
            Some(_) => invariant_violation("popping an execution context that is not running"),
            None => invariant_violation("popping from an empty execution context stack"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Scripts
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Run top-level code in the default realm's global environment.
    ///
    /// Returns the value of the last expression statement evaluated.
    pub fn evaluate_script(&mut self, script: &Script) -> Result<JsValue, JsError> {
        let Some(realm) = self.realm.clone() else {
            invariant_violation("evaluating a script without a realm");
        };
        let context = ExecutionContext::for_script(realm, script.is_strict);
        let id = self.push_execution_context(context)?;
        let result = self
            .global_declaration_instantiation(script)
            .and_then(|()| self.evaluate_statements(&script.body));
        self.pop_execution_context(id);
        Ok(match result? {
            Completion::Normal(value) => value.unwrap_or_default(),
            Completion::Return(value) => value,
        })
    }

    /// Read a binding of the default realm's global environment
    pub fn global_binding(&self, name: &str) -> Result<JsValue, JsError> {
        let Some(realm) = &self.realm else {
            return Err(JsError::reference_error(ErrorType::UnknownIdentifier, name));
        };
        realm.global_env().borrow().get_binding_value(name, true)
    }

    /// The global environment of the running (or default) realm
    pub fn global_env(&self) -> Option<EnvRef> {
        self.current_realm().map(|realm| realm.global_env().cheap_clone())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace for Interpreter {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(realm) = &self.realm {
            visitor.visit(GcEdge::Realm(realm.cheap_clone()));
        }
        for (_, context) in &self.context_stack {
            context.visit_references(visitor);
        }
        for job in &self.jobs {
            job.visit_references(visitor);
        }
    }
}
