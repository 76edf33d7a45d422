//! Function invocation and lexical environment engine for an ECMAScript runtime
//!
//! Given a closure and an argument list, the engine builds the activation
//! (execution context, function environment, `this` binding), instantiates
//! parameters and declarations in specification order, runs the body with
//! the configured evaluator and routes the completion back to the caller.
//! Generator and async bodies are bootstrapped into generator objects and
//! promise capabilities.
//!
//! Programs are built as ASTs; there is no parser in this crate.
//!
//! # Example
//!
//! ```
//! use jscall::ast::build::*;
//! use jscall::{Interpreter, JsValue};
//!
//! let mut interp = Interpreter::new();
//! let program = script(vec![
//!     function_decl("add", function(None, vec![param("a"), param("b")], vec![ret(add(ident("a"), ident("b")))])),
//!     expr(call(ident("add"), vec![num(1.0), num(2.0)])),
//! ]);
//! assert_eq!(interp.evaluate_script(&program).unwrap(), JsValue::Number(3.0));
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod env;
pub mod error;
pub mod gc;
pub mod hoist;
pub mod interpreter;
pub mod prelude;
pub mod realm;
pub mod value;

pub use config::{Config, EvaluationStrategy};
pub use error::{ErrorType, JsError};
pub use interpreter::{Completion, ExecutionContext, Interpreter, ScriptFunction};
pub use realm::Realm;
pub use value::{CheapClone, JsObjectRef, JsString, JsValue};
