//! Error types for the invocation engine
//!
//! Language-level failures travel as `Err(JsError)` through every fallible
//! operation. There is no separate pending-exception flag: a throw completion
//! exists exactly when a `Result` is `Err`.

use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{JsObject, JsString, JsValue, Property, PropertyKey};
use thiserror::Error;

/// Kinds of engine-raised errors, each with a message template.
///
/// A `{}` in the template is replaced by the detail passed when the error is
/// raised (usually a binding or function name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    ClassConstructorWithoutNew,
    DerivedConstructorReturningInvalidValue,
    NotImplemented,
    NotAFunction,
    NotAConstructor,
    BindingNotInitialized,
    UnknownIdentifier,
    InvalidAssignToConst,
    ThisHasNotBeenInitialized,
    ThisIsAlreadyInitialized,
    ToObjectNullOrUndefined,
    CallStackSizeExceeded,
    GeneratorAlreadyRunning,
    AwaitOnPendingPromise,
    SuperCallOutsideDerivedConstructor,
    PromiseSelfResolution,
    ReadOnlyProperty,
    NotAnObject,
    Redeclaration,
    InvalidArrayLength,
}

impl ErrorType {
    fn template(self) -> &'static str {
        match self {
            ErrorType::ClassConstructorWithoutNew => {
                "Class constructor {} cannot be invoked without 'new'"
            }
            ErrorType::DerivedConstructorReturningInvalidValue => {
                "Derived constructor return invalid value"
            }
            ErrorType::NotImplemented => "{} is not supported",
            ErrorType::NotAFunction => "{} is not a function",
            ErrorType::NotAConstructor => "{} is not a constructor",
            ErrorType::BindingNotInitialized => "Binding {} is not initialized",
            ErrorType::UnknownIdentifier => "'{}' is not defined",
            ErrorType::InvalidAssignToConst => "Invalid assignment to const variable {}",
            ErrorType::ThisHasNotBeenInitialized => "|this| has not been initialized",
            ErrorType::ThisIsAlreadyInitialized => "|this| is already initialized",
            ErrorType::ToObjectNullOrUndefined => "ToObject on null or undefined",
            ErrorType::CallStackSizeExceeded => "Maximum call stack size exceeded",
            ErrorType::GeneratorAlreadyRunning => "Generator is already running",
            ErrorType::AwaitOnPendingPromise => "Awaited promise can never settle",
            ErrorType::SuperCallOutsideDerivedConstructor => "'super' keyword unexpected here",
            ErrorType::PromiseSelfResolution => "Cannot resolve promise with itself",
            ErrorType::ReadOnlyProperty => "Cannot assign to read-only property {}",
            ErrorType::NotAnObject => "{} is not an object",
            ErrorType::Redeclaration => "Identifier '{}' has already been declared",
            ErrorType::InvalidArrayLength => "Invalid array length {}",
        }
    }

    /// Render the message for this kind with the given detail.
    pub fn message(self, detail: &str) -> String {
        self.template().replacen("{}", detail, 1)
    }
}

/// Main error type for the engine
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("TypeError: {message}")]
    TypeError { kind: ErrorType, message: String },

    #[error("ReferenceError: {message}")]
    ReferenceError { kind: ErrorType, message: String },

    #[error("RangeError: {message}")]
    RangeError { kind: ErrorType, message: String },

    #[error("SyntaxError: {message}")]
    SyntaxError { kind: ErrorType, message: String },

    /// The body's kind cannot run under the active evaluation strategy, or the
    /// compiler met a construct it does not lower.
    #[error("InternalError: {message}")]
    InternalError { kind: ErrorType, message: String },

    /// A value thrown by user code.
    #[error("Uncaught {0:?}")]
    Thrown(JsValue),
}

impl JsError {
    pub fn type_error(kind: ErrorType, detail: impl AsRef<str>) -> Self {
        JsError::TypeError {
            kind,
            message: kind.message(detail.as_ref()),
        }
    }

    pub fn reference_error(kind: ErrorType, detail: impl AsRef<str>) -> Self {
        JsError::ReferenceError {
            kind,
            message: kind.message(detail.as_ref()),
        }
    }

    pub fn range_error(kind: ErrorType, detail: impl AsRef<str>) -> Self {
        JsError::RangeError {
            kind,
            message: kind.message(detail.as_ref()),
        }
    }

    pub fn syntax_error(kind: ErrorType, detail: impl AsRef<str>) -> Self {
        JsError::SyntaxError {
            kind,
            message: kind.message(detail.as_ref()),
        }
    }

    pub fn internal_error(kind: ErrorType, detail: impl AsRef<str>) -> Self {
        JsError::InternalError {
            kind,
            message: kind.message(detail.as_ref()),
        }
    }

    /// Shorthand for the unsupported-combination errors of the body dispatcher.
    pub fn not_implemented(what: impl AsRef<str>) -> Self {
        Self::internal_error(ErrorType::NotImplemented, what)
    }

    /// Create an error that wraps a thrown value
    pub fn thrown(value: JsValue) -> Self {
        JsError::Thrown(value)
    }

    /// The engine error kind, or `None` for user-thrown values.
    pub fn kind(&self) -> Option<ErrorType> {
        match self {
            JsError::TypeError { kind, .. }
            | JsError::ReferenceError { kind, .. }
            | JsError::RangeError { kind, .. }
            | JsError::SyntaxError { kind, .. }
            | JsError::InternalError { kind, .. } => Some(*kind),
            JsError::Thrown(_) => None,
        }
    }

    /// Constructor name of the error object this error materializes as.
    pub fn name(&self) -> &'static str {
        match self {
            JsError::TypeError { .. } => "TypeError",
            JsError::ReferenceError { .. } => "ReferenceError",
            JsError::RangeError { .. } => "RangeError",
            JsError::SyntaxError { .. } => "SyntaxError",
            JsError::InternalError { .. } => "InternalError",
            JsError::Thrown(_) => "Error",
        }
    }

    /// Extract the thrown value, creating an error object in `realm` for
    /// engine-raised errors.
    pub fn to_value(&self, realm: &Realm) -> JsValue {
        let message = match self {
            JsError::Thrown(value) => return value.clone(),
            JsError::TypeError { message, .. }
            | JsError::ReferenceError { message, .. }
            | JsError::RangeError { message, .. }
            | JsError::SyntaxError { message, .. }
            | JsError::InternalError { message, .. } => message,
        };
        let mut error = JsObject::with_prototype(realm.intrinsics().error_prototype.clone());
        error.define_property(
            PropertyKey::from("name"),
            Property::hidden(JsValue::String(JsString::from(self.name()))),
        );
        error.define_property(
            PropertyKey::from("message"),
            Property::hidden(JsValue::String(JsString::from(message.as_str()))),
        );
        JsValue::Object(Rc::new(RefCell::new(error)))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown evaluation strategy '{0}'")]
    UnknownStrategy(String),

    #[error("invalid value '{value}' for {variable}")]
    InvalidVariable { variable: &'static str, value: String },
}

/// Abort on a state the invocation algorithms define as impossible.
///
/// These are engine bugs, never user errors, so they are not propagated.
#[cold]
#[track_caller]
pub(crate) fn invariant_violation(message: &str) -> ! {
    tracing::error!(message, "invariant violation");
    #[allow(clippy::panic)]
    {
        panic!("invariant violation: {message}")
    }
}
