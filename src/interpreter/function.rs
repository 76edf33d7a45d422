//! Script function objects
//!
//! A `ScriptFunction` is the closure record behind a callable object: the
//! shared function node, the environment it closed over, and the derived
//! flags (`this` mode, constructor kind, strictness) that the call machinery
//! consults. The compiled executable is memoized per closure.

use crate::ast::{FunctionKind, FunctionNode, FunctionParameter};
use crate::compiler::Executable;
use crate::env::{EnvRef, PrivateEnvironment};
use crate::error::{JsError, invariant_violation};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::interpreter::Interpreter;
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsString, JsValue, Property,
    PropertyKey, create_object,
};
use once_cell::unsync::OnceCell;

/// How `this` is bound on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisMode {
    /// Arrow functions
    Lexical,
    /// `this` is taken as passed
    Strict,
    /// Nullish `this` becomes the global this, primitives are boxed
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorKind {
    Base,
    /// Class with `extends`; `this` is bound by `super(...)`
    Derived,
}

/// A class field definition carried by its constructor
#[derive(Debug, Clone)]
pub struct ClassFieldDefinition {
    pub key: PropertyKey,
    /// Called with the instance as `this`; `None` defines `undefined`
    pub initializer: Option<JsObjectRef>,
}

pub struct ScriptFunction {
    node: Rc<FunctionNode>,
    name: RefCell<JsString>,
    renamed: Cell<bool>,
    environment: EnvRef,
    private_environment: Option<Rc<PrivateEnvironment>>,
    realm: Option<Rc<Realm>>,
    strict: bool,
    this_mode: ThisMode,
    constructor_kind: ConstructorKind,
    is_class_constructor: bool,
    has_construct: bool,
    home_object: Option<JsObjectRef>,
    fields: RefCell<Vec<ClassFieldDefinition>>,
    executable: OnceCell<Rc<Executable>>,
}

impl ScriptFunction {
    pub fn node(&self) -> &Rc<FunctionNode> {
        &self.node
    }

    pub fn kind(&self) -> FunctionKind {
        self.node.kind
    }

    pub fn name(&self) -> JsString {
        self.name.borrow().cheap_clone()
    }

    pub fn environment(&self) -> &EnvRef {
        &self.environment
    }

    pub fn private_environment(&self) -> Option<&Rc<PrivateEnvironment>> {
        self.private_environment.as_ref()
    }

    /// `None` for closures created without a realm
    pub fn realm(&self) -> Option<&Rc<Realm>> {
        self.realm.as_ref()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn this_mode(&self) -> ThisMode {
        self.this_mode
    }

    pub fn constructor_kind(&self) -> ConstructorKind {
        self.constructor_kind
    }

    pub fn is_class_constructor(&self) -> bool {
        self.is_class_constructor
    }

    /// Whether the function has a [[Construct]] internal method
    pub fn is_constructor(&self) -> bool {
        self.has_construct
    }

    pub fn home_object(&self) -> Option<&JsObjectRef> {
        self.home_object.as_ref()
    }

    pub fn formal_parameters(&self) -> &[FunctionParameter] {
        &self.node.parameters
    }

    pub fn has_simple_parameter_list(&self) -> bool {
        self.node.has_simple_parameter_list()
    }

    /// Snapshot of the class field definitions
    pub fn fields(&self) -> Vec<ClassFieldDefinition> {
        self.fields.borrow().clone()
    }

    /// Append a class field definition
    pub fn add_field(&self, key: PropertyKey, initializer: Option<JsObjectRef>) {
        self.fields.borrow_mut().push(ClassFieldDefinition { key, initializer });
    }

    /// The compiled body, if it has been compiled
    pub fn executable(&self) -> Option<&Rc<Executable>> {
        self.executable.get()
    }

    /// Compile on first use; later calls reuse the same executable
    pub(crate) fn executable_or_compile(
        &self,
        compile: impl FnOnce() -> Result<Executable, JsError>,
    ) -> Result<Rc<Executable>, JsError> {
        self.executable
            .get_or_try_init(|| compile().map(Rc::new))
            .map(CheapClone::cheap_clone)
    }

    /// OrdinaryFunctionCreate + MakeConstructor, returning the function object
    pub fn create(realm: &Rc<Realm>, parts: ClosureParts) -> JsObjectRef {
        let intrinsics = realm.intrinsics();
        let node = parts.node;
        let strict = parts.strict || node.is_strict;
        let this_mode = if node.is_arrow {
            ThisMode::Lexical
        } else if strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        };
        let has_construct = node.kind == FunctionKind::Regular && !node.is_arrow && !parts.is_method;
        let name = parts.name.or_else(|| node.name.clone()).unwrap_or_default();

        let prototype = parts.prototype.unwrap_or_else(|| match node.kind {
            FunctionKind::Regular => intrinsics.function_prototype.cheap_clone(),
            FunctionKind::Generator => intrinsics.generator_function_prototype.cheap_clone(),
            FunctionKind::Async => intrinsics.async_function_prototype.cheap_clone(),
        });

        let kind = node.kind;
        let length = node.function_length;
        let is_class_constructor = parts.is_class_constructor;
        let func = Rc::new(ScriptFunction {
            node,
            name: RefCell::new(name.cheap_clone()),
            renamed: Cell::new(false),
            environment: parts.environment,
            private_environment: parts.private_environment,
            realm: if parts.detached { None } else { Some(realm.cheap_clone()) },
            strict,
            this_mode,
            constructor_kind: parts.constructor_kind,
            is_class_constructor,
            has_construct,
            home_object: parts.home_object,
            fields: RefCell::new(Vec::new()),
            executable: OnceCell::new(),
        });

        let mut obj = JsObject::with_prototype(prototype);
        obj.define_property(
            PropertyKey::from("length"),
            Property::readonly(JsValue::Number(f64::from(length))),
        );
        obj.define_property(PropertyKey::from("name"), Property::readonly(JsValue::String(name)));
        obj.exotic = ExoticObject::Function(JsFunction::Script(func));
        let obj = obj.into_ref();

        // Class constructors get their prototype from the class definition
        let own_prototype = match kind {
            FunctionKind::Regular if has_construct && !is_class_constructor => {
                let proto = create_object(Some(intrinsics.object_prototype.cheap_clone()));
                proto.borrow_mut().define_property(
                    PropertyKey::from("constructor"),
                    Property::hidden(JsValue::Object(obj.cheap_clone())),
                );
                Some(proto)
            }
            FunctionKind::Generator => Some(create_object(Some(
                intrinsics.generator_prototype.cheap_clone(),
            ))),
            FunctionKind::Regular | FunctionKind::Async => None,
        };
        if let Some(proto) = own_prototype {
            obj.borrow_mut().define_property(
                PropertyKey::from("prototype"),
                Property::with_attributes(JsValue::Object(proto), true, false, false),
            );
        }
        obj
    }
}

/// SetFunctionName for anonymous function definitions.
///
/// A function is renamed at most once, and never to the empty string.
pub fn rename(function_object: &JsObjectRef, name: JsString) {
    let Some(func) = function_object.borrow().as_script_function() else {
        invariant_violation("renaming an object that is not a script function");
    };
    if name.is_empty() {
        invariant_violation("renaming a function to the empty string");
    }
    if func.renamed.replace(true) {
        invariant_violation("renaming a function twice");
    }
    *func.name.borrow_mut() = name.cheap_clone();
    function_object
        .borrow_mut()
        .define_property(PropertyKey::from("name"), Property::readonly(JsValue::String(name)));
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name.borrow())
            .field("kind", &self.node.kind)
            .field("strict", &self.strict)
            .field("this_mode", &self.this_mode)
            .field("constructor_kind", &self.constructor_kind)
            .field("is_class_constructor", &self.is_class_constructor)
            .field("compiled", &self.executable.get().is_some())
            .finish()
    }
}

impl Trace for ScriptFunction {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        visitor.visit(GcEdge::Environment(self.environment.cheap_clone()));
        if let Some(private_env) = &self.private_environment {
            visitor.visit(GcEdge::PrivateEnvironment(private_env.cheap_clone()));
        }
        if let Some(realm) = &self.realm {
            visitor.visit(GcEdge::Realm(realm.cheap_clone()));
        }
        if let Some(home) = &self.home_object {
            visitor.visit(GcEdge::Object(home.cheap_clone()));
        }
        for field in self.fields.borrow().iter() {
            if let Some(init) = &field.initializer {
                visitor.visit(GcEdge::Object(init.cheap_clone()));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Closure creation
// ═══════════════════════════════════════════════════════════════════════════════

/// Inputs to closure creation
pub struct ClosureParts {
    pub node: Rc<FunctionNode>,
    pub environment: EnvRef,
    /// Overrides the node's own name
    pub name: Option<JsString>,
    pub private_environment: Option<Rc<PrivateEnvironment>>,
    /// Realm to create in; defaults to the running realm
    pub realm: Option<Rc<Realm>>,
    /// Don't record a realm on the function
    pub detached: bool,
    /// Strictness of the code creating the function
    pub strict: bool,
    pub home_object: Option<JsObjectRef>,
    pub constructor_kind: ConstructorKind,
    pub is_class_constructor: bool,
    /// Methods and field initializers never get [[Construct]]
    pub is_method: bool,
    /// Overrides the intrinsic [[Prototype]] for the function's kind
    pub prototype: Option<JsObjectRef>,
}

impl ClosureParts {
    pub fn new(node: Rc<FunctionNode>, environment: EnvRef) -> Self {
        Self {
            node,
            environment,
            name: None,
            private_environment: None,
            realm: None,
            detached: false,
            strict: false,
            home_object: None,
            constructor_kind: ConstructorKind::Base,
            is_class_constructor: false,
            is_method: false,
            prototype: None,
        }
    }

    pub fn named(mut self, name: JsString) -> Self {
        self.name = Some(name);
        self
    }

    pub fn private_environment(mut self, private_environment: Option<Rc<PrivateEnvironment>>) -> Self {
        self.private_environment = private_environment;
        self
    }

    pub fn realm(mut self, realm: Rc<Realm>) -> Self {
        self.realm = Some(realm);
        self
    }

    pub fn without_realm(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn home_object(mut self, home_object: JsObjectRef) -> Self {
        self.home_object = Some(home_object);
        self
    }

    pub fn class_constructor(mut self, kind: ConstructorKind) -> Self {
        self.is_class_constructor = true;
        self.constructor_kind = kind;
        self
    }

    pub fn method(mut self) -> Self {
        self.is_method = true;
        self
    }

    pub fn prototype(mut self, prototype: JsObjectRef) -> Self {
        self.prototype = Some(prototype);
        self
    }
}

impl Interpreter {
    /// Create a function object in the given or running realm
    pub fn create_closure(&self, parts: ClosureParts) -> JsObjectRef {
        let realm = match &parts.realm {
            Some(realm) => realm.cheap_clone(),
            None => self
                .current_realm()
                .unwrap_or_else(|| invariant_violation("creating a closure without a realm")),
        };
        let func = ScriptFunction::create(&realm, parts);
        tracing::trace!(name = %function_name(&func), "created closure");
        func
    }
}

fn function_name(obj: &JsObjectRef) -> JsString {
    match &obj.borrow().exotic {
        ExoticObject::Function(f) => f.name(),
        _ => JsString::default(),
    }
}
