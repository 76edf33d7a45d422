//! JavaScript value representation
//!
//! The core JsValue type and the minimal object model the invocation engine
//! needs: ordinary objects, arrays, function objects, arguments objects,
//! primitive wrappers, promises and generators.

use crate::env::EnvRef;
use crate::error::{ErrorType, JsError};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::interpreter::Interpreter;
use crate::interpreter::function::ScriptFunction;
use crate::interpreter::generator::GeneratorState;
use crate::interpreter::promise::{PromiseState, ResolvingFunction};
use crate::prelude::*;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data).
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl CheapClone for JsValue {}

impl JsValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Convert to number (ToNumber) without invoking user code
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => {
                let trimmed = s.as_str().trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Primitive(inner) => inner.to_number(),
                _ => f64::NAN,
            },
        }
    }

    /// Convert to string (ToString) without invoking user code
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => number_to_js_string(*n),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Primitive(inner) => inner.to_js_string(),
                ExoticObject::Function(_) => JsString::from("function"),
                _ => JsString::from("[object Object]"),
            },
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN falls out of f64 comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn number_to_js_string(n: f64) -> JsString {
    if n.is_nan() {
        JsString::from("NaN")
    } else if n.is_infinite() {
        if n > 0.0 {
            JsString::from("Infinity")
        } else {
            JsString::from("-Infinity")
        }
    } else if n == 0.0 {
        JsString::from("0")
    } else {
        JsString::from(n.to_string())
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => match obj.try_borrow() {
                Ok(obj) => match &obj.exotic {
                    ExoticObject::Ordinary => write!(f, "{{...}}"),
                    ExoticObject::Array => write!(f, "[...]"),
                    ExoticObject::Function(func) => {
                        write!(f, "[Function: {}]", func.name())
                    }
                    ExoticObject::Arguments(_) => write!(f, "[Arguments]"),
                    ExoticObject::Primitive(inner) => write!(f, "[Wrapper {:?}]", inner),
                    ExoticObject::Promise(_) => write!(f, "Promise {{...}}"),
                    ExoticObject::Generator(_) => write!(f, "Object [Generator] {{}}"),
                },
                Err(_) => write!(f, "{{<borrowed>}}"),
            },
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Reference-counted immutable string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JsString(Rc<str>);

impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::ops::Deref for JsString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(Rc::from(s))
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(Rc::from(s.as_str()))
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &*self.0)
    }
}

impl serde::Serialize for JsString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, rhs: &JsString) -> Self::Output {
        let mut s = String::with_capacity(self.len() + rhs.len());
        s.push_str(self.as_str());
        s.push_str(rhs.as_str());
        JsString::from(s)
    }
}

/// Shared, mutable reference to a JavaScript object
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// A JavaScript object
#[derive(Debug)]
pub struct JsObject {
    /// Prototype link
    pub prototype: Option<JsObjectRef>,
    /// Whether the object can have properties added
    pub extensible: bool,
    /// Own properties, in definition order
    pub properties: IndexMap<PropertyKey, Property>,
    /// Exotic object behavior
    pub exotic: ExoticObject,
}

impl JsObject {
    /// Create a new ordinary object with no prototype
    pub fn new() -> Self {
        Self {
            prototype: None,
            extensible: true,
            properties: index_map_new(),
            exotic: ExoticObject::Ordinary,
        }
    }

    /// Create a new ordinary object with a prototype
    pub fn with_prototype(prototype: JsObjectRef) -> Self {
        Self {
            prototype: Some(prototype),
            ..Self::new()
        }
    }

    /// Wrap in a shared reference
    pub fn into_ref(self) -> JsObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Check if this object is callable
    pub fn is_callable(&self) -> bool {
        matches!(self.exotic, ExoticObject::Function(_))
    }

    /// Check if this object has a [[Construct]] internal method
    pub fn is_constructor(&self) -> bool {
        match &self.exotic {
            ExoticObject::Function(JsFunction::Script(f)) => f.is_constructor(),
            _ => false,
        }
    }

    /// The script function behind this object, if it is one
    pub fn as_script_function(&self) -> Option<Rc<ScriptFunction>> {
        match &self.exotic {
            ExoticObject::Function(JsFunction::Script(f)) => Some(f.cheap_clone()),
            _ => None,
        }
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Look up a data property along the prototype chain (no exotic behaviour)
    pub fn get_property(&self, key: &PropertyKey) -> Option<JsValue> {
        if let Some(prop) = self.properties.get(key) {
            return Some(prop.value.clone());
        }
        let mut current = self.prototype.clone();
        while let Some(proto) = current {
            let proto_ref = proto.borrow();
            if let Some(prop) = proto_ref.properties.get(key) {
                return Some(prop.value.clone());
            }
            current = proto_ref.prototype.clone();
        }
        None
    }

    /// Create or overwrite an own property with the given attributes
    pub fn define_property(&mut self, key: PropertyKey, prop: Property) {
        self.properties.insert(key, prop);
    }

    /// CreateDataProperty: a writable, enumerable, configurable own property
    pub fn set_property(&mut self, key: PropertyKey, value: JsValue) {
        self.properties.insert(key, Property::data(value));
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Property key
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    /// ToPropertyKey for the primitive values the engine supports
    pub fn from_value(value: &JsValue) -> Self {
        match value {
            JsValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < u32::MAX as f64 => {
                PropertyKey::Index(*n as u32)
            }
            other => PropertyKey::from(other.to_js_string()),
        }
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::String(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::from(JsString::from(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        // Canonical array indices are stored as integers
        if let Ok(index) = s.as_str().parse::<u32>()
            && index.to_string() == s.as_str()
            && index != u32::MAX
        {
            return PropertyKey::Index(index);
        }
        PropertyKey::String(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        PropertyKey::Index(i)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Data property with attributes
#[derive(Debug, Clone)]
pub struct Property {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Property {
    /// Writable, enumerable, configurable data property
    pub fn data(value: JsValue) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Writable, non-enumerable, configurable (methods, `constructor`)
    pub fn hidden(value: JsValue) -> Self {
        Self {
            value,
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, configurable (`length`, `name` of functions)
    pub fn readonly(value: JsValue) -> Self {
        Self {
            value,
            writable: false,
            enumerable: false,
            configurable: true,
        }
    }

    pub fn with_attributes(
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value,
            writable,
            enumerable,
            configurable,
        }
    }
}

/// Exotic object behavior
#[derive(Debug)]
pub enum ExoticObject {
    Ordinary,
    /// Array exotic object; `length` is kept as an own property
    Array,
    Function(JsFunction),
    Arguments(ArgumentsData),
    /// Boolean/Number/String wrapper produced by ToObject
    Primitive(JsValue),
    Promise(Rc<RefCell<PromiseState>>),
    Generator(Rc<RefCell<GeneratorState>>),
}

/// Arguments object internal slots.
///
/// `mapped[i]` names the parameter binding index `i` aliases; unmapped
/// arguments objects have no entries and no environment.
#[derive(Debug)]
pub struct ArgumentsData {
    pub mapped: Vec<Option<JsString>>,
    pub env: Option<EnvRef>,
}

impl ArgumentsData {
    pub fn unmapped() -> Self {
        Self {
            mapped: Vec::new(),
            env: None,
        }
    }

    /// Binding name and environment an index is aliased to, if any
    fn mapping(&self, key: &PropertyKey) -> Option<(JsString, EnvRef)> {
        let index = key.as_index()? as usize;
        let name = self.mapped.get(index)?.as_ref()?;
        let env = self.env.as_ref()?;
        Some((name.cheap_clone(), env.cheap_clone()))
    }
}

/// Native function signature
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

/// Native Rust function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    pub arity: u32,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Function representation
#[derive(Debug, Clone)]
pub enum JsFunction {
    /// Closure created from a function node
    Script(Rc<ScriptFunction>),
    /// Native Rust function
    Native(NativeFunction),
    /// Promise resolve function (has internal [[Promise]] slot)
    PromiseResolve(ResolvingFunction),
    /// Promise reject function (has internal [[Promise]] slot)
    PromiseReject(ResolvingFunction),
}

impl JsFunction {
    pub fn name(&self) -> JsString {
        match self {
            JsFunction::Script(f) => f.name(),
            JsFunction::Native(f) => f.name.cheap_clone(),
            JsFunction::PromiseResolve(_) | JsFunction::PromiseReject(_) => JsString::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Object operations
// ═══════════════════════════════════════════════════════════════════════════════

/// [[Get]] with arguments-object aliasing
pub fn get(obj: &JsObjectRef, key: &PropertyKey) -> Result<JsValue, JsError> {
    let alias = match &obj.borrow().exotic {
        ExoticObject::Arguments(args) => args.mapping(key),
        _ => None,
    };
    if let Some((name, env)) = alias {
        return env.borrow().get_binding_value(&name, false);
    }
    Ok(obj.borrow().get_property(key).unwrap_or_default())
}

/// [[Set]] on an own data property, with arguments-object aliasing.
///
/// Assigning to a non-writable property throws in strict code and is ignored
/// otherwise.
pub fn set(obj: &JsObjectRef, key: PropertyKey, value: JsValue, strict: bool) -> Result<(), JsError> {
    let alias = match &obj.borrow().exotic {
        ExoticObject::Arguments(args) => args.mapping(&key),
        _ => None,
    };
    if let Some((name, env)) = alias {
        env.borrow_mut()
            .set_mutable_binding(&name, value.clone(), false)?;
    }

    let mut obj_ref = obj.borrow_mut();
    if let Some(prop) = obj_ref.properties.get_mut(&key) {
        if !prop.writable {
            if strict {
                return Err(JsError::type_error(
                    ErrorType::ReadOnlyProperty,
                    key.to_string(),
                ));
            }
            return Ok(());
        }
        prop.value = value;
        return Ok(());
    }
    if !obj_ref.extensible {
        return Ok(());
    }
    let grows_array = matches!(obj_ref.exotic, ExoticObject::Array);
    if grows_array && let Some(index) = key.as_index() {
        let length_key = PropertyKey::from("length");
        let length = obj_ref
            .properties
            .get(&length_key)
            .map(|p| p.value.to_number())
            .unwrap_or(0.0);
        if f64::from(index) >= length {
            obj_ref.define_property(
                length_key,
                Property::with_attributes(JsValue::Number(f64::from(index) + 1.0), true, false, false),
            );
        }
    }
    obj_ref.set_property(key, value);
    Ok(())
}

/// Create an ordinary object with the given prototype
pub fn create_object(prototype: Option<JsObjectRef>) -> JsObjectRef {
    let mut obj = JsObject::new();
    obj.prototype = prototype;
    obj.into_ref()
}

/// Create an array exotic object holding `elements`
pub fn create_array(prototype: JsObjectRef, elements: Vec<JsValue>) -> JsObjectRef {
    let mut arr = JsObject::with_prototype(prototype);
    arr.exotic = ExoticObject::Array;
    let len = elements.len();
    for (i, elem) in elements.into_iter().enumerate() {
        arr.set_property(PropertyKey::Index(i as u32), elem);
    }
    arr.define_property(
        PropertyKey::from("length"),
        Property::with_attributes(JsValue::Number(len as f64), true, false, false),
    );
    arr.into_ref()
}

/// Clamp a `length` value to the index range; NaN and negatives read as 0
pub(crate) fn array_index_length(length: f64) -> Result<u32, JsError> {
    if length.is_nan() || length <= 0.0 {
        return Ok(0);
    }
    let length = length.trunc();
    if length > f64::from(u32::MAX) {
        return Err(JsError::range_error(
            ErrorType::InvalidArrayLength,
            length.to_string(),
        ));
    }
    Ok(length as u32)
}

/// Read back the dense elements of an array-like object (`length` + indices)
pub fn array_like_to_vec(obj: &JsObjectRef) -> Result<Vec<JsValue>, JsError> {
    let length = array_index_length(get(obj, &PropertyKey::from("length"))?.to_number())?;
    (0..length)
        .map(|i| get(obj, &PropertyKey::Index(i)))
        .collect()
}

impl Trace for JsValue {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let JsValue::Object(obj) = self {
            visitor.visit(GcEdge::Object(obj.cheap_clone()));
        }
    }
}

impl Trace for JsObject {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        if let Some(proto) = &self.prototype {
            visitor.visit(GcEdge::Object(proto.cheap_clone()));
        }
        for prop in self.properties.values() {
            prop.value.visit_references(visitor);
        }
        match &self.exotic {
            ExoticObject::Ordinary | ExoticObject::Array => {}
            ExoticObject::Function(JsFunction::Script(f)) => f.visit_references(visitor),
            ExoticObject::Function(JsFunction::Native(_)) => {}
            ExoticObject::Function(
                JsFunction::PromiseResolve(resolving) | JsFunction::PromiseReject(resolving),
            ) => {
                visitor.visit(GcEdge::Object(resolving.promise.cheap_clone()));
            }
            ExoticObject::Arguments(args) => {
                if let Some(env) = &args.env {
                    visitor.visit(GcEdge::Environment(env.cheap_clone()));
                }
            }
            ExoticObject::Primitive(inner) => inner.visit_references(visitor),
            ExoticObject::Promise(state) => state.borrow().visit_references(visitor),
            ExoticObject::Generator(state) => state.borrow().visit_references(visitor),
        }
    }
}
