//! Realms and their intrinsic objects

use crate::env::{EnvRef, Environment};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::interpreter::generator::generator_prototype_next;
use crate::prelude::*;
use crate::value::{
    CheapClone, ExoticObject, JsFunction, JsObject, JsObjectRef, JsString, JsValue,
    NativeFunction, NativeFn, Property, PropertyKey, create_object,
};

/// Intrinsic prototypes used when creating objects in a realm
#[derive(Debug)]
pub struct Intrinsics {
    pub object_prototype: JsObjectRef,
    pub function_prototype: JsObjectRef,
    /// %GeneratorFunction.prototype%
    pub generator_function_prototype: JsObjectRef,
    /// %AsyncFunction.prototype%
    pub async_function_prototype: JsObjectRef,
    /// %GeneratorPrototype%, the prototype of generator objects
    pub generator_prototype: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub promise_prototype: JsObjectRef,
    pub error_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
}

impl Intrinsics {
    fn new() -> Self {
        let object_prototype = create_object(None);
        let derived = || create_object(Some(object_prototype.cheap_clone()));

        let function_prototype = derived();
        let generator_function_prototype =
            create_object(Some(function_prototype.cheap_clone()));
        let async_function_prototype = create_object(Some(function_prototype.cheap_clone()));

        let generator_prototype = derived();
        let next = native_function(
            &function_prototype,
            "next",
            1,
            generator_prototype_next,
        );
        generator_prototype
            .borrow_mut()
            .define_property(PropertyKey::from("next"), Property::hidden(JsValue::Object(next)));
        generator_function_prototype.borrow_mut().define_property(
            PropertyKey::from("prototype"),
            Property::readonly(JsValue::Object(generator_prototype.cheap_clone())),
        );

        let error_prototype = derived();
        {
            let mut proto = error_prototype.borrow_mut();
            proto.define_property(PropertyKey::from("name"), Property::hidden(JsValue::from("Error")));
            proto.define_property(PropertyKey::from("message"), Property::hidden(JsValue::from("")));
        }

        Self {
            array_prototype: derived(),
            promise_prototype: derived(),
            boolean_prototype: derived(),
            number_prototype: derived(),
            string_prototype: derived(),
            object_prototype,
            function_prototype,
            generator_function_prototype,
            async_function_prototype,
            generator_prototype,
            error_prototype,
        }
    }

    fn all(&self) -> [&JsObjectRef; 11] {
        [
            &self.object_prototype,
            &self.function_prototype,
            &self.generator_function_prototype,
            &self.async_function_prototype,
            &self.generator_prototype,
            &self.array_prototype,
            &self.promise_prototype,
            &self.error_prototype,
            &self.boolean_prototype,
            &self.number_prototype,
            &self.string_prototype,
        ]
    }
}

/// Create a native function object with `length` and `name`
pub fn native_function(
    function_prototype: &JsObjectRef,
    name: &str,
    arity: u32,
    func: NativeFn,
) -> JsObjectRef {
    let mut obj = JsObject::with_prototype(function_prototype.cheap_clone());
    obj.define_property(
        PropertyKey::from("length"),
        Property::readonly(JsValue::Number(f64::from(arity))),
    );
    obj.define_property(PropertyKey::from("name"), Property::readonly(JsValue::from(name)));
    obj.exotic = ExoticObject::Function(JsFunction::Native(NativeFunction {
        name: JsString::from(name),
        func,
        arity,
    }));
    obj.into_ref()
}

/// A global environment plus its intrinsic objects
#[derive(Debug)]
pub struct Realm {
    global_object: JsObjectRef,
    global_env: EnvRef,
    intrinsics: Intrinsics,
}

impl Realm {
    pub fn new() -> Rc<Realm> {
        let intrinsics = Intrinsics::new();
        let global_object = create_object(Some(intrinsics.object_prototype.cheap_clone()));
        let global_env = Environment::new_global(global_object.cheap_clone());
        Rc::new(Realm {
            global_object,
            global_env,
            intrinsics,
        })
    }

    pub fn global_env(&self) -> &EnvRef {
        &self.global_env
    }

    /// The global `this` value (the global object)
    pub fn global_this(&self) -> &JsObjectRef {
        &self.global_object
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }
}

impl Trace for Realm {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        visitor.visit(GcEdge::Object(self.global_object.cheap_clone()));
        visitor.visit(GcEdge::Environment(self.global_env.cheap_clone()));
        for proto in self.intrinsics.all() {
            visitor.visit(GcEdge::Object(proto.cheap_clone()));
        }
    }
}
