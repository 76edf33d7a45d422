//! Class definitions and `super(...)`

use super::Interpreter;
use super::function::{ClosureParts, ConstructorKind};
use crate::ast::{ClassNode, FunctionNode};
use crate::env::{Environment, get_this_environment};
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::prelude::*;
use crate::value::{
    CheapClone, JsObjectRef, JsValue, Property, PropertyKey, create_object, get,
};

impl Interpreter {
    /// ClassDefinitionEvaluation.
    ///
    /// `heritage` is the already evaluated `extends` operand.
    pub(crate) fn class_definition_evaluation(
        &mut self,
        class: &ClassNode,
        heritage: Option<JsValue>,
    ) -> Result<JsObjectRef, JsError> {
        let realm = self.realm_or_fatal();
        let intrinsics = realm.intrinsics();
        let class_env = Environment::new_declarative(Some(self.lexical_environment()));
        if let Some(name) = &class.name {
            class_env
                .borrow_mut()
                .create_immutable_binding(name.cheap_clone(), true);
        }

        let (proto_parent, constructor_parent) = match &heritage {
            None => (
                Some(intrinsics.object_prototype.cheap_clone()),
                intrinsics.function_prototype.cheap_clone(),
            ),
            Some(JsValue::Null) => (None, intrinsics.function_prototype.cheap_clone()),
            Some(superclass) => {
                let parent = superclass
                    .as_object()
                    .filter(|obj| obj.borrow().is_constructor())
                    .cloned();
                let Some(parent) = parent else {
                    return Err(JsError::type_error(ErrorType::NotAConstructor, superclass.to_js_string()));
                };
                let proto_parent = match get(&parent, &PropertyKey::from("prototype"))? {
                    JsValue::Object(proto) => Some(proto),
                    JsValue::Null => None,
                    other => {
                        return Err(JsError::type_error(ErrorType::NotAnObject, other.to_js_string()));
                    }
                };
                (proto_parent, parent)
            }
        };

        let proto = create_object(proto_parent);
        let kind = if heritage.is_some() {
            ConstructorKind::Derived
        } else {
            ConstructorKind::Base
        };
        let constructor_node = class
            .constructor
            .clone()
            .unwrap_or_else(|| Rc::new(default_constructor(kind)));

        let private_environment = self.running_context().and_then(|c| c.private_environment.clone());
        let constructor = self.create_closure(
            ClosureParts::new(constructor_node, class_env.cheap_clone())
                .named(class.name.clone().unwrap_or_default())
                .private_environment(private_environment.clone())
                .prototype(constructor_parent)
                .home_object(proto.cheap_clone())
                .class_constructor(kind)
                .strict(true),
        );
        constructor.borrow_mut().define_property(
            PropertyKey::from("prototype"),
            Property::with_attributes(JsValue::Object(proto.cheap_clone()), false, false, false),
        );
        proto.borrow_mut().define_property(
            PropertyKey::from("constructor"),
            Property::hidden(JsValue::Object(constructor.cheap_clone())),
        );

        for method in &class.methods {
            let target = if method.is_static { &constructor } else { &proto };
            let closure = self.create_closure(
                ClosureParts::new(method.function.cheap_clone(), class_env.cheap_clone())
                    .named(method.key.cheap_clone())
                    .private_environment(private_environment.clone())
                    .home_object(target.cheap_clone())
                    .method()
                    .strict(true),
            );
            target.borrow_mut().define_property(
                PropertyKey::from(method.key.cheap_clone()),
                Property::hidden(JsValue::Object(closure)),
            );
        }

        let Some(constructor_function) = constructor.borrow().as_script_function() else {
            invariant_violation("class constructor is not a script function");
        };
        for field in &class.fields {
            let initializer = field.initializer.as_ref().map(|node| {
                self.create_closure(
                    ClosureParts::new(node.cheap_clone(), class_env.cheap_clone())
                        .named(field.key.cheap_clone())
                        .private_environment(private_environment.clone())
                        .home_object(proto.cheap_clone())
                        .method()
                        .strict(true),
                )
            });
            constructor_function.add_field(PropertyKey::from(field.key.cheap_clone()), initializer);
        }

        if let Some(name) = &class.name {
            class_env
                .borrow_mut()
                .initialize_binding(name, JsValue::Object(constructor.cheap_clone()));
        }
        tracing::trace!(
            name = class.name.as_ref().map_or("<anonymous>", |n| n.as_str()),
            derived = kind == ConstructorKind::Derived,
            methods = class.methods.len(),
            fields = class.fields.len(),
            "class definition"
        );
        Ok(constructor)
    }

    /// SuperCall: construct the parent with the current new.target, bind
    /// `this`, then run the field initializers
    pub(crate) fn super_call(&mut self, args: &[JsValue]) -> Result<JsValue, JsError> {
        let this_env = get_this_environment(&self.lexical_environment());
        let (active_function, new_target) = {
            let env = this_env.borrow();
            (env.function_object(), env.new_target())
        };
        let derived = active_function
            .as_ref()
            .and_then(|f| f.borrow().as_script_function())
            .is_some_and(|f| f.constructor_kind() == ConstructorKind::Derived);
        let Some(active_function) = active_function.filter(|_| derived && !new_target.is_undefined()) else {
            return Err(JsError::syntax_error(ErrorType::SuperCallOutsideDerivedConstructor, ""));
        };

        // GetSuperConstructor
        let parent = active_function
            .borrow()
            .prototype
            .clone()
            .filter(|p| p.borrow().is_constructor());
        let Some(parent) = parent else {
            return Err(JsError::type_error(ErrorType::NotAConstructor, "super constructor"));
        };

        let result = self.construct(&JsValue::Object(parent), args, Some(&new_target))?;
        this_env.borrow_mut().bind_this_value(result.clone())?;
        let JsValue::Object(instance) = &result else {
            invariant_violation("construct returned a non-object");
        };
        self.initialize_instance_elements(instance, &active_function)?;
        Ok(result)
    }
}

/// `constructor() {}` or `constructor(...args) { super(...args); }`
fn default_constructor(kind: ConstructorKind) -> FunctionNode {
    use crate::ast::build::*;
    let node = match kind {
        ConstructorKind::Base => function(None, vec![], vec![]),
        ConstructorKind::Derived => function(
            None,
            vec![rest("args")],
            vec![expr(super_call(vec![spread(ident("args"))]))],
        ),
    };
    node.strict()
}
