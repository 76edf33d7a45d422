//! Arguments exotic objects

use crate::ast::{BindingTarget, FunctionParameter};
use crate::env::EnvRef;
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{
    ArgumentsData, CheapClone, ExoticObject, JsObject, JsObjectRef, JsString, JsValue, Property,
    PropertyKey,
};

/// CreateUnmappedArgumentsObject: a plain snapshot of the arguments
pub fn create_unmapped_arguments_object(realm: &Realm, args: &[JsValue]) -> JsObjectRef {
    let obj = new_arguments_object(realm, args, ArgumentsData::unmapped());
    obj.into_ref()
}

/// CreateMappedArgumentsObject: indices below both the argument count and
/// the parameter count alias the parameter bindings in `env`.
///
/// With duplicate parameter names the rightmost occurrence owns the binding.
pub fn create_mapped_arguments_object(
    realm: &Realm,
    function_object: &JsObjectRef,
    parameters: &[FunctionParameter],
    args: &[JsValue],
    env: &EnvRef,
) -> JsObjectRef {
    let mut mapped: Vec<Option<JsString>> = vec![None; args.len()];
    let mut mapped_names: FxHashSet<JsString> = FxHashSet::default();
    for (index, parameter) in parameters.iter().enumerate().rev() {
        let BindingTarget::Name(name) = &parameter.target else {
            continue;
        };
        if mapped_names.insert(name.cheap_clone())
            && let Some(slot) = mapped.get_mut(index)
        {
            *slot = Some(name.cheap_clone());
        }
    }

    let data = ArgumentsData {
        mapped,
        env: Some(env.cheap_clone()),
    };
    let mut obj = new_arguments_object(realm, args, data);
    obj.define_property(
        PropertyKey::from("callee"),
        Property::hidden(JsValue::Object(function_object.cheap_clone())),
    );
    obj.into_ref()
}

fn new_arguments_object(realm: &Realm, args: &[JsValue], data: ArgumentsData) -> JsObject {
    let mut obj = JsObject::with_prototype(realm.intrinsics().object_prototype.cheap_clone());
    obj.exotic = ExoticObject::Arguments(data);
    for (index, arg) in args.iter().enumerate() {
        obj.set_property(PropertyKey::Index(index as u32), arg.clone());
    }
    obj.define_property(
        PropertyKey::from("length"),
        Property::hidden(JsValue::Number(args.len() as f64)),
    );
    obj
}
