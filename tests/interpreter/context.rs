//! Execution context stack discipline

use super::{create_interpreter, create_test_interpreter};
use jscall::ast::build::*;
use jscall::realm::native_function;
use jscall::{EvaluationStrategy, Interpreter, JsError, JsString, JsValue};
use std::rc::Rc;

fn depth(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(interp.context_depth() as f64))
}

fn running_function(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let name = interp
        .running_context()
        .map(|context| context.function_name.clone())
        .unwrap_or_default();
    Ok(JsValue::String(name))
}

/// Whether the caller's body runs directly in its variable environment
fn shares_var_environment(interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let shared = interp
        .running_context()
        .is_some_and(|context| Rc::ptr_eq(&context.lexical_environment, &context.variable_environment));
    Ok(JsValue::Boolean(shared))
}

fn install_natives(interp: &Interpreter) {
    let realm = interp.realm().expect("realm").clone();
    let function_prototype = &realm.intrinsics().function_prototype;
    let mut global = realm.global_env().borrow_mut();
    let natives: [(&str, jscall::value::NativeFn); 3] = [
        ("depth", depth),
        ("runningFunction", running_function),
        ("sharesVarEnvironment", shares_var_environment),
    ];
    for (name, func) in natives {
        let native = native_function(function_prototype, name, 0, func);
        global.create_mutable_binding(JsString::from(name));
        global.initialize_binding(name, JsValue::Object(native));
    }
}

#[test]
fn test_native_calls_push_no_context() {
    for strategy in [EvaluationStrategy::TreeWalking, EvaluationStrategy::Compiled] {
        let mut interp = create_interpreter(strategy);
        install_natives(&interp);
        let result = interp
            .evaluate_script(&script(vec![
                function_decl("outer", function(None, vec![], vec![ret(call(ident("inner"), vec![]))])),
                function_decl("inner", function(None, vec![], vec![ret(call(ident("depth"), vec![]))])),
                expr(array(vec![call(ident("depth"), vec![]), call(ident("outer"), vec![])])),
            ]))
            .unwrap();
        let items = jscall::value::array_like_to_vec(result.as_object().unwrap()).unwrap();
        // script, then script + outer + inner
        assert_eq!(items, vec![JsValue::Number(1.0), JsValue::Number(3.0)]);
    }
}

#[test]
fn test_native_sees_calling_function_context() {
    let mut interp = create_test_interpreter();
    install_natives(&interp);
    let result = interp
        .evaluate_script(&script(vec![
            function_decl("caller", function(None, vec![], vec![ret(call(ident("runningFunction"), vec![]))])),
            expr(call(ident("caller"), vec![])),
        ]))
        .unwrap();
    assert_eq!(result, JsValue::from("caller"));
}

#[test]
fn test_lexical_environment_separate_only_when_needed() {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    install_natives(&interp);
    let check = || ret(call(ident("sharesVarEnvironment"), vec![]));
    let result = interp
        .evaluate_script(&script(vec![
            function_decl("plain", function(None, vec![param("a")], vec![var("v", Some(num(1.0))), check()])),
            function_decl("withLet", function(None, vec![], vec![let_("l", Some(num(1.0))), check()])),
            function_decl("withConst", function(None, vec![], vec![const_("c", num(1.0)), check()])),
            function_decl(
                "strictLet",
                function(None, vec![], vec![let_("l", Some(num(1.0))), check()]).strict(),
            ),
            expr(array(vec![
                call(ident("plain"), vec![]),
                call(ident("withLet"), vec![]),
                call(ident("withConst"), vec![]),
                call(ident("strictLet"), vec![]),
            ])),
        ]))
        .unwrap();
    let items = jscall::value::array_like_to_vec(result.as_object().unwrap()).unwrap();
    assert_eq!(
        items,
        vec![
            JsValue::Boolean(true),
            JsValue::Boolean(false),
            JsValue::Boolean(false),
            JsValue::Boolean(true),
        ]
    );
}

#[test]
fn test_stack_unwinds_after_throw() {
    for strategy in [EvaluationStrategy::TreeWalking, EvaluationStrategy::Compiled] {
        let mut interp = create_interpreter(strategy);
        let err = interp
            .evaluate_script(&script(vec![
                function_decl("a", function(None, vec![], vec![expr(call(ident("b"), vec![]))])),
                function_decl("b", function(None, vec![], vec![expr(call(ident("c"), vec![]))])),
                function_decl("c", function(None, vec![], vec![throw(num(1.0))])),
                expr(call(ident("a"), vec![])),
            ]))
            .unwrap_err();
        assert!(matches!(err, JsError::Thrown(JsValue::Number(n)) if n == 1.0));
        assert_eq!(interp.context_depth(), 0);
        // script, a, b, c
        assert_eq!(interp.stats().contexts_pushed, 4);
    }
}

#[test]
fn test_stack_unwinds_after_failed_instantiation() {
    let mut interp = create_test_interpreter();
    let err = interp
        .evaluate_script(&script(vec![
            function_decl("f", function(None, vec![param_default("a", ident("nope"))], vec![])),
            expr(call(ident("f"), vec![])),
        ]))
        .unwrap_err();
    assert_eq!(err.kind(), Some(jscall::ErrorType::UnknownIdentifier));
    assert_eq!(interp.context_depth(), 0);
}

#[test]
fn test_interpreter_usable_after_error() {
    let mut interp = create_test_interpreter();
    interp
        .evaluate_script(&script(vec![expr(call(ident("missing"), vec![]))]))
        .unwrap_err();
    let value = interp
        .evaluate_script(&script(vec![
            function_decl("ok", function(None, vec![], vec![ret(num(1.0))])),
            expr(call(ident("ok"), vec![])),
        ]))
        .unwrap();
    assert_eq!(value, JsValue::Number(1.0));
}
