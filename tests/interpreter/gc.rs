//! Reachability of captured environments

use super::create_test_interpreter;
use jscall::ast::build::*;
use jscall::gc::{GcEdge, Tracer, environment_chain};
use jscall::{CheapClone, JsValue};

#[test]
fn test_closure_reaches_captured_environment() {
    let mut interp = create_test_interpreter();
    interp
        .evaluate_script(&script(vec![
            function_decl(
                "make",
                function(
                    None,
                    vec![param("secret")],
                    vec![
                        let_("kept", Some(object(vec![("v", ident("secret"))]))),
                        ret(function_expr(arrow_expr(vec![], member(ident("kept"), "v")))),
                    ],
                ),
            ),
            var("getter", Some(call(ident("make"), vec![num(1.0)]))),
        ]))
        .unwrap();

    let JsValue::Object(getter) = interp.global_binding("getter").unwrap() else {
        panic!("getter is not an object");
    };
    let func = getter.borrow().as_script_function().expect("script function");
    let captured = func.environment().cheap_clone();

    let mut tracer = Tracer::new();
    tracer.trace(GcEdge::Object(getter.cheap_clone()));
    for env in environment_chain(&captured) {
        assert!(tracer.is_environment_reachable(&env));
    }

    let JsValue::Object(kept) = captured.borrow().get_binding_value("kept", true).unwrap() else {
        panic!("kept is not an object");
    };
    assert!(tracer.is_object_reachable(&kept));
}

#[test]
fn test_interpreter_roots_include_realm() {
    let interp = create_test_interpreter();
    let mut tracer = Tracer::new();
    tracer.trace_from(&interp);
    assert_eq!(tracer.stats().realms, 1);
    let global = interp.global_env().unwrap();
    assert!(tracer.is_environment_reachable(&global));
}
