//! Function objects: creation, naming, closures and the call protocol

use super::{eval, eval_result, js, prop};
use jscall::ast::build::*;
use jscall::{Config, ErrorType, EvaluationStrategy, Interpreter, JsValue};

#[test]
fn test_function_call() {
    assert_eq!(
        eval(vec![
            function_decl("add", function(None, vec![param("a"), param("b")], vec![ret(add(ident("a"), ident("b")))])),
            expr(call(ident("add"), vec![num(2.0), num(3.0)])),
        ]),
        JsValue::Number(5.0)
    );
}

#[test]
fn test_missing_return_is_undefined() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![], vec![expr(num(1.0))])),
            expr(call(ident("f"), vec![])),
        ]),
        JsValue::Undefined
    );
}

#[test]
fn test_function_name_property() {
    let result = eval(vec![
        function_decl("foo", function(None, vec![], vec![])),
        expr(ident("foo")),
    ]);
    assert_eq!(prop(&result, "name"), js("foo"));

    // Named function expression keeps its own name
    let result = eval(vec![
        const_("f", function_expr(function(Some("bar"), vec![], vec![]))),
        expr(ident("f")),
    ]);
    assert_eq!(prop(&result, "name"), js("bar"));
}

#[test]
fn test_function_name_from_binding() {
    let result = eval(vec![
        const_("myFunc", function_expr(function(None, vec![], vec![]))),
        expr(ident("myFunc")),
    ]);
    assert_eq!(prop(&result, "name"), js("myFunc"));

    let result = eval(vec![
        var("arrowFn", None),
        expr(assign(ident("arrowFn"), function_expr(arrow(vec![], vec![])))),
        expr(ident("arrowFn")),
    ]);
    assert_eq!(prop(&result, "name"), js("arrowFn"));

    // Object literal keys name their values
    let result = eval(vec![expr(member(
        object(vec![("method", function_expr(function(None, vec![], vec![])))]),
        "method",
    ))]);
    assert_eq!(prop(&result, "name"), js("method"));
}

#[test]
fn test_function_length_property() {
    let result = eval(vec![
        function_decl(
            "f",
            function(None, vec![param("a"), param("b"), param_default("c", num(1.0)), param("d")], vec![]),
        ),
        expr(ident("f")),
    ]);
    assert_eq!(prop(&result, "length"), JsValue::Number(2.0));

    let result = eval(vec![
        function_decl("g", function(None, vec![param("a"), rest("more")], vec![])),
        expr(ident("g")),
    ]);
    assert_eq!(prop(&result, "length"), JsValue::Number(1.0));
}

#[test]
fn test_closure_counter() {
    // function makeCounter() { let n = 0; return () => { n = n + 1; return n; }; }
    assert_eq!(
        eval(vec![
            function_decl(
                "makeCounter",
                function(
                    None,
                    vec![],
                    vec![
                        let_("n", Some(num(0.0))),
                        ret(function_expr(arrow(
                            vec![],
                            vec![expr(assign(ident("n"), add(ident("n"), num(1.0)))), ret(ident("n"))],
                        ))),
                    ],
                ),
            ),
            const_("a", call(ident("makeCounter"), vec![])),
            const_("b", call(ident("makeCounter"), vec![])),
            expr(call(ident("a"), vec![])),
            expr(call(ident("a"), vec![])),
            expr(call(ident("b"), vec![])),
            expr(add(call(ident("a"), vec![]), mul(call(ident("b"), vec![]), num(10.0)))),
        ]),
        JsValue::Number(23.0)
    );
}

#[test]
fn test_recursion() {
    // function fact(n) { if (n < 2) return 1; return n * fact(n - 1); }
    assert_eq!(
        eval(vec![
            function_decl(
                "fact",
                function(
                    None,
                    vec![param("n")],
                    vec![
                        if_(lt(ident("n"), num(2.0)), ret(num(1.0)), None),
                        ret(mul(ident("n"), call(ident("fact"), vec![sub(ident("n"), num(1.0))]))),
                    ],
                ),
            ),
            expr(call(ident("fact"), vec![num(5.0)])),
        ]),
        JsValue::Number(120.0)
    );
}

#[test]
fn test_named_function_expression_binding_is_immutable() {
    // var f = function g() { g = 1; return typeof g; };
    assert_eq!(
        eval(vec![
            var(
                "f",
                Some(function_expr(function(
                    Some("g"),
                    vec![],
                    vec![expr(assign(ident("g"), num(1.0))), ret(type_of(ident("g")))],
                ))),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("function")
    );

    // The name is not visible outside
    assert_eq!(
        eval(vec![
            var("f", Some(function_expr(function(Some("inner"), vec![], vec![])))),
            expr(type_of(ident("inner"))),
        ]),
        js("undefined")
    );
}

#[test]
fn test_calling_non_callable() {
    let err = eval_result(vec![var("x", Some(num(1.0))), expr(call(ident("x"), vec![]))]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::NotAFunction));
    assert_eq!(err.to_string(), "TypeError: 1 is not a function");
}

#[test]
fn test_class_constructor_requires_new() {
    let err = eval_result(vec![
        class_decl(class(Some("Point"))),
        expr(call(ident("Point"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ClassConstructorWithoutNew));
    assert_eq!(
        err.to_string(),
        "TypeError: Class constructor Point cannot be invoked without 'new'"
    );
}

#[test]
fn test_thrown_value_propagates_to_caller() {
    let err = eval_result(vec![
        function_decl("f", function(None, vec![], vec![throw(str("boom"))])),
        function_decl("g", function(None, vec![], vec![ret(call(ident("f"), vec![]))])),
        expr(call(ident("g"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), None);
    match err {
        jscall::JsError::Thrown(value) => assert_eq!(value, js("boom")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unbounded_recursion_is_range_error() {
    for strategy in [EvaluationStrategy::TreeWalking, EvaluationStrategy::Compiled] {
        let config = Config::default().with_strategy(strategy).with_max_call_depth(64);
        let mut interp = Interpreter::with_config(config);
        let err = interp
            .evaluate_script(&script(vec![
                function_decl("f", function(None, vec![], vec![ret(call(ident("f"), vec![]))])),
                expr(call(ident("f"), vec![])),
            ]))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorType::CallStackSizeExceeded));
        assert_eq!(interp.context_depth(), 0);
    }
}

#[test]
fn test_methods_are_not_constructors() {
    let err = eval_result(vec![
        class_decl(class(Some("A")).method("m", function(None, vec![], vec![]))),
        expr(new_expr(member(new_expr(ident("A"), vec![]), "m"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::NotAConstructor));
}
