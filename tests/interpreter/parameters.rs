//! Parameter binding: defaults, rest, patterns, duplicates

use super::{eval, eval_result, js};
use jscall::ast::build::*;
use jscall::{ErrorType, JsValue};

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![param("a"), param("b")], vec![ret(type_of(ident("b")))])),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        js("undefined")
    );
}

#[test]
fn test_default_used_for_undefined() {
    let f = function_decl(
        "f",
        function(None, vec![param("a"), param_default("b", num(10.0))], vec![ret(add(ident("a"), ident("b")))]),
    );
    assert_eq!(
        eval(vec![f.clone(), expr(call(ident("f"), vec![num(1.0)]))]),
        JsValue::Number(11.0)
    );
    assert_eq!(
        eval(vec![f.clone(), expr(call(ident("f"), vec![num(1.0), undefined()]))]),
        JsValue::Number(11.0)
    );
    assert_eq!(
        eval(vec![f, expr(call(ident("f"), vec![num(1.0), num(2.0)]))]),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_default_sees_earlier_parameters() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a"), param_default("b", mul(ident("a"), num(2.0)))],
                    vec![ret(ident("b"))],
                ),
            ),
            expr(call(ident("f"), vec![num(4.0)])),
        ]),
        JsValue::Number(8.0)
    );
}

#[test]
fn test_later_parameter_in_default_is_tdz() {
    let err = eval_result(vec![
        function_decl(
            "f",
            function(None, vec![param_default("a", ident("b")), param("b")], vec![ret(ident("a"))]),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::BindingNotInitialized));
}

#[test]
fn test_default_closure_does_not_see_body_vars() {
    // var x = "outer"; function f(get = () => x) { var x = "inner"; return get(); }
    assert_eq!(
        eval(vec![
            var("x", Some(str("outer"))),
            function_decl(
                "f",
                function(
                    None,
                    vec![param_default("get", function_expr(arrow_expr(vec![], ident("x"))))],
                    vec![var("x", Some(str("inner"))), ret(call(ident("get"), vec![]))],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("outer")
    );
}

#[test]
fn test_body_var_starts_with_parameter_value() {
    // function f(a, b = 1) { var a; return a; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a"), param_default("b", num(1.0))],
                    vec![var("a", None), ret(ident("a"))],
                ),
            ),
            expr(call(ident("f"), vec![num(5.0)])),
        ]),
        JsValue::Number(5.0)
    );
}

#[test]
fn test_rest_parameter_collects_remaining() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("first"), rest("others")],
                    vec![ret(add(member(ident("others"), "length"), index(ident("others"), num(1.0))))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0), num(2.0), num(30.0)])),
        ]),
        JsValue::Number(32.0)
    );

    assert_eq!(
        eval(vec![
            function_decl("g", function(None, vec![rest("r")], vec![ret(member(ident("r"), "length"))])),
            expr(call(ident("g"), vec![])),
        ]),
        JsValue::Number(0.0)
    );
}

#[test]
fn test_spread_arguments() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(None, vec![param("a"), param("b"), param("c")], vec![ret(add(add(ident("a"), ident("b")), ident("c")))]),
            ),
            var("xs", Some(array(vec![num(2.0), num(3.0)]))),
            expr(call_with(ident("f"), vec![arg(num(1.0)), spread(ident("xs"))])),
        ]),
        JsValue::Number(6.0)
    );
}

#[test]
fn test_object_pattern_parameter() {
    // function f({ x, y: renamed = 5 }) { return x + renamed; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param_pattern(
                        object_pattern(vec![
                            ("x", name_target("x"), None),
                            ("y", name_target("renamed"), Some(num(5.0))),
                        ]),
                        None,
                    )],
                    vec![ret(add(ident("x"), ident("renamed")))],
                ),
            ),
            expr(call(ident("f"), vec![object(vec![("x", num(1.0))])])),
        ]),
        JsValue::Number(6.0)
    );
}

#[test]
fn test_array_pattern_parameter_with_default() {
    // function f([a, , b = 3, ...rest] = [1, 2]) { return a + b + rest.length; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param_pattern(
                        array_pattern(vec![element("a", None), None, element("b", Some(num(3.0))), rest_element("rest")]),
                        Some(array(vec![num(1.0), num(2.0)])),
                    )],
                    vec![ret(add(add(ident("a"), ident("b")), member(ident("rest"), "length")))],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        JsValue::Number(4.0)
    );
}

#[test]
fn test_pattern_on_undefined_throws() {
    let err = eval_result(vec![
        function_decl(
            "f",
            function(
                None,
                vec![param_pattern(object_pattern(vec![("x", name_target("x"), None)]), None)],
                vec![],
            ),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ToObjectNullOrUndefined));
}

#[test]
fn test_duplicate_parameters_last_wins() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![param("a"), param("a")], vec![ret(ident("a"))])),
            expr(call(ident("f"), vec![num(1.0), num(2.0)])),
        ]),
        JsValue::Number(2.0)
    );
    // The second occurrence is bound even when its argument is missing
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![param("a"), param("a")], vec![ret(ident("a"))])),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Undefined
    );
}

#[test]
fn test_anonymous_default_is_named_after_parameter() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param_default("callback", function_expr(arrow(vec![], vec![])))],
                    vec![ret(member(ident("callback"), "name"))],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("callback")
    );
}
