//! The `arguments` object: mapped and unmapped forms

use super::{eval, js};
use jscall::ast::build::*;
use jscall::JsValue;

#[test]
fn test_arguments_length_and_indices() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![ret(add(member(ident("arguments"), "length"), index(ident("arguments"), num(2.0))))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0), num(2.0), num(30.0)])),
        ]),
        JsValue::Number(33.0)
    );
}

#[test]
fn test_mapped_arguments_write_updates_parameter() {
    // function f(a) { arguments[0] = 9; return a; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a")],
                    vec![expr(assign(index(ident("arguments"), num(0.0)), num(9.0))), ret(ident("a"))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Number(9.0)
    );
}

#[test]
fn test_mapped_parameter_write_updates_arguments() {
    // function f(a) { a = 7; return arguments[0]; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a")],
                    vec![expr(assign(ident("a"), num(7.0))), ret(index(ident("arguments"), num(0.0)))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Number(7.0)
    );
}

#[test]
fn test_missing_argument_is_not_mapped() {
    // function f(a, b) { b = 2; return arguments[1]; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a"), param("b")],
                    vec![expr(assign(ident("b"), num(2.0))), ret(type_of(index(ident("arguments"), num(1.0))))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        js("undefined")
    );
}

#[test]
fn test_strict_arguments_are_unmapped() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a")],
                    vec![expr(assign(ident("a"), num(7.0))), ret(index(ident("arguments"), num(0.0)))],
                )
                .strict(),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_non_simple_parameters_are_unmapped() {
    // function f(a, b = 0) { arguments[0] = 9; return a; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a"), param_default("b", num(0.0))],
                    vec![expr(assign(index(ident("arguments"), num(0.0)), num(9.0))), ret(ident("a"))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_arrow_sees_enclosing_arguments() {
    // function f() { return (() => arguments[0])(); }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![ret(call(
                        function_expr(arrow_expr(vec![], index(ident("arguments"), num(0.0)))),
                        vec![num(99.0)],
                    ))],
                ),
            ),
            expr(call(ident("f"), vec![str("outer")])),
        ]),
        js("outer")
    );
}

#[test]
fn test_parameter_named_arguments_shadows_object() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![param("arguments")], vec![ret(ident("arguments"))])),
            expr(call(ident("f"), vec![num(5.0)])),
        ]),
        JsValue::Number(5.0)
    );
}

#[test]
fn test_function_named_arguments_shadows_object() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        function_decl("arguments", function(None, vec![], vec![])),
                        ret(type_of(ident("arguments"))),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![num(5.0)])),
        ]),
        js("function")
    );
}

#[test]
fn test_sloppy_callee_is_the_function() {
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(None, vec![], vec![ret(strict_eq(member(ident("arguments"), "callee"), ident("f")))]),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_arguments_in_default_expression() {
    // function f(a, b = arguments.length) { return b; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("a"), param_default("b", member(ident("arguments"), "length"))],
                    vec![ret(ident("b"))],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        JsValue::Number(1.0)
    );
}
