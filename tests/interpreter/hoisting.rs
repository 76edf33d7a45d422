//! Hoisting, TDZ and block-level function semantics

use super::{create_test_interpreter, eval, eval_result, eval_script, js};
use jscall::ast::build::*;
use jscall::{ErrorType, JsValue};

#[test]
fn test_var_is_undefined_before_assignment() {
    // function f() { var before = typeof v; var v = 1; return before; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        var("before", Some(type_of(ident("v")))),
                        var("v", Some(num(1.0))),
                        ret(ident("before")),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("undefined")
    );
}

#[test]
fn test_function_declaration_callable_before_definition() {
    assert_eq!(
        eval(vec![
            function_decl(
                "outer",
                function(
                    None,
                    vec![],
                    vec![
                        ret(call(ident("inner"), vec![])),
                        function_decl("inner", function(None, vec![], vec![ret(num(42.0))])),
                    ],
                ),
            ),
            expr(call(ident("outer"), vec![])),
        ]),
        JsValue::Number(42.0)
    );
}

#[test]
fn test_last_function_declaration_wins() {
    assert_eq!(
        eval(vec![
            function_decl(
                "outer",
                function(
                    None,
                    vec![],
                    vec![
                        function_decl("inner", function(None, vec![], vec![ret(num(1.0))])),
                        function_decl("inner", function(None, vec![], vec![ret(num(2.0))])),
                        ret(call(ident("inner"), vec![])),
                    ],
                ),
            ),
            expr(call(ident("outer"), vec![])),
        ]),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_function_declaration_overrides_parameter() {
    // function f(g) { function g() { return "decl"; } return g(); }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("g")],
                    vec![
                        function_decl("g", function(None, vec![], vec![ret(str("decl"))])),
                        ret(call(ident("g"), vec![])),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![num(1.0)])),
        ]),
        js("decl")
    );
}

#[test]
fn test_let_before_declaration_is_tdz() {
    let err = eval_result(vec![
        function_decl(
            "f",
            function(None, vec![], vec![expr(ident("x")), let_("x", Some(num(1.0)))]),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::BindingNotInitialized));
    assert_eq!(err.to_string(), "ReferenceError: Binding x is not initialized");
}

#[test]
fn test_closure_called_before_let_initialized() {
    // function f() { const g = () => x; g(); let x = 1; }
    let err = eval_result(vec![
        function_decl(
            "f",
            function(
                None,
                vec![],
                vec![
                    const_("g", function_expr(arrow_expr(vec![], ident("x")))),
                    expr(call(ident("g"), vec![])),
                    let_("x", Some(num(1.0))),
                ],
            ),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::BindingNotInitialized));
}

#[test]
fn test_const_assignment_is_type_error() {
    let err = eval_result(vec![
        function_decl(
            "f",
            function(None, vec![], vec![const_("c", num(1.0)), expr(assign(ident("c"), num(2.0)))]),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::InvalidAssignToConst));
}

#[test]
fn test_unknown_identifier() {
    let err = eval_result(vec![expr(ident("nowhere"))]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::UnknownIdentifier));
    assert_eq!(err.to_string(), "ReferenceError: 'nowhere' is not defined");
}

#[test]
fn test_block_scoping_shadows_outer() {
    // function f() { let x = 1; { let x = 2; } return x; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        let_("x", Some(num(1.0))),
                        block(vec![let_("x", Some(num(2.0)))]),
                        ret(ident("x")),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_block_closure_captures_block_binding() {
    // function f() { let get; { let x = "inner"; get = () => x; } return get(); }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        let_("get", None),
                        block(vec![
                            let_("x", Some(str("inner"))),
                            expr(assign(ident("get"), function_expr(arrow_expr(vec![], ident("x"))))),
                        ]),
                        ret(call(ident("get"), vec![])),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("inner")
    );
}

#[test]
fn test_sloppy_block_function_is_visible_after_block() {
    // function f() { var before = typeof g; { function g() { return 1; } } return before + g(); }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        var("before", Some(type_of(ident("g")))),
                        block(vec![function_decl("g", function(None, vec![], vec![ret(num(1.0))]))]),
                        ret(add(ident("before"), call(ident("g"), vec![]))),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        js("undefined1")
    );
}

#[test]
fn test_strict_block_function_stays_in_block() {
    let err = eval_result(vec![
        function_decl(
            "f",
            function(
                None,
                vec![],
                vec![
                    block(vec![function_decl("g", function(None, vec![], vec![]))]),
                    ret(call(ident("g"), vec![])),
                ],
            )
            .strict(),
        ),
        expr(call(ident("f"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::UnknownIdentifier));
}

#[test]
fn test_block_function_not_copied_over_let() {
    // function f() { let g = 1; { function g() {} } return g; }
    assert_eq!(
        eval(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![],
                    vec![
                        let_("g", Some(num(1.0))),
                        block(vec![function_decl("g", function(None, vec![], vec![]))]),
                        ret(ident("g")),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![])),
        ]),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_global_lexical_redeclaration_across_scripts() {
    let mut interp = create_test_interpreter();
    interp.evaluate_script(&script(vec![const_("shared", num(1.0))])).unwrap();
    let err = interp
        .evaluate_script(&script(vec![let_("shared", None)]))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::Redeclaration));

    // Bindings from the first script remain visible
    let value = interp.evaluate_script(&script(vec![expr(ident("shared"))])).unwrap();
    assert_eq!(value, JsValue::Number(1.0));
}

#[test]
fn test_global_var_visible_to_later_scripts() {
    let mut interp = create_test_interpreter();
    interp
        .evaluate_script(&script(vec![
            var("counter", Some(num(0.0))),
            function_decl(
                "bump",
                function(None, vec![], vec![expr(assign(ident("counter"), add(ident("counter"), num(1.0))))]),
            ),
        ]))
        .unwrap();
    interp.evaluate_script(&script(vec![expr(call(ident("bump"), vec![]))])).unwrap();
    interp.evaluate_script(&script(vec![expr(call(ident("bump"), vec![]))])).unwrap();
    assert_eq!(interp.global_binding("counter").unwrap(), JsValue::Number(2.0));
}

#[test]
fn test_strict_script_functions_are_strict() {
    // "use strict" at script level: an assignment to an undeclared name throws inside functions
    let err = eval_script(&strict_script(vec![
        function_decl("f", function(None, vec![], vec![expr(assign(ident("leak"), num(1.0)))])),
        expr(call(ident("f"), vec![])),
    ]))
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::UnknownIdentifier));
}
