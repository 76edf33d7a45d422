//! `this` and `new.target` resolution

use super::{create_test_interpreter, eval, eval_result, js, prop};
use jscall::ast::build::*;
use jscall::{ErrorType, JsValue};

#[test]
fn test_sloppy_this_is_global_object() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![], vec![ret(this())])),
            expr(strict_eq(call(ident("f"), vec![]), this())),
        ]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_strict_this_is_undefined() {
    assert_eq!(
        eval(vec![
            function_decl("f", function(None, vec![], vec![ret(type_of(this()))]).strict()),
            expr(call(ident("f"), vec![])),
        ]),
        js("undefined")
    );
}

#[test]
fn test_sloppy_primitive_this_is_boxed() {
    let mut interp = create_test_interpreter();
    interp
        .evaluate_script(&script(vec![
            function_decl("sloppy", function(None, vec![], vec![ret(type_of(this()))])),
            function_decl("strict", function(None, vec![], vec![ret(type_of(this()))]).strict()),
        ]))
        .unwrap();

    let sloppy = interp.global_binding("sloppy").unwrap();
    let strict = interp.global_binding("strict").unwrap();
    assert_eq!(interp.call(&sloppy, JsValue::Number(1.0), &[]).unwrap(), js("object"));
    assert_eq!(interp.call(&strict, JsValue::Number(1.0), &[]).unwrap(), js("number"));
    assert_eq!(interp.context_depth(), 0);
}

#[test]
fn test_method_call_receiver() {
    assert_eq!(
        eval(vec![
            var(
                "o",
                Some(object(vec![
                    ("v", num(3.0)),
                    ("m", function_expr(function(None, vec![], vec![ret(member(this(), "v"))]))),
                ])),
            ),
            expr(call(member(ident("o"), "m"), vec![])),
        ]),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_detached_method_loses_receiver() {
    let err = eval_result(vec![
        var(
            "o",
            Some(object(vec![(
                "m",
                function_expr(function(None, vec![], vec![ret(member(this(), "v"))]).strict()),
            )])),
        ),
        var("m", Some(member(ident("o"), "m"))),
        expr(call(ident("m"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ToObjectNullOrUndefined));
}

#[test]
fn test_arrow_captures_lexical_this() {
    // o.f = function () { return (() => this)(); }
    assert_eq!(
        eval(vec![
            var(
                "o",
                Some(object(vec![(
                    "f",
                    function_expr(function(
                        None,
                        vec![],
                        vec![ret(call(function_expr(arrow_expr(vec![], this())), vec![]))],
                    )),
                )])),
            ),
            expr(strict_eq(call(member(ident("o"), "f"), vec![]), ident("o"))),
        ]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_this_before_super_is_reference_error() {
    let err = eval_result(vec![
        class_decl(class(Some("Base"))),
        class_decl(
            class(Some("Derived")).extends(ident("Base")).constructor(function(
                None,
                vec![],
                vec![
                    expr(assign(member(this(), "x"), num(1.0))),
                    expr(super_call(vec![])),
                ],
            )),
        ),
        expr(new_expr(ident("Derived"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ThisHasNotBeenInitialized));
}

#[test]
fn test_second_super_call_is_reference_error() {
    let err = eval_result(vec![
        class_decl(class(Some("Base"))),
        class_decl(
            class(Some("Derived"))
                .extends(ident("Base"))
                .constructor(function(None, vec![], vec![expr(super_call(vec![])), expr(super_call(vec![]))])),
        ),
        expr(new_expr(ident("Derived"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ThisIsAlreadyInitialized));
}

#[test]
fn test_derived_constructor_without_super_call() {
    let err = eval_result(vec![
        class_decl(class(Some("Base"))),
        class_decl(class(Some("Derived")).extends(ident("Base")).constructor(function(None, vec![], vec![]))),
        expr(new_expr(ident("Derived"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::ThisHasNotBeenInitialized));
}

#[test]
fn test_super_call_from_arrow_binds_constructor_this() {
    // constructor() { const init = () => super(); init(); this.ok = true; }
    let result = eval(vec![
        class_decl(class(Some("Base"))),
        class_decl(class(Some("Derived")).extends(ident("Base")).constructor(function(
            None,
            vec![],
            vec![
                const_("init", function_expr(arrow_expr(vec![], super_call(vec![])))),
                expr(call(ident("init"), vec![])),
                expr(assign(member(this(), "ok"), boolean(true))),
            ],
        ))),
        expr(new_expr(ident("Derived"), vec![])),
    ]);
    assert_eq!(prop(&result, "ok"), JsValue::Boolean(true));
}

#[test]
fn test_new_target() {
    // function F() { return { called: new.target === undefined, target: new.target }; }
    let body = vec![ret(object(vec![
        ("plain", strict_eq(new_target(), undefined())),
        ("target", new_target()),
    ]))];

    let result = eval(vec![
        function_decl("F", function(None, vec![], body.clone())),
        expr(call(ident("F"), vec![])),
    ]);
    assert_eq!(prop(&result, "plain"), JsValue::Boolean(true));

    let result = eval(vec![
        function_decl("F", function(None, vec![], body)),
        expr(strict_eq(member(new_expr(ident("F"), vec![]), "target"), ident("F"))),
    ]);
    assert_eq!(result, JsValue::Boolean(true));
}

#[test]
fn test_new_target_is_subclass_in_base_constructor() {
    // class Base { constructor() { this.made = new.target; } } class Sub extends Base {}
    assert_eq!(
        eval(vec![
            class_decl(class(Some("Base")).constructor(function(
                None,
                vec![],
                vec![expr(assign(member(this(), "made"), new_target()))],
            ))),
            class_decl(class(Some("Sub")).extends(ident("Base"))),
            expr(strict_eq(member(new_expr(ident("Sub"), vec![]), "made"), ident("Sub"))),
        ]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_arrow_sees_enclosing_new_target() {
    assert_eq!(
        eval(vec![
            function_decl(
                "F",
                function(
                    None,
                    vec![],
                    vec![expr(assign(
                        member(this(), "fromArrow"),
                        call(function_expr(arrow_expr(vec![], new_target())), vec![]),
                    ))],
                ),
            ),
            expr(strict_eq(member(new_expr(ident("F"), vec![]), "fromArrow"), ident("F"))),
        ]),
        JsValue::Boolean(true)
    );
}
