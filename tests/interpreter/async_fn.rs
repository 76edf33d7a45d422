//! Async functions (tree-walking evaluator only)

use super::{create_interpreter, js};
use jscall::ast::Statement;
use jscall::ast::build::*;
use jscall::interpreter::promise::{PromiseStatus, promise_status};
use jscall::{ErrorType, EvaluationStrategy, JsValue};

fn settle(body: Vec<Statement>) -> (PromiseStatus, JsValue) {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    let value = interp.evaluate_script(&script(body)).expect("script threw");
    assert_eq!(interp.context_depth(), 0);
    promise_status(value.as_object().expect("not a promise")).expect("not a promise")
}

#[test]
fn test_async_call_returns_promise() {
    let (status, value) = settle(vec![
        function_decl("f", function(None, vec![], vec![]).async_()),
        expr(call(ident("f"), vec![])),
    ]);
    assert_eq!(status, PromiseStatus::Fulfilled);
    assert_eq!(value, JsValue::Undefined);
}

#[test]
fn test_body_runs_before_caller_continues() {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    let value = interp
        .evaluate_script(&script(vec![
            var("log", Some(str(""))),
            function_decl(
                "f",
                function(None, vec![], vec![expr(assign(ident("log"), add(ident("log"), str("a"))))]).async_(),
            ),
            expr(call(ident("f"), vec![])),
            expr(assign(ident("log"), add(ident("log"), str("b")))),
        ]))
        .unwrap();
    assert_eq!(value, js("ab"));
}

#[test]
fn test_await_plain_value() {
    assert_eq!(
        settle(vec![
            function_decl("f", function(None, vec![], vec![ret(mul(await_(num(5.0)), num(2.0)))]).async_()),
            expr(call(ident("f"), vec![])),
        ]),
        (PromiseStatus::Fulfilled, JsValue::Number(10.0))
    );
}

#[test]
fn test_returned_promise_is_adopted() {
    // async function inner() { return 1; } async function outer() { return inner(); }
    assert_eq!(
        settle(vec![
            function_decl("inner", function(None, vec![], vec![ret(num(1.0))]).async_()),
            function_decl("outer", function(None, vec![], vec![ret(call(ident("inner"), vec![]))]).async_()),
            function_decl(
                "main",
                function(None, vec![], vec![ret(await_(call(ident("outer"), vec![])))]).async_(),
            ),
            expr(call(ident("main"), vec![])),
        ]),
        (PromiseStatus::Fulfilled, JsValue::Number(1.0))
    );
}

#[test]
fn test_engine_error_rejects_with_error_object() {
    let (status, reason) = settle(vec![
        function_decl("f", function(None, vec![], vec![expr(call(ident("missing"), vec![]))]).async_()),
        expr(call(ident("f"), vec![])),
    ]);
    assert_eq!(status, PromiseStatus::Rejected);
    let reason = reason.as_object().expect("error object").clone();
    let name = jscall::value::get(&reason, &jscall::value::PropertyKey::from("name")).unwrap();
    assert_eq!(name, js("ReferenceError"));
}

#[test]
fn test_async_arrow_keeps_lexical_this() {
    // var o = { v: 7, m: function () { return (async () => this.v)(); } }; o.m()
    assert_eq!(
        settle(vec![
            var(
                "o",
                Some(object(vec![
                    ("v", num(7.0)),
                    (
                        "m",
                        function_expr(function(
                            None,
                            vec![],
                            vec![ret(call(
                                function_expr(arrow_expr(vec![], member(this(), "v")).async_()),
                                vec![],
                            ))],
                        )),
                    ),
                ])),
            ),
            expr(call(member(ident("o"), "m"), vec![])),
        ]),
        (PromiseStatus::Fulfilled, JsValue::Number(7.0))
    );
}

#[test]
fn test_async_requires_tree_walking_strategy() {
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    let err = interp
        .evaluate_script(&script(vec![
            function_decl("f", function(None, vec![], vec![]).async_()),
            expr(call(ident("f"), vec![])),
        ]))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::NotImplemented));
    assert_eq!(interp.context_depth(), 0);
}
