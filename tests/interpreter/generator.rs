//! Generator functions (bytecode VM only)

use super::{create_interpreter, js, prop};
use jscall::ast::Statement;
use jscall::ast::build::*;
use jscall::interpreter::generator::{GeneratorStatus, generator_status};
use jscall::{ErrorType, EvaluationStrategy, JsError, JsValue};

fn run(body: Vec<Statement>) -> Result<JsValue, JsError> {
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    let result = interp.evaluate_script(&script(body));
    assert_eq!(interp.context_depth(), 0);
    result
}

fn next(target: &str) -> jscall::ast::Expression {
    call(member(ident(target), "next"), vec![])
}

#[test]
fn test_call_returns_suspended_generator() {
    let value = run(vec![
        function_decl("g", function(None, vec![], vec![expr(assign(ident("ran"), boolean(true)))]).generator()),
        var("ran", Some(boolean(false))),
        var("it", Some(call(ident("g"), vec![]))),
        expr(ident("it")),
    ])
    .unwrap();
    assert_eq!(generator_status(&value), Some(GeneratorStatus::SuspendedStart));
}

#[test]
fn test_body_runs_on_first_next() {
    assert_eq!(
        run(vec![
            function_decl("g", function(None, vec![], vec![expr(assign(ident("ran"), boolean(true)))]).generator()),
            var("ran", Some(boolean(false))),
            var("it", Some(call(ident("g"), vec![]))),
            var("before", Some(ident("ran"))),
            expr(next("it")),
            expr(add(ident("before"), ident("ran"))),
        ])
        .unwrap(),
        // false + true
        JsValue::Number(1.0)
    );
}

#[test]
fn test_yield_sequence() {
    let result = run(vec![
        function_decl(
            "g",
            function(
                None,
                vec![param("start")],
                vec![
                    expr(yield_(ident("start"))),
                    expr(yield_(add(ident("start"), num(1.0)))),
                    ret(str("end")),
                ],
            )
            .generator(),
        ),
        var("it", Some(call(ident("g"), vec![num(10.0)]))),
        expr(array(vec![
            member(next("it"), "value"),
            member(next("it"), "value"),
            member(next("it"), "value"),
            member(next("it"), "done"),
        ])),
    ])
    .unwrap();
    assert_eq!(prop(&result, "0"), JsValue::Number(10.0));
    assert_eq!(prop(&result, "1"), JsValue::Number(11.0));
    assert_eq!(prop(&result, "2"), js("end"));
    assert_eq!(prop(&result, "3"), JsValue::Boolean(true));
}

#[test]
fn test_block_bindings_survive_suspension() {
    // function* g() { { let n = 1; yield n; n = n + 1; yield n; } }
    let result = run(vec![
        function_decl(
            "g",
            function(
                None,
                vec![],
                vec![block(vec![
                    let_("n", Some(num(1.0))),
                    expr(yield_(ident("n"))),
                    expr(assign(ident("n"), add(ident("n"), num(1.0)))),
                    expr(yield_(ident("n"))),
                ])],
            )
            .generator(),
        ),
        var("it", Some(call(ident("g"), vec![]))),
        expr(add(member(next("it"), "value"), mul(member(next("it"), "value"), num(10.0)))),
    ])
    .unwrap();
    assert_eq!(result, JsValue::Number(21.0));
}

#[test]
fn test_generators_are_independent() {
    let result = run(vec![
        function_decl(
            "counter",
            function(
                None,
                vec![],
                vec![
                    var("i", Some(num(0.0))),
                    while_(
                        boolean(true),
                        block(vec![
                            expr(yield_(ident("i"))),
                            expr(assign(ident("i"), add(ident("i"), num(1.0)))),
                        ]),
                    ),
                ],
            )
            .generator(),
        ),
        var("a", Some(call(ident("counter"), vec![]))),
        var("b", Some(call(ident("counter"), vec![]))),
        expr(next("a")),
        expr(next("a")),
        expr(next("b")),
        expr(add(member(next("a"), "value"), mul(member(next("b"), "value"), num(10.0)))),
    ])
    .unwrap();
    assert_eq!(result, JsValue::Number(12.0));
}

#[test]
fn test_throw_completes_generator() {
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    let it = interp
        .evaluate_script(&script(vec![
            function_decl("g", function(None, vec![], vec![throw(str("bad"))]).generator()),
            var("it", Some(call(ident("g"), vec![]))),
            expr(ident("it")),
        ]))
        .unwrap();

    let err = interp.evaluate_script(&script(vec![expr(next("it"))])).unwrap_err();
    assert!(matches!(err, JsError::Thrown(ref v) if *v == js("bad")));
    assert_eq!(generator_status(&it), Some(GeneratorStatus::Completed));
    assert_eq!(interp.context_depth(), 0);

    let again = interp.evaluate_script(&script(vec![expr(next("it"))])).unwrap();
    assert_eq!(prop(&again, "done"), JsValue::Boolean(true));
}

#[test]
fn test_parameter_errors_throw_at_call() {
    // function* g(a = missing) {}  g()
    let err = run(vec![
        function_decl("g", function(None, vec![param_default("a", ident("missing"))], vec![]).generator()),
        expr(call(ident("g"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::UnknownIdentifier));
}

#[test]
fn test_generator_is_not_a_constructor() {
    let err = run(vec![
        function_decl("g", function(None, vec![], vec![]).generator()),
        expr(new_expr(ident("g"), vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::NotAConstructor));
}

#[test]
fn test_generator_requires_compiled_strategy() {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    let err = interp
        .evaluate_script(&script(vec![
            function_decl("g", function(None, vec![], vec![]).generator()),
            expr(call(ident("g"), vec![])),
        ]))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorType::NotImplemented));
    assert_eq!(interp.context_depth(), 0);
}
