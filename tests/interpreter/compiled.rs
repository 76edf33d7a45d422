//! Bytecode strategy: compile caching and strategy switching

use super::create_interpreter;
use jscall::ast::build::*;
use jscall::{Config, EvaluationStrategy, Interpreter, JsValue};

#[test]
fn test_body_compiled_once_per_closure() {
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    let result = interp
        .evaluate_script(&script(vec![
            function_decl("sq", function(None, vec![param("x")], vec![ret(mul(ident("x"), ident("x")))])),
            expr(add(
                add(call(ident("sq"), vec![num(1.0)]), call(ident("sq"), vec![num(2.0)])),
                call(ident("sq"), vec![num(3.0)]),
            )),
        ]))
        .unwrap();
    assert_eq!(result, JsValue::Number(14.0));
    assert_eq!(interp.stats().compilations, 1);
}

#[test]
fn test_each_closure_compiles_its_own_body() {
    // function make() { return () => 1; }  make()(); make()();
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    interp
        .evaluate_script(&script(vec![
            function_decl("make", function(None, vec![], vec![ret(function_expr(arrow_expr(vec![], num(1.0))))])),
            expr(call(call(ident("make"), vec![]), vec![])),
            expr(call(call(ident("make"), vec![]), vec![])),
        ]))
        .unwrap();
    // `make` once, then one arrow closure per call
    assert_eq!(interp.stats().compilations, 3);
}

#[test]
fn test_tree_walking_never_compiles() {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    interp
        .evaluate_script(&script(vec![
            function_decl("f", function(None, vec![], vec![ret(num(1.0))])),
            expr(call(ident("f"), vec![])),
        ]))
        .unwrap();
    assert_eq!(interp.stats().compilations, 0);
}

#[test]
fn test_strategy_switch_between_scripts() {
    let mut interp = create_interpreter(EvaluationStrategy::TreeWalking);
    interp
        .evaluate_script(&script(vec![
            var("total", Some(num(0.0))),
            function_decl(
                "bump",
                function(None, vec![param("by")], vec![expr(assign(ident("total"), add(ident("total"), ident("by"))))]),
            ),
            expr(call(ident("bump"), vec![num(1.0)])),
        ]))
        .unwrap();

    interp.set_evaluation_strategy(EvaluationStrategy::Compiled);
    interp
        .evaluate_script(&script(vec![expr(call(ident("bump"), vec![num(10.0)]))]))
        .unwrap();
    assert_eq!(interp.stats().compilations, 1);

    interp.set_evaluation_strategy(EvaluationStrategy::TreeWalking);
    interp
        .evaluate_script(&script(vec![expr(call(ident("bump"), vec![num(100.0)]))]))
        .unwrap();
    assert_eq!(interp.global_binding("total").unwrap(), JsValue::Number(111.0));
}

#[test]
fn test_closures_created_by_vm_run_under_tree_walker() {
    let mut interp = create_interpreter(EvaluationStrategy::Compiled);
    interp
        .evaluate_script(&script(vec![
            function_decl(
                "adder",
                function(None, vec![param("a")], vec![ret(function_expr(arrow_expr(vec![param("b")], add(ident("a"), ident("b")))))]),
            ),
            var("add5", Some(call(ident("adder"), vec![num(5.0)]))),
        ]))
        .unwrap();

    interp.set_evaluation_strategy(EvaluationStrategy::TreeWalking);
    let result = interp
        .evaluate_script(&script(vec![expr(call(ident("add5"), vec![num(2.0)]))]))
        .unwrap();
    assert_eq!(result, JsValue::Number(7.0));
}

#[test]
fn test_dump_bytecode_does_not_change_results() {
    let config = Config {
        dump_bytecode: true,
        ..Config::default().with_strategy(EvaluationStrategy::Compiled)
    };
    let mut interp = Interpreter::with_config(config);
    let result = interp
        .evaluate_script(&script(vec![
            function_decl(
                "f",
                function(
                    None,
                    vec![param("n")],
                    vec![
                        let_("acc", Some(num(0.0))),
                        while_(
                            lt(num(0.0), ident("n")),
                            block(vec![
                                expr(assign(ident("acc"), add(ident("acc"), ident("n")))),
                                expr(assign(ident("n"), sub(ident("n"), num(1.0)))),
                            ]),
                        ),
                        ret(ident("acc")),
                    ],
                ),
            ),
            expr(call(ident("f"), vec![num(4.0)])),
        ]))
        .unwrap();
    assert_eq!(result, JsValue::Number(10.0));
    assert_eq!(interp.stats().compilations, 1);
}
