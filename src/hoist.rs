//! Static scope queries over function and script bodies
//!
//! `var` declarations and top-level function declarations are hoisted to the
//! top of their function scope; `let`/`const`/`class` are scoped to their
//! block. Declaration instantiation asks these questions before any code in
//! the body runs. None of them descend into nested (non-arrow) functions,
//! which form their own scopes.

use crate::ast::{
    Argument, ClassNode, Expression, FunctionBody, FunctionDeclaration,
    FunctionParameter, Literal, MemberProperty, Statement, VariableKind,
};
use crate::prelude::*;
use crate::value::JsString;

/// A top-level lexical declaration and the names it binds
#[derive(Debug, Clone)]
pub struct LexicalDeclaration {
    pub names: Vec<JsString>,
    pub is_constant: bool,
}

/// Whether the directive prologue contains `"use strict"`
pub fn has_use_strict_directive(body: &[Statement]) -> bool {
    for stmt in body {
        match stmt {
            Statement::Expression(Expression::Literal(Literal::String(s))) => {
                if s.as_str() == "use strict" {
                    return true;
                }
            }
            _ => return false,
        }
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════════════
// Var scope
// ═══════════════════════════════════════════════════════════════════════════════

/// VarDeclaredNames of a function body: `var` names anywhere in the body's
/// statements plus the names of top-level function declarations, in source
/// order (duplicates included).
pub fn var_declared_names(body: &[Statement]) -> Vec<JsString> {
    let mut names = Vec::new();
    for stmt in body {
        if let Statement::FunctionDeclaration(decl) = stmt {
            names.push(decl.name.clone());
        } else {
            collect_hoisted_vars_stmt(stmt, &mut names);
        }
    }
    names
}

/// Collect hoisted vars from a single statement
fn collect_hoisted_vars_stmt(stmt: &Statement, names: &mut Vec<JsString>) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            if decl.kind == VariableKind::Var {
                for declarator in &decl.declarations {
                    names.extend(declarator.target.bound_names());
                }
            }
        }

        // Block statements - vars hoist out of blocks
        Statement::Block(block) => {
            for s in block.body.iter() {
                collect_hoisted_vars_stmt(s, names);
            }
        }

        // Control flow - vars hoist out
        Statement::If(if_stmt) => {
            collect_hoisted_vars_stmt(&if_stmt.consequent, names);
            if let Some(ref alt) = if_stmt.alternate {
                collect_hoisted_vars_stmt(alt, names);
            }
        }

        Statement::While(while_stmt) => {
            collect_hoisted_vars_stmt(&while_stmt.body, names);
        }

        // Function and class declarations in blocks are lexical; at the top
        // level functions are handled by the caller
        Statement::FunctionDeclaration(_)
        | Statement::ClassDeclaration(_)
        | Statement::Return(_)
        | Statement::Throw(_)
        | Statement::Expression(_)
        | Statement::Empty => {}
    }
}

/// Top-level function declarations, in source order.
pub fn var_scoped_function_declarations(body: &[Statement]) -> Vec<Rc<FunctionDeclaration>> {
    body.iter()
        .filter_map(|stmt| match stmt {
            Statement::FunctionDeclaration(decl) => Some(decl.clone()),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lexical scope
// ═══════════════════════════════════════════════════════════════════════════════

/// `let`/`const`/`class` declarations directly in a statement list
pub fn lexically_scoped_declarations(body: &[Statement]) -> Vec<LexicalDeclaration> {
    let mut declarations = Vec::new();
    for stmt in body {
        match stmt {
            Statement::VariableDeclaration(decl) if decl.kind != VariableKind::Var => {
                let names = decl
                    .declarations
                    .iter()
                    .flat_map(|d| d.target.bound_names())
                    .collect();
                declarations.push(LexicalDeclaration {
                    names,
                    is_constant: decl.kind == VariableKind::Const,
                });
            }
            Statement::ClassDeclaration(class) => {
                if let Some(name) = &class.name {
                    declarations.push(LexicalDeclaration {
                        names: vec![name.clone()],
                        is_constant: true,
                    });
                }
            }
            _ => {}
        }
    }
    declarations
}

pub fn lexically_declared_names(body: &[Statement]) -> Vec<JsString> {
    lexically_scoped_declarations(body)
        .into_iter()
        .flat_map(|d| d.names)
        .collect()
}

pub fn has_lexical_declarations(body: &[Statement]) -> bool {
    body.iter().any(|stmt| match stmt {
        Statement::VariableDeclaration(decl) => decl.kind != VariableKind::Var,
        Statement::ClassDeclaration(_) => true,
        _ => false,
    })
}

/// Declarations instantiated when a block is entered
#[derive(Debug, Default)]
pub struct BlockScope {
    pub lexical: Vec<LexicalDeclaration>,
    /// Function declarations directly in the block (block-scoped)
    pub functions: Vec<Rc<FunctionDeclaration>>,
}

impl BlockScope {
    pub fn of(body: &[Statement]) -> Self {
        Self {
            lexical: lexically_scoped_declarations(body),
            functions: var_scoped_function_declarations(body),
        }
    }

    /// Blocks without declarations run in the enclosing environment
    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.functions.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Annex B
// ═══════════════════════════════════════════════════════════════════════════════

/// Block-nested function declarations that also get a function-level `var`
/// binding in sloppy code.
///
/// A declaration qualifies only if a `var` of the same name would not clash
/// with a lexical declaration of the body or of any enclosing block.
pub fn annex_b_function_candidates(body: &[Statement]) -> Vec<Rc<FunctionDeclaration>> {
    let mut blocked = lexically_declared_names(body);
    let mut candidates = Vec::new();
    for stmt in body {
        collect_annex_b_stmt(stmt, &mut blocked, &mut candidates, false);
    }
    candidates
}

fn collect_annex_b_stmt(
    stmt: &Statement,
    blocked: &mut Vec<JsString>,
    candidates: &mut Vec<Rc<FunctionDeclaration>>,
    nested: bool,
) {
    match stmt {
        Statement::FunctionDeclaration(decl) => {
            if nested && !blocked.contains(&decl.name) {
                candidates.push(decl.clone());
            }
        }
        Statement::Block(block) => {
            let saved = blocked.len();
            blocked.extend(lexically_declared_names(&block.body));
            for s in &block.body {
                collect_annex_b_stmt(s, blocked, candidates, true);
            }
            blocked.truncate(saved);
        }
        Statement::If(if_stmt) => {
            collect_annex_b_stmt(&if_stmt.consequent, blocked, candidates, true);
            if let Some(alt) = &if_stmt.alternate {
                collect_annex_b_stmt(alt, blocked, candidates, true);
            }
        }
        Statement::While(while_stmt) => {
            collect_annex_b_stmt(&while_stmt.body, blocked, candidates, true);
        }
        _ => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// `arguments` references
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether the parameters or body mention `arguments`, looking through arrow
/// functions (which see the enclosing function's `arguments`).
pub fn references_arguments(parameters: &[FunctionParameter], body: &FunctionBody) -> bool {
    let in_params = parameters.iter().any(|p| {
        p.target
            .bound_names()
            .iter()
            .any(|n| n.as_str() == "arguments")
            || p.default_value.as_ref().is_some_and(expression_references_arguments)
    });
    in_params
        || match body {
            FunctionBody::Block(stmts) => stmts.iter().any(statement_references_arguments),
            FunctionBody::Expression(e) => expression_references_arguments(e),
        }
}

fn statement_references_arguments(stmt: &Statement) -> bool {
    match stmt {
        Statement::VariableDeclaration(decl) => decl.declarations.iter().any(|d| {
            d.target
                .bound_names()
                .iter()
                .any(|n| n.as_str() == "arguments")
                || d.init.as_ref().is_some_and(expression_references_arguments)
        }),
        Statement::FunctionDeclaration(decl) => decl.name.as_str() == "arguments",
        Statement::ClassDeclaration(class) => class_references_arguments(class),
        Statement::Block(block) => block.body.iter().any(statement_references_arguments),
        Statement::If(if_stmt) => {
            expression_references_arguments(&if_stmt.test)
                || statement_references_arguments(&if_stmt.consequent)
                || if_stmt
                    .alternate
                    .as_deref()
                    .is_some_and(statement_references_arguments)
        }
        Statement::While(while_stmt) => {
            expression_references_arguments(&while_stmt.test)
                || statement_references_arguments(&while_stmt.body)
        }
        Statement::Return(e) => e.as_ref().is_some_and(expression_references_arguments),
        Statement::Throw(e) | Statement::Expression(e) => expression_references_arguments(e),
        Statement::Empty => false,
    }
}

fn class_references_arguments(class: &ClassNode) -> bool {
    class
        .heritage
        .as_ref()
        .is_some_and(expression_references_arguments)
}

fn arguments_reference_arguments(args: &[Argument]) -> bool {
    args.iter().any(|a| match a {
        Argument::Expression(e) | Argument::Spread(e) => expression_references_arguments(e),
    })
}

fn expression_references_arguments(expr: &Expression) -> bool {
    match expr {
        Expression::Identifier(name) => name.as_str() == "arguments",
        Expression::Literal(_)
        | Expression::This
        | Expression::NewTarget
        | Expression::SuperMember(_) => false,
        Expression::Array(elements) => arguments_reference_arguments(elements),
        Expression::Object(props) => props.iter().any(|(_, v)| expression_references_arguments(v)),
        Expression::Function(node) => {
            node.is_arrow && references_arguments(&node.parameters, &node.body)
        }
        Expression::Class(class) => class_references_arguments(class),
        Expression::Unary(_, e) | Expression::Await(e) => expression_references_arguments(e),
        Expression::Binary(_, l, r) | Expression::Assign(l, r) => {
            expression_references_arguments(l) || expression_references_arguments(r)
        }
        Expression::Member(object, property) => {
            expression_references_arguments(object)
                || match property {
                    MemberProperty::Named(_) => false,
                    MemberProperty::Computed(key) => expression_references_arguments(key),
                }
        }
        Expression::Call(callee, args) | Expression::New(callee, args) => {
            expression_references_arguments(callee) || arguments_reference_arguments(args)
        }
        Expression::SuperCall(args) => arguments_reference_arguments(args),
        Expression::Yield(e) => e.as_deref().is_some_and(expression_references_arguments),
    }
}
