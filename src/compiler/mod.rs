//! Bytecode compiler for function bodies
//!
//! This module compiles a function body to bytecode for execution by the
//! bytecode VM. Declaration instantiation has already run when a body is
//! compiled, so the executable only contains the statements themselves.

mod builder;
mod bytecode;
mod compile_expr;
mod compile_stmt;

pub use builder::{BytecodeBuilder, PendingJump, RegisterAllocator};
pub use bytecode::{Constant, ConstantIndex, Executable, JumpTarget, Op, Register};
pub(crate) use compile_expr::is_anonymous_function_definition;

use crate::ast::{FunctionBody, FunctionKind, FunctionNode};
use crate::error::JsError;
use crate::value::JsString;

/// Compiler state for converting a function body to bytecode
pub struct Compiler {
    /// Current bytecode builder
    builder: BytecodeBuilder,

    /// Whether `yield` is allowed
    is_generator: bool,
}

impl Compiler {
    /// Compile the body of `node` into an executable named `name`
    pub fn compile_function(node: &FunctionNode, name: JsString) -> Result<Executable, JsError> {
        let is_generator = node.kind == FunctionKind::Generator;
        let mut compiler = Compiler {
            builder: BytecodeBuilder::new(),
            is_generator,
        };

        match &node.body {
            FunctionBody::Block(body) => compiler.compile_statements(body)?,
            FunctionBody::Expression(expr) => {
                let result = compiler.builder.alloc_register()?;
                compiler.compile_expression(expr, result)?;
                compiler.builder.emit(Op::Return { src: result });
                compiler.builder.free_register(result);
            }
        }

        // Falling off the end returns undefined
        let result = compiler.builder.alloc_register()?;
        compiler.builder.emit(Op::LoadUndefined { dst: result });
        compiler.builder.emit(Op::Return { src: result });
        compiler.builder.free_register(result);

        Ok(compiler.builder.finish(name, is_generator))
    }
}
