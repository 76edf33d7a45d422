//! Statement compilation

use super::Compiler;
use super::bytecode::{Constant, Op};
use crate::ast::{BindingTarget, Statement, VariableDeclaration, VariableKind};
use crate::error::JsError;
use crate::hoist::BlockScope;
use crate::prelude::*;

impl Compiler {
    /// Compile a sequence of statements
    pub(super) fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), JsError> {
        for stmt in statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), JsError> {
        match stmt {
            Statement::Expression(expr) => {
                let tmp = self.builder.alloc_register()?;
                self.compile_expression(expr, tmp)?;
                self.builder.free_register(tmp);
            }

            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl)?,

            // Instantiated on scope entry; only the Annex B copy happens here
            Statement::FunctionDeclaration(decl) => {
                if decl.annex_b_hoisted.get() {
                    let name = self.builder.add_string(decl.name.clone())?;
                    self.builder.emit(Op::AnnexBCopy { name });
                }
            }

            Statement::ClassDeclaration(class) => {
                let dst = self.builder.alloc_register()?;
                self.compile_class(class, dst)?;
                if let Some(name) = &class.name {
                    let name = self.builder.add_string(name.clone())?;
                    self.builder.emit(Op::InitializeBinding { name, src: dst });
                }
                self.builder.free_register(dst);
            }

            Statement::Return(arg) => {
                let src = self.builder.alloc_register()?;
                match arg {
                    Some(expr) => self.compile_expression(expr, src)?,
                    None => {
                        self.builder.emit(Op::LoadUndefined { dst: src });
                    }
                }
                self.builder.emit(Op::Return { src });
                self.builder.free_register(src);
            }

            Statement::Throw(expr) => {
                let src = self.builder.alloc_register()?;
                self.compile_expression(expr, src)?;
                self.builder.emit(Op::Throw { src });
                self.builder.free_register(src);
            }

            Statement::If(if_stmt) => {
                let cond = self.builder.alloc_register()?;
                self.compile_expression(&if_stmt.test, cond)?;
                let else_jump = self.builder.emit_jump_if_false(cond);
                self.builder.free_register(cond);

                self.compile_substatement(&if_stmt.consequent)?;

                if let Some(alternate) = &if_stmt.alternate {
                    let end_jump = self.builder.emit_jump();
                    self.builder.patch_jump(else_jump);
                    self.compile_substatement(alternate)?;
                    self.builder.patch_jump(end_jump);
                } else {
                    self.builder.patch_jump(else_jump);
                }
            }

            Statement::While(while_stmt) => {
                let loop_start = self.builder.current_offset();
                let cond = self.builder.alloc_register()?;
                self.compile_expression(&while_stmt.test, cond)?;
                let exit_jump = self.builder.emit_jump_if_false(cond);
                self.builder.free_register(cond);

                self.compile_substatement(&while_stmt.body)?;
                self.builder.emit_jump_to(loop_start);
                self.builder.patch_jump(exit_jump);
            }

            Statement::Block(block) => self.compile_block(&block.body)?,

            Statement::Empty => {}
        }
        Ok(())
    }

    /// Body of an `if`/`while`; a bare function declaration there behaves as
    /// if wrapped in a block
    fn compile_substatement(&mut self, stmt: &Statement) -> Result<(), JsError> {
        if matches!(stmt, Statement::FunctionDeclaration(_)) {
            self.compile_block(std::slice::from_ref(stmt))
        } else {
            self.compile_statement(stmt)
        }
    }

    fn compile_block(&mut self, body: &[Statement]) -> Result<(), JsError> {
        let scope = BlockScope::of(body);
        if scope.is_empty() {
            return self.compile_statements(body);
        }
        let scope = self.builder.add_constant(Constant::Scope(Rc::new(scope)))?;
        self.builder.emit(Op::PushScope { scope });
        self.compile_statements(body)?;
        self.builder.emit(Op::PopScope);
        Ok(())
    }

    fn compile_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), JsError> {
        for declarator in &decl.declarations {
            let BindingTarget::Name(name) = &declarator.target else {
                return Err(JsError::not_implemented("destructuring declarations in compiled code"));
            };

            // `var x;` leaves the hoisted binding untouched
            if decl.kind == VariableKind::Var && declarator.init.is_none() {
                continue;
            }

            let value = self.builder.alloc_register()?;
            match &declarator.init {
                Some(init) => self.compile_named(init, value, name)?,
                None => {
                    self.builder.emit(Op::LoadUndefined { dst: value });
                }
            }
            let name_idx = self.builder.add_string(name.clone())?;
            if decl.kind == VariableKind::Var {
                self.builder.emit(Op::SetVar {
                    name: name_idx,
                    src: value,
                });
            } else {
                self.builder.emit(Op::InitializeBinding {
                    name: name_idx,
                    src: value,
                });
            }
            self.builder.free_register(value);
        }
        Ok(())
    }
}
