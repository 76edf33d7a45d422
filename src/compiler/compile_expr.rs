//! Expression compilation
//!
//! Every expression is compiled into a caller-chosen destination register;
//! temporaries are freed in reverse allocation order.

use super::Compiler;
use super::bytecode::{Constant, Op, Register};
use crate::ast::{Argument, BinaryOp, ClassNode, Expression, Literal, MemberProperty, UnaryOp};
use crate::error::JsError;
use crate::prelude::*;
use crate::value::JsString;

impl Compiler {
    /// Compile an expression, leaving its value in `dst`
    pub(super) fn compile_expression(&mut self, expr: &Expression, dst: Register) -> Result<(), JsError> {
        match expr {
            Expression::Literal(lit) => self.compile_literal(lit, dst)?,

            Expression::Identifier(name) => {
                let name = self.builder.add_string(name.clone())?;
                self.builder.emit(Op::GetVar { dst, name });
            }

            Expression::This => {
                self.builder.emit(Op::LoadThis { dst });
            }

            Expression::NewTarget => {
                self.builder.emit(Op::LoadNewTarget { dst });
            }

            Expression::Array(elements) => {
                self.builder.emit(Op::NewArray { dst });
                self.compile_elements_into(elements, dst)?;
            }

            Expression::Object(props) => {
                self.builder.emit(Op::NewObject { dst });
                for (key, value) in props {
                    let tmp = self.builder.alloc_register()?;
                    self.compile_named(value, tmp, key)?;
                    let key = self.builder.add_string(key.clone())?;
                    self.builder.emit(Op::DefineField {
                        obj: dst,
                        key,
                        src: tmp,
                    });
                    self.builder.free_register(tmp);
                }
            }

            Expression::Function(node) => {
                let idx = self.builder.add_constant(Constant::Function(node.clone()))?;
                self.builder.emit(Op::NewFunction { dst, idx });
            }

            Expression::Class(class) => self.compile_class(class, dst)?,

            Expression::Unary(UnaryOp::Typeof, operand) if matches!(**operand, Expression::Identifier(_)) => {
                if let Expression::Identifier(name) = &**operand {
                    let name = self.builder.add_string(name.clone())?;
                    self.builder.emit(Op::TypeOfVar { dst, name });
                }
            }

            Expression::Unary(op, operand) => {
                let src = self.builder.alloc_register()?;
                self.compile_expression(operand, src)?;
                self.builder.emit(match op {
                    UnaryOp::Not => Op::Not { dst, src },
                    UnaryOp::Minus => Op::Neg { dst, src },
                    UnaryOp::Typeof => Op::TypeOf { dst, src },
                });
                self.builder.free_register(src);
            }

            Expression::Binary(op, left, right) => {
                let l = self.builder.alloc_register()?;
                let r = self.builder.alloc_register()?;
                self.compile_expression(left, l)?;
                self.compile_expression(right, r)?;
                self.builder.emit(match op {
                    BinaryOp::Add => Op::Add { dst, left: l, right: r },
                    BinaryOp::Sub => Op::Sub { dst, left: l, right: r },
                    BinaryOp::Mul => Op::Mul { dst, left: l, right: r },
                    BinaryOp::Lt => Op::Lt { dst, left: l, right: r },
                    BinaryOp::StrictEq => Op::StrictEq { dst, left: l, right: r },
                    BinaryOp::StrictNotEq => Op::StrictNotEq { dst, left: l, right: r },
                });
                self.builder.free_register(r);
                self.builder.free_register(l);
            }

            Expression::Assign(target, value) => self.compile_assignment(target, value, dst)?,

            Expression::Member(object, property) => {
                let obj = self.builder.alloc_register()?;
                self.compile_expression(object, obj)?;
                self.compile_member_get(obj, property, dst)?;
                self.builder.free_register(obj);
            }

            Expression::SuperMember(name) => {
                let name = self.builder.add_string(name.clone())?;
                self.builder.emit(Op::GetSuperNamed { dst, name });
            }

            Expression::Call(callee, args) => {
                let func = self.builder.alloc_register()?;
                let this = self.builder.alloc_register()?;
                if let Expression::Member(object, property) = &**callee {
                    // Method call: the object is the receiver
                    self.compile_expression(object, this)?;
                    self.compile_member_get(this, property, func)?;
                } else if let Expression::SuperMember(name) = &**callee {
                    let name = self.builder.add_string(name.clone())?;
                    self.builder.emit(Op::GetSuperNamed { dst: func, name });
                    self.builder.emit(Op::LoadThis { dst: this });
                } else {
                    self.compile_expression(callee, func)?;
                    self.builder.emit(Op::LoadUndefined { dst: this });
                }
                let args = self.compile_arguments(args)?;
                self.builder.emit(Op::Call {
                    dst,
                    callee: func,
                    this,
                    args,
                });
                self.builder.free_register(args);
                self.builder.free_register(this);
                self.builder.free_register(func);
            }

            Expression::New(callee, args) => {
                let func = self.builder.alloc_register()?;
                self.compile_expression(callee, func)?;
                let args = self.compile_arguments(args)?;
                self.builder.emit(Op::New {
                    dst,
                    callee: func,
                    args,
                });
                self.builder.free_register(args);
                self.builder.free_register(func);
            }

            Expression::SuperCall(args) => {
                let args = self.compile_arguments(args)?;
                self.builder.emit(Op::SuperCall { dst, args });
                self.builder.free_register(args);
            }

            Expression::Yield(argument) => {
                if !self.is_generator {
                    return Err(JsError::not_implemented("yield outside a generator body"));
                }
                let src = self.builder.alloc_register()?;
                match argument {
                    Some(arg) => self.compile_expression(arg, src)?,
                    None => {
                        self.builder.emit(Op::LoadUndefined { dst: src });
                    }
                }
                self.builder.emit(Op::Yield { dst, src });
                self.builder.free_register(src);
            }

            Expression::Await(_) => {
                return Err(JsError::not_implemented("await in compiled code"));
            }
        }
        Ok(())
    }

    fn compile_literal(&mut self, lit: &Literal, dst: Register) -> Result<(), JsError> {
        match lit {
            Literal::Undefined => {
                self.builder.emit(Op::LoadUndefined { dst });
            }
            Literal::Null => {
                self.builder.emit(Op::LoadNull { dst });
            }
            Literal::Boolean(value) => {
                self.builder.emit(Op::LoadBool { dst, value: *value });
            }
            Literal::Number(n) => self.builder.emit_load_number(dst, *n)?,
            Literal::String(s) => self.builder.emit_load_string(dst, s.clone())?,
        }
        Ok(())
    }

    /// NamedEvaluation: anonymous functions and classes take the binding's name
    pub(super) fn compile_named(
        &mut self,
        expr: &Expression,
        dst: Register,
        name: &JsString,
    ) -> Result<(), JsError> {
        self.compile_expression(expr, dst)?;
        if is_anonymous_function_definition(expr) {
            let name = self.builder.add_string(name.clone())?;
            self.builder.emit(Op::SetFunctionName { reg: dst, name });
        }
        Ok(())
    }

    fn compile_member_get(
        &mut self,
        obj: Register,
        property: &MemberProperty,
        dst: Register,
    ) -> Result<(), JsError> {
        match property {
            MemberProperty::Named(name) => {
                let name = self.builder.add_string(name.clone())?;
                self.builder.emit(Op::GetNamed { dst, obj, name });
            }
            MemberProperty::Computed(key_expr) => {
                let key = self.builder.alloc_register()?;
                self.compile_expression(key_expr, key)?;
                self.builder.emit(Op::GetComputed { dst, obj, key });
                self.builder.free_register(key);
            }
        }
        Ok(())
    }

    fn compile_assignment(
        &mut self,
        target: &Expression,
        value: &Expression,
        dst: Register,
    ) -> Result<(), JsError> {
        match target {
            Expression::Identifier(name) => {
                self.compile_named(value, dst, name)?;
                let name = self.builder.add_string(name.clone())?;
                self.builder.emit(Op::SetVar { name, src: dst });
            }
            Expression::Member(object, property) => {
                let obj = self.builder.alloc_register()?;
                self.compile_expression(object, obj)?;
                match property {
                    MemberProperty::Named(name) => {
                        self.compile_expression(value, dst)?;
                        let name = self.builder.add_string(name.clone())?;
                        self.builder.emit(Op::PutNamed { obj, name, src: dst });
                    }
                    MemberProperty::Computed(key_expr) => {
                        let key = self.builder.alloc_register()?;
                        self.compile_expression(key_expr, key)?;
                        self.compile_expression(value, dst)?;
                        self.builder.emit(Op::PutComputed { obj, key, src: dst });
                        self.builder.free_register(key);
                    }
                }
                self.builder.free_register(obj);
            }
            _ => return Err(JsError::not_implemented("assignment to this target")),
        }
        Ok(())
    }

    /// Build the argument list as an array, expanding spreads
    fn compile_arguments(&mut self, args: &[Argument]) -> Result<Register, JsError> {
        let array = self.builder.alloc_register()?;
        self.builder.emit(Op::NewArray { dst: array });
        self.compile_elements_into(args, array)?;
        Ok(array)
    }

    fn compile_elements_into(&mut self, elements: &[Argument], array: Register) -> Result<(), JsError> {
        for element in elements {
            let tmp = self.builder.alloc_register()?;
            match element {
                Argument::Expression(e) => {
                    self.compile_expression(e, tmp)?;
                    self.builder.emit(Op::ArrayPush { array, src: tmp });
                }
                Argument::Spread(e) => {
                    self.compile_expression(e, tmp)?;
                    self.builder.emit(Op::ArraySpread { array, src: tmp });
                }
            }
            self.builder.free_register(tmp);
        }
        Ok(())
    }

    pub(super) fn compile_class(&mut self, class: &Rc<ClassNode>, dst: Register) -> Result<(), JsError> {
        let heritage = match &class.heritage {
            Some(expr) => {
                let reg = self.builder.alloc_register()?;
                self.compile_expression(expr, reg)?;
                Some(reg)
            }
            None => None,
        };
        let idx = self.builder.add_constant(Constant::Class(class.clone()))?;
        self.builder.emit(Op::NewClass { dst, idx, heritage });
        if let Some(reg) = heritage {
            self.builder.free_register(reg);
        }
        Ok(())
    }
}

/// IsAnonymousFunctionDefinition
pub(crate) fn is_anonymous_function_definition(expr: &Expression) -> bool {
    match expr {
        Expression::Function(node) => node.name.is_none(),
        Expression::Class(class) => class.name.is_none(),
        _ => false,
    }
}
