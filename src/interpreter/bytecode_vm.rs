//! Bytecode Virtual Machine
//!
//! Executes a compiled function body on the running execution context. The
//! register file lives in a [`Frame`]; environments live on the context, so a
//! generator can suspend by handing back its frame and be resumed later with
//! the saved context pushed again.

use super::Interpreter;
use super::runtime::{binary_operation, describe_value, name_anonymous_function, unary_operation};
use crate::ast::{BinaryOp, UnaryOp};
use crate::compiler::{Constant, ConstantIndex, Executable, Op, Register};
use crate::env::Environment;
use crate::error::{ErrorType, JsError, invariant_violation};
use crate::gc::{GcEdge, Trace, Visitor};
use crate::prelude::*;
use crate::value::{
    CheapClone, JsString, JsValue, PropertyKey, array_like_to_vec, create_array, create_object,
};

/// Register file and program counter of one executable activation
#[derive(Debug, Clone)]
pub struct Frame {
    pc: usize,
    registers: Vec<JsValue>,
}

impl Frame {
    pub fn new(executable: &Executable) -> Self {
        Self {
            pc: 0,
            registers: vec![JsValue::Undefined; usize::from(executable.register_count)],
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    #[inline]
    pub fn get(&self, reg: Register) -> JsValue {
        self.registers
            .get(usize::from(reg))
            .cloned()
            .unwrap_or_else(|| invariant_violation("register out of range"))
    }

    #[inline]
    pub fn set(&mut self, reg: Register, value: JsValue) {
        match self.registers.get_mut(usize::from(reg)) {
            Some(slot) => *slot = value,
            None => invariant_violation("register out of range"),
        }
    }
}

impl Trace for Frame {
    fn visit_references(&self, visitor: &mut dyn Visitor) {
        for value in &self.registers {
            if let JsValue::Object(obj) = value {
                visitor.visit(GcEdge::Object(obj.cheap_clone()));
            }
        }
    }
}

/// Result of VM execution
#[derive(Debug)]
pub enum VmResult {
    /// Execution completed with a value
    Complete(JsValue),
    /// Generator yielded; resuming writes the sent value to `resume_register`
    Yield {
        value: JsValue,
        frame: Frame,
        resume_register: Register,
    },
}

impl Interpreter {
    /// Run `executable` from the frame's program counter until it returns,
    /// throws or yields
    pub(crate) fn run_executable(
        &mut self,
        executable: &Rc<Executable>,
        mut frame: Frame,
    ) -> Result<VmResult, JsError> {
        loop {
            let Some(op) = executable.get(frame.pc) else {
                invariant_violation("program counter ran off the end of the executable");
            };
            frame.pc += 1;

            match op {
                // ═══════════════════════════════════════════════════════════════
                // Constants & Register Operations
                // ═══════════════════════════════════════════════════════════════
                Op::LoadConst { dst, idx } => {
                    let value = match executable.get_constant(*idx) {
                        Some(Constant::String(s)) => JsValue::String(s.cheap_clone()),
                        Some(Constant::Number(n)) => JsValue::Number(*n),
                        _ => invariant_violation("LoadConst of a non-primitive constant"),
                    };
                    frame.set(*dst, value);
                }
                Op::LoadUndefined { dst } => frame.set(*dst, JsValue::Undefined),
                Op::LoadNull { dst } => frame.set(*dst, JsValue::Null),
                Op::LoadBool { dst, value } => frame.set(*dst, JsValue::Boolean(*value)),
                Op::LoadInt { dst, value } => frame.set(*dst, JsValue::Number(f64::from(*value))),
                Op::Move { dst, src } => {
                    let value = frame.get(*src);
                    frame.set(*dst, value);
                }
                Op::LoadThis { dst } => {
                    let value = self.resolve_this_binding()?;
                    frame.set(*dst, value);
                }
                Op::LoadNewTarget { dst } => frame.set(*dst, self.new_target_value()),

                // ═══════════════════════════════════════════════════════════════
                // Operators
                // ═══════════════════════════════════════════════════════════════
                Op::Add { dst, left, right } => binary(&mut frame, BinaryOp::Add, *dst, *left, *right),
                Op::Sub { dst, left, right } => binary(&mut frame, BinaryOp::Sub, *dst, *left, *right),
                Op::Mul { dst, left, right } => binary(&mut frame, BinaryOp::Mul, *dst, *left, *right),
                Op::Lt { dst, left, right } => binary(&mut frame, BinaryOp::Lt, *dst, *left, *right),
                Op::StrictEq { dst, left, right } => {
                    binary(&mut frame, BinaryOp::StrictEq, *dst, *left, *right)
                }
                Op::StrictNotEq { dst, left, right } => {
                    binary(&mut frame, BinaryOp::StrictNotEq, *dst, *left, *right)
                }
                Op::Not { dst, src } => unary(&mut frame, UnaryOp::Not, *dst, *src),
                Op::Neg { dst, src } => unary(&mut frame, UnaryOp::Minus, *dst, *src),
                Op::TypeOf { dst, src } => unary(&mut frame, UnaryOp::Typeof, *dst, *src),
                Op::TypeOfVar { dst, name } => {
                    let name = string_constant(executable, *name);
                    let value = self.typeof_identifier(&name)?;
                    frame.set(*dst, value);
                }

                // ═══════════════════════════════════════════════════════════════
                // Bindings & Scopes
                // ═══════════════════════════════════════════════════════════════
                Op::GetVar { dst, name } => {
                    let name = string_constant(executable, *name);
                    let value = self.identifier_value(&name)?;
                    frame.set(*dst, value);
                }
                Op::SetVar { name, src } => {
                    let name = string_constant(executable, *name);
                    self.assign_identifier(&name, frame.get(*src))?;
                }
                Op::InitializeBinding { name, src } => {
                    let name = string_constant(executable, *name);
                    self.initialize_lexical_binding(&name, frame.get(*src));
                }
                Op::PushScope { scope } => {
                    let Some(Constant::Scope(scope)) = executable.get_constant(*scope) else {
                        invariant_violation("PushScope without a scope constant");
                    };
                    let block_env = Environment::new_declarative(Some(self.lexical_environment()));
                    self.block_declaration_instantiation(scope, &block_env);
                    self.set_lexical_environment(block_env);
                }
                Op::PopScope => {
                    let outer = self.lexical_environment().borrow().outer();
                    match outer {
                        Some(outer) => self.set_lexical_environment(outer),
                        None => invariant_violation("PopScope on the outermost environment"),
                    }
                }
                Op::AnnexBCopy { name } => {
                    let name = string_constant(executable, *name);
                    self.copy_annex_b_function(&name)?;
                }

                // ═══════════════════════════════════════════════════════════════
                // Objects & Arrays
                // ═══════════════════════════════════════════════════════════════
                Op::NewArray { dst } => {
                    let realm = self.realm_or_fatal();
                    let array = create_array(realm.intrinsics().array_prototype.cheap_clone(), Vec::new());
                    frame.set(*dst, JsValue::Object(array));
                }
                Op::ArrayPush { array, src } => {
                    let JsValue::Object(target) = frame.get(*array) else {
                        invariant_violation("ArrayPush target is not an array");
                    };
                    self.array_push(&target, frame.get(*src))?;
                }
                Op::ArraySpread { array, src } => {
                    let JsValue::Object(target) = frame.get(*array) else {
                        invariant_violation("ArraySpread target is not an array");
                    };
                    self.array_spread(&target, &frame.get(*src))?;
                }
                Op::NewObject { dst } => {
                    let realm = self.realm_or_fatal();
                    let obj = create_object(Some(realm.intrinsics().object_prototype.cheap_clone()));
                    frame.set(*dst, JsValue::Object(obj));
                }
                Op::DefineField { obj, key, src } => {
                    let JsValue::Object(target) = frame.get(*obj) else {
                        invariant_violation("DefineField on a non-object");
                    };
                    let key = string_constant(executable, *key);
                    target.borrow_mut().set_property(PropertyKey::from(key), frame.get(*src));
                }
                Op::GetNamed { dst, obj, name } => {
                    let key = PropertyKey::from(string_constant(executable, *name));
                    let value = self.get_value_property(&frame.get(*obj), &key)?;
                    frame.set(*dst, value);
                }
                Op::GetComputed { dst, obj, key } => {
                    let key = PropertyKey::from_value(&frame.get(*key));
                    let value = self.get_value_property(&frame.get(*obj), &key)?;
                    frame.set(*dst, value);
                }
                Op::PutNamed { obj, name, src } => {
                    let key = PropertyKey::from(string_constant(executable, *name));
                    self.put_value_property(&frame.get(*obj), key, frame.get(*src))?;
                }
                Op::PutComputed { obj, key, src } => {
                    let key = PropertyKey::from_value(&frame.get(*key));
                    self.put_value_property(&frame.get(*obj), key, frame.get(*src))?;
                }
                Op::GetSuperNamed { dst, name } => {
                    let name = string_constant(executable, *name);
                    let value = self.super_property(&name)?;
                    frame.set(*dst, value);
                }

                // ═══════════════════════════════════════════════════════════════
                // Calls
                // ═══════════════════════════════════════════════════════════════
                Op::Call { dst, callee, this, args } => {
                    let function = frame.get(*callee);
                    let args = argument_list(&frame, *args)?;
                    if !function.is_callable() {
                        return Err(JsError::type_error(ErrorType::NotAFunction, describe_value(&function)));
                    }
                    let value = self.call(&function, frame.get(*this), &args)?;
                    frame.set(*dst, value);
                }
                Op::New { dst, callee, args } => {
                    let constructor = frame.get(*callee);
                    let args = argument_list(&frame, *args)?;
                    let value = self.construct(&constructor, &args, None)?;
                    frame.set(*dst, value);
                }
                Op::SuperCall { dst, args } => {
                    let args = argument_list(&frame, *args)?;
                    let value = self.super_call(&args)?;
                    frame.set(*dst, value);
                }
                Op::NewFunction { dst, idx } => {
                    let Some(Constant::Function(node)) = executable.get_constant(*idx) else {
                        invariant_violation("NewFunction without a function constant");
                    };
                    let closure = self.instantiate_function_expression(node);
                    frame.set(*dst, JsValue::Object(closure));
                }
                Op::NewClass { dst, idx, heritage } => {
                    let Some(Constant::Class(class)) = executable.get_constant(*idx) else {
                        invariant_violation("NewClass without a class constant");
                    };
                    let heritage = heritage.map(|reg| frame.get(reg));
                    let class = class.cheap_clone();
                    let constructor = self.class_definition_evaluation(&class, heritage)?;
                    frame.set(*dst, JsValue::Object(constructor));
                }
                Op::SetFunctionName { reg, name } => {
                    let name = string_constant(executable, *name);
                    name_anonymous_function(&frame.get(*reg), &name);
                }

                // ═══════════════════════════════════════════════════════════════
                // Control Flow
                // ═══════════════════════════════════════════════════════════════
                Op::Jump { target } => frame.pc = *target as usize,
                Op::JumpIfFalse { cond, target } => {
                    if !frame.get(*cond).to_boolean() {
                        frame.pc = *target as usize;
                    }
                }
                Op::Yield { dst, src } => {
                    let value = frame.get(*src);
                    return Ok(VmResult::Yield {
                        value,
                        resume_register: *dst,
                        frame,
                    });
                }
                Op::Return { src } => return Ok(VmResult::Complete(frame.get(*src))),
                Op::Throw { src } => return Err(JsError::thrown(frame.get(*src))),
            }
        }
    }
}

fn string_constant(executable: &Executable, idx: ConstantIndex) -> JsString {
    match executable.get_constant(idx) {
        Some(Constant::String(s)) => s.cheap_clone(),
        _ => invariant_violation("expected a string constant"),
    }
}

fn binary(frame: &mut Frame, op: BinaryOp, dst: Register, left: Register, right: Register) {
    let value = binary_operation(op, &frame.get(left), &frame.get(right));
    frame.set(dst, value);
}

fn unary(frame: &mut Frame, op: UnaryOp, dst: Register, src: Register) {
    let value = unary_operation(op, &frame.get(src));
    frame.set(dst, value);
}

/// Arguments are passed as an array built by `NewArray`/`ArrayPush`
fn argument_list(frame: &Frame, reg: Register) -> Result<Vec<JsValue>, JsError> {
    match frame.get(reg) {
        JsValue::Object(array) => array_like_to_vec(&array),
        _ => invariant_violation("argument register does not hold an array"),
    }
}
