//! Instruction emission, constant pooling and register allocation for one
//! function body

use super::bytecode::{Constant, ConstantIndex, Executable, JumpTarget, Op, Register};
use crate::error::JsError;
use crate::prelude::*;
use crate::value::{CheapClone, JsString};

/// A forward jump whose target is filled in by [`BytecodeBuilder::patch_jump`]
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct PendingJump {
    at: usize,
}

/// Stack-like register allocation with a free list for out-of-order frees
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    next: u8,
    high_water: u8,
    released: Vec<u8>,
}

impl RegisterAllocator {
    pub fn alloc(&mut self) -> Result<Register, JsError> {
        if let Some(reg) = self.released.pop() {
            return Ok(reg);
        }
        if self.next == u8::MAX {
            return Err(JsError::not_implemented("functions needing more than 255 registers"));
        }
        let reg = self.next;
        self.next += 1;
        self.high_water = self.high_water.max(self.next);
        Ok(reg)
    }

    pub fn free(&mut self, reg: Register) {
        if reg.checked_add(1) == Some(self.next) {
            self.next = reg;
        } else {
            self.released.push(reg);
        }
    }

    /// Registers a frame for this body needs
    pub fn frame_size(&self) -> u8 {
        self.high_water
    }
}

#[derive(Default)]
pub struct BytecodeBuilder {
    code: Vec<Op>,
    constants: Vec<Constant>,
    interned_strings: FxHashMap<JsString, ConstantIndex>,
    interned_numbers: FxHashMap<u64, ConstantIndex>,
    registers: RegisterAllocator,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `op`, returning its offset
    pub fn emit(&mut self, op: Op) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    pub fn emit_jump(&mut self) -> PendingJump {
        PendingJump {
            at: self.emit(Op::Jump { target: 0 }),
        }
    }

    pub fn emit_jump_if_false(&mut self, cond: Register) -> PendingJump {
        PendingJump {
            at: self.emit(Op::JumpIfFalse { cond, target: 0 }),
        }
    }

    /// Backward jump to an already emitted offset
    pub fn emit_jump_to(&mut self, target: usize) {
        self.emit(Op::Jump {
            target: target as JumpTarget,
        });
    }

    /// Point `jump` at the next instruction to be emitted
    pub fn patch_jump(&mut self, jump: PendingJump) {
        let here = self.code.len() as JumpTarget;
        match self.code.get_mut(jump.at) {
            Some(Op::Jump { target } | Op::JumpIfFalse { target, .. }) => *target = here,
            _ => crate::error::invariant_violation("patching an offset that is not a jump"),
        }
    }

    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn add_string(&mut self, s: JsString) -> Result<ConstantIndex, JsError> {
        if let Some(&idx) = self.interned_strings.get(&s) {
            return Ok(idx);
        }
        let idx = self.add_constant(Constant::String(s.cheap_clone()))?;
        self.interned_strings.insert(s, idx);
        Ok(idx)
    }

    fn add_number(&mut self, n: f64) -> Result<ConstantIndex, JsError> {
        if let Some(&idx) = self.interned_numbers.get(&n.to_bits()) {
            return Ok(idx);
        }
        let idx = self.add_constant(Constant::Number(n))?;
        self.interned_numbers.insert(n.to_bits(), idx);
        Ok(idx)
    }

    pub fn add_constant(&mut self, constant: Constant) -> Result<ConstantIndex, JsError> {
        let Ok(idx) = ConstantIndex::try_from(self.constants.len()) else {
            return Err(JsError::not_implemented("functions with more than 65535 constants"));
        };
        self.constants.push(constant);
        Ok(idx)
    }

    pub fn emit_load_string(&mut self, dst: Register, s: JsString) -> Result<(), JsError> {
        let idx = self.add_string(s)?;
        self.emit(Op::LoadConst { dst, idx });
        Ok(())
    }

    /// Small integers are encoded inline; -0 goes through the pool
    pub fn emit_load_number(&mut self, dst: Register, n: f64) -> Result<(), JsError> {
        let inline = n.fract() == 0.0 && (-128.0..=127.0).contains(&n) && !(n == 0.0 && n.is_sign_negative());
        if inline {
            self.emit(Op::LoadInt { dst, value: n as i32 });
        } else {
            let idx = self.add_number(n)?;
            self.emit(Op::LoadConst { dst, idx });
        }
        Ok(())
    }

    pub fn finish(self, name: JsString, is_generator: bool) -> Executable {
        Executable {
            name,
            code: self.code,
            constants: self.constants,
            register_count: self.registers.frame_size(),
            is_generator,
        }
    }

    pub fn alloc_register(&mut self) -> Result<Register, JsError> {
        self.registers.alloc()
    }

    pub fn free_register(&mut self, reg: Register) {
        self.registers.free(reg);
    }
}
