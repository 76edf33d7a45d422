//! Bytecode instruction set and executable format
//!
//! This module defines the bytecode format used by the VM.
//! We use a register-based design with up to 255 virtual registers.

use crate::ast::{ClassNode, FunctionNode};
use crate::hoist::BlockScope;
use crate::prelude::*;
use crate::value::JsString;
use serde::Serialize;
use serde::ser::Serializer;

/// Virtual register index (0-254)
pub type Register = u8;

/// Constant pool index (0-65535)
pub type ConstantIndex = u16;

/// Jump target (instruction offset)
pub type JumpTarget = u32;

/// Bytecode instruction
///
/// Each instruction operates on virtual registers. Names of bindings and
/// properties live in the constant pool.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op")]
pub enum Op {
    // ═══════════════════════════════════════════════════════════════════════════════
    // Constants & Register Operations
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Load constant from pool: r[dst] = constants[idx]
    LoadConst { dst: Register, idx: ConstantIndex },

    /// Load undefined: r[dst] = undefined
    LoadUndefined { dst: Register },

    /// Load null: r[dst] = null
    LoadNull { dst: Register },

    /// Load boolean: r[dst] = value
    LoadBool { dst: Register, value: bool },

    /// Load integer (small numbers without constant pool): r[dst] = value
    LoadInt { dst: Register, value: i32 },

    /// Move register: r[dst] = r[src]
    Move { dst: Register, src: Register },

    /// r[dst] = this (resolved through the environment chain)
    LoadThis { dst: Register },

    /// r[dst] = new.target
    LoadNewTarget { dst: Register },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Add: r[dst] = r[left] + r[right]
    Add {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Subtract: r[dst] = r[left] - r[right]
    Sub {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Multiply: r[dst] = r[left] * r[right]
    Mul {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Less than: r[dst] = r[left] < r[right]
    Lt {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Strict equality: r[dst] = r[left] === r[right]
    StrictEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Strict inequality: r[dst] = r[left] !== r[right]
    StrictNotEq {
        dst: Register,
        left: Register,
        right: Register,
    },

    /// Logical not: r[dst] = !r[src]
    Not { dst: Register, src: Register },

    /// Negate: r[dst] = -r[src]
    Neg { dst: Register, src: Register },

    /// typeof: r[dst] = typeof r[src]
    TypeOf { dst: Register, src: Register },

    /// typeof of an identifier; unresolvable names give "undefined"
    TypeOfVar { dst: Register, name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Bindings & Scopes
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Read a binding: r[dst] = name
    GetVar { dst: Register, name: ConstantIndex },

    /// Assign a binding: name = r[src]
    SetVar { name: ConstantIndex, src: Register },

    /// Initialize a lexical binding in the current scope (let/const/class)
    InitializeBinding { name: ConstantIndex, src: Register },

    /// Enter a block: new declarative environment with its declarations
    PushScope { scope: ConstantIndex },

    /// Leave a block: restore the outer environment
    PopScope,

    /// Copy a block-level function binding to the function's var scope
    AnnexBCopy { name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Objects & Arrays
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Create empty array: r[dst] = []
    NewArray { dst: Register },

    /// Append r[src] to the array in r[array]
    ArrayPush { array: Register, src: Register },

    /// Append every element of the array-like in r[src]
    ArraySpread { array: Register, src: Register },

    /// Create empty object: r[dst] = {}
    NewObject { dst: Register },

    /// Define data property: r[obj][key] = r[src]
    DefineField {
        obj: Register,
        key: ConstantIndex,
        src: Register,
    },

    /// Get named property: r[dst] = r[obj].name
    GetNamed {
        dst: Register,
        obj: Register,
        name: ConstantIndex,
    },

    /// Get computed property: r[dst] = r[obj][r[key]]
    GetComputed {
        dst: Register,
        obj: Register,
        key: Register,
    },

    /// Set named property: r[obj].name = r[src]
    PutNamed {
        obj: Register,
        name: ConstantIndex,
        src: Register,
    },

    /// Set computed property: r[obj][r[key]] = r[src]
    PutComputed {
        obj: Register,
        key: Register,
        src: Register,
    },

    /// r[dst] = super.name
    GetSuperNamed { dst: Register, name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════
    /// r[dst] = r[callee].call(r[this], ...r[args])
    Call {
        dst: Register,
        callee: Register,
        this: Register,
        args: Register,
    },

    /// r[dst] = new r[callee](...r[args])
    New {
        dst: Register,
        callee: Register,
        args: Register,
    },

    /// r[dst] = super(...r[args])
    SuperCall { dst: Register, args: Register },

    /// Create a closure over the current environment: r[dst] = function
    NewFunction { dst: Register, idx: ConstantIndex },

    /// ClassDefinitionEvaluation: r[dst] = class (extends r[heritage])
    NewClass {
        dst: Register,
        idx: ConstantIndex,
        heritage: Option<Register>,
    },

    /// Give an anonymous function in r[reg] the inferred name
    SetFunctionName { reg: Register, name: ConstantIndex },

    // ═══════════════════════════════════════════════════════════════════════════════
    // Control Flow
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Unconditional jump
    Jump { target: JumpTarget },

    /// Jump if r[cond] is falsy
    JumpIfFalse { cond: Register, target: JumpTarget },

    /// Suspend the generator with r[src]; the sent value lands in r[dst]
    Yield { dst: Register, src: Register },

    /// Return r[src]
    Return { src: Register },

    /// Throw r[src]
    Throw { src: Register },
}

/// Constant pool entry
#[derive(Debug, Clone)]
pub enum Constant {
    String(JsString),
    Number(f64),
    Function(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Scope(Rc<BlockScope>),
}

impl Serialize for Constant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Constant::String(s) => serializer.serialize_newtype_variant("Constant", 0, "String", s),
            Constant::Number(n) => serializer.serialize_newtype_variant("Constant", 1, "Number", n),
            Constant::Function(f) => serializer.serialize_newtype_variant(
                "Constant",
                2,
                "Function",
                f.name.as_ref().map_or("<anonymous>", |n| n.as_str()),
            ),
            Constant::Class(c) => serializer.serialize_newtype_variant(
                "Constant",
                3,
                "Class",
                c.name.as_ref().map_or("<anonymous>", |n| n.as_str()),
            ),
            Constant::Scope(scope) => {
                let names: Vec<&str> = scope
                    .lexical
                    .iter()
                    .flat_map(|d| d.names.iter().map(|n| n.as_str()))
                    .chain(scope.functions.iter().map(|f| f.name.as_str()))
                    .collect();
                serializer.serialize_newtype_variant("Constant", 4, "Scope", &names)
            }
        }
    }
}

/// A compiled function body
#[derive(Debug, Serialize)]
pub struct Executable {
    pub name: JsString,
    pub code: Vec<Op>,
    pub constants: Vec<Constant>,
    pub register_count: u8,
    pub is_generator: bool,
}

impl Executable {
    /// Get instruction at offset
    #[inline]
    pub fn get(&self, offset: usize) -> Option<&Op> {
        self.code.get(offset)
    }

    /// Get constant at index
    pub fn get_constant(&self, idx: ConstantIndex) -> Option<&Constant> {
        self.constants.get(idx as usize)
    }

    /// JSON rendering for bytecode dumps
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }
}
