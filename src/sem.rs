//! Semantic micro-operations.
//!
//! A [`Block`] runs its operations strictly in order. [`SemOp::If`] is the only
//! control construct: when its condition does not hold, the next `skip`
//! operations are skipped.

use crate::regs::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operand: a platform register number or a block-local temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Var {
    Reg(usize),
    Tmp(u8),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Reg(n) => match Platform::get().register(*n) {
                Some(r) => write!(f, "{r}"),
                None => write!(f, "?{n}"),
            },
            Var::Tmp(n) => write!(f, "t{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Ult,
    Ule,
    Uge,
    Ugt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemOp {
    Nop,
    Branch { target: Var },
    Trap,
    Cont,
    If { cond: Cond, reg: Var, skip: u32 },
    Load { dst: Var, addr: Var, ty: MemType },
    Store { src: Var, addr: Var, ty: MemType },
    Scratch { dst: Var },
    Set { dst: Var, src: Var },
    SetI { dst: Var, imm: u32 },
    Cmp { dst: Var, a: Var, b: Var },
    CmpU { dst: Var, a: Var, b: Var },
    Add { dst: Var, a: Var, b: Var },
    Sub { dst: Var, a: Var, b: Var },
    Shl { dst: Var, a: Var, b: Var },
    Shr { dst: Var, a: Var, b: Var },
    Asr { dst: Var, a: Var, b: Var },
    Not { dst: Var, src: Var },
    And { dst: Var, a: Var, b: Var },
    Or { dst: Var, a: Var, b: Var },
    Xor { dst: Var, a: Var, b: Var },
    Mul { dst: Var, a: Var, b: Var },
    MulU { dst: Var, a: Var, b: Var },
}

impl fmt::Display for SemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SemOp::*;
        let bin = |f: &mut fmt::Formatter<'_>, mn: &str, dst: &Var, a: &Var, b: &Var| write!(f, "{mn} {dst}, {a}, {b}");
        match self {
            Nop => f.write_str("nop"),
            Branch { target } => write!(f, "branch {target}"),
            Trap => f.write_str("trap"),
            Cont => f.write_str("cont"),
            If { cond, reg, skip } => write!(f, "if {cond:?}, {reg}, {skip}"),
            Load { dst, addr, ty } => write!(f, "load {dst}, {addr}, {ty:?}"),
            Store { src, addr, ty } => write!(f, "store {src}, {addr}, {ty:?}"),
            Scratch { dst } => write!(f, "scratch {dst}"),
            Set { dst, src } => write!(f, "set {dst}, {src}"),
            SetI { dst, imm } => write!(f, "seti {dst}, {imm:#x}"),
            Cmp { dst, a, b } => bin(f, "cmp", dst, a, b),
            CmpU { dst, a, b } => bin(f, "cmpu", dst, a, b),
            Add { dst, a, b } => bin(f, "add", dst, a, b),
            Sub { dst, a, b } => bin(f, "sub", dst, a, b),
            Shl { dst, a, b } => bin(f, "shl", dst, a, b),
            Shr { dst, a, b } => bin(f, "shr", dst, a, b),
            Asr { dst, a, b } => bin(f, "asr", dst, a, b),
            Not { dst, src } => write!(f, "not {dst}, {src}"),
            And { dst, a, b } => bin(f, "and", dst, a, b),
            Or { dst, a, b } => bin(f, "or", dst, a, b),
            Xor { dst, a, b } => bin(f, "xor", dst, a, b),
            Mul { dst, a, b } => bin(f, "mul", dst, a, b),
            MulU { dst, a, b } => bin(f, "mulu", dst, a, b),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    ops: Vec<SemOp>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, op: SemOp) {
        self.ops.push(op);
    }
    pub fn ops(&self) -> &[SemOp] {
        &self.ops
    }
    pub fn len(&self) -> usize {
        self.ops.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, SemOp> {
        self.ops.iter()
    }
}

impl From<Vec<SemOp>> for Block {
    fn from(ops: Vec<SemOp>) -> Self {
        Self { ops }
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = &'a SemOp;
    type IntoIter = std::slice::Iter<'a, SemOp>;
    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}
