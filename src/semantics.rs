//! Translation of decoded instructions into semantic blocks.
//!
//! Each instruction family has one template; `instructions::TABLE` binds
//! every opcode to its template. Guarded instructions get their body wrapped
//! in a single `If` over the guard predicate.

use crate::decoder::{Area, Decoded, Format, Op, Pred};
use crate::instructions::desc;
use crate::isa::patmos::{access_shift, raw_target};
use crate::regs::*;
use crate::sem::{Block, Cond, MemType, SemOp, Var};

/// Accumulates the operations of one block and hands out temporaries.
#[derive(Debug)]
pub struct Builder {
    ops: Vec<SemOp>,
    next_tmp: u8,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self { ops: Vec::new(), next_tmp: 1 }
    }

    pub fn emit(&mut self, op: SemOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Fresh block-local temporary.
    pub fn tmp(&mut self) -> Var {
        let t = Var::Tmp(self.next_tmp);
        self.next_tmp += 1;
        t
    }

    /// Semantic operand for an internal register index.
    ///
    /// Panics for PC-class indices; templates never name them.
    pub fn reg(&self, index: u8) -> Var {
        match RegisterDecoder::get().lookup(index) {
            Some(r) => Var::Reg(r.number()),
            None => panic!("register index {index} has no semantic operand"),
        }
    }

    /// Temporary holding `v`.
    pub fn imm(&mut self, v: u32) -> Var {
        let t = self.tmp();
        self.emit(SemOp::SetI { dst: t, imm: v });
        t
    }

    /// General register read; `r0` reads as zero.
    pub fn gpr(&mut self, r: u8) -> Var {
        if r == 0 {
            self.imm(0)
        } else {
            self.reg(reg_r(r))
        }
    }

    /// Predicate read, negation applied. `p0` reads as true.
    pub fn pred(&mut self, p: Pred) -> Var {
        if p.idx == 0 {
            return self.imm(u32::from(!p.neg));
        }
        let v = self.reg(reg_p(p.idx));
        if !p.neg {
            return v;
        }
        let one = self.imm(1);
        let t = self.tmp();
        self.emit(SemOp::Xor { dst: t, a: v, b: one });
        t
    }

    fn patch_skip(&mut self, at: usize, n: u32) {
        if let Some(SemOp::If { skip, .. }) = self.ops.get_mut(at) {
            *skip = n;
        }
    }

    pub fn finish(self) -> Block {
        Block::from(self.ops)
    }
}

/// Semantic block of one instruction. Unknown instructions give an empty block.
pub fn translate(d: &Decoded) -> Block {
    if d.is_unknown() {
        return Block::new();
    }
    let mut b = Builder::new();
    let guard = if d.guard.is_always() {
        None
    } else {
        let p = b.pred(d.guard);
        let zero = b.imm(0);
        let c = b.tmp();
        b.emit(SemOp::CmpU { dst: c, a: p, b: zero });
        b.emit(SemOp::If { cond: Cond::Ne, reg: c, skip: 0 });
        Some(b.len() - 1)
    };
    (desc(d.op).sem)(d, &mut b);
    if let Some(at) = guard {
        let body = (b.len() - at - 1) as u32;
        b.patch_skip(at, body);
    }
    b.finish()
}

// second operand: register for R forms, immediate otherwise
fn rhs(d: &Decoded, b: &mut Builder) -> Var {
    match d.format {
        Format::AluR | Format::AluC | Format::AluM => b.gpr(d.rs2),
        _ => b.imm(d.imm),
    }
}

pub fn unknown(_: &Decoded, _: &mut Builder) {}

pub fn nop(_: &Decoded, b: &mut Builder) {
    b.emit(SemOp::Nop);
}

pub fn alu(d: &Decoded, b: &mut Builder) {
    if d.rd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let dst = b.reg(reg_r(d.rd));
    let a = b.gpr(d.rs1);
    let c = rhs(d, b);
    let op = match d.op {
        Op::Add => SemOp::Add { dst, a, b: c },
        Op::Sub => SemOp::Sub { dst, a, b: c },
        Op::Xor => SemOp::Xor { dst, a, b: c },
        Op::Sl => SemOp::Shl { dst, a, b: c },
        Op::Sr => SemOp::Shr { dst, a, b: c },
        Op::Sra => SemOp::Asr { dst, a, b: c },
        Op::Or => SemOp::Or { dst, a, b: c },
        Op::And => SemOp::And { dst, a, b: c },
        Op::Nor => {
            b.emit(SemOp::Or { dst, a, b: c });
            SemOp::Not { dst, src: dst }
        }
        Op::Shadd | Op::Shadd2 => {
            let n = b.imm(if d.op == Op::Shadd { 1 } else { 2 });
            let t = b.tmp();
            b.emit(SemOp::Shl { dst: t, a, b: n });
            SemOp::Add { dst, a: t, b: c }
        }
        // rotates are not modeled
        _ => SemOp::Scratch { dst },
    };
    b.emit(op);
}

pub fn unary(d: &Decoded, b: &mut Builder) {
    if d.rd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let dst = b.reg(reg_r(d.rd));
    let a = b.gpr(d.rs1);
    match d.op {
        Op::Sext8 | Op::Sext16 => {
            let n = b.imm(if d.op == Op::Sext8 { 24 } else { 16 });
            b.emit(SemOp::Shl { dst, a, b: n });
            b.emit(SemOp::Asr { dst, a: dst, b: n });
        }
        Op::Zext16 => {
            let m = b.imm(0xffff);
            b.emit(SemOp::And { dst, a, b: m });
        }
        _ => {
            let zero = b.imm(0);
            let c = b.tmp();
            b.emit(SemOp::Cmp { dst: c, a, b: zero });
            b.emit(SemOp::Set { dst, src: a });
            b.emit(SemOp::If { cond: Cond::Lt, reg: c, skip: 1 });
            b.emit(SemOp::Sub { dst, a: zero, b: a });
        }
    }
}

pub fn mul(d: &Decoded, b: &mut Builder) {
    let a = b.gpr(d.rs1);
    let c = b.gpr(d.rs2);
    let sl = b.reg(reg_s(S_SL));
    let sh = b.reg(reg_s(S_SH));
    if d.op == Op::Mulu {
        b.emit(SemOp::MulU { dst: sl, a, b: c });
    } else {
        b.emit(SemOp::Mul { dst: sl, a, b: c });
    }
    b.emit(SemOp::Scratch { dst: sh });
}

pub fn compare(d: &Decoded, b: &mut Builder) {
    // p0 is hardwired
    if d.pd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let a = b.gpr(d.rs1);
    let c = rhs(d, b);
    let t = b.tmp();
    let cond = match d.op {
        Op::Btest => {
            let bit = b.tmp();
            b.emit(SemOp::Shr { dst: bit, a, b: c });
            let one = b.imm(1);
            b.emit(SemOp::And { dst: bit, a: bit, b: one });
            let zero = b.imm(0);
            b.emit(SemOp::CmpU { dst: t, a: bit, b: zero });
            Cond::Ne
        }
        Op::Cmpult | Op::Cmpule => {
            b.emit(SemOp::CmpU { dst: t, a, b: c });
            if d.op == Op::Cmpult { Cond::Ult } else { Cond::Ule }
        }
        _ => {
            b.emit(SemOp::Cmp { dst: t, a, b: c });
            match d.op {
                Op::Cmpeq => Cond::Eq,
                Op::Cmpneq => Cond::Ne,
                Op::Cmplt => Cond::Lt,
                _ => Cond::Le,
            }
        }
    };
    let p = b.reg(reg_p(d.pd));
    b.emit(SemOp::SetI { dst: p, imm: 0 });
    b.emit(SemOp::If { cond, reg: t, skip: 1 });
    b.emit(SemOp::SetI { dst: p, imm: 1 });
}

pub fn pred_logic(d: &Decoded, b: &mut Builder) {
    if d.pd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let a = b.pred(d.ps1);
    let c = b.pred(d.ps2);
    let dst = b.reg(reg_p(d.pd));
    b.emit(match d.op {
        Op::Por => SemOp::Or { dst, a, b: c },
        Op::Pand => SemOp::And { dst, a, b: c },
        _ => SemOp::Xor { dst, a, b: c },
    });
}

pub fn bcopy(d: &Decoded, b: &mut Builder) {
    if d.rd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let dst = b.reg(reg_r(d.rd));
    let a = b.gpr(d.rs1);
    let mask = b.imm(!(1u32 << d.imm));
    let cleared = b.tmp();
    b.emit(SemOp::And { dst: cleared, a, b: mask });
    let p = b.pred(d.ps1);
    let n = b.imm(d.imm);
    let bit = b.tmp();
    b.emit(SemOp::Shl { dst: bit, a: p, b: n });
    b.emit(SemOp::Or { dst, a: cleared, b: bit });
}

pub fn mts(d: &Decoded, b: &mut Builder) {
    let a = b.gpr(d.rs1);
    if d.sreg == S_PRED {
        let one = b.imm(1);
        for i in 1..8u8 {
            let n = b.imm(u32::from(i));
            let t = b.tmp();
            b.emit(SemOp::Shr { dst: t, a, b: n });
            let p = b.reg(reg_p(i));
            b.emit(SemOp::And { dst: p, a: t, b: one });
        }
    } else {
        let s = b.reg(reg_s(d.sreg));
        b.emit(SemOp::Set { dst: s, src: a });
    }
}

pub fn mfs(d: &Decoded, b: &mut Builder) {
    if d.rd == 0 {
        b.emit(SemOp::Nop);
        return;
    }
    let dst = b.reg(reg_r(d.rd));
    if d.sreg == S_PRED {
        // bit 0 mirrors p0
        b.emit(SemOp::SetI { dst, imm: 1 });
        for i in 1..8u8 {
            let n = b.imm(u32::from(i));
            let t = b.tmp();
            let p = b.reg(reg_p(i));
            b.emit(SemOp::Shl { dst: t, a: p, b: n });
            b.emit(SemOp::Or { dst, a: dst, b: t });
        }
    } else {
        let s = b.reg(reg_s(d.sreg));
        b.emit(SemOp::Set { dst, src: s });
    }
}

// effective address of a typed access
fn address(d: &Decoded, b: &mut Builder) -> Var {
    let base = b.gpr(d.rs1);
    let off = b.imm(d.imm << access_shift(d.op));
    let ea = b.tmp();
    b.emit(SemOp::Add { dst: ea, a: base, b: off });
    if d.area == Area::Stack {
        let st = b.reg(reg_s(S_ST));
        b.emit(SemOp::Add { dst: ea, a: ea, b: st });
    }
    ea
}

fn mem_type(op: Op) -> MemType {
    match op {
        Op::Lh | Op::Sh => MemType::Int16,
        Op::Lb | Op::Sb => MemType::Int8,
        Op::Lhu => MemType::Uint16,
        Op::Lbu => MemType::Uint8,
        _ => MemType::Int32,
    }
}

pub fn load(d: &Decoded, b: &mut Builder) {
    let addr = address(d, b);
    let dst = if d.op == Op::Dlw {
        b.reg(reg_s(S_SM))
    } else if d.rd == 0 {
        b.tmp()
    } else {
        b.reg(reg_r(d.rd))
    };
    b.emit(SemOp::Load { dst, addr, ty: mem_type(d.op) });
}

pub fn store(d: &Decoded, b: &mut Builder) {
    let addr = address(d, b);
    let src = b.gpr(d.rs2);
    b.emit(SemOp::Store { src, addr, ty: mem_type(d.op) });
}

// stack cache amount in bytes
fn amount(d: &Decoded, b: &mut Builder) -> Var {
    if d.format == Format::StcR {
        let a = b.gpr(d.rs1);
        let two = b.imm(2);
        let t = b.tmp();
        b.emit(SemOp::Shl { dst: t, a, b: two });
        t
    } else {
        b.imm(d.imm << 2)
    }
}

pub fn stack(d: &Decoded, b: &mut Builder) {
    let st = b.reg(reg_s(S_ST));
    let ss = b.reg(reg_s(S_SS));
    match d.op {
        Op::Sres => {
            let n = amount(d, b);
            b.emit(SemOp::Sub { dst: st, a: st, b: n });
            b.emit(SemOp::Scratch { dst: ss });
        }
        Op::Sens => b.emit(SemOp::Scratch { dst: ss }),
        Op::Sfree => {
            let n = amount(d, b);
            b.emit(SemOp::Add { dst: st, a: st, b: n });
            let c = b.tmp();
            b.emit(SemOp::CmpU { dst: c, a: ss, b: st });
            b.emit(SemOp::If { cond: Cond::Ult, reg: c, skip: 1 });
            b.emit(SemOp::Set { dst: ss, src: st });
        }
        _ => {
            let n = amount(d, b);
            b.emit(SemOp::Sub { dst: ss, a: ss, b: n });
        }
    }
}

pub fn call(d: &Decoded, b: &mut Builder) {
    let mcb = b.reg(REG_MCB);
    if d.format == Format::CflI {
        b.emit(SemOp::SetI { dst: mcb, imm: d.imm << 2 });
    } else {
        let a = b.gpr(d.rs1);
        b.emit(SemOp::Set { dst: mcb, src: a });
    }
    let srb = b.reg(reg_s(S_SRB));
    let sro = b.reg(reg_s(S_SRO));
    b.emit(SemOp::Scratch { dst: srb });
    b.emit(SemOp::Scratch { dst: sro });
    b.emit(SemOp::Branch { target: mcb });
}

pub fn branch(d: &Decoded, b: &mut Builder) {
    let target = match raw_target(d) {
        Some(addr) => b.imm(addr),
        None => b.gpr(d.rs1),
    };
    b.emit(SemOp::Branch { target });
}

pub fn branch_cf(d: &Decoded, b: &mut Builder) {
    let mcb = b.reg(REG_MCB);
    if d.format == Format::CflI {
        b.emit(SemOp::SetI { dst: mcb, imm: d.imm << 2 });
        b.emit(SemOp::Branch { target: mcb });
        return;
    }
    let base = b.gpr(d.rs1);
    b.emit(SemOp::Set { dst: mcb, src: base });
    let off = b.gpr(d.rs2);
    let t = b.tmp();
    b.emit(SemOp::Add { dst: t, a: base, b: off });
    b.emit(SemOp::Branch { target: t });
}

pub fn trap(_: &Decoded, b: &mut Builder) {
    let sxb = b.reg(reg_s(S_SXB));
    let sxo = b.reg(reg_s(S_SXO));
    b.emit(SemOp::Scratch { dst: sxb });
    b.emit(SemOp::Scratch { dst: sxo });
    b.emit(SemOp::Trap);
}

pub fn ret(d: &Decoded, b: &mut Builder) {
    let (base, off) = if d.op == Op::Xret { (S_SXB, S_SXO) } else { (S_SRB, S_SRO) };
    let mcb = b.reg(REG_MCB);
    let base = b.reg(reg_s(base));
    let off = b.reg(reg_s(off));
    b.emit(SemOp::Set { dst: mcb, src: base });
    let t = b.tmp();
    b.emit(SemOp::Add { dst: t, a: base, b: off });
    b.emit(SemOp::Branch { target: t });
}
