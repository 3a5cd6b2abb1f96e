use crate::decoder::{Decoded, Kind, Op};
use crate::semantics::{self as sem, Builder};

pub type SemFn = fn(&Decoded, &mut Builder);

#[derive(Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub kind: Kind,
    /// Delay depth in bundles when the delayed form is used.
    pub delay: u8,
    pub sem: SemFn,
}

impl std::fmt::Debug for InstrDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrDesc")
            .field("op", &self.op)
            .field("mnemonic", &self.mnemonic)
            .field("kind", &self.kind)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

const ALU: Kind = Kind::IS_INT.union(Kind::IS_ALU);
const SHIFT: Kind = ALU.union(Kind::IS_SHIFT);
const MUL: Kind = Kind::IS_INT.union(Kind::IS_MUL);
const LOAD: Kind = Kind::IS_MEM.union(Kind::IS_LOAD);
const STORE: Kind = Kind::IS_MEM.union(Kind::IS_STORE);
const SPECIAL: Kind = Kind::IS_INT.union(Kind::IS_SPECIAL);
const CONTROL: Kind = Kind::IS_CONTROL;

const fn e(op: Op, mnemonic: &'static str, kind: Kind, delay: u8, sem: SemFn) -> InstrDesc {
    InstrDesc { op, mnemonic, kind, delay, sem }
}

/// One entry per `Op`, in discriminant order.
pub const TABLE: &[InstrDesc] = &[
    e(Op::Unknown, "unknown", Kind::empty(), 0, sem::unknown),
    e(Op::Add, "add", ALU, 0, sem::alu),
    e(Op::Sub, "sub", ALU, 0, sem::alu),
    e(Op::Xor, "xor", ALU, 0, sem::alu),
    e(Op::Sl, "sl", SHIFT, 0, sem::alu),
    e(Op::Sr, "sr", SHIFT, 0, sem::alu),
    e(Op::Sra, "sra", SHIFT, 0, sem::alu),
    e(Op::Or, "or", ALU, 0, sem::alu),
    e(Op::And, "and", ALU, 0, sem::alu),
    e(Op::Rl, "rl", SHIFT, 0, sem::alu),
    e(Op::Rr, "rr", SHIFT, 0, sem::alu),
    e(Op::Nor, "nor", ALU, 0, sem::alu),
    e(Op::Shadd, "shadd", SHIFT, 0, sem::alu),
    e(Op::Shadd2, "shadd2", SHIFT, 0, sem::alu),
    e(Op::Sext8, "sext8", ALU, 0, sem::unary),
    e(Op::Sext16, "sext16", ALU, 0, sem::unary),
    e(Op::Zext16, "zext16", ALU, 0, sem::unary),
    e(Op::Abs, "abs", ALU, 0, sem::unary),
    e(Op::Mul, "mul", MUL, 0, sem::mul),
    e(Op::Mulu, "mulu", MUL, 0, sem::mul),
    e(Op::Cmpeq, "cmpeq", ALU, 0, sem::compare),
    e(Op::Cmpneq, "cmpneq", ALU, 0, sem::compare),
    e(Op::Cmplt, "cmplt", ALU, 0, sem::compare),
    e(Op::Cmple, "cmple", ALU, 0, sem::compare),
    e(Op::Cmpult, "cmpult", ALU, 0, sem::compare),
    e(Op::Cmpule, "cmpule", ALU, 0, sem::compare),
    e(Op::Btest, "btest", ALU, 0, sem::compare),
    e(Op::Por, "por", ALU, 0, sem::pred_logic),
    e(Op::Pand, "pand", ALU, 0, sem::pred_logic),
    e(Op::Pxor, "pxor", ALU, 0, sem::pred_logic),
    e(Op::Bcopy, "bcopy", ALU, 0, sem::bcopy),
    e(Op::Mts, "mts", SPECIAL, 0, sem::mts),
    e(Op::Mfs, "mfs", SPECIAL, 0, sem::mfs),
    e(Op::WaitMem, "wait.mem", Kind::IS_INTERN, 0, sem::nop),
    e(Op::Lw, "lw", LOAD, 0, sem::load),
    e(Op::Lh, "lh", LOAD, 0, sem::load),
    e(Op::Lb, "lb", LOAD, 0, sem::load),
    e(Op::Lhu, "lhu", LOAD, 0, sem::load),
    e(Op::Lbu, "lbu", LOAD, 0, sem::load),
    e(Op::Dlw, "dlw", LOAD, 0, sem::load),
    e(Op::Sw, "sw", STORE, 0, sem::store),
    e(Op::Sh, "sh", STORE, 0, sem::store),
    e(Op::Sb, "sb", STORE, 0, sem::store),
    e(Op::Sres, "sres", STORE.union(Kind::IS_INTERN), 0, sem::stack),
    e(Op::Sens, "sens", LOAD.union(Kind::IS_INTERN), 0, sem::stack),
    e(Op::Sfree, "sfree", Kind::IS_INTERN, 0, sem::stack),
    e(Op::Sspill, "sspill", STORE.union(Kind::IS_INTERN), 0, sem::stack),
    e(Op::Call, "call", CONTROL.union(Kind::IS_CALL), 3, sem::call),
    e(Op::Br, "br", CONTROL, 2, sem::branch),
    e(Op::Brcf, "brcf", CONTROL, 3, sem::branch_cf),
    e(Op::Trap, "trap", CONTROL.union(Kind::IS_TRAP), 0, sem::trap),
    e(Op::Ret, "ret", CONTROL.union(Kind::IS_RETURN), 3, sem::ret),
    e(Op::Xret, "xret", CONTROL.union(Kind::IS_RETURN), 3, sem::ret),
];

pub fn desc(op: Op) -> &'static InstrDesc {
    &TABLE[op as usize]
}
