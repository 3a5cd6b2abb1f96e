use crate::memory::Memory;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kind: u32 {
const IS_COND = 1 << 0;
const IS_CONTROL = 1 << 1;
const IS_CALL = 1 << 2;
const IS_RETURN = 1 << 3;
const IS_MEM = 1 << 4;
const IS_LOAD = 1 << 5;
const IS_STORE = 1 << 6;
const IS_INT = 1 << 7;
const IS_ALU = 1 << 8;
const IS_MUL = 1 << 9;
const IS_SHIFT = 1 << 10;
const IS_TRAP = 1 << 11;
const IS_INTERN = 1 << 12;
const IS_SPECIAL = 1 << 13;
const IS_INDIRECT = 1 << 14;
}
}

/// Instruction identity. The discriminant indexes `instructions::TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Unknown,
    // integer ALU, register/immediate/long forms
    Add,
    Sub,
    Xor,
    Sl,
    Sr,
    Sra,
    Or,
    And,
    Rl,
    Rr,
    Nor,
    Shadd,
    Shadd2,
    // unary
    Sext8,
    Sext16,
    Zext16,
    Abs,
    // multiply into sl/sh
    Mul,
    Mulu,
    // compares into a predicate
    Cmpeq,
    Cmpneq,
    Cmplt,
    Cmple,
    Cmpult,
    Cmpule,
    Btest,
    // predicate combine
    Por,
    Pand,
    Pxor,
    Bcopy,
    // special registers
    Mts,
    Mfs,
    WaitMem,
    // typed loads/stores
    Lw,
    Lh,
    Lb,
    Lhu,
    Lbu,
    Dlw,
    Sw,
    Sh,
    Sb,
    // stack cache control
    Sres,
    Sens,
    Sfree,
    Sspill,
    // control flow
    Call,
    Br,
    Brcf,
    Trap,
    Ret,
    Xret,
}

/// Encoding format: tells templates where operands live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    None,
    AluI,
    AluL,
    AluR,
    AluU,
    AluM,
    AluC,
    AluCi,
    AluP,
    AluB,
    SpcW,
    SpcT,
    SpcF,
    LdT,
    StT,
    StcI,
    StcR,
    CflI,
    CflRi,
    CflRs,
    CflRt,
}

/// Memory area selected by typed loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Area {
    Stack,
    Local,
    Cache,
    Main,
}

impl Area {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Area::Stack,
            1 => Area::Local,
            2 => Area::Cache,
            _ => Area::Main,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Area::Stack => 's',
            Area::Local => 'l',
            Area::Cache => 'c',
            Area::Main => 'm',
        }
    }
}

/// Predicate operand, optionally negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pred {
    pub neg: bool,
    pub idx: u8,
}

impl Pred {
    pub fn from_bits(bits: u32) -> Self {
        Self {
            neg: bits & 0x8 != 0,
            idx: (bits & 0x7) as u8,
        }
    }

    /// `(p0)` is the always-true guard.
    pub fn is_always(self) -> bool {
        !self.neg && self.idx == 0
    }
}

/// Transient result of one decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub addr: u32,
    pub op: Op,
    pub format: Format,
    pub bits: u8, // 32 or 64, 0 when unknown
    pub bundle: bool,
    pub guard: Pred,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub pd: u8,
    pub ps1: Pred,
    pub ps2: Pred,
    pub sreg: u8,
    pub area: Area,
    pub delayed: bool,
    pub imm: u32,
}

impl Decoded {
    pub fn unknown(addr: u32, bundle: bool) -> Self {
        Self {
            addr,
            op: Op::Unknown,
            format: Format::None,
            bits: 0,
            bundle,
            guard: Pred::default(),
            rd: 0,
            rs1: 0,
            rs2: 0,
            pd: 0,
            ps1: Pred::default(),
            ps2: Pred::default(),
            sreg: 0,
            area: Area::Main,
            delayed: false,
            imm: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.op == Op::Unknown
    }

    /// Size in bytes.
    pub fn size(&self) -> u32 {
        self.bits as u32 / 8
    }
}

/// Raw internal register indices touched by an instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedRegs {
    pub read: Vec<u8>,
    pub write: Vec<u8>,
}

pub trait Decoder {
    /// Decode from already fetched words; `ext` is the word following `word`.
    fn decode_words(&self, addr: u32, word: u32, ext: Option<u32>) -> Decoded;

    /// Whether `word` needs its successor to be decoded.
    fn needs_ext(&self, word: u32) -> bool;

    fn decode<M: Memory + ?Sized>(&self, mem: &M, addr: u32) -> anyhow::Result<Decoded> {
        let word = mem.read_u32(addr)?;
        let ext = if self.needs_ext(word) {
            Some(mem.read_u32(addr.wrapping_add(4))?)
        } else {
            None
        };
        Ok(self.decode_words(addr, word, ext))
    }
}
