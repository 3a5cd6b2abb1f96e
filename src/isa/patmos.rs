//! PatMOS decoder.
//!
//! Word layout (big-endian, bit 31 first):
//!
//! ```text
//!  31   | 30..27 | 26..22 | 21..17 | 16..12 | 11..7 | 6..4   | 3..0
//!  bndl | guard  | opcode | rd     | rs1    | rs2   | sub-op | func
//! ```
//!
//! Bit 31 marks the first word of an 8-byte bundle. ALUl instructions take
//! the whole bundle: their 32-bit immediate is the following word.

use crate::decoder::{Area, Decoded, Decoder, Format, Kind, Op, Pred, UsedRegs};
use crate::instructions::desc;
use crate::regs::*;
use tracing::{debug, trace};

pub struct PatmosDecoder;

impl PatmosDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PatmosDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn bits(w: u32, hi: u32, lo: u32) -> u32 {
    (w >> lo) & ((1u32 << (hi - lo + 1)) - 1)
}

#[inline]
pub fn sign_ext(v: u32, bits: u32) -> u32 {
    let s = 32 - bits;
    ((v << s) as i32 >> s) as u32
}

const OPC_ALUL: u32 = 0b11111;
const OPC_ALU: u32 = 0b01000;
const OPC_SPC: u32 = 0b01001;
const OPC_LDT: u32 = 0b01010;
const OPC_STT: u32 = 0b01011;
const OPC_STC: u32 = 0b01100;
const OPC_CFLR: u32 = 0b11000;

// ALUr function codes; ALUi only uses the first eight
const ALU_FUNCS: [Option<Op>; 16] = [
    Some(Op::Add),
    Some(Op::Sub),
    Some(Op::Xor),
    Some(Op::Sl),
    Some(Op::Sr),
    Some(Op::Sra),
    Some(Op::Or),
    Some(Op::And),
    Some(Op::Rl),
    Some(Op::Rr),
    Some(Op::Nor),
    Some(Op::Shadd),
    Some(Op::Shadd2),
    None,
    None,
    None,
];

const CMP_FUNCS: [Op; 7] = [
    Op::Cmpeq,
    Op::Cmpneq,
    Op::Cmplt,
    Op::Cmple,
    Op::Cmpult,
    Op::Cmpule,
    Op::Btest,
];

const STC_OPS: [Op; 4] = [Op::Sres, Op::Sens, Op::Sfree, Op::Sspill];
const CFL_OPS: [Op; 4] = [Op::Call, Op::Br, Op::Brcf, Op::Trap];

impl Decoder for PatmosDecoder {
    fn needs_ext(&self, word: u32) -> bool {
        word & 0x8000_0000 != 0 && bits(word, 26, 22) == OPC_ALUL
    }

    fn decode_words(&self, addr: u32, word: u32, ext: Option<u32>) -> Decoded {
        trace!("decode {addr:#010x}: {word:#010x}");
        let bundle = word & 0x8000_0000 != 0;
        let mut d = Decoded::unknown(addr, bundle);
        match fields(&mut d, word, ext) {
            Some((op, format)) => {
                d.op = op;
                d.format = format;
                d.guard = Pred::from_bits(bits(word, 30, 27));
                d.bits = if format == Format::AluL { 64 } else { 32 };
                d
            }
            None => {
                debug!("unknown encoding {word:#010x} at {addr:#010x}");
                Decoded::unknown(addr, bundle)
            }
        }
    }
}

fn fields(d: &mut Decoded, w: u32, ext: Option<u32>) -> Option<(Op, Format)> {
    let opc = bits(w, 26, 22);
    if opc >> 3 == 0b00 {
        // ALUi
        d.rd = bits(w, 21, 17) as u8;
        d.rs1 = bits(w, 16, 12) as u8;
        d.imm = bits(w, 11, 0);
        return Some((ALU_FUNCS[bits(w, 24, 22) as usize]?, Format::AluI));
    }
    if opc >> 3 == 0b10 {
        // CFLi
        d.delayed = bits(w, 22, 22) == 1;
        d.imm = bits(w, 21, 0);
        return Some((CFL_OPS[bits(w, 24, 23) as usize], Format::CflI));
    }
    match opc {
        OPC_ALUL => {
            let func = bits(w, 3, 0);
            if !d.bundle || bits(w, 6, 4) != 0 || matches!(func, 8 | 9) {
                return None;
            }
            d.rd = bits(w, 21, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            d.imm = ext?;
            Some((ALU_FUNCS[func as usize]?, Format::AluL))
        }
        OPC_ALU => alu(d, w),
        OPC_SPC => {
            let func = bits(w, 3, 0);
            match bits(w, 6, 4) {
                0b000 if func == 0 => Some((Op::WaitMem, Format::SpcW)),
                0b010 => {
                    d.rs1 = bits(w, 16, 12) as u8;
                    d.sreg = func as u8;
                    Some((Op::Mts, Format::SpcT))
                }
                0b011 => {
                    d.rd = bits(w, 21, 17) as u8;
                    d.sreg = func as u8;
                    Some((Op::Mfs, Format::SpcF))
                }
                _ => None,
            }
        }
        OPC_LDT => {
            d.area = Area::from_bits(bits(w, 8, 7));
            let op = match bits(w, 11, 9) {
                0 => Op::Lw,
                1 => Op::Lh,
                2 => Op::Lb,
                3 => Op::Lhu,
                4 => Op::Lbu,
                5 if matches!(d.area, Area::Cache | Area::Main) => Op::Dlw,
                _ => return None,
            };
            d.rd = bits(w, 21, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            d.imm = bits(w, 6, 0);
            Some((op, Format::LdT))
        }
        OPC_STT => {
            d.area = Area::from_bits(bits(w, 18, 17));
            let op = match bits(w, 21, 19) {
                0 => Op::Sw,
                1 => Op::Sh,
                2 => Op::Sb,
                _ => return None,
            };
            d.rs1 = bits(w, 16, 12) as u8;
            d.rs2 = bits(w, 11, 7) as u8;
            d.imm = bits(w, 6, 0);
            Some((op, Format::StT))
        }
        OPC_STC => {
            let op = STC_OPS[bits(w, 19, 18) as usize];
            match bits(w, 21, 20) {
                0b00 => {
                    d.imm = bits(w, 17, 0);
                    Some((op, Format::StcI))
                }
                0b01 if matches!(op, Op::Sens | Op::Sspill) => {
                    d.rs1 = bits(w, 16, 12) as u8;
                    Some((op, Format::StcR))
                }
                _ => None,
            }
        }
        OPC_CFLR => {
            d.delayed = bits(w, 21, 21) == 1;
            match (bits(w, 3, 2), bits(w, 1, 0)) {
                (0b00, 0b00) => Some((Op::Ret, Format::CflRi)),
                (0b00, 0b01) => Some((Op::Xret, Format::CflRi)),
                (0b01, op @ (0b00 | 0b01)) => {
                    d.rs1 = bits(w, 16, 12) as u8;
                    let op = if op == 0 { Op::Call } else { Op::Br };
                    Some((op, Format::CflRs))
                }
                (0b10, 0b00) => {
                    d.rs1 = bits(w, 16, 12) as u8;
                    d.rs2 = bits(w, 11, 7) as u8;
                    Some((Op::Brcf, Format::CflRt))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn alu(d: &mut Decoded, w: u32) -> Option<(Op, Format)> {
    let func = bits(w, 3, 0);
    match bits(w, 6, 4) {
        0b000 => {
            d.rd = bits(w, 21, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            d.rs2 = bits(w, 11, 7) as u8;
            Some((ALU_FUNCS[func as usize]?, Format::AluR))
        }
        0b001 => {
            let op = match func {
                0 => Op::Sext8,
                1 => Op::Sext16,
                2 => Op::Zext16,
                5 => Op::Abs,
                _ => return None,
            };
            d.rd = bits(w, 21, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            Some((op, Format::AluU))
        }
        0b010 => {
            let op = match func {
                0 => Op::Mul,
                1 => Op::Mulu,
                _ => return None,
            };
            d.rs1 = bits(w, 16, 12) as u8;
            d.rs2 = bits(w, 11, 7) as u8;
            Some((op, Format::AluM))
        }
        sub @ (0b011 | 0b110) => {
            let op = *CMP_FUNCS.get(func as usize)?;
            d.pd = bits(w, 19, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            if sub == 0b110 {
                d.imm = bits(w, 11, 7);
                Some((op, Format::AluCi))
            } else {
                d.rs2 = bits(w, 11, 7) as u8;
                Some((op, Format::AluC))
            }
        }
        0b100 => {
            let op = match func {
                6 => Op::Por,
                7 => Op::Pand,
                10 => Op::Pxor,
                _ => return None,
            };
            d.pd = bits(w, 19, 17) as u8;
            d.ps1 = Pred::from_bits(bits(w, 15, 12));
            d.ps2 = Pred::from_bits(bits(w, 10, 7));
            Some((op, Format::AluP))
        }
        0b101 => {
            d.rd = bits(w, 21, 17) as u8;
            d.rs1 = bits(w, 16, 12) as u8;
            d.imm = bits(w, 11, 7);
            d.ps1 = Pred::from_bits(func);
            Some((Op::Bcopy, Format::AluB))
        }
        _ => None,
    }
}

/// Kind bitmask of a decoded instruction; empty for unknown encodings.
pub fn kind(d: &Decoded) -> Kind {
    if d.is_unknown() {
        return Kind::empty();
    }
    let mut kind = desc(d.op).kind;
    if matches!(d.format, Format::CflRs | Format::CflRt) {
        kind |= Kind::IS_INDIRECT;
    }
    if !d.guard.is_always() {
        kind |= Kind::IS_COND;
    }
    kind
}

/// Delay depth in bundles.
pub fn delayed(d: &Decoded) -> u32 {
    if d.delayed {
        desc(d.op).delay as u32
    } else {
        0
    }
}

/// Log2 of the byte scale applied to typed memory offsets.
pub fn access_shift(op: Op) -> u32 {
    match op {
        Op::Lw | Op::Dlw | Op::Sw => 2,
        Op::Lh | Op::Lhu | Op::Sh => 1,
        _ => 0,
    }
}

/// Encoded target before zero filtering: absolute for call/brcf,
/// PC-relative for br, `None` for register-indirect transfers.
pub fn raw_target(d: &Decoded) -> Option<u32> {
    match (d.op, d.format) {
        (Op::Call | Op::Brcf, Format::CflI) => Some(d.imm << 2),
        (Op::Br, Format::CflI) => Some(d.addr.wrapping_add(sign_ext(d.imm, 22) << 2)),
        _ => None,
    }
}

/// Statically known, nonzero target address.
pub fn target(d: &Decoded) -> Option<u32> {
    raw_target(d).filter(|&a| a != 0)
}

/// Raw register indices read and written, PC-class indices included.
/// The hardwired `r0` and `p0` are left out.
pub fn used_regs(d: &Decoded) -> UsedRegs {
    let mut u = UsedRegs::default();
    if d.is_unknown() {
        return u;
    }
    if !d.guard.is_always() {
        u.read.push(reg_p(d.guard.idx));
    }
    let (r, w) = (&mut u.read, &mut u.write);
    match d.format {
        Format::None | Format::SpcW => {}
        Format::AluI | Format::AluL | Format::AluU => {
            r.push(reg_r(d.rs1));
            w.push(reg_r(d.rd));
        }
        Format::AluR => {
            r.extend([reg_r(d.rs1), reg_r(d.rs2)]);
            w.push(reg_r(d.rd));
        }
        Format::AluM => {
            r.extend([reg_r(d.rs1), reg_r(d.rs2)]);
            w.extend([reg_s(S_SL), reg_s(S_SH)]);
        }
        Format::AluC => {
            r.extend([reg_r(d.rs1), reg_r(d.rs2)]);
            w.push(reg_p(d.pd));
        }
        Format::AluCi => {
            r.push(reg_r(d.rs1));
            w.push(reg_p(d.pd));
        }
        Format::AluP => {
            r.extend([reg_p(d.ps1.idx), reg_p(d.ps2.idx)]);
            w.push(reg_p(d.pd));
        }
        Format::AluB => {
            r.extend([reg_r(d.rs1), reg_p(d.ps1.idx)]);
            w.push(reg_r(d.rd));
        }
        Format::SpcT => {
            r.push(reg_r(d.rs1));
            if d.sreg == S_PRED {
                w.extend((1..8).map(reg_p));
            } else {
                w.push(reg_s(d.sreg));
            }
        }
        Format::SpcF => {
            if d.sreg == S_PRED {
                r.extend((1..8).map(reg_p));
            } else {
                r.push(reg_s(d.sreg));
            }
            w.push(reg_r(d.rd));
        }
        Format::LdT => {
            r.push(reg_r(d.rs1));
            if d.area == Area::Stack {
                r.push(reg_s(S_ST));
            }
            w.push(if d.op == Op::Dlw { reg_s(S_SM) } else { reg_r(d.rd) });
        }
        Format::StT => {
            r.extend([reg_r(d.rs1), reg_r(d.rs2)]);
            if d.area == Area::Stack {
                r.push(reg_s(S_ST));
            }
        }
        Format::StcI | Format::StcR => {
            if d.format == Format::StcR {
                r.push(reg_r(d.rs1));
            }
            match d.op {
                Op::Sres | Op::Sfree => {
                    r.extend([reg_s(S_SS), reg_s(S_ST)]);
                    w.extend([reg_s(S_ST), reg_s(S_SS)]);
                }
                Op::Sens => {
                    r.extend([reg_s(S_SS), reg_s(S_ST)]);
                    w.push(reg_s(S_SS));
                }
                _ => {
                    r.push(reg_s(S_SS));
                    w.push(reg_s(S_SS));
                }
            }
        }
        Format::CflI => {
            match d.op {
                Op::Call => {
                    r.push(REG_PC);
                    w.extend([REG_MCB, reg_s(S_SRB), reg_s(S_SRO)]);
                }
                Op::Br => r.push(REG_PC),
                Op::Brcf => w.push(REG_MCB),
                _ => {
                    r.push(REG_PC);
                    w.extend([reg_s(S_SXB), reg_s(S_SXO)]);
                }
            }
            w.push(REG_NPC);
        }
        Format::CflRs => {
            r.push(reg_r(d.rs1));
            if d.op == Op::Call {
                r.push(REG_PC);
                w.extend([REG_MCB, reg_s(S_SRB), reg_s(S_SRO)]);
            }
            w.push(REG_NPC);
        }
        Format::CflRt => {
            r.extend([reg_r(d.rs1), reg_r(d.rs2)]);
            w.extend([REG_MCB, REG_NPC]);
        }
        Format::CflRi => {
            if d.op == Op::Ret {
                r.extend([reg_s(S_SRB), reg_s(S_SRO)]);
            } else {
                r.extend([reg_s(S_SXB), reg_s(S_SXO)]);
            }
            w.extend([REG_MCB, REG_NPC]);
        }
    }
    // r0 and p0 are constants
    let hardwired = |i: &u8| *i != reg_r(0) && *i != reg_p(0);
    u.read.retain(hardwired);
    u.write.retain(hardwired);
    u
}
