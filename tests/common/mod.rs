#![allow(dead_code)]

// PatMOS instruction encoders for tests.

pub const BUNDLE: u32 = 1 << 31;

const ALU: u32 = 0b01000 << 22;
const SPC: u32 = 0b01001 << 22;

/// Puts a guard `(p)` / `(!p)` on `w`.
pub fn guarded(w: u32, neg: bool, p: u32) -> u32 {
    w | ((neg as u32) << 30) | ((p & 7) << 27)
}

pub fn alu_i(func: u32, rd: u32, rs1: u32, imm12: u32) -> u32 {
    ((func & 7) << 22) | (rd << 17) | (rs1 << 12) | (imm12 & 0xfff)
}

pub fn alu_r(func: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    ALU | (rd << 17) | (rs1 << 12) | (rs2 << 7) | func
}

/// First word of an ALUl bundle; the immediate is the next word.
pub fn alu_l(func: u32, rd: u32, rs1: u32) -> u32 {
    BUNDLE | (0b11111 << 22) | (rd << 17) | (rs1 << 12) | func
}

pub fn alu_u(func: u32, rd: u32, rs1: u32) -> u32 {
    ALU | (rd << 17) | (rs1 << 12) | (0b001 << 4) | func
}

pub fn alu_m(func: u32, rs1: u32, rs2: u32) -> u32 {
    ALU | (rs1 << 12) | (rs2 << 7) | (0b010 << 4) | func
}

pub fn alu_c(func: u32, pd: u32, rs1: u32, rs2: u32) -> u32 {
    ALU | (pd << 17) | (rs1 << 12) | (rs2 << 7) | (0b011 << 4) | func
}

pub fn alu_ci(func: u32, pd: u32, rs1: u32, imm5: u32) -> u32 {
    ALU | (pd << 17) | (rs1 << 12) | ((imm5 & 0x1f) << 7) | (0b110 << 4) | func
}

/// Predicate operands are 4 bits: negate flag in bit 3.
pub fn alu_p(func: u32, pd: u32, ps1: u32, ps2: u32) -> u32 {
    ALU | (pd << 17) | (ps1 << 12) | (ps2 << 7) | (0b100 << 4) | func
}

pub fn alu_b(rd: u32, rs1: u32, imm5: u32, ps: u32) -> u32 {
    ALU | (rd << 17) | (rs1 << 12) | (imm5 << 7) | (0b101 << 4) | ps
}

pub fn wait_mem() -> u32 {
    SPC
}

pub fn mts(sreg: u32, rs1: u32) -> u32 {
    SPC | (rs1 << 12) | (0b010 << 4) | sreg
}

pub fn mfs(rd: u32, sreg: u32) -> u32 {
    SPC | (rd << 17) | (0b011 << 4) | sreg
}

// sizes: w h b hu bu dw; areas: s l c m
pub fn ldt(size: u32, area: u32, rd: u32, ra: u32, imm7: u32) -> u32 {
    (0b01010 << 22) | (rd << 17) | (ra << 12) | (size << 9) | (area << 7) | (imm7 & 0x7f)
}

pub fn stt(size: u32, area: u32, ra: u32, rs: u32, imm7: u32) -> u32 {
    (0b01011 << 22) | (size << 19) | (area << 17) | (ra << 12) | (rs << 7) | (imm7 & 0x7f)
}

// ops: sres sens sfree sspill
pub fn stc_i(op: u32, imm18: u32) -> u32 {
    (0b01100 << 22) | (op << 18) | (imm18 & 0x3ffff)
}

pub fn stc_r(op: u32, rs1: u32) -> u32 {
    (0b01100 << 22) | (1 << 20) | (op << 18) | (rs1 << 12)
}

// ops: call br brcf trap
pub fn cfl_i(op: u32, delayed: bool, imm22: u32) -> u32 {
    ((0b10000 | (op << 1) | delayed as u32) << 22) | (imm22 & 0x3f_ffff)
}

// (form, op): (0,0) ret (0,1) xret (1,0) callr (1,1) brr (2,0) brcfr
pub fn cfl_r(form: u32, op: u32, delayed: bool, rs1: u32, rs2: u32) -> u32 {
    (0b11000 << 22) | ((delayed as u32) << 21) | (rs1 << 12) | (rs2 << 7) | (form << 2) | op
}

/// No-op: `addi r0 = r0, 0`.
pub const NOP: u32 = 0;
/// Matches no format.
pub const UNKNOWN: u32 = 0b11101 << 22;
