//! Register banks of the PatMOS platform and the mapping from the decoder's
//! internal register indices onto them.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::sync::OnceLock;

/// Internal index of general register `r<i>`.
pub const fn reg_r(i: u8) -> u8 {
    i
}
/// Internal index of special register `s<i>`.
pub const fn reg_s(i: u8) -> u8 {
    32 + i
}
/// Internal index of predicate register `p<i>`.
pub const fn reg_p(i: u8) -> u8 {
    48 + i
}
pub const REG_MCB: u8 = 56;
pub const REG_PC: u8 = 57;
pub const REG_NPC: u8 = 58;
/// Size of the internal register index space.
pub const REG_COUNT: usize = 59;

// special register roles
pub const S_PRED: u8 = 0;
pub const S_SM: u8 = 1;
pub const S_SL: u8 = 2;
pub const S_SH: u8 = 3;
pub const S_SS: u8 = 5;
pub const S_ST: u8 = 6;
pub const S_SRB: u8 = 7;
pub const S_SRO: u8 = 8;
pub const S_SXB: u8 = 9;
pub const S_SXO: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegKind {
    Int,
    Addr,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Register {
    name: String,
    kind: RegKind,
    width: u8,
    bank: &'static str,
    index: usize,
    number: usize,
}

impl Register {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> RegKind {
        self.kind
    }
    /// Width in bits.
    pub fn width(&self) -> u8 {
        self.width
    }
    pub fn bank(&self) -> &'static str {
        self.bank
    }
    /// Position inside the owning bank.
    pub fn index(&self) -> usize {
        self.index
    }
    /// Stable identifier across the whole platform, used by semantic operands.
    pub fn number(&self) -> usize {
        self.number
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Dense, fixed-size collection of registers.
#[derive(Debug)]
pub struct RegBank {
    name: &'static str,
    regs: Vec<Register>,
}

impl RegBank {
    fn plain(name: &'static str, kind: RegKind, width: u8, prefix: &str, count: usize, first: usize) -> Self {
        let regs = (0..count)
            .map(|index| Register {
                name: format!("{prefix}{index}"),
                kind,
                width,
                bank: name,
                index,
                number: first + index,
            })
            .collect();
        Self { name, regs }
    }

    fn melted(name: &'static str, members: &[(&str, RegKind, u8)], first: usize) -> Self {
        let regs = members
            .iter()
            .enumerate()
            .map(|(index, &(reg, kind, width))| Register {
                name: reg.to_string(),
                kind,
                width,
                bank: name,
                index,
                number: first + index,
            })
            .collect();
        Self { name, regs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn len(&self) -> usize {
        self.regs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
    pub fn registers(&self) -> &[Register] {
        &self.regs
    }
}

impl Index<usize> for RegBank {
    type Output = Register;
    fn index(&self, i: usize) -> &Register {
        &self.regs[i]
    }
}

/// All register banks of one PatMOS instance.
#[derive(Debug)]
pub struct Platform {
    banks: [RegBank; 4],
}

const BANK_R: usize = 0;
const BANK_S: usize = 1;
const BANK_P: usize = 2;
const BANK_MISC: usize = 3;

impl Platform {
    pub const ID: &'static str = "patmos-";

    fn new() -> Self {
        let r = RegBank::plain("D", RegKind::Int, 32, "r", 32, 0);
        let s = RegBank::plain("S", RegKind::Int, 32, "s", 16, 32);
        let p = RegBank::plain("P", RegKind::Int, 1, "p", 8, 48);
        let misc = RegBank::melted(
            "misc",
            &[("mcb", RegKind::Addr, 32), ("pc", RegKind::Addr, 32), ("npc", RegKind::Addr, 32)],
            56,
        );
        Self { banks: [r, s, p, misc] }
    }

    /// Process-wide platform, built once on first use.
    pub fn get() -> &'static Platform {
        static PLATFORM: OnceLock<Platform> = OnceLock::new();
        PLATFORM.get_or_init(Platform::new)
    }

    pub fn accept(architecture: &str, abi: &str) -> bool {
        architecture == "patmos" && abi == "eabi"
    }

    pub fn banks(&self) -> &[RegBank] {
        &self.banks
    }

    pub fn r(&self, i: usize) -> &Register {
        &self.banks[BANK_R][i]
    }
    pub fn s(&self, i: usize) -> &Register {
        &self.banks[BANK_S][i]
    }
    pub fn p(&self, i: usize) -> &Register {
        &self.banks[BANK_P][i]
    }
    pub fn mcb(&self) -> &Register {
        &self.banks[BANK_MISC][0]
    }
    pub fn pc(&self) -> &Register {
        &self.banks[BANK_MISC][1]
    }
    pub fn npc(&self) -> &Register {
        &self.banks[BANK_MISC][2]
    }

    pub fn register_count(&self) -> usize {
        self.banks.iter().map(RegBank::len).sum()
    }

    /// Look a register up by platform number.
    pub fn register(&self, number: usize) -> Option<&Register> {
        self.banks.iter().flat_map(|b| b.registers()).find(|r| r.number == number)
    }
}

/// Maps the decoder's register indices onto platform registers.
///
/// PC and nPC map to nothing; control flow is carried by kind and target.
#[derive(Debug)]
pub struct RegisterDecoder {
    map: [Option<&'static Register>; REG_COUNT],
}

impl RegisterDecoder {
    fn new(pf: &'static Platform) -> Self {
        let mut map = [None; REG_COUNT];
        for i in 0..32u8 {
            map[reg_r(i) as usize] = Some(pf.r(i as usize));
        }
        for i in 0..16u8 {
            map[reg_s(i) as usize] = Some(pf.s(i as usize));
        }
        for i in 0..8u8 {
            map[reg_p(i) as usize] = Some(pf.p(i as usize));
        }
        map[REG_MCB as usize] = Some(pf.mcb());
        Self { map }
    }

    pub fn get() -> &'static RegisterDecoder {
        static DECODER: OnceLock<RegisterDecoder> = OnceLock::new();
        DECODER.get_or_init(|| RegisterDecoder::new(Platform::get()))
    }

    /// Panics when `index` lies outside the internal index space.
    pub fn lookup(&self, index: u8) -> Option<&'static Register> {
        self.map[index as usize]
    }

    /// Map raw indices to registers in discovery order, dropping untracked
    /// indices and duplicates.
    pub fn collect(&self, raw: &[u8]) -> Vec<&'static Register> {
        let mut seen = bitvec![usize, Lsb0; 0; Platform::get().register_count()];
        let mut out = Vec::with_capacity(raw.len());
        for &index in raw {
            if let Some(reg) = self.lookup(index) {
                if !seen.replace(reg.number(), true) {
                    out.push(reg);
                }
            }
        }
        out
    }
}
