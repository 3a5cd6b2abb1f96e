//! Instruction facade over a loaded image.
//!
//! A [`Process`] owns the image and a table of [`Inst`], one per address,
//! materialised on first lookup. Derived facts (register sets, semantics,
//! branch target, delay count) are computed once per instruction and kept.

use crate::decoder::{Decoded, Decoder, Kind, Op};
use crate::disasm::fmt_decoded;
use crate::isa::patmos::{self, PatmosDecoder};
use crate::lines::LineMap;
use crate::memory::{Image, Memory};
use crate::regs::{Platform, Register, RegisterDecoder};
use crate::sem::Block;
use crate::semantics::translate;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Cannot fetch instruction at {addr:#010x}: {source}")]
    Memory { addr: u32, #[source] source: anyhow::Error },
    #[error("Delay slot of {branch:#010x}: no slot at {addr:#010x} as it should be")]
    MissingSlot { branch: u32, addr: u32 },
    #[error("Branch at {branch:#010x} targets {target:#010x} where no instruction lives")]
    MissingTarget { branch: u32, target: u32 },
    #[error("Unsupported feature(s): {0:?}")]
    Unsupported(Features),
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Features: u32 {
const INFO = 1 << 0;
const MEMORY_ACCESS = 1 << 1;
const SOURCE_LINE = 1 << 2;
const CONTROL_DECODING = 1 << 3;
const REGISTER_USAGE = 1 << 4;
const MEMORY_ACCESSES = 1 << 5;
const DELAYED = 1 << 6;
}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayType {
    None,
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Overrides the image entry point.
    pub entry: Option<u32>,
    /// A decoded target with no instruction behind it is an error.
    pub check_targets: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self { entry: None, check_targets: true }
    }
}

/// Architecture facts computed from memory content.
#[derive(Debug, Clone)]
pub struct Info {
    image: Arc<Image>,
}

impl Info {
    pub fn new(image: Arc<Image>) -> Self {
        Self { image }
    }

    /// Size of the bundle starting at `addr`: 8 when the word's bundle bit
    /// is set, 4 otherwise.
    pub fn bundle_size(&self, addr: u32) -> Result<u32, LoadError> {
        let word = self
            .image
            .read_u32(addr)
            .map_err(|source| LoadError::Memory { addr, source })?;
        Ok(if word & 0x8000_0000 != 0 { 8 } else { 4 })
    }
}

#[derive(Debug, Default)]
struct BranchData {
    target: OnceLock<Option<u32>>,
    delay: OnceLock<usize>,
}

#[derive(Debug)]
struct RegSets {
    read: Vec<&'static Register>,
    written: Vec<&'static Register>,
}

/// One decoded instruction.
#[derive(Debug)]
pub struct Inst {
    addr: u32,
    size: u32,
    kind: Kind,
    op: Op,
    decoded: Decoded,
    regs: OnceLock<RegSets>,
    sem: OnceLock<Block>,
    branch: Option<BranchData>,
}

impl Inst {
    fn new(d: Decoded) -> Self {
        let kind = patmos::kind(&d);
        let branch = kind.contains(Kind::IS_CONTROL).then(BranchData::default);
        Self {
            addr: d.addr,
            size: d.size(),
            kind,
            op: d.op,
            decoded: d,
            regs: OnceLock::new(),
            sem: OnceLock::new(),
            branch,
        }
    }

    pub fn decoded(&self) -> Decoded {
        self.decoded
    }

    pub fn address(&self) -> u32 {
        self.addr
    }
    /// Size in bytes, 0 for unknown encodings.
    pub fn size(&self) -> u32 {
        self.size
    }
    pub fn top_address(&self) -> u32 {
        self.addr.wrapping_add(self.size)
    }
    pub fn kind(&self) -> Kind {
        self.kind
    }
    pub fn op(&self) -> Op {
        self.op
    }
    pub fn is_unknown(&self) -> bool {
        self.op == Op::Unknown
    }
    pub fn is_control(&self) -> bool {
        self.kind.contains(Kind::IS_CONTROL)
    }
    pub fn is_call(&self) -> bool {
        self.kind.contains(Kind::IS_CALL)
    }
    pub fn is_return(&self) -> bool {
        self.kind.contains(Kind::IS_RETURN)
    }
    pub fn is_conditional(&self) -> bool {
        self.kind.contains(Kind::IS_COND)
    }
    pub fn is_mem(&self) -> bool {
        self.kind.contains(Kind::IS_MEM)
    }
    pub fn is_load(&self) -> bool {
        self.kind.contains(Kind::IS_LOAD)
    }
    pub fn is_store(&self) -> bool {
        self.kind.contains(Kind::IS_STORE)
    }

    fn reg_sets(&self) -> &RegSets {
        self.regs.get_or_init(|| {
            let used = patmos::used_regs(&self.decoded());
            let rd = RegisterDecoder::get();
            RegSets { read: rd.collect(&used.read), written: rd.collect(&used.write) }
        })
    }

    pub fn read_regs(&self) -> &[&'static Register] {
        &self.reg_sets().read
    }

    pub fn written_regs(&self) -> &[&'static Register] {
        &self.reg_sets().written
    }

    pub fn semantics(&self) -> &Block {
        self.sem.get_or_init(|| translate(&self.decoded()))
    }

    /// Statically encoded target, before any lookup.
    pub fn target_address(&self) -> Option<u32> {
        patmos::target(&self.decoded())
    }

    pub fn disasm(&self) -> String {
        fmt_decoded(&self.decoded())
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}  {}", self.addr, self.disasm())
    }
}

/// A loaded program and the instructions decoded from it so far.
pub struct Process {
    platform: &'static Platform,
    image: Arc<Image>,
    info: Info,
    decoder: PatmosDecoder,
    config: ProcessConfig,
    features: Features,
    lines: Option<LineMap>,
    insts: Mutex<BTreeMap<u32, Arc<Inst>>>,
}

impl Process {
    pub fn new(image: Image, config: ProcessConfig) -> Self {
        let image = Arc::new(image);
        Self {
            platform: Platform::get(),
            info: Info::new(image.clone()),
            image,
            decoder: PatmosDecoder::new(),
            config,
            features: Features::INFO
                | Features::MEMORY_ACCESS
                | Features::CONTROL_DECODING
                | Features::REGISTER_USAGE
                | Features::MEMORY_ACCESSES
                | Features::DELAYED,
            lines: None,
            insts: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_line_map(mut self, lines: LineMap) -> Self {
        self.lines = Some(lines);
        self.features |= Features::SOURCE_LINE;
        self
    }

    pub fn platform(&self) -> &'static Platform {
        self.platform
    }
    pub fn image(&self) -> &Image {
        &self.image
    }
    pub fn info(&self) -> &Info {
        &self.info
    }
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
    pub fn features(&self) -> Features {
        self.features
    }

    pub fn provides(&self, f: Features) -> bool {
        self.features.contains(f)
    }

    pub fn require(&self, f: Features) -> Result<(), LoadError> {
        let missing = f - self.features;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::Unsupported(missing))
        }
    }

    /// Entry instruction: configured entry, else the image's.
    pub fn start(&self) -> Result<Option<Arc<Inst>>, LoadError> {
        self.find_inst_at(self.config.entry.unwrap_or(self.image.entry))
    }

    /// Decode `addr` without touching the instruction table.
    pub fn decode(&self, addr: u32) -> Result<Inst, LoadError> {
        let d = self
            .decoder
            .decode(&*self.image, addr)
            .map_err(|source| LoadError::Memory { addr, source })?;
        Ok(Inst::new(d))
    }

    /// Instruction at `addr`, decoded on first request. Addresses outside
    /// executable segments have none.
    pub fn find_inst_at(&self, addr: u32) -> Result<Option<Arc<Inst>>, LoadError> {
        if !self.image.is_exec(addr) {
            return Ok(None);
        }
        let mut insts = self.insts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(inst) = insts.get(&addr) {
            return Ok(Some(inst.clone()));
        }
        debug!("materialise instruction at {addr:#010x}");
        let inst = Arc::new(self.decode(addr)?);
        insts.insert(addr, inst.clone());
        Ok(Some(inst))
    }

    /// Resolved branch target. Indirect and zero targets give `None`.
    pub fn target(&self, inst: &Inst) -> Result<Option<Arc<Inst>>, LoadError> {
        let Some(branch) = &inst.branch else {
            return Ok(None);
        };
        let addr = match branch.target.get() {
            Some(addr) => *addr,
            None => {
                let addr = inst.target_address();
                let _ = branch.target.set(addr);
                addr
            }
        };
        let Some(addr) = addr else {
            return Ok(None);
        };
        match self.find_inst_at(addr)? {
            Some(t) => Ok(Some(t)),
            None if self.config.check_targets => {
                warn!("branch at {:#010x} targets unmapped {addr:#010x}", inst.addr);
                Err(LoadError::MissingTarget { branch: inst.addr, target: addr })
            }
            None => Ok(None),
        }
    }

    pub fn delay_type(&self, inst: &Inst) -> DelayType {
        if inst.is_control() {
            DelayType::Always
        } else {
            DelayType::None
        }
    }

    /// Number of instructions in the delay bundles of a control instruction.
    pub fn delay_slots(&self, inst: &Inst) -> Result<usize, LoadError> {
        let Some(branch) = &inst.branch else {
            return Ok(0);
        };
        if let Some(n) = branch.delay.get() {
            return Ok(*n);
        }
        let mut count = 0;
        // 64-bit cursor: a bundle running past the address space has no slot
        let mut at = u64::from(inst.top_address());
        for _ in 0..patmos::delayed(&inst.decoded()) {
            let addr = self.slot_address(inst, at)?;
            let end = at + u64::from(self.info.bundle_size(addr)?);
            while at < end {
                let addr = self.slot_address(inst, at)?;
                let slot = match self.find_inst_at(addr)? {
                    Some(slot) if slot.size() > 0 => slot,
                    _ => return Err(missing_slot(inst, addr)),
                };
                count += 1;
                at += u64::from(slot.size());
            }
        }
        let _ = branch.delay.set(count);
        Ok(count)
    }

    // executable address of a delay slot, wrapped to 0 when out of range
    fn slot_address(&self, inst: &Inst, at: u64) -> Result<u32, LoadError> {
        match u32::try_from(at) {
            Ok(addr) if self.image.is_exec(addr) => Ok(addr),
            _ => Err(missing_slot(inst, at as u32)),
        }
    }

    /// Source file and line of `addr`, when a line map is attached.
    pub fn source_line(&self, addr: u32) -> Option<(&str, u32)> {
        self.lines.as_ref()?.line_of(addr)
    }

    pub fn addresses(&self, file: &str, line: u32) -> Vec<(u32, u32)> {
        self.lines.as_ref().map(|l| l.addresses(file, line)).unwrap_or_default()
    }

    /// Instructions materialised so far, by address.
    pub fn insts(&self) -> Vec<Arc<Inst>> {
        let insts = self.insts.lock().unwrap_or_else(PoisonError::into_inner);
        insts.values().cloned().collect()
    }
}

fn missing_slot(inst: &Inst, addr: u32) -> LoadError {
    warn!("delay slot missing at {addr:#010x} after {:#010x}", inst.addr);
    LoadError::MissingSlot { branch: inst.addr, addr }
}

impl Memory for Process {
    fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> anyhow::Result<()> {
        self.image.read_bytes(addr, buf)
    }
}
