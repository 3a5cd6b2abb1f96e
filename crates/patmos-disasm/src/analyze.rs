use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use patmos_rs::{Inst, Process};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Fallthrough,
    Branch,
    CondBranch,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    pub start: u32,
    pub end: u32,
}

/// Reachable code found from a set of entries.
#[derive(Debug, Default)]
pub struct Exploration {
    /// Decoded address -> size, delay slots included.
    pub insts: BTreeMap<u32, u32>,
    pub edges: Vec<Edge>,
    /// Control instruction -> end of its last delay slot.
    pub ends: BTreeMap<u32, u32>,
    pub rets: BTreeSet<u32>,
}

// walk the delay slots of `inst`, returning the first address after them
fn skip_delay(process: &Process, inst: &Inst, insts: &mut BTreeMap<u32, u32>) -> Result<u32> {
    let mut at = inst.top_address();
    for _ in 0..process.delay_slots(inst)? {
        let Some(slot) = process.find_inst_at(at)? else { break };
        insts.insert(at, slot.size());
        at = slot.top_address();
    }
    Ok(at)
}

pub fn explore(process: &Process, entries: &[u32], max_instr: usize) -> Result<Exploration> {
    let mut out = Exploration::default();
    let mut queue: VecDeque<u32> = entries.iter().copied().collect();
    let mut visited = BTreeSet::new();
    while let Some(pc) = queue.pop_front() {
        if visited.len() >= max_instr {
            debug!("instruction budget exhausted at {pc:#010x}");
            break;
        }
        if !visited.insert(pc) {
            continue;
        }
        let Some(inst) = process.find_inst_at(pc)? else { continue };
        if inst.size() == 0 {
            continue;
        }
        out.insts.insert(pc, inst.size());
        if !inst.is_control() {
            let ft = inst.top_address();
            out.edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
            queue.push_back(ft);
            continue;
        }

        let after = skip_delay(process, &inst, &mut out.insts)?;
        out.ends.insert(pc, after);
        let target = process.target(&inst)?.map(|t| t.address());
        let fallthrough = |out: &mut Exploration, queue: &mut VecDeque<u32>| {
            out.edges.push(Edge { from: pc, to: after, kind: EdgeKind::Fallthrough });
            queue.push_back(after);
        };
        if inst.is_return() {
            out.rets.insert(pc);
            if inst.is_conditional() {
                fallthrough(&mut out, &mut queue);
            }
        } else if inst.is_call() {
            if let Some(t) = target {
                out.edges.push(Edge { from: pc, to: t, kind: EdgeKind::Call });
                queue.push_back(t);
            }
            fallthrough(&mut out, &mut queue);
        } else if inst.kind().contains(patmos_rs::Kind::IS_TRAP) {
            fallthrough(&mut out, &mut queue);
        } else {
            let kind = if inst.is_conditional() { EdgeKind::CondBranch } else { EdgeKind::Branch };
            if let Some(t) = target {
                out.edges.push(Edge { from: pc, to: t, kind });
                queue.push_back(t);
            }
            if inst.is_conditional() {
                fallthrough(&mut out, &mut queue);
            }
        }
    }
    Ok(out)
}

impl Exploration {
    /// Basic blocks by linear sweep. A block ends at the next block start or
    /// after the delay slots of a control instruction.
    pub fn blocks(&self, entries: &[u32]) -> Vec<Block> {
        let mut starts: BTreeSet<u32> = entries.iter().copied().collect();
        for e in &self.edges {
            if e.kind != EdgeKind::Fallthrough || self.ends.contains_key(&e.from) {
                starts.insert(e.to);
            }
        }
        let mut blocks = Vec::new();
        for &start in &starts {
            let mut cur = start;
            while let Some(&size) = self.insts.get(&cur) {
                if let Some(&end) = self.ends.get(&cur) {
                    blocks.push(Block { start, end });
                    break;
                }
                let next = cur.wrapping_add(size);
                if !self.insts.contains_key(&next) || starts.contains(&next) {
                    blocks.push(Block { start, end: next });
                    break;
                }
                cur = next;
            }
        }
        blocks
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockOut {
    pub start: u32,
    pub end: u32,
    pub insns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entries: Vec<u32>,
    pub blocks: Vec<BlockOut>,
    pub edges: Vec<Edge>,
    pub returns: Vec<u32>,
}

impl Report {
    pub fn build(process: &Process, entries: &[u32], ex: &Exploration) -> Result<Self> {
        let mut blocks = Vec::new();
        for b in ex.blocks(entries) {
            let mut insns = Vec::new();
            let mut pc = b.start;
            while pc < b.end {
                let Some(inst) = process.find_inst_at(pc)? else { break };
                if inst.size() == 0 {
                    break;
                }
                insns.push(inst.to_string());
                pc = inst.top_address();
            }
            blocks.push(BlockOut { start: b.start, end: b.end, insns });
        }
        Ok(Self {
            entries: entries.to_vec(),
            blocks,
            edges: ex.edges.iter().filter(|e| e.kind != EdgeKind::Fallthrough).copied().collect(),
            returns: ex.rets.iter().copied().collect(),
        })
    }
}
