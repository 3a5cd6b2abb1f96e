use serde::{Deserialize, Serialize};

/// One row of the line table: `[low, high)` was generated from `file:line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEntry {
    pub file: String,
    pub line: u32,
    pub low: u32,
    pub high: u32,
}

/// Address to source line table, ordered by address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineMap {
    entries: Vec<LineEntry>,
}

impl LineMap {
    pub fn new(mut entries: Vec<LineEntry>) -> Self {
        entries.sort_by_key(|e| e.low);
        Self { entries }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Vec<LineEntry>>(text).map(Self::new)
    }

    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }

    pub fn line_of(&self, addr: u32) -> Option<(&str, u32)> {
        self.entries
            .iter()
            .find(|e| e.low <= addr && addr < e.high)
            .map(|e| (e.file.as_str(), e.line))
    }

    /// Address ranges generated for `file:line`.
    ///
    /// `file` matches an entry's file exactly or as a plain suffix. A line
    /// with no row of its own falls back to the row preceding it when that
    /// row is followed by a later line of the same file.
    pub fn addresses(&self, file: &str, line: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut prev: Option<&LineEntry> = None;
        for cur in &self.entries {
            if !same_file(&cur.file, file) {
                prev = None;
                continue;
            }
            if cur.line == line {
                out.push((cur.low, cur.high));
            } else if let Some(p) = prev {
                if p.line < line && line < cur.line {
                    out.push((p.low, p.high));
                }
            }
            prev = Some(cur);
        }
        out.dedup();
        out
    }
}

fn same_file(entry: &str, wanted: &str) -> bool {
    entry.ends_with(wanted)
}
