use anyhow::Result;
use std::path::Path;

use patmos_rs::{Image, Segment};

/// Maps a raw binary as one executable segment at `base`.
pub fn load_raw_bin(path: &Path, base: u32, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        base as u64 + payload.len() as u64 <= 1u64 << 32,
        "image does not fit the 32-bit address space"
    );
    let seg = Segment { name: "segment0".into(), base, bytes: payload.to_vec(), exec: true };
    Ok(Image { segments: vec![seg], entry: base })
}

pub fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}
