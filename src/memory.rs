use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Read-only view over the program image. PatMOS is big-endian.
pub trait Memory {
    fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<()>;

    fn read_u8(&self, addr: u32) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_bytes(addr, &mut b)?;
        Ok(b[0])
    }
    fn read_u16(&self, addr: u32) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_bytes(addr, &mut b)?;
        Ok(u16::from_be_bytes(b))
    }
    fn read_u32(&self, addr: u32) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b)?;
        Ok(u32::from_be_bytes(b))
    }
    fn read_u64(&self, addr: u32) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_bytes(addr, &mut b)?;
        Ok(u64::from_be_bytes(b))
    }
    /// Address-sized read, e.g. a pointer in a data table.
    fn read_addr(&self, addr: u32) -> Result<u32> {
        self.read_u32(addr)
    }
    fn read_i8(&self, addr: u32) -> Result<i8> {
        Ok(self.read_u8(addr)? as i8)
    }
    fn read_i16(&self, addr: u32) -> Result<i16> {
        Ok(self.read_u16(addr)? as i16)
    }
    fn read_i32(&self, addr: u32) -> Result<i32> {
        Ok(self.read_u32(addr)? as i32)
    }
    fn read_i64(&self, addr: u32) -> Result<i64> {
        Ok(self.read_u64(addr)? as i64)
    }

    /// NUL-terminated string starting at `addr`.
    fn read_string(&self, addr: u32) -> Result<String> {
        let mut bytes = Vec::new();
        let mut at = addr;
        loop {
            let b = self.read_u8(at)?;
            if b == 0 {
                break;
            }
            bytes.push(b);
            at = at.wrapping_add(1);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Unmapped read of {len} bytes at {addr:#010x}")]
    Unmapped { addr: u32, len: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub base: u32,
    pub bytes: Vec<u8>,
    pub exec: bool,
}

impl Segment {
    pub fn end(&self) -> u64 {
        self.base as u64 + self.bytes.len() as u64
    }

    pub fn contains(&self, addr: u32) -> bool {
        (addr as u64) >= self.base as u64 && (addr as u64) < self.end()
    }
}

/// Loaded program: segments plus entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    pub segments: Vec<Segment>,
    pub entry: u32,
}

impl Image {
    /// Single executable segment holding `bytes` at `base`.
    pub fn from_code(base: u32, bytes: Vec<u8>) -> Self {
        let seg = Segment { name: ".text".into(), base, bytes, exec: true };
        Self { segments: vec![seg], entry: base }
    }

    /// Builds a code image from instruction words laid out from `base`.
    pub fn from_words(base: u32, words: &[u32]) -> Self {
        let bytes = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        Self::from_code(base, bytes)
    }

    pub fn add_segment(&mut self, seg: Segment) {
        self.segments.push(seg);
    }

    pub fn is_mapped(&self, addr: u32) -> bool {
        self.segments.iter().any(|s| s.contains(addr))
    }

    /// Inside an executable segment.
    pub fn is_exec(&self, addr: u32) -> bool {
        self.segments.iter().any(|s| s.exec && s.contains(addr))
    }
}

impl Memory for Image {
    fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let end = addr as u64 + buf.len() as u64;
        let seg = self
            .segments
            .iter()
            .find(|s| s.contains(addr) && end <= s.end())
            .ok_or(MemoryError::Unmapped { addr, len: buf.len() })?;
        let off = (addr - seg.base) as usize;
        buf.copy_from_slice(&seg.bytes[off..off + buf.len()]);
        Ok(())
    }
}
