use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cpu::Trap;

pub const TEXT_BASE: u32 = 0x0000_0000;
pub const DATA_BASE: u32 = 0x1000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text,
    Data,
}

impl Segment {
    pub fn contains(self, addr: u32) -> bool {
        match self {
            Segment::Text => addr < DATA_BASE,
            Segment::Data => addr >= DATA_BASE,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Segment::Text => "text",
            Segment::Data => "data",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Width {
    Byte = 1,
    Half = 2,
    Word = 4,
    Double = 8,
}

impl Width {
    pub fn bits(self) -> u32 {
        self as u32 * 8
    }
}

/// Byte-addressed storage. Multi-byte accesses are big-endian.
pub trait Bus {
    fn read_u8(&mut self, addr: u32) -> Result<u8, Trap>;
    fn read_u16(&mut self, addr: u32) -> Result<u16, Trap>;
    fn read_u32(&mut self, addr: u32) -> Result<u32, Trap>;
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<(), Trap>;
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), Trap>;
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), Trap>;
}

/// Sparse memory that only accepts addresses of one segment. Bytes never
/// written read as zero.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentMemory {
    pub segment: Segment,
    bytes: BTreeMap<u32, u8>,
}

impl SegmentMemory {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            bytes: BTreeMap::new(),
        }
    }

    pub fn check(&self, addr: u32, len: u32) -> Result<(), Trap> {
        for i in 0..len {
            let a = addr.wrapping_add(i);
            if !self.segment.contains(a) {
                return Err(Trap::SegmentAccessViolation {
                    addr: a,
                    segment: self.segment,
                });
            }
        }
        Ok(())
    }

    pub fn is_written(&self, addr: u32) -> bool {
        self.bytes.contains_key(&addr)
    }

    pub fn peek(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn dump(&self, start: u32, len: u32) -> Vec<u8> {
        (0..len).map(|i| self.peek(start.wrapping_add(i))).collect()
    }

    /// Written bytes in address order.
    pub fn written(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(a, b)| (*a, *b))
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn load_be(&mut self, addr: u32, len: u32) -> Result<u32, Trap> {
        self.check(addr, len)?;
        Ok((0..len).fold(0u32, |acc, i| (acc << 8) | self.peek(addr.wrapping_add(i)) as u32))
    }

    fn store_be(&mut self, addr: u32, len: u32, val: u32) -> Result<(), Trap> {
        self.check(addr, len)?;
        for i in 0..len {
            let shift = 8 * (len - 1 - i);
            self.bytes.insert(addr.wrapping_add(i), (val >> shift) as u8);
        }
        Ok(())
    }
}

impl Bus for SegmentMemory {
    fn read_u8(&mut self, addr: u32) -> Result<u8, Trap> {
        self.load_be(addr, 1).map(|v| v as u8)
    }
    fn read_u16(&mut self, addr: u32) -> Result<u16, Trap> {
        self.load_be(addr, 2).map(|v| v as u16)
    }
    fn read_u32(&mut self, addr: u32) -> Result<u32, Trap> {
        self.load_be(addr, 4)
    }
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<(), Trap> {
        self.store_be(addr, 1, val as u32)
    }
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), Trap> {
        self.store_be(addr, 2, val as u32)
    }
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), Trap> {
        self.store_be(addr, 4, val)
    }
}

/// Processor-side port of a memory: every access goes through the
/// address (MAR) and data (MDR) latches.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryInterface {
    pub mar: u32,
    pub mdr: u32,
    pub mem: SegmentMemory,
}

impl MemoryInterface {
    pub fn new(segment: Segment) -> Self {
        Self {
            mar: 0,
            mdr: 0,
            mem: SegmentMemory::new(segment),
        }
    }

    /// Reads `width` bytes at MAR into MDR, zero-extended.
    pub fn load(&mut self, width: Width) -> Result<u32, Trap> {
        self.mdr = match width {
            Width::Byte => self.mem.read_u8(self.mar)? as u32,
            Width::Half => self.mem.read_u16(self.mar)? as u32,
            Width::Word => self.mem.read_u32(self.mar)?,
            Width::Double => return Err(self.unsupported(width)),
        };
        Ok(self.mdr)
    }

    /// Writes the low `width` bytes of MDR at MAR.
    pub fn store(&mut self, width: Width) -> Result<(), Trap> {
        match width {
            Width::Byte => self.mem.write_u8(self.mar, self.mdr as u8),
            Width::Half => self.mem.write_u16(self.mar, self.mdr as u16),
            Width::Word => self.mem.write_u32(self.mar, self.mdr),
            Width::Double => Err(self.unsupported(width)),
        }
    }

    /// Instruction fetch at MAR. An address that was never written yields
    /// `None`.
    pub fn fetch(&mut self) -> Result<Option<u32>, Trap> {
        let word = self.mem.read_u32(self.mar)?;
        if !self.mem.is_written(self.mar) {
            return Ok(None);
        }
        self.mdr = word;
        Ok(Some(word))
    }

    fn unsupported(&self, width: Width) -> Trap {
        Trap::UnsupportedWidth {
            addr: self.mar,
            bits: width.bits(),
        }
    }

    pub fn reset(&mut self) {
        self.mar = 0;
        self.mdr = 0;
        self.mem.clear();
    }
}
