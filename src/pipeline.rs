use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::decoder::{Decoded, Op, OpClass};
use crate::hazard::{DataHazard, Forward};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control: u8 {
const MEM_LOAD = 1 << 0;
const MEM_STORE = 1 << 1;
const WRITE_BACK = 1 << 2; // rd receives a value
const BRANCH = 1 << 3;
const JAL = 1 << 4;
const JALR = 1 << 5;
}
}

impl Control {
    pub fn for_op(op: Op) -> Self {
        match op.class() {
            OpClass::Alu => Control::WRITE_BACK,
            OpClass::Load => Control::MEM_LOAD | Control::WRITE_BACK,
            OpClass::Store => Control::MEM_STORE,
            OpClass::Branch => Control::BRANCH,
            OpClass::Jal => Control::JAL | Control::WRITE_BACK,
            OpClass::Jalr => Control::JALR | Control::WRITE_BACK,
            OpClass::Halt => Control::empty(),
        }
    }

    pub fn is_control_transfer(self) -> bool {
        self.intersects(Control::BRANCH | Control::JAL | Control::JALR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Decode,
    Execute,
    Memory,
    WriteBack,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "F",
            Stage::Decode => "D",
            Stage::Execute => "E",
            Stage::Memory => "M",
            Stage::WriteBack => "W",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IfId {
    pub pc: u32,
    pub next_pc: u32,
    pub word: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdEx {
    pub pc: u32,
    pub next_pc: u32,
    pub decoded: Decoded,
    pub control: Control,
    pub rs1_val: u32,
    pub rs2_val: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExMem {
    pub pc: u32,
    pub decoded: Decoded,
    pub control: Control,
    pub alu_out: u32,
    pub store_val: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemWb {
    pub pc: u32,
    pub decoded: Decoded,
    pub control: Control,
    pub value: u32,
}

/// Inter-stage buffers. `None` is a bubble.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Latches {
    pub if_id: Option<IfId>,
    pub id_ex: Option<IdEx>,
    pub ex_mem: Option<ExMem>,
    pub mem_wb: Option<MemWb>,
}

impl Latches {
    /// Drops the two youngest instructions after a control misprediction.
    pub fn flush_front(&mut self) {
        self.if_id = None;
        self.id_ex = None;
    }

    pub fn is_empty(&self) -> bool {
        self.if_id.is_none() && self.id_ex.is_none() && self.ex_mem.is_none() && self.mem_wb.is_none()
    }
}

/// Instruction address generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Iag {
    pub pc: u32,
    pub redirect: Option<u32>,
}

impl Iag {
    pub fn new(pc: u32) -> Self {
        Self { pc, redirect: None }
    }

    pub fn redirect(&mut self, target: u32) {
        self.redirect = Some(target);
    }

    pub fn is_redirecting(&self) -> bool {
        self.redirect.is_some()
    }

    /// Moves to the next fetch address: a pending redirect first, then a
    /// predicted target, else the sequential address.
    pub fn advance(&mut self, predicted: Option<u32>) {
        self.pc = match self.redirect.take() {
            Some(target) => target,
            None => predicted.unwrap_or(self.pc.wrapping_add(4)),
        };
    }
}

/// Something the pipeline did in a cycle besides moving instructions along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    DataHazard(DataHazard),
    Forward(Forward),
    Stall { pc: u32 },
    ControlHazard { pc: u32, fetched: Option<u32>, target: u32 },
    Watched { stage: Stage, pc: u32 },
}
