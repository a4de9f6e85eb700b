//! Read-after-write detection for the instruction in decode against the
//! two instructions ahead of it.

use std::fmt;

use serde::Serialize;

/// Pipeline buffer a value is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForwardSource {
    ExMem,
    MemWb,
}

impl fmt::Display for ForwardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForwardSource::ExMem => "EX/MEM",
            ForwardSource::MemWb => "MEM/WB",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operand {
    Rs1,
    Rs2,
}

/// An instruction ahead in the pipeline that will write `rd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer {
    pub pc: u32,
    pub rd: Option<u8>,
    pub value: u32,
    pub is_load: bool,
}

impl Producer {
    fn writes(&self, reg: Option<u8>) -> bool {
        matches!((self.rd, reg), (Some(rd), Some(r)) if rd != 0 && rd == r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumer {
    pub pc: u32,
    pub rs1: Option<u8>,
    pub rs2: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataHazard {
    pub source: ForwardSource,
    pub register: u8,
    pub producer_pc: u32,
    pub consumer_pc: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Forward {
    pub source: ForwardSource,
    pub operand: Operand,
    pub register: u8,
    pub value: u32,
}

impl fmt::Display for Forward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ID/EX x{} = {:#x}", self.source, self.register, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub stall: bool,
    pub hazards: Vec<DataHazard>,
    pub forwards: Vec<Forward>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HazardUnit {
    pub forwarding: bool,
}

impl HazardUnit {
    pub fn new(forwarding: bool) -> Self {
        Self { forwarding }
    }

    /// `ex_mem` is the instruction that executed this cycle, `mem_wb` the
    /// one that just left the memory stage. A value in EX/MEM is newer
    /// and wins over MEM/WB for the same operand.
    pub fn resolve(
        &self,
        consumer: &Consumer,
        ex_mem: Option<&Producer>,
        mem_wb: Option<&Producer>,
    ) -> Resolution {
        let mut res = Resolution::default();

        for (source, producer) in [(ForwardSource::ExMem, ex_mem), (ForwardSource::MemWb, mem_wb)] {
            let Some(p) = producer else { continue };
            let matched: Vec<(Operand, u8)> = [(Operand::Rs1, consumer.rs1), (Operand::Rs2, consumer.rs2)]
                .into_iter()
                .filter(|(_, reg)| p.writes(*reg))
                .filter_map(|(op, reg)| reg.map(|r| (op, r)))
                .collect();
            let Some(&(_, register)) = matched.first() else { continue };

            res.hazards.push(DataHazard {
                source,
                register,
                producer_pc: p.pc,
                consumer_pc: consumer.pc,
            });

            // a load's data only exists after the memory stage
            if !self.forwarding || (source == ForwardSource::ExMem && p.is_load) {
                res.stall = true;
                continue;
            }
            for (operand, register) in matched {
                if res.forwards.iter().any(|f| f.operand == operand) {
                    continue;
                }
                res.forwards.push(Forward {
                    source,
                    operand,
                    register,
                    value: p.value,
                });
            }
        }

        if res.stall {
            res.forwards.clear();
        }
        res
    }
}
