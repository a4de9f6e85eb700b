use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::asm::Program;
use crate::decoder::{DecodeError, Decoder, Op, OpClass};
use crate::exec::{AluOp, Executor, IntExecutor};
use crate::hazard::{Consumer, HazardUnit, Operand, Producer};
use crate::instructions::Format;
use crate::isa::rv32::Rv32Decoder;
use crate::loader::Image;
use crate::memory::{MemoryInterface, Segment, Width, TEXT_BASE};
use crate::pipeline::{Control, ExMem, Iag, IdEx, IfId, Latches, MemWb, PipelineEvent, Stage};
use crate::predictor::{BranchPredictor, PredictorEntry};
use crate::registers::{RegisterFile, DEFAULT_STACK_POINTER};
use crate::stats::Stats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Bypass EX/MEM and MEM/WB values into decode instead of stalling.
    pub forwarding: bool,
    pub stack_pointer: u32,
    /// `run` gives up after this many cycles.
    pub max_cycles: u64,
    /// Log every stage this instruction address completes.
    pub watch_pc: Option<u32>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            forwarding: false,
            stack_pointer: DEFAULT_STACK_POINTER,
            max_cycles: 10_000_000,
            watch_pc: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("{segment} segment access violation at {addr:#010x}")]
    SegmentAccessViolation { addr: u32, segment: Segment },
    #[error("unsupported {bits}-bit memory access at {addr:#010x}")]
    UnsupportedWidth { addr: u32, bits: u32 },
    #[error("illegal instruction {word:#010x} at {pc:#010x}")]
    IllegalInstruction { pc: u32, word: u32 },
    #[error("unsupported operation `{mnemonic}` at {pc:#010x}")]
    UnsupportedOperation { pc: u32, mnemonic: &'static str },
    #[error("malformed image line {line}: `{text}`")]
    MalformedImage { line: usize, text: String },
    #[error("no halt within {cycles} cycles")]
    CycleLimitExceeded { cycles: u64 },
}

impl Trap {
    fn from_decode(pc: u32, err: DecodeError) -> Self {
        match err {
            DecodeError::Illegal { word } => Trap::IllegalInstruction { pc, word },
            DecodeError::Unsupported { mnemonic, .. } => Trap::UnsupportedOperation { pc, mnemonic },
        }
    }
}

/// Serialisable view of the whole engine after a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub pc: u32,
    pub halted: bool,
    pub registers: [u32; 32],
    pub latches: Latches,
    pub predictor: Vec<PredictorEntry>,
    pub stats: Stats,
    pub cpi: f64,
    pub events: Vec<PipelineEvent>,
}

/// Five-stage pipeline: fetch, decode, execute, memory, write-back.
///
/// Each call to [`Cpu::step`] is one clock cycle. Stages are evaluated
/// from write-back to fetch so every stage reads the buffer contents left
/// by the previous cycle before the stage behind it overwrites them. As a
/// consequence a register written back this cycle is visible to decode in
/// the same cycle.
pub struct Cpu<D: Decoder = Rv32Decoder, X: Executor = IntExecutor> {
    cfg: CpuConfig,
    regs: RegisterFile,
    text: MemoryInterface,
    data: MemoryInterface,
    iag: Iag,
    latches: Latches,
    predictor: BranchPredictor,
    stats: Stats,
    events: Vec<PipelineEvent>,
    halted: bool,
    decoder: D,
    alu: X,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self::with_units(cfg, Rv32Decoder::new(), IntExecutor)
    }
}

impl<D: Decoder, X: Executor> Cpu<D, X> {
    pub fn with_units(cfg: CpuConfig, decoder: D, alu: X) -> Self {
        Self {
            regs: RegisterFile::new(cfg.stack_pointer),
            text: MemoryInterface::new(Segment::Text),
            data: MemoryInterface::new(Segment::Data),
            iag: Iag::new(TEXT_BASE),
            latches: Latches::default(),
            predictor: BranchPredictor::new(),
            stats: Stats::default(),
            events: Vec::new(),
            halted: false,
            cfg,
            decoder,
            alu,
        }
    }

    /// Clears registers, both memories, the pipeline, the predictor and
    /// the statistics.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::new(self.cfg.stack_pointer);
        self.text.reset();
        self.data.reset();
        self.iag = Iag::new(TEXT_BASE);
        self.latches = Latches::default();
        self.predictor.clear();
        self.stats = Stats::default();
        self.events.clear();
        self.halted = false;
    }

    pub fn load_image(&mut self, image: &Image) -> Result<(), Trap> {
        self.reset();
        for &(addr, word) in &image.text {
            self.text.mar = addr;
            self.text.mdr = word;
            self.text.store(Width::Word)?;
        }
        for &(addr, byte) in &image.data {
            self.data.mar = addr;
            self.data.mdr = byte as u32;
            self.data.store(Width::Byte)?;
        }
        info!(
            text_words = image.text.len(),
            data_bytes = image.data.len(),
            "program loaded"
        );
        Ok(())
    }

    pub fn load_program(&mut self, program: &Program) -> Result<(), Trap> {
        self.load_image(&Image::from(program))
    }

    /// Parses the assembler's textual output and loads it.
    pub fn load_text(&mut self, machine_code: &str) -> Result<(), Trap> {
        let image = Image::parse(machine_code)?;
        self.load_image(&image)
    }

    pub fn set_forwarding(&mut self, enabled: bool) {
        self.cfg.forwarding = enabled;
    }

    pub fn config(&self) -> &CpuConfig {
        &self.cfg
    }

    pub fn pc(&self) -> u32 {
        self.iag.pc
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn registers(&self) -> &[u32; 32] {
        self.regs.as_array()
    }

    pub fn register(&self, r: u8) -> u32 {
        self.regs.read(r)
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn latches(&self) -> &Latches {
        &self.latches
    }

    pub fn predictor(&self) -> &BranchPredictor {
        &self.predictor
    }

    /// Events recorded during the last cycle.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }

    /// `len` bytes starting at `start`; unwritten bytes read as zero. The
    /// whole range must lie inside `segment`.
    pub fn read_memory(&self, segment: Segment, start: u32, len: u32) -> Result<Vec<u8>, Trap> {
        let mem = match segment {
            Segment::Text => &self.text.mem,
            Segment::Data => &self.data.mem,
        };
        mem.check(start, len)?;
        Ok(mem.dump(start, len))
    }

    /// Big-endian word from data memory, without touching the MAR/MDR latches.
    pub fn read_data_word(&self, addr: u32) -> Result<u32, Trap> {
        let bytes = self.read_memory(Segment::Data, addr, 4)?;
        Ok(bytes.iter().fold(0, |acc, b| (acc << 8) | *b as u32))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.iag.pc,
            halted: self.halted,
            registers: *self.regs.as_array(),
            latches: self.latches.clone(),
            predictor: self.predictor.entries(),
            stats: self.stats,
            cpi: self.stats.cpi(),
            events: self.events.clone(),
        }
    }

    /// Advances one clock cycle. Returns `false` once the halt word has
    /// reached write-back.
    pub fn step(&mut self) -> Result<bool, Trap> {
        if self.halted {
            return Ok(false);
        }
        self.events.clear();
        self.stats.cycles += 1;
        trace!(cycle = self.stats.cycles, "cycle start");

        let halt = self.write_back();
        self.memory()?;
        self.execute()?;
        self.decode()?;
        self.fetch()?;

        if halt {
            self.halted = true;
            info!(cycles = self.stats.cycles, instructions = self.stats.instructions, "halted");
        }
        Ok(!self.halted)
    }

    /// Steps until the program halts.
    pub fn run(&mut self) -> Result<Stats, Trap> {
        while !self.halted {
            if self.stats.cycles >= self.cfg.max_cycles {
                return Err(Trap::CycleLimitExceeded {
                    cycles: self.stats.cycles,
                });
            }
            self.step()?;
        }
        Ok(self.stats)
    }

    fn watch(&mut self, stage: Stage, pc: u32) {
        if self.cfg.watch_pc == Some(pc) {
            debug!(%stage, pc = format_args!("{pc:#x}"), latches = ?self.latches, "watched instruction");
            self.events.push(PipelineEvent::Watched { stage, pc });
        }
    }

    fn write_back(&mut self) -> bool {
        let Some(slot) = self.latches.mem_wb else {
            trace!("W: bubble");
            return false;
        };
        trace!(pc = format_args!("{:#x}", slot.pc), value = slot.value, "W");
        self.watch(Stage::WriteBack, slot.pc);

        if slot.decoded.op == Op::Ecall {
            return true;
        }
        self.stats.instructions += 1;
        if slot.control.contains(Control::WRITE_BACK) {
            if let Some(rd) = slot.decoded.rd {
                self.regs.write(rd, slot.value);
            }
        }
        false
    }

    fn memory(&mut self) -> Result<(), Trap> {
        let Some(slot) = self.latches.ex_mem else {
            trace!("M: bubble");
            self.latches.mem_wb = None;
            return Ok(());
        };

        let mut value = slot.alu_out;
        if let Some(width) = slot.decoded.op.access_width() {
            self.data.mar = slot.alu_out;
            if slot.control.contains(Control::MEM_STORE) {
                self.data.mdr = slot.store_val;
                self.data.store(width)?;
            } else {
                value = self.data.load(width)?;
            }
            self.stats.data_transfer_instructions += 1;
        }
        trace!(pc = format_args!("{:#x}", slot.pc), value, "M");

        self.latches.mem_wb = Some(MemWb {
            pc: slot.pc,
            decoded: slot.decoded,
            control: slot.control,
            value,
        });
        self.watch(Stage::Memory, slot.pc);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), Trap> {
        let Some(slot) = self.latches.id_ex else {
            trace!("E: bubble");
            self.latches.ex_mem = None;
            return Ok(());
        };
        let d = slot.decoded;

        let a = if d.op == Op::Auipc { slot.pc } else { slot.rs1_val };
        let b = match d.format {
            Format::R | Format::SB => slot.rs2_val,
            _ => d.imm as u32,
        };
        let mut alu_out = self.alu.exec(AluOp::from(d.op), a, b);

        match d.op.class() {
            OpClass::Alu => self.stats.alu_instructions += 1,
            OpClass::Branch | OpClass::Jal | OpClass::Jalr => self.stats.control_instructions += 1,
            _ => {}
        }

        if slot.control.is_control_transfer() {
            let (taken, target) = if slot.control.contains(Control::BRANCH) {
                let taken = alu_out != 0;
                let target = if taken {
                    slot.pc.wrapping_add(d.imm as u32)
                } else {
                    slot.next_pc
                };
                (taken, target)
            } else if slot.control.contains(Control::JAL) {
                (true, slot.pc.wrapping_add(d.imm as u32))
            } else {
                (true, alu_out)
            };
            self.resolve_control(slot.pc, taken, target);
            if slot.control.intersects(Control::JAL | Control::JALR) {
                alu_out = slot.next_pc;
            }
        }
        trace!(pc = format_args!("{:#x}", slot.pc), alu_out, "E");

        self.latches.ex_mem = Some(ExMem {
            pc: slot.pc,
            decoded: d,
            control: slot.control,
            alu_out,
            store_val: slot.rs2_val,
        });
        self.watch(Stage::Execute, slot.pc);
        Ok(())
    }

    /// Compares the resolved target with what fetch actually followed.
    fn resolve_control(&mut self, pc: u32, taken: bool, target: u32) {
        let fetched = self.latches.if_id.map(|f| f.pc);
        if fetched != Some(target) {
            self.stats.control_hazards += 1;
            self.stats.mispredictions += 1;
            self.stats.control_stalls += 2;
            self.stats.stalls += 2;
            debug!(
                pc = format_args!("{pc:#x}"),
                target = format_args!("{target:#x}"),
                "control hazard, flushing IF/ID and ID/EX"
            );
            self.events.push(PipelineEvent::ControlHazard { pc, fetched, target });
            self.iag.redirect(target);
            self.latches.flush_front();
        }
        self.predictor.update(pc, taken, target);
    }

    fn decode(&mut self) -> Result<(), Trap> {
        let Some(fetched) = self.latches.if_id else {
            trace!("D: bubble");
            self.latches.id_ex = None;
            return Ok(());
        };
        let decoded = self
            .decoder
            .decode(fetched.word)
            .map_err(|e| Trap::from_decode(fetched.pc, e))?;

        let mut slot = IdEx {
            pc: fetched.pc,
            next_pc: fetched.next_pc,
            decoded,
            control: Control::for_op(decoded.op),
            rs1_val: self.regs.read(decoded.rs1.unwrap_or(0)),
            rs2_val: self.regs.read(decoded.rs2.unwrap_or(0)),
        };

        let consumer = Consumer {
            pc: fetched.pc,
            rs1: decoded.rs1,
            rs2: decoded.rs2,
        };
        let ex_mem = self.latches.ex_mem.map(|s| Producer {
            pc: s.pc,
            rd: s.decoded.rd.filter(|_| s.control.contains(Control::WRITE_BACK)),
            value: s.alu_out,
            is_load: s.control.contains(Control::MEM_LOAD),
        });
        let mem_wb = self.latches.mem_wb.map(|s| Producer {
            pc: s.pc,
            rd: s.decoded.rd.filter(|_| s.control.contains(Control::WRITE_BACK)),
            value: s.value,
            is_load: s.control.contains(Control::MEM_LOAD),
        });
        let res = HazardUnit::new(self.cfg.forwarding).resolve(&consumer, ex_mem.as_ref(), mem_wb.as_ref());

        self.stats.data_hazards += res.hazards.len() as u64;
        for hazard in res.hazards {
            debug!(
                source = %hazard.source,
                register = hazard.register,
                consumer = format_args!("{:#x}", hazard.consumer_pc),
                "data hazard"
            );
            self.events.push(PipelineEvent::DataHazard(hazard));
        }

        if res.stall {
            self.stats.data_stalls += 1;
            self.stats.stalls += 1;
            self.events.push(PipelineEvent::Stall { pc: fetched.pc });
            // hold the instruction: refetch it and send a bubble onward
            self.latches.id_ex = None;
            self.iag.pc = fetched.pc;
            return Ok(());
        }

        for fwd in res.forwards {
            debug!(%fwd, "forward");
            match fwd.operand {
                Operand::Rs1 => slot.rs1_val = fwd.value,
                Operand::Rs2 => slot.rs2_val = fwd.value,
            }
            self.events.push(PipelineEvent::Forward(fwd));
        }
        trace!(pc = format_args!("{:#x}", fetched.pc), op = ?decoded.op, "D");

        self.latches.id_ex = Some(slot);
        self.watch(Stage::Decode, fetched.pc);
        Ok(())
    }

    fn fetch(&mut self) -> Result<(), Trap> {
        let pc = self.iag.pc;
        self.text.mar = pc;
        let word = self.text.fetch()?;

        let slot = match word {
            Some(word) if !self.iag.is_redirecting() => Some(IfId {
                pc,
                next_pc: pc.wrapping_add(4),
                word,
            }),
            _ => None,
        };
        let predicted = slot.and_then(|f| {
            let p = self.predictor.predict(f.pc);
            p.taken.then_some(p.target)
        });
        trace!(pc = format_args!("{pc:#x}"), bubble = slot.is_none(), "F");

        self.latches.if_id = slot;
        self.iag.advance(predicted);
        if slot.is_some() {
            self.watch(Stage::Fetch, pc);
        }
        Ok(())
    }
}
