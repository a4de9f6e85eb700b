use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rvpipe::{assemble, Cpu, CpuConfig, Image, Segment, Stats};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a RISC-V program on the 5-stage pipeline model"
)]
struct Opts {
    /// Assembly source (.s/.asm) or assembled machine-code listing
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// JSON file with a CpuConfig; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Enable operand forwarding
    #[arg(long)]
    forwarding: bool,
    /// Give up after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,
    /// Log each stage completed by the instruction at this address (hex or dec)
    #[arg(long, value_parser = parse_u32)]
    watch_pc: Option<u32>,
    /// Stop after N cycles instead of running to halt
    #[arg(long)]
    cycles: Option<u64>,
    /// Dump this many bytes of data memory from --dump-start
    #[arg(long, default_value_t = 0)]
    dump_len: u32,
    /// Start address of the data dump (hex or dec)
    #[arg(long, value_parser = parse_u32, default_value = "0x10000000")]
    dump_start: u32,
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address `{s}`: {e}"))
}

fn load_image(path: &Path) -> Result<Image> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_asm = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("s") | Some("S") | Some("asm")
    );
    if is_asm {
        let program = assemble(&source)?;
        Ok(Image::from(&program))
    } else {
        Ok(Image::parse(&source)?)
    }
}

#[derive(Serialize)]
struct Report {
    halted: bool,
    pc: u32,
    registers: [u32; 32],
    stats: Stats,
    cpi: f64,
    dump_start: u32,
    dump: Vec<u8>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<CpuConfig>(&text)?
        }
        None => CpuConfig::default(),
    };
    if opts.forwarding {
        cfg.forwarding = true;
    }
    if let Some(max) = opts.max_cycles {
        cfg.max_cycles = max;
    }
    if opts.watch_pc.is_some() {
        cfg.watch_pc = opts.watch_pc;
    }

    let image = load_image(&opts.input)?;
    let mut cpu = Cpu::new(cfg);
    cpu.load_image(&image)?;

    match opts.cycles {
        Some(n) => {
            for _ in 0..n {
                if !cpu.step()? {
                    break;
                }
            }
        }
        None => {
            cpu.run()?;
        }
    }

    let report = Report {
        halted: cpu.is_halted(),
        pc: cpu.pc(),
        registers: *cpu.registers(),
        stats: *cpu.stats(),
        cpi: cpu.stats().cpi(),
        dump_start: opts.dump_start,
        dump: cpu.read_memory(Segment::Data, opts.dump_start, opts.dump_len)?,
    };

    match opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("halted: {}  pc: {:#010x}", report.halted, report.pc);
            for (i, chunk) in report.registers.chunks(4).enumerate() {
                let row: Vec<String> = chunk
                    .iter()
                    .enumerate()
                    .map(|(j, v)| format!("x{:<2} = {:#010x}", i * 4 + j, v))
                    .collect();
                println!("{}", row.join("  "));
            }
            println!();
            println!("{}", report.stats);
            if !report.dump.is_empty() {
                println!();
                for (i, line) in report.dump.chunks(16).enumerate() {
                    let bytes: Vec<String> = line.iter().map(|b| format!("{b:02X}")).collect();
                    println!("{:#010x}: {}", report.dump_start as usize + i * 16, bytes.join(" "));
                }
            }
        }
    }
    Ok(())
}
