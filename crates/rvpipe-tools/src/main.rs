use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use rvpipe::decoder::Decoder;
use rvpipe::disasm::{branch_target, fmt_decoded};
use rvpipe::isa::rv32::Rv32Decoder;

use rvpipe_tools::model::{is_mapped, load_listing, read_u32, read_u8, Image};

#[derive(Parser, Debug)]
#[command(author, version, about = "RISC-V machine-code listing inspector", long_about = None)]
struct Cli {
    /// Assembled listing (output of rvasm)
    #[arg(value_name = "MCFILE")]
    input: String,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded segments
    Sections,
    /// Disassemble a range [start, end) in bytes
    Range {
        /// Start address (hex or dec)
        start: String,
        /// End address (hex or dec, exclusive)
        end: String,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Disassemble every text segment
    Listing {
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Hex dump of a byte range
    Dump {
        /// Start address (hex or dec)
        start: String,
        /// Number of bytes
        #[arg(default_value_t = 64)]
        len: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct InsnOut {
    addr: u32,
    word: u32,
    text: String,
    target: Option<u32>,
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn disassemble(img: &Image, pc: u32) -> Option<InsnOut> {
    let word = read_u32(img, pc)?;
    let out = match Rv32Decoder::new().decode(word) {
        Ok(d) => InsnOut {
            addr: pc,
            word,
            text: fmt_decoded(&d),
            target: branch_target(&d, pc),
        },
        Err(_) => InsnOut {
            addr: pc,
            word,
            text: format!(".word {word:#010x}"),
            target: None,
        },
    };
    Some(out)
}

fn render(insn: &InsnOut, show_bytes: bool) -> String {
    let mut line = format!("{:#010x}: ", insn.addr);
    if show_bytes {
        for b in insn.word.to_be_bytes() {
            let _ = write!(line, "{b:02x} ");
        }
        line.push(' ');
    }
    line.push_str(&insn.text);
    if let Some(t) = insn.target {
        let _ = write!(line, "  ; -> {t:#010x}");
    }
    line
}

fn emit(out: Option<String>, text: String) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let img = load_listing(Path::new(&cli.input))?;

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<12} {:<12} {:<6} {:<6}", "name", "start", "end", "perms", "kind");
            for s in &img.segments {
                let start = s.base;
                let end = s.base + (s.bytes.len() as u32);
                println!(
                    "{:<10} {start:#010x}   {end:#010x}   {:<6} {:<6}",
                    s.name, s.perms, s.kind
                );
            }
        }
        Command::Range { start, end, show_bytes, out } => {
            let start = parse_u32(&start)?;
            let end = parse_u32(&end)?;
            anyhow::ensure!(end >= start, "end must be >= start");

            let mut buf = String::new();
            let mut pc = start;
            while pc < end {
                let Some(insn) = disassemble(&img, pc) else {
                    let _ = writeln!(buf, "{pc:#010x}: <unmapped>");
                    break;
                };
                let _ = writeln!(buf, "{}", render(&insn, show_bytes));
                pc = pc.wrapping_add(4);
            }
            emit(out, buf)?;
        }
        Command::Listing { format, out } => {
            let mut insns = Vec::new();
            for s in img.segments.iter().filter(|s| s.kind == "text") {
                let mut pc = s.base;
                while let Some(insn) = disassemble(&img, pc) {
                    insns.push(insn);
                    pc = pc.wrapping_add(4);
                }
            }
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&insns)? + "\n",
                OutputFormat::Text => insns.iter().map(|i| render(i, false) + "\n").collect(),
            };
            emit(out, text)?;
        }
        Command::Dump { start, len } => {
            let start = parse_u32(&start)?;
            for row in (0..len).step_by(16) {
                let base = start.wrapping_add(row);
                let mut line = format!("{base:#010x}:");
                for i in 0..16.min(len - row) {
                    let addr = base.wrapping_add(i);
                    if is_mapped(&img, addr) {
                        let _ = write!(line, " {:02X}", read_u8(&img, addr).unwrap_or(0));
                    } else {
                        line.push_str(" --");
                    }
                }
                println!("{line}");
            }
        }
    }

    Ok(())
}
