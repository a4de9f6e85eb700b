use anyhow::Result;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Two-pass RISC-V assembler")]
struct Opts {
    /// Input assembly file (one instruction, directive or label per line)
    #[arg(short, long)]
    input: PathBuf,
    /// Output listing file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the symbol table to stderr
    #[arg(long)]
    symbols: bool,
    /// Emit the assembled program as JSON instead of the listing
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let source = fs::read_to_string(&opts.input)?;
    let program = rvpipe::assemble(&source)?;

    if opts.symbols {
        for (name, addr) in &program.symbols {
            eprintln!("{addr:#010x} {name}");
        }
    }

    let rendered = if opts.json {
        serde_json::to_string_pretty(&program)?
    } else {
        program.to_string()
    };
    match &opts.output {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}
