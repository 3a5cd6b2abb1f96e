use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use patmos_rs::{Image, Inst, LineMap, Process, ProcessConfig, SemOp};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Decode a PatMOS binary and print what the analysis core sees"
)]
struct Opts {
    /// Load address of the binary
    #[arg(long, default_value = "0", value_parser = parse_u32)]
    base: u32,
    /// Entry point, overrides the config file
    #[arg(short, long, value_parser = parse_u32)]
    entry: Option<u32>,
    /// First address to inspect (default: entry)
    #[arg(long, value_parser = parse_u32)]
    start: Option<u32>,
    /// Number of instructions to inspect
    #[arg(short = 'n', long, default_value_t = 16)]
    count: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// ProcessConfig as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<String>,
    /// Line table as JSON (Vec<{ file, line, low, high }>)
    #[arg(long, value_name = "FILE")]
    lines: Option<String>,
    #[arg(value_name = "BINFILE")]
    input: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct InstOut {
    addr: u32,
    size: u32,
    disasm: String,
    kind: Vec<String>,
    reads: Vec<String>,
    writes: Vec<String>,
    target: Option<u32>,
    delay: Option<usize>,
    source: Option<(String, u32)>,
    semantics: Vec<SemOp>,
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn describe(process: &Process, inst: &Inst) -> Result<InstOut> {
    let target = process.target(inst)?.map(|t| t.address());
    let delay = if inst.is_control() { Some(process.delay_slots(inst)?) } else { None };
    Ok(InstOut {
        addr: inst.address(),
        size: inst.size(),
        disasm: inst.disasm(),
        kind: inst.kind().iter_names().map(|(n, _)| n.to_string()).collect(),
        reads: inst.read_regs().iter().map(|r| r.to_string()).collect(),
        writes: inst.written_regs().iter().map(|r| r.to_string()).collect(),
        target,
        delay,
        source: process.source_line(inst.address()).map(|(f, l)| (f.to_string(), l)),
        semantics: inst.semantics().ops().to_vec(),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let bytes = std::fs::read(&opts.input).with_context(|| format!("reading {}", opts.input))?;
    let mut config: ProcessConfig = match &opts.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ProcessConfig::default(),
    };
    if opts.entry.is_some() {
        config.entry = opts.entry;
    }
    let mut process = Process::new(Image::from_code(opts.base, bytes), config);
    if let Some(path) = &opts.lines {
        process = process.with_line_map(LineMap::from_json(&std::fs::read_to_string(path)?)?);
    }

    let mut addr = opts
        .start
        .or(process.config().entry)
        .unwrap_or(process.image().entry);
    let mut out = Vec::new();
    for _ in 0..opts.count {
        let Some(inst) = process.find_inst_at(addr)? else { break };
        out.push(describe(&process, &inst)?);
        if inst.size() == 0 {
            break;
        }
        addr = inst.top_address();
    }

    match opts.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out)?),
        OutputFormat::Text => {
            for i in &out {
                println!("{:#010x}: {}", i.addr, i.disasm);
                println!("    kind   : {}", i.kind.join(" | "));
                println!("    reads  : {}", i.reads.join(", "));
                println!("    writes : {}", i.writes.join(", "));
                if let Some(t) = i.target {
                    println!("    target : {t:#010x}");
                }
                if let Some(n) = i.delay {
                    println!("    delay  : {n}");
                }
                if let Some((file, line)) = &i.source {
                    println!("    source : {file}:{line}");
                }
                for op in &i.semantics {
                    println!("      {op}");
                }
            }
        }
    }
    Ok(())
}
