use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use patmos_disasm::{explore, load_raw_bin, parse_u32, Report};
use patmos_rs::{Memory, Process, ProcessConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "PatMOS disassembler CLI", long_about = None)]
struct Cli {
    /// Load address for the binary in target address space
    #[arg(long, default_value_t = 0u32)]
    base: u32,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Treat branch targets outside the image as unknown instead of failing
    #[arg(long)]
    lenient_targets: bool,
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: String,
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
    /// Explore reachable code from entry points
    Analyze {
        /// Entry addresses (hex or dec). Repeat flag to add multiple entries.
        #[arg(long = "entry", value_name = "ADDR", num_args = 1..)]
        entries: Vec<String>,
        /// Maximum instructions to decode before stopping
        #[arg(long, default_value_t = 100_000usize)]
        max_instr: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write analysis output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn emit(text: String, out: Option<String>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn range(process: &Process, start: u32, end: u32, show_bytes: bool) -> Result<String> {
    let mut buf = String::new();
    let mut pc = start;
    while pc < end {
        let Some(inst) = process.find_inst_at(pc)? else {
            let _ = writeln!(buf, "{pc:#010x}: <oob>");
            break;
        };
        if inst.size() == 0 {
            let _ = writeln!(buf, "{pc:#010x}: .word {:#010x}", process.read_u32(pc)?);
            pc = pc.wrapping_add(4);
            continue;
        }
        let _ = write!(buf, "{pc:#010x}: ");
        if show_bytes {
            let mut bytes = vec![0u8; inst.size() as usize];
            process.read_bytes(pc, &mut bytes)?;
            for b in bytes {
                let _ = write!(buf, "{b:02x} ");
            }
            buf.push_str("  ");
        }
        let _ = writeln!(buf, "{}", inst.disasm());
        pc = inst.top_address();
    }
    Ok(buf)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(Path::new(&cli.input), cli.base, cli.skip, cli.len)?;
    let config = ProcessConfig { check_targets: !cli.lenient_targets, ..ProcessConfig::default() };
    let process = Process::new(img, config);

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<10} {:<10} {:<4}", "name", "start", "end", "exec");
            for s in &process.image().segments {
                println!("{:<10} {:#010x} {:#010x} {:<4}", s.name, s.base, s.end(), s.exec);
            }
        }
        Command::Range { start, end, show_bytes, out } => {
            let start = parse_u32(&start)?;
            let end = parse_u32(&end)?;
            anyhow::ensure!(end >= start, "end must be >= start");
            emit(range(&process, start, end, show_bytes)?, out)?;
        }
        Command::Analyze { entries, max_instr, format, out } => {
            let mut seeds = if entries.is_empty() {
                vec![process.image().entry]
            } else {
                entries.iter().map(|e| parse_u32(e)).collect::<Result<Vec<_>>>()?
            };
            seeds.sort_unstable();
            seeds.dedup();
            let ex = explore(&process, &seeds, max_instr)?;
            let report = Report::build(&process, &seeds, &ex)?;
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
                OutputFormat::Text => {
                    let mut buf = String::new();
                    let _ = writeln!(buf, "Analysis summary:");
                    let _ = writeln!(buf, "  entries : {:x?}", report.entries);
                    let _ = writeln!(buf, "  insts   : {}", ex.insts.len());
                    let _ = writeln!(buf, "  blocks  : {}", report.blocks.len());
                    let _ = writeln!(buf, "  returns : {}", report.returns.len());
                    for e in &report.edges {
                        let _ = writeln!(buf, "  {:#010x} -> {:#010x} ({:?})", e.from, e.to, e.kind);
                    }
                    for b in &report.blocks {
                        let _ = writeln!(buf, "\nloc_{:08x}:", b.start);
                        for i in &b.insns {
                            let _ = writeln!(buf, "  {i}");
                        }
                    }
                    buf
                }
            };
            emit(text, out)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patmos_rs::Image;

    #[test]
    fn range_disasm_decodes_simple() {
        // add r3 = r1, r2 ; then a word no format claims
        let img = Image::from_words(0, &[0x0206_1100, 0x0740_0000]);
        let process = Process::new(img, ProcessConfig::default());
        let text = range(&process, 0, 8, true).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0x00000000: 02 06 11 00   add r3 = r1, r2");
        assert_eq!(lines[1], "0x00000004: .word 0x07400000");
    }
}
