//! Select a textual DAG for a Z80 target and print the result.
//!
//! Reads from the given file, or from stdin when no file is named.

use clap::{Parser as ClapParser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use z80_isel::core::{IselSession, TypeContext};
use z80_isel::dag_text::parse_dag;
use z80_isel::isel::InstructionSelector;
use z80_isel::z80::{FeatureSet, PointerMode, Subtarget, TargetTriple, Z80Target};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    #[value(name = "16")]
    Bits16,
    #[value(name = "24")]
    Bits24,
}

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// DAG file; stdin when omitted.
    input: Option<PathBuf>,

    #[arg(long, default_value = "z80")]
    triple: String,

    /// Enable undocumented Z80 instructions.
    #[arg(long)]
    undoc_ops: bool,

    /// Enable Z180 instructions.
    #[arg(long)]
    z180: bool,

    /// Enable eZ80 instructions.
    #[arg(long)]
    ez80: bool,

    /// Pointer width; the architecture default when omitted.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Print selection statistics to stderr.
    #[arg(long)]
    stats: bool,
}

fn run(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
    let text = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let triple: TargetTriple = args.triple.parse()?;
    let features = FeatureSet {
        undoc_ops: args.undoc_ops,
        z180_ops: args.z180,
        ez80_ops: args.ez80,
        mode: args.mode.map(|mode| match mode {
            Mode::Bits16 => PointerMode::Bits16,
            Mode::Bits24 => PointerMode::Bits24,
        }),
    };
    let target = Z80Target::new(Subtarget::new(triple, features)?);

    let ctx = TypeContext::new();
    let mut parsed = parse_dag(&text, &ctx)?;
    let session = IselSession::new();
    let name = args
        .input
        .as_ref()
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<stdin>".to_string());
    InstructionSelector::new(&target, &session).select_named_function(
        &name,
        &mut parsed.dag,
        &parsed.order,
    )?;

    if args.stats {
        eprintln!("{}", session.stats());
    }
    Ok(parsed.dag.to_string())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
