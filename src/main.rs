use clap::{Parser, Subcommand};
use pipevm::eval::{DEFAULT_STEP_BUDGET, Evaluator};
use pipevm::packet::Packet;
use pipevm::program;
use pipevm::telemetry::{EvalStats, init_logging};
use pipevm::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "pipevm")]
#[command(about = "Evaluate compiled match-action pipeline programs against packets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a program file without evaluating anything
    Validate {
        /// Path to the compiled program
        #[arg(short, long, default_value = "program.toml")]
        program: PathBuf,
    },
    /// Evaluate a program against a single packet
    Run {
        /// Path to the compiled program
        #[arg(short, long, default_value = "program.toml")]
        program: PathBuf,

        /// Packet bytes as a hex string (whitespace and colons ignored)
        #[arg(long, conflicts_with = "packet_file")]
        packet: Option<String>,

        /// File holding the raw packet bytes
        #[arg(long)]
        packet_file: Option<PathBuf>,

        /// Physical ingress port
        #[arg(long, default_value_t = 0)]
        port: u32,

        /// Per-packet step budget
        #[arg(long, default_value_t = DEFAULT_STEP_BUDGET)]
        budget: u64,
    },
}

fn main() {
    init_logging(None);

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { program } => cmd_validate(&program),
        Commands::Run {
            program,
            packet,
            packet_file,
            port,
            budget,
        } => cmd_run(&program, packet.as_deref(), packet_file.as_deref(), port, budget),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_validate(path: &std::path::Path) -> Result<()> {
    let loaded = program::load(path)?;
    let result = program::validate(&loaded);
    result.print_diagnostics();

    if result.has_errors() {
        return Err(Error::ProgramFormat(format!(
            "{} validation error(s)",
            result.errors.len()
        )));
    }

    println!(
        "OK: {} table(s), {} warning(s)",
        loaded.len(),
        result.warnings.len()
    );
    Ok(())
}

fn cmd_run(
    program_path: &std::path::Path,
    packet_hex: Option<&str>,
    packet_file: Option<&std::path::Path>,
    port: u32,
    budget: u64,
) -> Result<()> {
    info!("loading {}", program_path.display());
    let loaded = program::load(program_path)?;
    let validation = program::validate(&loaded);
    validation.print_diagnostics();
    if validation.has_errors() {
        return Err(Error::ProgramFormat(format!(
            "{} validation error(s)",
            validation.errors.len()
        )));
    }
    let loaded = Arc::new(loaded);

    let data = match (packet_hex, packet_file) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(path)) => std::fs::read(path)?,
        (None, None) => {
            return Err(Error::Config(
                "one of --packet or --packet-file is required".into(),
            ));
        }
    };

    let stats = EvalStats::new();
    let packet = match Packet::classify(data, SystemTime::now(), port) {
        Ok(packet) => packet,
        Err(e) => {
            stats.record_abort();
            return Err(e);
        }
    };
    debug!(
        len = packet.len(),
        ingress_port = packet.ingress_port(),
        "packet classified"
    );

    let mut evaluator = Evaluator::new(Arc::clone(&loaded), &packet)?;
    if let Err(e) = evaluator.run_bounded(budget) {
        stats.record_abort();
        return Err(e);
    }

    let steps = evaluator.steps();
    let (buffer, decision) = evaluator.into_output();
    stats.record_completed(decision.output_port(), steps);

    match decision.output_port() {
        Some(out) => println!("output port {}", out),
        None => println!("dropped"),
    }
    println!("steps: {}", steps);
    println!("buffer: {}", to_hex(&buffer));
    Ok(())
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if cleaned.len() % 2 != 0 {
        return Err(Error::Config("odd number of hex digits in packet".into()));
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|_| Error::Config("invalid hex digit in packet".into()))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
