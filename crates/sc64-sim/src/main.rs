//! SC64 simulator - run session scripts against the firmware engines
//!
//! Usage: sc64-sim [OPTIONS] <script>

use anyhow::Context;
use clap::Parser as ClapParser;
use sc64_sim::{BoardConfig, DiagnosticReporter, Session, SessionConfig};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "sc64-sim")]
#[command(author = "SC64 Firmware Team")]
#[command(version = "0.1.0")]
#[command(about = "Drive the SC64 USB and joybus engines from a session script", long_about = None)]
struct Args {
    /// Session script
    #[arg(required = true)]
    script: PathBuf,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    /// SDRAM size in bytes
    #[arg(long, default_value_t = BoardConfig::default().sdram_size)]
    sdram_size: usize,

    /// Bytes moved by the DMA engine per tick
    #[arg(long, default_value_t = BoardConfig::default().dma_rate)]
    dma_rate: usize,

    /// USB bridge FIFO depth in bytes
    #[arg(long, default_value_t = BoardConfig::default().fifo_depth)]
    fifo_depth: usize,

    /// Tick budget for every wait on the link
    #[arg(long, default_value_t = SessionConfig::default().max_ticks)]
    max_ticks: u64,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let filename = args.script.display().to_string();

    if args.dma_rate == 0 {
        anyhow::bail!("--dma-rate must be at least 1");
    }

    let config = SessionConfig {
        board: BoardConfig {
            sdram_size: args.sdram_size,
            dma_rate: args.dma_rate,
            fifo_depth: args.fifo_depth,
        },
        max_ticks: args.max_ticks,
        dump_tokens: args.dump_tokens,
    };
    let session = Session::new(config);

    match session.run(&source) {
        Ok(summary) => {
            log::info!("{}: {} steps passed in {} ticks", filename, summary.steps, summary.ticks);
            Ok(())
        }
        Err(e) => {
            let mut reporter = DiagnosticReporter::new();
            let file_id = reporter.add_file(&filename, &source);
            reporter.report_error(file_id, &e);
            anyhow::bail!("{} failed", filename)
        }
    }
}
