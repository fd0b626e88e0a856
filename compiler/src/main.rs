use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use kemit::codegen::CodegenOptions;
use kemit::pipeline::{self, EmitKind};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    Code,
    Declaration,
    Invocation,
    Types,
    BuildInfo,
}

impl From<EmitStage> for EmitKind {
    fn from(stage: EmitStage) -> Self {
        match stage {
            EmitStage::Code => EmitKind::Code,
            EmitStage::Declaration => EmitKind::Declaration,
            EmitStage::Invocation => EmitKind::Invocation,
            EmitStage::Types => EmitKind::Types,
            EmitStage::BuildInfo => EmitKind::BuildInfo,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "kemit",
    version,
    about = "kemit — prints polyhedral GPU schedules (kernels, copies, early exits) as C/CUDA source"
)]
struct Cli {
    /// Input emission bundle (.json)
    bundle: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Code)]
    emit: EmitStage,

    /// Code generation options file (.json)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Memory space prefix for kernel array parameters
    #[arg(long)]
    memory_space: Option<String>,

    /// Print element types by name in the procedure declaration
    #[arg(long)]
    custom_types: bool,

    /// Spaces per indentation level
    #[arg(long)]
    indent: Option<usize>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    debug!("bundle = {}", cli.bundle.display());
    debug!("emit   = {:?}", cli.emit);

    // ── Options: file first, then flags ──
    let mut options = match &cli.options {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("kemit: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            };
            match serde_json::from_str::<CodegenOptions>(&text) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("kemit: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
        }
        None => CodegenOptions::default(),
    };
    if cli.memory_space.is_some() {
        options.memory_space = cli.memory_space.clone();
    }
    if cli.custom_types {
        options.custom_types = Some(true);
    }
    if let Some(indent) = cli.indent {
        options.indent = indent;
    }

    // ── Read bundle ──
    let bundle = match std::fs::read_to_string(&cli.bundle) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("kemit: error: {}: {}", cli.bundle.display(), e);
            std::process::exit(2);
        }
    };

    // ── Emit ──
    let outcome = pipeline::run(&bundle, &options, cli.emit.into());
    for diag in &outcome.diagnostics {
        if diag.is_error() || !cli.quiet {
            eprintln!("kemit: {}", diag);
        }
    }
    let failed = outcome.has_error();
    let output = match outcome.output {
        Some(text) if !failed => text,
        _ => std::process::exit(1),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &output) {
                eprintln!("kemit: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            info!("wrote {}", path.display());
        }
        None => print!("{}", output),
    }
}
