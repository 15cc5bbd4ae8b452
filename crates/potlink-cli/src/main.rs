//! potlink - play a hardware knob box into a live effect chain.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "potlink")]
#[command(author, version, about = "Serial controller to effect chain host", long_about = None)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every control change received from the board
    Monitor(commands::monitor::MonitorArgs),

    /// Run the effect chain on live audio, driven by the board
    Run(commands::run::RunArgs),

    /// Render a WAV file through the effect chain
    Process(commands::process::ProcessArgs),

    /// Show the controller routing table
    Routes(commands::routes::RoutesArgs),

    /// List serial ports and audio devices
    Ports,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Monitor(args) => commands::monitor::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Routes(args) => commands::routes::run(args),
        Commands::Ports => commands::ports::run(),
    }
}
