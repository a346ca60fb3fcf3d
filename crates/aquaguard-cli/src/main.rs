//! AquaGuard CLI
//!
//! Operator and diagnostic front end for the command dispatch core

use aquaguard_core::logging_facility::{self, Profile};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "aquaguard")]
#[command(about = "AquaGuard - SCADA command dispatch and audit", long_about = None)]
struct Cli {
    /// Logging profile: dev, prod or test
    #[arg(long, global = true, default_value = "test")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify a proposed parameter change
    Assess(commands::assess::AssessArgs),
    /// Print the display descriptor of a risk tier
    RiskDisplay(commands::risk_display::RiskDisplayArgs),
    /// Create and execute one command against the simulated gateway
    Simulate(commands::simulate::SimulateArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_profile);

    let result = match cli.command {
        Commands::Assess(args) => commands::assess::execute(args),
        Commands::RiskDisplay(args) => commands::risk_display::execute(args),
        Commands::Simulate(args) => commands::simulate::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
