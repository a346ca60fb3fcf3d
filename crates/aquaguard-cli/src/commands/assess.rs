//! Assess command
//!
//! Usage: aquaguard assess --parameter <NAME> --change <PCT> [--type <TYPE>] [--json]

use aquaguard_core::{CommandService, CommandType};
use clap::Args;

#[derive(Debug, Args)]
pub struct AssessArgs {
    /// Parameter being changed, e.g. "pH dosing"
    #[arg(short, long)]
    pub parameter: String,

    /// Signed percent change from the current value
    #[arg(short, long, allow_negative_numbers = true)]
    pub change: f64,

    /// Command type
    #[arg(short = 't', long = "type", default_value = "setpoint")]
    pub command_type: CommandType,

    /// Print the descriptor as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: AssessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let level =
        CommandService::assess_command_risk(args.command_type, &args.parameter, args.change);
    let display = CommandService::get_risk_display(level);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&display)?);
    } else {
        println!("{}", level);
        println!("{}: {}", display.label, display.description);
        if display.requires_reason {
            println!("Override reason required before execution");
        }
    }

    Ok(())
}
