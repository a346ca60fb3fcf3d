//! Risk display command
//!
//! Usage: aquaguard risk-display <LEVEL>

use aquaguard_core::{CommandService, RiskLevel};
use clap::Args;

#[derive(Debug, Args)]
pub struct RiskDisplayArgs {
    /// Risk tier: low, medium, high or critical
    pub level: RiskLevel,
}

pub fn execute(args: RiskDisplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let display = CommandService::get_risk_display(args.level);
    println!("{}", serde_json::to_string_pretty(&display)?);
    Ok(())
}
