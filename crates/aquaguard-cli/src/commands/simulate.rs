//! Simulate command
//!
//! Usage: aquaguard simulate --parameter <NAME> --current <V> --target <V>
//!        [--config <FILE>] [--seed <N>] [--reason <TEXT>] ...
//!
//! Creates one classified command, confirms it and dispatches it to the
//! simulated gateway, then prints the command, the result and the audit
//! statistics as a single JSON document.

use aquaguard_core::{
    AuditQuery, Clock, CommandConfirmation, CommandIntent, CommandService, CommandSource,
    CommandType, RiskLevel, ServiceConfig, StdEntropy, SystemClock,
};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// TOML configuration file; `AQUAGUARD_*` variables override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for the simulated gateway's random draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Parameter being changed
    #[arg(short, long)]
    pub parameter: String,

    #[arg(long, allow_negative_numbers = true)]
    pub current: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub target: f64,

    #[arg(long, default_value = "")]
    pub unit: String,

    #[arg(short = 't', long = "type", default_value = "setpoint")]
    pub command_type: CommandType,

    #[arg(long, default_value = "plant-1")]
    pub plant: String,

    #[arg(long, default_value = "equipment-1")]
    pub equipment: String,

    /// Operator recorded as requester and confirmer
    #[arg(long, default_value = "cli-operator")]
    pub operator: String,

    /// Override reason for high and critical changes
    #[arg(long)]
    pub reason: Option<String>,

    /// Skip execution and cancel the command instead
    #[arg(long)]
    pub cancel: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    command: aquaguard_core::CommandRequest,
    result: aquaguard_core::CommandResult,
    audit: Vec<aquaguard_core::AuditLogEntry>,
    stats: aquaguard_core::AuditStats,
}

pub fn execute(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load(args.config.as_deref())?;

    let mut builder = CommandService::builder(config);
    if let Some(seed) = args.seed {
        builder = builder.entropy(Arc::new(StdEntropy::seeded(seed)));
    }
    let service = builder.build()?;

    let intent = CommandIntent {
        command_type: args.command_type,
        equipment_id: args.equipment.clone(),
        equipment_name: args.equipment,
        plant_id: args.plant.clone(),
        plant_name: args.plant,
        parameter: args.parameter,
        current_value: args.current.into(),
        target_value: args.target.into(),
        unit: args.unit,
        risk_level: RiskLevel::Low,
        reasoning: None,
        source: CommandSource::Manual,
        requested_by: args.operator.clone(),
    };
    let command = service.create_classified_command(intent)?;
    tracing::debug!(command_id = command.id.as_str(), "simulation command created");

    let result = if args.cancel {
        service.cancel_command(&command.id, &args.operator, args.reason.as_deref())
    } else {
        let mut confirmation = CommandConfirmation::new(args.operator, SystemClock.now());
        if let Some(reason) = args.reason {
            confirmation = confirmation.with_override_reason(reason);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(service.execute_command(&command.id, confirmation))
    };

    let report = SimulationReport {
        audit: service.get_audit_log(&AuditQuery::new().plant(command.plant_id.clone())),
        stats: service.get_audit_stats(None),
        command,
        result,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    service.close();
    Ok(())
}
