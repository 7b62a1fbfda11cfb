//! `hark drivers`

use std::process::ExitCode;

use colored::Colorize;
use tracing::debug;

use hark_orchestrator::LocalClient;

use super::registry;
use crate::output::print_table;

pub async fn handle_drivers(client: &LocalClient) -> anyhow::Result<ExitCode> {
    let registry = registry(client)?;
    println!(
        "{}",
        format!("drivers: platform is {}", registry.os()).green()
    );

    let mut rows = Vec::new();
    for &kind in registry.drivers() {
        let capability = registry.capability(kind);
        let available = registry.is_available(kind);
        let version = if available {
            registry.version(kind).await.unwrap_or_else(|e| {
                debug!("Could not read {} version: {}", kind, e);
                "unknown".to_string()
            })
        } else {
            "-".to_string()
        };

        rows.push(vec![
            kind.to_string(),
            capability.command.to_string(),
            yes_no(registry.supports(kind) && capability.implemented),
            yes_no(available),
            version,
        ]);
    }

    print_table(
        &["driver", "command", "supported", "installed", "version"],
        &rows,
    );
    Ok(ExitCode::SUCCESS)
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}
