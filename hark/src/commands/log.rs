use std::process::ExitCode;

use hark_orchestrator::LocalClient;

pub fn handle_log(client: &LocalClient) -> anyhow::Result<ExitCode> {
    print!("{}", client.log()?);
    Ok(ExitCode::SUCCESS)
}
