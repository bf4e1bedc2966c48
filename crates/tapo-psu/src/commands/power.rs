//! `on` / `off`: switch the plug through the session manager.

use serde::Serialize;

use tapo_psu_core::{SessionConfig, SessionManager};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Field};

#[derive(Debug, Serialize)]
struct PowerReport {
    address: String,
    on: bool,
}

pub async fn handle(config: SessionConfig, on: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let address = config.credentials.address.clone();
    let session = SessionManager::tapo(config);

    let result = if on {
        session.turn_on().await
    } else {
        session.turn_off().await
    };
    session.shutdown().await;
    result?;

    let report = PowerReport { address, on };
    let out = output::render_single(global.output, &report, |r| {
        vec![
            Field::new("Address", r.address.clone()),
            Field::new("Status", output::power_label(r.on)),
        ]
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
