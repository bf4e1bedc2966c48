//! `check`: one-shot connection test.
//!
//! Logs in directly (no cached session), reports what the plug is and, for
//! the expected model, its current power draw.

use serde::Serialize;
use tracing::debug;

use tapo_psu_core::{
    DeviceClient, DeviceConnector, DeviceInfo, EnergyReading, SessionConfig, TapoConnector,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Field};

#[derive(Debug, Serialize)]
struct CheckReport {
    address: String,
    #[serde(flatten)]
    info: DeviceInfo,
    energy: Option<EnergyReading>,
    warning: Option<String>,
}

pub async fn handle(config: &SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let address = config.credentials.address.clone();
    let to_unreachable = |e: tapo_psu_core::DeviceError| CliError::DeviceUnreachable {
        address: address.clone(),
        reason: e.to_string(),
    };

    let connector = TapoConnector::with_timeout(config.timeout);
    let client = connector
        .connect(&config.credentials)
        .await
        .map_err(to_unreachable)?;
    let info = client.get_info().await.map_err(to_unreachable)?;

    let (energy, warning) = if info.model == config.expected_model {
        match client.get_energy_usage().await {
            Ok(reading) => (Some(reading), None),
            Err(e) => {
                debug!(error = %e, "energy query failed");
                (None, Some(format!("could not read energy usage: {e}")))
            }
        }
    } else {
        let message = format!(
            "device is a {}, not a {}; energy monitoring may be unavailable",
            info.model, config.expected_model
        );
        (None, Some(message))
    };

    if let Some(ref message) = warning {
        if !global.quiet {
            eprintln!("{}", output::warning(message));
        }
    }

    let report = CheckReport {
        address: address.clone(),
        info,
        energy,
        warning,
    };
    let out = output::render_single(global.output, &report, detail_rows)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail_rows(report: &CheckReport) -> Vec<Field> {
    let mut rows = vec![
        Field::new("Address", report.address.clone()),
        Field::new("Model", report.info.model.clone()),
        Field::new("Firmware", report.info.firmware_version.clone()),
        Field::new("Hardware", report.info.hardware_version.clone()),
        Field::new("Status", output::power_label(report.info.on)),
    ];
    if let Some(ref nickname) = report.info.nickname {
        rows.push(Field::new("Nickname", nickname.clone()));
    }
    if let Some(energy) = report.energy {
        rows.push(Field::new(
            "Current power",
            format!("{} mW", energy.current_power_mw),
        ));
        rows.push(Field::new(
            "Today's energy",
            format!("{} Wh", energy.today_energy_wh),
        ));
    }
    rows
}
