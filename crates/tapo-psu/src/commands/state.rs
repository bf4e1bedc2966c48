//! `state`: print whether the PSU is on.
//!
//! With `--watch`, polls the same way a PSU-control host does: the first
//! read waits for the plug, later reads come from the cache while a
//! background refresh keeps it current.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use tapo_psu_core::{SessionConfig, SessionManager};

use crate::cli::{GlobalOpts, OutputFormat, StateArgs};
use crate::error::CliError;
use crate::output::{self, Field};

#[derive(Debug, Serialize)]
struct StateReport {
    address: String,
    on: bool,
}

pub async fn handle(
    config: SessionConfig,
    args: StateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = config.credentials.address.clone();
    let session = SessionManager::tapo(config);

    let result = match args.watch {
        None => print_state(&session, &address, global).await,
        Some(secs) => watch(&session, &address, secs, args.count, global).await,
    };
    session.shutdown().await;
    result
}

async fn print_state(
    session: &SessionManager,
    address: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let on = session.get_state().await?;
    let report = StateReport {
        address: address.to_owned(),
        on,
    };
    let out = output::render_single(global.output, &report, |r| {
        vec![
            Field::new("Address", r.address.clone()),
            Field::new("Status", output::power_label(r.on)),
        ]
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn watch(
    session: &SessionManager,
    address: &str,
    secs: u64,
    count: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if secs == 0 {
        return Err(CliError::Validation {
            field: "watch".into(),
            reason: "interval must be at least 1 second".into(),
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    let mut polls = 0_u64;
    let mut last = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted, stopping watch");
                break;
            }
            _ = ticker.tick() => {}
        }

        match session.get_state().await {
            Ok(on) => {
                // JSON consumers get every poll; the table only changes.
                if global.output == OutputFormat::Json {
                    let report = StateReport {
                        address: address.to_owned(),
                        on,
                    };
                    output::print_output(&serde_json::to_string(&report)?, global.quiet);
                } else if last != Some(on) {
                    output::print_output(&output::power_label(on), global.quiet);
                }
                last = Some(on);
            }
            // Without a cached value there is nothing to show yet.
            Err(e) if last.is_none() => return Err(e.into()),
            Err(e) => warn!(error = %e, "state poll failed"),
        }

        polls += 1;
        if count.is_some_and(|limit| polls >= limit) {
            break;
        }
    }
    Ok(())
}
