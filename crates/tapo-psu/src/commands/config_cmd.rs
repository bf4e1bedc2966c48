//! Config subcommand handlers.

use secrecy::SecretString;

use tapo_psu_config::{Settings, save_settings, store_password};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Field};

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let settings = config::load(global)?.redacted();
            let out = output::render_single(global.output, &settings, detail_rows)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Init: defaults plus whatever flags were given ───────────
        ConfigCommand::Init { force } => {
            let path = config::settings_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut settings = Settings::default();
            if let Some(ref address) = global.address {
                settings.address.clone_from(address);
            }
            if let Some(ref username) = global.username {
                settings.username.clone_from(username);
            }
            if let Some(timeout) = global.timeout {
                settings.timeout_secs = timeout;
            }
            settings.validate()?;

            save_settings(&settings, &path)?;
            if !global.quiet {
                eprintln!("✓ Settings written to {}", path.display());
                eprintln!("  Store the password with: tapo-psu config set-password");
            }
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let path = config::settings_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        // ── Keyring ─────────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let settings = config::load(global)?;
            if settings.username.is_empty() {
                return Err(CliError::Validation {
                    field: "username".into(),
                    reason: "set a username first (--username or config init)".into(),
                });
            }

            let password = match global.password.clone().filter(|pw| !pw.is_empty()) {
                Some(pw) => pw,
                None => rpassword::prompt_password(format!(
                    "Tapo password for {}: ",
                    settings.username
                ))
                .map_err(prompt_err)?,
            };
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            store_password(&settings.username, &SecretString::from(password))?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring");
            }
            Ok(())
        }
    }
}

fn detail_rows(settings: &Settings) -> Vec<Field> {
    let or_unset = |value: &str| {
        if value.is_empty() {
            "(not set)".to_owned()
        } else {
            value.to_owned()
        }
    };
    vec![
        Field::new("Address", or_unset(&settings.address)),
        Field::new("Username", or_unset(&settings.username)),
        Field::new(
            "Password",
            settings
                .password
                .clone()
                .unwrap_or_else(|| "(keyring or env)".into()),
        ),
        Field::new(
            "Energy monitoring",
            settings.enable_energy_monitoring.to_string(),
        ),
        Field::new("Timeout", format!("{}s", settings.timeout_secs)),
        Field::new("Expected model", settings.expected_model.clone()),
        Field::new("Settings version", settings.settings_version.to_string()),
    ]
}
