use clap::{Args, Parser, Subcommand};
use serde_json::json;
use upstox_totp::{totp, Client, Config, ErrorKind, UpstoxError};

use crate::render::{CliError, CommandOutput, CommandResult, Output};

#[derive(Parser, Clone)]
#[command(name = "upstox-totp", version, about = "Generate Upstox daily access tokens")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short = 'o', long, global = true, value_enum, default_value_t = Output::Plain)]
    pub output: Output,

    #[arg(short = 'q', long, global = true, help = "Don't print anything to stdout")]
    pub quiet: bool,
}

#[derive(Subcommand, Clone)]
pub(crate) enum Commands {
    /// Run the full login flow and print the access token (the default)
    GenerateToken(GenerateTokenArgs),
    /// Print the TOTP code for the current 30-second window
    ///
    /// Compare against a reference authenticator app to confirm the
    /// configured seed is the right one.
    Totp,
    /// Load and validate the configuration without any network call
    CheckConfig,
}

#[derive(Args, Clone, Default)]
pub(crate) struct GenerateTokenArgs {
    /// Override the inter-step pacing delay, in milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub sleep_time: Option<u64>,

    /// Override the per-step attempt ceiling
    #[arg(long, value_name = "ATTEMPTS")]
    pub max_retries: Option<u32>,

    /// Abort the run once this overall deadline expires, in milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub deadline: Option<u64>,
}

impl GenerateTokenArgs {
    pub(crate) async fn run(self, output: Output) -> CommandResult {
        let mut config = Config::from_env()?;
        if let Some(sleep_time) = self.sleep_time {
            config.settings.sleep_time_ms = sleep_time;
        }
        if let Some(max_retries) = self.max_retries {
            config.settings.max_retries = max_retries;
        }
        if let Some(deadline) = self.deadline {
            config.settings.deadline_ms = Some(deadline);
        }

        let client = Client::new_with_settings(config.credentials, config.settings)?;
        match client.get_access_token().await.into_data() {
            Ok(token) => match output {
                Output::Plain => Ok(token.access_token.into()),
                Output::Json | Output::None => {
                    let value = serde_json::to_value(&token).map_err(internal)?;
                    Ok(CommandOutput::Object(value))
                }
            },
            Err(detail) => Err(detail.into()),
        }
    }
}

pub(crate) fn run_totp(output: Output) -> CommandResult {
    let config = Config::from_env()?;
    let code = totp::generate(config.credentials.totp_secret().expose())
        .map_err(UpstoxError::from)?;
    match output {
        Output::Plain => Ok(code.into()),
        Output::Json | Output::None => Ok(CommandOutput::Object(json!({
            "totp": code,
            "period_seconds": 30,
        }))),
    }
}

/// Loads and validates the configuration, reporting only non-secret fields.
pub(crate) fn run_check_config(output: Output) -> CommandResult {
    let config = Config::from_env()?;
    let summary = json!({
        "username": config.credentials.username(),
        "client_id": config.credentials.client_id(),
        "redirect_uri": config.credentials.redirect_uri().as_str(),
        "sleep_time_ms": config.settings.sleep_time_ms,
        "max_retries": config.settings.max_retries,
        "service_url": config.settings.service_url,
        "api_url": config.settings.api_url,
    });
    match output {
        Output::Plain => Ok(format!(
            "configuration OK\n  username: {}\n  client_id: {}\n  redirect_uri: {}\n  \
             sleep_time_ms: {}\n  max_retries: {}",
            config.credentials.username(),
            config.credentials.client_id(),
            config.credentials.redirect_uri(),
            config.settings.sleep_time_ms,
            config.settings.max_retries,
        )
        .into()),
        Output::Json | Output::None => Ok(CommandOutput::Object(summary)),
    }
}

fn internal(e: serde_json::Error) -> CliError {
    CliError {
        kind: ErrorKind::Unclassified,
        message: e.to_string(),
        hint: None,
    }
}
