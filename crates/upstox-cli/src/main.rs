#![doc = include_str!("../README.md")]

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{
    EnvFilter, prelude::__tracing_subscriber_SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::{
    command::{Cli, Commands, GenerateTokenArgs},
    render::{CommandResult, Output, RenderConfig},
};

mod command;
mod render;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // the log level hierarchy is determined by:
    //    - if RUST_LOG is detected at runtime
    //    - if RUST_LOG is provided at compile time
    //    - default to WARN, so the token stays the only stdout line
    let filter = EnvFilter::builder()
        .with_default_directive(
            option_env!("RUST_LOG")
                .unwrap_or("warn")
                .parse()
                .expect("should provide valid log level at compile time."),
        )
        // parse directives from the RUST_LOG environment variable,
        // overriding the default directive for matching targets.
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let render_config = RenderConfig {
        output: cli.output,
        quiet: cli.quiet,
    };

    // Running with no subcommand generates a token, which keeps the common
    // cron invocation down to the bare binary name.
    let command = cli
        .command
        .unwrap_or_else(|| Commands::GenerateToken(GenerateTokenArgs::default()));

    let result = process_command(command, cli.output).await;
    ExitCode::from(render_config.render_result(result))
}

async fn process_command(command: Commands, output: Output) -> CommandResult {
    match command {
        Commands::GenerateToken(args) => args.run(output).await,
        Commands::Totp => command::run_totp(output),
        Commands::CheckConfig => command::run_check_config(output),
    }
}
