mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let is_serve = matches!(cli.command, Command::Serve);
    let default_level = if is_serve { "info" } else { "warn" };

    // Logs go to stderr: stdout carries CLI output and the MCP protocol.
    // CLI mode shows warnings (embedding fallbacks, out-of-range scores) by default;
    // serve mode adds lifecycle events, and RUST_LOG=debug adds per-request lines.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.eval_config()?;

    match cli.command {
        Command::Evaluate {
            test_cases,
            case,
            k,
        } => commands::cmd_evaluate(&config, &test_cases, case, k, cli.json),
        Command::Report {
            test_cases,
            corpus,
            output_dir,
            version,
            k,
        } => commands::cmd_report(
            &config,
            &test_cases,
            &corpus,
            output_dir,
            version,
            k,
            cli.json,
        ),
        Command::Judge {
            scores,
            threshold,
            min_score,
            report,
            plots,
        } => commands::cmd_judge(
            &config,
            &scores,
            threshold,
            min_score,
            report.as_deref(),
            plots.as_deref(),
            cli.json,
        ),
        Command::Metrics => commands::cmd_metrics(cli.json),
        Command::Setup => commands::cmd_setup(cli.json),
        Command::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(rageval::mcp::run_server(config))
        }
    }
}
