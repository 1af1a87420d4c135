//! Maestro CLI entry point: register configured agents, warm up, then
//! answer queries from stdin.

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use maestro::agent::AgentReference;
use maestro::config::Settings;
use maestro::orchestrator::Orchestrator;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "maestro", about = "Agent-tool orchestration engine")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Print answers as complete strings instead of streaming.
    #[arg(long)]
    no_stream: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("maestro={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = Settings::load_from(cli.config.as_ref())?;
    std::fs::create_dir_all(settings.data_dir())?;

    let references: Vec<AgentReference> = settings
        .agents
        .iter()
        .map(|entry| AgentReference::new(entry.name.clone(), entry.manifest_url.clone()))
        .collect();

    let orchestrator = Orchestrator::new(settings)?;

    if !references.is_empty() {
        orchestrator.register(references).await?;
        let report = orchestrator.warm_up().await?;
        eprintln!(
            "Warm-up: {} ingested, {} skipped, {} failed",
            report.ingested,
            report.skipped,
            report.failed.len()
        );
        for (agent, error) in &report.failed {
            eprintln!("  {}: {}", agent, error);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" {
            break;
        }

        if cli.no_stream {
            match orchestrator.invoke_query(query).await {
                Ok(answer) => println!("{}", answer),
                Err(e) => eprintln!("error: {}", e),
            }
        } else {
            match orchestrator.invoke_query_stream(query).await {
                Ok(mut stream) => {
                    while let Some(fragment) = stream.next().await {
                        match fragment {
                            Ok(text) => {
                                print!("{}", text);
                                std::io::stdout().flush()?;
                            }
                            Err(e) => {
                                eprintln!("\nstream error: {}", e);
                                break;
                            }
                        }
                    }
                    println!();
                }
                Err(e) => eprintln!("error: {}", e),
            }
        }
    }

    Ok(())
}
