//! Metaforge - build AI agents by conversation
//!
//! Terminal client that walks the user from a plain-language request to a
//! generated agent source file.

use clap::{Args, Parser, Subcommand};
use metaforge::models::HealthStatus;
use metaforge::pipeline::artifact;
use metaforge::{AgentOsClient, AgentPlan, Config, Context, GenerateOptions, GenerateRequest};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Metaforge - build AI agents by conversation
#[derive(Parser)]
#[command(
    name = "metaforge",
    author,
    version,
    about = "Build AI agents by describing them in a conversation",
    long_about = r#"
Metaforge talks to an agent-orchestration backend: an analyzer agent asks
clarifying questions, a planner turns the answers into a plan and the
backend compiles the plan into agent source code.

Examples:
  metaforge                          Start interactive TUI
  metaforge cli --simple             Start line-based console
  metaforge generate --name news --role "Searches tech news"
  metaforge agents                   List backend agents
  metaforge generated                List generated agents on disk
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (defaults to $AGENTOS_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Simulated latency of the local engine, in milliseconds
    #[arg(long, global = true)]
    latency_ms: Option<u64>,

    /// Directory that generated/agents/ is written under
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console (default)
    #[command(alias = "console", alias = "repl")]
    Cli(CliArgs),

    /// Generate an agent directly from a name and role
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// List the agents exposed by the backend
    Agents,

    /// List generated agents on disk
    Generated,

    /// Display version and build information
    Info,
}

#[derive(Args)]
struct CliArgs {
    /// Use simple line-based interface instead of TUI
    #[arg(short, long)]
    simple: bool,

    /// Do not write the generated agent to disk
    #[arg(long)]
    no_save: bool,
}

#[derive(Args)]
struct GenerateArgs {
    /// Agent name (snake_case)
    #[arg(short, long)]
    name: String,

    /// What the agent does
    #[arg(short, long)]
    role: String,

    /// Model the agent runs on
    #[arg(short, long, default_value = metaforge::models::DEFAULT_MODEL)]
    model: String,

    /// Print the code instead of writing it to disk
    #[arg(long)]
    no_save: bool,
}

fn options(no_save: bool) -> GenerateOptions {
    GenerateOptions {
        save_to_file: !no_save,
        ..GenerateOptions::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only when RUST_LOG is set, so the TUI stays clean)
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.url {
        config.agentos_url = url;
    }
    if let Some(ms) = cli.latency_ms {
        config.latency = Duration::from_millis(ms);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let client: Arc<dyn AgentOsClient> = Arc::new(config.local_engine());
    let ctx = Context::background();

    // An unreachable backend is reported, never fatal.
    let probe = client.health(&ctx).await;
    if let Err(e) = &probe {
        tracing::warn!(url = %config.agentos_url, error = %e, "backend health check failed");
        eprintln!("Warning: backend at {} is not available: {}", config.agentos_url, e);
    }
    let health = HealthStatus::probe(&probe);

    match cli.command {
        // Default: start TUI console
        None => {
            #[cfg(feature = "tui")]
            {
                metaforge::cli::tui::run(config.workflow(client), config.agentos_url, options(false)).await?;
            }
            #[cfg(not(feature = "tui"))]
            {
                metaforge::cli::console::run(config.workflow(client), options(false)).await?;
            }
        }

        Some(Commands::Cli(args)) => {
            let workflow = config.workflow(client);
            if args.simple {
                metaforge::cli::console::run(workflow, options(args.no_save)).await?;
            } else {
                #[cfg(feature = "tui")]
                {
                    metaforge::cli::tui::run(workflow, config.agentos_url, options(args.no_save)).await?;
                }
                #[cfg(not(feature = "tui"))]
                {
                    metaforge::cli::console::run(workflow, options(args.no_save)).await?;
                }
            }
        }

        Some(Commands::Generate(args)) => {
            let plan = AgentPlan::new(args.name, args.role).with_model(args.model);
            let request = GenerateRequest {
                plan,
                options: options(args.no_save),
            };
            let save = request.options.save_to_file;
            let response = client.generate_agent(&ctx, request).await?;
            if save {
                let path = artifact::save(&config.output_dir, &response)?;
                println!("Generated {} ({} bytes, ~{} lines)", path.display(), response.size_bytes, response.lines);
            } else {
                println!("{}", response.code);
            }
        }

        Some(Commands::Agents) => {
            let os = client.get_config(&ctx).await?;
            println!("{} - {}", os.os_id, os.description);
            for agent in &os.agents {
                println!("  - {} [{}] {}", agent.id, agent.model, agent.name);
                println!("      {}", agent.description);
            }
        }

        Some(Commands::Generated) => {
            let agents = artifact::list(&config.output_dir)?;
            if agents.is_empty() {
                println!("No generated agents found.");
            } else {
                println!("Generated agents:");
                for agent in agents {
                    println!(
                        "  - {} ({} lines, {} bytes, {})",
                        agent.filename,
                        agent.lines,
                        agent.size_bytes,
                        agent.modified_at.format("%Y-%m-%d %H:%M")
                    );
                    println!("      {}", agent.role);
                }
            }
        }

        Some(Commands::Info) => {
            println!("Metaforge - agent builder client");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Features:");
            #[cfg(feature = "tui")]
            println!("  - TUI console (ratatui)");
            #[cfg(not(feature = "tui"))]
            println!("  - TUI console: disabled");
            println!();
            println!("Backend:          {} ({})", config.agentos_url, health.status);
            println!("Engine:           local (latency {} ms)", config.latency.as_millis());
            println!("Output directory: {}", config.output_dir.display());
        }
    }

    Ok(())
}
