use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use swarmgate::api::{serve, AppState};
use swarmgate::client::SwarmClient;
use swarmgate::dispatch::invoker::ProcessInvoker;
use swarmgate::dispatch::Dispatcher;
use swarmgate::registry::AgentRegistry;
use swarmgate::types::DispatchRequest;
use swarmgate::Config;

#[derive(Parser)]
#[command(name = "swarmgate")]
#[command(about = "Agent swarm dispatch service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dispatch endpoint
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        agents_dir: Option<PathBuf>,
    },
    /// Dispatch a payload to agents locally, without the HTTP layer
    Run {
        #[arg(help = "Payload passed to every agent")]
        payload: String,
        #[arg(short, long = "agent", required = true)]
        agents: Vec<String>,
        #[arg(long)]
        agents_dir: Option<PathBuf>,
    },
    /// Post one dispatch request per repository to a running endpoint
    Sweep {
        #[arg(help = "Repositories to dispatch over", required = true)]
        repos: Vec<String>,
        #[arg(short, long = "agent", required = true)]
        agents: Vec<String>,
        #[arg(long, default_value = "http://localhost:8000")]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, agents_dir } => serve_command(port, agents_dir).await?,
        Commands::Run {
            payload,
            agents,
            agents_dir,
        } => run_command(&payload, agents, agents_dir).await?,
        Commands::Sweep {
            repos,
            agents,
            endpoint,
        } => sweep_command(repos, agents, &endpoint).await?,
    }

    Ok(())
}

fn load_config(port: Option<u16>, agents_dir: Option<PathBuf>) -> Config {
    let mut config = Config::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = agents_dir {
        config.agents_dir = dir;
    }
    config
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let registry = AgentRegistry::discover(&config.agents_dir, &config.agent_suffix)?;
    let invoker = Arc::new(ProcessInvoker::new(
        config.timeout_secs,
        config.max_output_bytes,
    ));
    Ok(Dispatcher::new(registry, invoker))
}

async fn serve_command(port: Option<u16>, agents_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(port, agents_dir);
    let dispatcher = build_dispatcher(&config)?;

    println!(
        "Registered {} agent(s) from {}",
        dispatcher.registry().len(),
        config.agents_dir.display()
    );

    let port = config.port;
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        config,
    };

    serve(state, port).await
}

async fn run_command(
    payload: &str,
    agents: Vec<String>,
    agents_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(None, agents_dir);
    let dispatcher = build_dispatcher(&config)?;

    let request = DispatchRequest::new(agents, payload.to_string());
    let outcome = dispatcher.dispatch(&request).await;

    println!("Dispatch {} ({}ms)", outcome.id, outcome.duration_ms);
    for report in &outcome.reports {
        println!("--- {} (code {})", report.agent, report.record.code);
        if !report.record.output.is_empty() {
            print!("{}", report.record.output);
        }
        if !report.record.error.is_empty() {
            eprint!("{}", report.record.error);
        }
    }
    println!(
        "{} agent(s), {} failure(s)",
        outcome.reports.len(),
        outcome.failure_count()
    );

    Ok(())
}

async fn sweep_command(repos: Vec<String>, agents: Vec<String>, endpoint: &str) -> Result<()> {
    let client = SwarmClient::new(endpoint);
    let version = client.health().await?;
    println!("Sweeping {} repo(s) via swarmgate {}", repos.len(), version);

    for repo in &repos {
        let request = DispatchRequest::new(agents.clone(), format!("repo:{}", repo));
        let results = client.dispatch(&request).await?;

        let records = results.records()?;
        let failures = records.iter().filter(|(_, r)| !r.is_success()).count();
        println!(
            "{}: {} agent(s), {} failure(s)",
            repo,
            records.len(),
            failures
        );
        for (agent, record) in &records {
            if !record.is_success() {
                println!("  {} failed (code {}): {}", agent, record.code, record.error.trim());
            }
        }
    }

    Ok(())
}
