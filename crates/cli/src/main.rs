mod config;
mod error;
mod logging;
mod output;

use std::sync::Arc;
use std::time::Duration;

use agents::{SimpleMediaAgent, WebhookConfig, WebhookEvent, WebhookServer};
use allocation::AllocationConfig;
use clap::{Parser, Subcommand, ValueEnum};
use client::{AgentType, Environment, Session};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use config::{Config, Overrides};
use error::{Error, Result};
use logging::{LogFormat, LoggingConfig};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "scope3")]
#[command(about = "Command-line client for the Scope3 Agentic API", long_about = None)]
#[command(version)]
struct Cli {
    /// API key (overrides SCOPE3_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL (overrides SCOPE3_BASE_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Deployment to use when no base URL is set
    #[arg(long, global = true, value_parser = parse_environment)]
    environment: Option<Environment>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Capture and print a sanitized record of each call
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the CLI configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List the tools the API exposes
    Tools,
    /// Call any tool by name
    Call {
        tool: String,
        /// Arguments as a JSON object
        #[arg(long)]
        json: Option<String>,
        /// Single argument as key=value; values that parse as JSON are used as such
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
    /// Registered agents
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },
    /// Media products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Run an example agent or the webhook listener
    Serve {
        #[command(subcommand)]
        server: ServeCommand,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value (api_key, base_url, environment)
    Set { key: String, value: String },
    /// Show one value, or the whole file
    Get { key: Option<String> },
    /// Delete the configuration file
    Clear,
}

#[derive(Subcommand)]
enum AgentsAction {
    List {
        #[arg(long = "type", value_enum)]
        agent_type: Option<AgentKind>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AgentKind {
    Sales,
    Outcome,
}

impl From<AgentKind> for AgentType {
    fn from(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Sales => AgentType::Sales,
            AgentKind::Outcome => AgentType::Outcome,
        }
    }
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Ask one sales agent for its products
    Discover { sales_agent_id: String },
}

#[derive(Subcommand)]
enum ServeCommand {
    /// Passthrough media agent
    MediaAgent {
        #[arg(long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "100")]
        min_daily_budget: f64,
        #[arg(long, default_value = "40")]
        overallocation_percent: f64,
    },
    /// Outcome agent answering proposal requests
    OutcomeAgent {
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Webhook listener that logs every event
    Webhook {
        #[arg(long, default_value_t = agents::webhook::DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = agents::webhook::DEFAULT_PATH)]
        path: String,
        /// Require `Authorization: Bearer <secret>`
        #[arg(long)]
        secret: Option<String>,
    },
}

fn parse_environment(s: &str) -> std::result::Result<Environment, String> {
    s.parse().map_err(|e: client::Error| e.to_string())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LoggingConfig {
        format: cli.log_format,
        verbose: cli.verbose || matches!(cli.command, Commands::Serve { .. }),
        debug: cli.debug,
        quiet: cli.quiet,
    });

    let config_path = Config::default_path()?;
    let overrides = Overrides {
        api_key: cli.api_key.clone(),
        base_url: cli.base_url.clone(),
        environment: cli.environment,
        timeout: cli.timeout.map(Duration::from_secs),
        debug: cli.debug,
    };

    match cli.command {
        Commands::Config { action } => cmd_config(&config_path, action),
        Commands::Serve { server } => cmd_serve(server, &config_path, &overrides).await,
        command => {
            let file = Config::load(&config_path)?.with_env(|name| std::env::var(name).ok());
            let session = Session::new(&file.resolve(&overrides)?)?;

            let outcome = run_remote(&session, command, cli.format).await;
            if let Err(e) = session.disconnect().await {
                warn!(error = %e, "disconnect failed");
            }
            outcome
        }
    }
}

async fn run_remote(session: &Session, command: Commands, format: OutputFormat) -> Result<()> {
    let result: Value = match command {
        Commands::Tools => {
            let tools = session.list_tools().await?;
            Value::Array(
                tools
                    .into_iter()
                    .map(|t| json!({ "name": t.name, "description": t.description }))
                    .collect(),
            )
        }
        Commands::Call { tool, json, args } => {
            let arguments = build_arguments(json.as_deref(), &args)?;
            session.call_tool(&tool, arguments).await?
        }
        Commands::Agents {
            action: AgentsAction::List { agent_type },
        } => {
            let mut args = Map::new();
            if let Some(kind) = agent_type {
                args.insert("type".into(), serde_json::to_value(AgentType::from(kind))?);
            }
            session.agents().list(args).await?
        }
        Commands::Products {
            action: ProductsAction::Discover { sales_agent_id },
        } => {
            session
                .products()
                .discover(json!({ "salesAgentId": sales_agent_id }))
                .await?
        }
        Commands::Config { .. } | Commands::Serve { .. } => return Ok(()),
    };

    println!("{}", output::render(&result, format));

    if let Some(record) = session.last_debug_record().await {
        eprintln!("Debug: {}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn cmd_config(path: &std::path::Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(path)?;
            config.set(&key, &value)?;
            config.save(path)?;
            println!("Configuration saved to {}", path.display());
        }
        ConfigAction::Get { key: Some(key) } => match Config::load(path)?.get(&key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Get { key: None } => {
            let config = Config::load(path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Clear => {
            if path.exists() {
                std::fs::remove_file(path)?;
                println!("Configuration cleared");
            } else {
                println!("No configuration file found");
            }
        }
    }
    Ok(())
}

async fn cmd_serve(
    server: ServeCommand,
    config_path: &std::path::Path,
    overrides: &Overrides,
) -> Result<()> {
    match server {
        ServeCommand::MediaAgent {
            port,
            min_daily_budget,
            overallocation_percent,
        } => {
            let file = Config::load(config_path)?.with_env(|name| std::env::var(name).ok());
            let session = Arc::new(Session::new(&file.resolve(overrides)?)?);
            let allocation = AllocationConfig {
                min_daily_budget,
                overallocation_percent,
                ..AllocationConfig::default()
            };
            info!(
                endpoint = session.endpoint(),
                min_daily_budget, overallocation_percent, "starting media agent"
            );
            let agent = Arc::new(SimpleMediaAgent::new(session, allocation)?);
            agents::serve(agents::media_agent_router(agent), port).await?;
        }
        ServeCommand::OutcomeAgent { port } => {
            info!("starting outcome agent");
            agents::serve(agents::outcome_agent_router(), port).await?;
        }
        ServeCommand::Webhook { port, path, secret } => {
            let server = Arc::new(WebhookServer::new(WebhookConfig { port, path, secret }));
            server.on(agents::webhook::WILDCARD, |event: WebhookEvent| async move {
                info!(event_type = %event.event_type, timestamp = ?event.timestamp, "webhook received");
                println!("{}", serde_json::to_string(&event).unwrap_or_default());
                Ok::<_, agents::Error>(())
            });
            server.serve().await?;
        }
    }
    Ok(())
}

/// Merge `--json` with `-a key=value` pairs; pairs win on conflict.
fn build_arguments(json: Option<&str>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut arguments = match json {
        None => Map::new(),
        Some(raw) => match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(Error::InvalidArgument(
                    "--json must be a JSON object".to_string(),
                ));
            }
            Err(e) => return Err(Error::InvalidArgument(format!("invalid JSON: {e}"))),
        },
    };

    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::InvalidArgument(format!("expected KEY=VALUE, got '{pair}'")))?;
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        arguments.insert(key.to_string(), value);
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_merge_json_and_pairs() {
        let args = build_arguments(
            Some(r#"{"campaignId": "c1", "limit": 5}"#),
            &["limit=10".into(), "name=Spring Sale".into(), "active=true".into()],
        )
        .unwrap();

        assert_eq!(args["campaignId"], "c1");
        assert_eq!(args["limit"], 10);
        assert_eq!(args["name"], "Spring Sale");
        assert_eq!(args["active"], true);
    }

    #[test]
    fn arguments_reject_bad_input() {
        assert!(build_arguments(Some("[1, 2]"), &[]).is_err());
        assert!(build_arguments(Some("{oops"), &[]).is_err());
        assert!(build_arguments(None, &["novalue".into()]).is_err());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scope3",
            "call",
            "campaign_get",
            "-a",
            "campaignId=1",
            "--format",
            "json",
            "--environment",
            "staging",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.environment, Some(Environment::Staging));
        match cli.command {
            Commands::Call { tool, args, .. } => {
                assert_eq!(tool, "campaign_get");
                assert_eq!(args, ["campaignId=1"]);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["scope3", "serve", "webhook"]).unwrap();
        match cli.command {
            Commands::Serve {
                server: ServeCommand::Webhook { port, path, secret },
            } => {
                assert_eq!(port, 3000);
                assert_eq!(path, "/webhooks");
                assert!(secret.is_none());
            }
            _ => panic!("expected serve webhook"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
