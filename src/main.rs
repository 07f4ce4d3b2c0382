mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use dockhand::gateway::{
    CommandRegistrar, DiscordRest, GatewayEvent, GatewaySession, RegisteredCommand, schema,
};
use dockhand::monitoring::TracingConfig;
use dockhand::runtime::{ContainerRuntime, DockerRuntime};
use dockhand::{BotConfig, Dockhand, FilterCriteria};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new(cli.verbose, cli.json_logs).init_tracing()?;

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(BotConfig::default_path);
    let mut config = match &cli.config {
        Some(_) => BotConfig::load(&config_path)?,
        None => BotConfig::load_or_default(&config_path)?,
    };
    config.apply(cli.overrides());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Ps { with, limit } => ps(&config, with.as_deref(), limit).await,
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema::game_server_command())?);
            Ok(())
        }
    }
}

async fn run(config: BotConfig) -> Result<()> {
    config.validate()?;
    info!("🚀 Dockhand starting up...");

    let runtime = Arc::new(
        DockerRuntime::connect()
            .await
            .context("Unable to reach the container runtime")?,
    );
    let rest = Arc::new(DiscordRest::new(config.token.clone())?);
    let application_id = rest.application_id().await?;

    let base_filter = config.base_filter();
    info!("🔎 Base filter: {}", base_filter);
    match runtime.list(0, &base_filter).await {
        Ok(servers) => {
            let names: Vec<_> = servers.iter().filter_map(|s| s.display_name()).collect();
            info!("🎮 Servers currently matching: {:?}", names);
        }
        Err(e) => warn!("Could not list servers at startup: {}", e),
    }

    if let Some(auto_stop) = &config.auto_stop {
        warn!(
            "Auto-stop after {}h idle is configured but not enforced",
            auto_stop.idle_hours
        );
    }

    info!("📝 Registering commands in guild {}", config.guild_id);
    let registered = rest
        .register(&application_id, &config.guild_id, &schema::game_server_command())
        .await
        .context("Cannot register slash commands")?;

    let runtime_handle: Arc<dyn ContainerRuntime> = runtime.clone();
    let bot = Dockhand::from_config(&config, runtime_handle, rest.clone());
    let (session, mut events) = GatewaySession::connect(config.token.clone());

    info!("Press Ctrl+C to exit");
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
            event = events.recv() => match event {
                Some(GatewayEvent::Ready { username, .. }) => {
                    info!("✅ Logged in as {}", username);
                }
                Some(GatewayEvent::Interaction(envelope)) => {
                    bot.router().handle_envelope(envelope).await;
                }
                None => {
                    warn!("Gateway event stream ended");
                    break;
                }
            }
        }
    }

    info!("🛑 Shutting down...");
    let deliveries = bot.router().drain(config.shutdown_grace()).await;
    info!("Delivered {} pending result(s)", deliveries.len());

    session.close().await;
    drop(bot);
    match Arc::try_unwrap(runtime) {
        Ok(runtime) => runtime.close(),
        Err(_) => warn!("Container runtime still in use at shutdown"),
    }

    if config.remove_commands {
        remove_commands(rest.as_ref(), &application_id, &config.guild_id, &registered).await;
    }

    info!("Gracefully shut down.");
    Ok(())
}

async fn remove_commands(
    registrar: &dyn CommandRegistrar,
    application_id: &str,
    guild_id: &str,
    command: &RegisteredCommand,
) {
    info!("🧹 Removing command '{}'", command.name);
    if let Err(e) = registrar.deregister(application_id, guild_id, &command.id).await {
        error!("Cannot delete '{}' command: {}", command.name, e);
    }
}

async fn ps(config: &BotConfig, with: Option<&str>, limit: i64) -> Result<()> {
    let runtime = DockerRuntime::connect()
        .await
        .context("Unable to reach the container runtime")?;

    let extra = with.map(FilterCriteria::parse).unwrap_or_default();
    let criteria = config.base_filter().merged_with(&extra);
    let containers = runtime.list(limit, &criteria).await?;

    if containers.is_empty() {
        info!("No containers match {}", criteria);
        return Ok(());
    }

    println!("{:<14} {:<25} {:<12} {:<30}", "CONTAINER ID", "NAME", "STATE", "STATUS");
    println!("{}", "─".repeat(84));
    for container in &containers {
        let short_id = container.id.chars().take(12).collect::<String>();
        println!(
            "{:<14} {:<25} {:<12} {:<30}",
            short_id,
            container.display_name().unwrap_or("-"),
            container.state.as_deref().unwrap_or("-"),
            container.status
        );
    }

    println!();
    info!("Found {} containers (filter: {})", containers.len(), criteria);
    runtime.close();
    Ok(())
}
