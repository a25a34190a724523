mod dispatch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ragchat_core::bootstrap::AppBuilder;
use ragchat_gateway::GatewayServer;
use ragchat_memory::SessionKey;
use tokio::sync::mpsc;

const CHAT_QUEUE: usize = 64;

/// HTTP chat endpoint backed by a retrieval-augmented agent.
#[derive(Debug, Parser)]
#[command(name = "ragchat", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_subscriber();
    let cli = Cli::parse();

    let builder = AppBuilder::from_env(cli.config).await?;
    let config = builder.config();
    tracing::info!(
        config = %builder.config_path().display(),
        provider = config.llm.provider.as_str(),
        knowledge = %config.knowledge.path,
        "starting ragchat"
    );

    let provider = builder.build_provider()?;
    let agent = Arc::new(builder.build_agent(provider).await?);

    let (shutdown_tx, shutdown_rx) = AppBuilder::build_shutdown();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let (chat_tx, chat_rx) = mpsc::channel(CHAT_QUEUE);
    let defaults = SessionKey::new(config.agent.session_id.clone(), config.agent.user_id.clone());
    tokio::spawn(dispatch::run(agent, defaults, chat_rx));

    let gateway = &config.gateway;
    GatewayServer::new(&gateway.bind, gateway.port, chat_tx, shutdown_rx)
        .with_cors_origins(gateway.cors_origins.clone())
        .with_max_body_size(gateway.max_body_size)
        .with_include_sources(gateway.include_sources)
        .serve()
        .await
        .context("gateway stopped with an error")?;

    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
