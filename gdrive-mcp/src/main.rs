use anyhow::Result;
use clap::Parser;
use gdrive_mcp::auth::{ClientSecret, CredentialProvider, TokenStore};
use gdrive_mcp::drive::DriveClient;
use gdrive_mcp::server::DriveToolServer;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gdrive-mcp", about = "Google Drive MCP tool server")]
struct Cli {
    /// Path to the OAuth client secret JSON (installed-app registration).
    #[arg(long, env = "GDRIVE_CLIENT_SECRET", default_value = "client_secret.json")]
    client_secret: PathBuf,

    /// Path to the single-slot token store.
    #[arg(long, env = "GDRIVE_TOKEN_STORE", default_value = "token.json")]
    token_store: PathBuf,

    /// Address to serve the SSE transport on.
    #[arg(long, env = "GDRIVE_MCP_BIND", default_value = "0.0.0.0:3002")]
    bind: SocketAddr,
}

fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    let secret = ClientSecret::load(&cli.client_secret)?;
    let provider = CredentialProvider::new(secret, TokenStore::new(cli.token_store.clone()));
    let credential = provider.credential().await?;

    let drive = DriveClient::new(credential.access_token);
    let ct = SseServer::serve(cli.bind)
        .await?
        .with_service(move || DriveToolServer::new(drive.clone()));

    tracing::info!(addr = %cli.bind, "Drive MCP server ready");
    tokio::signal::ctrl_c().await?;
    ct.cancel();
    Ok(())
}
