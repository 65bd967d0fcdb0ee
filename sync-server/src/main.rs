use sync_server::{AppState, Config, Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    setup_environment()?;

    print_banner();
    tracing::info!("Reef sync server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. State (registry, hub, sync service, watcher hook)
    let state = AppState::initialize(config.clone()).await?;

    // 4. HTTP server (spawns background tasks)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {e}");
        return Err(e.into());
    }

    Ok(())
}
