use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use cro_analyzer::{
    config::Config,
    api::routes::create_router,
    llm::OpenAiClient,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing credentials abort startup here
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_max_level(if config.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let server_addr = config.server_addr;
    info!(
        model = %config.model,
        schema = %config.schema,
        debug = config.debug,
        "configuration loaded"
    );

    let completion = Arc::new(OpenAiClient::new(&config)?);
    let app_state = AppState::new(config, completion)?;

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
