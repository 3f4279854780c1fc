use std::sync::Arc;

use server::clients::{LichessClient, YoutubeChat};
use server::config;
use server::routes;

use crowd_engine::{event_channel, ChatSource, Session, SilentChat, StockfishAnalyzer, TurnEngine};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(
        side = ?config.crowd.session.human_side,
        level = config.crowd.session.difficulty.value(),
        deadline = config.crowd.session.turn_deadline_secs,
        fallback = ?config.crowd.fallback,
        "Configuration loaded"
    );

    let (sink, inbox) = event_channel();

    let authority = Arc::new(LichessClient::new(&config.lichess_base_url, &config.lichess_token)?);

    tracing::info!("Starting Stockfish...");
    let analysis = StockfishAnalyzer::spawn(&config.crowd.stockfish, sink.clone()).await?;

    let chat: Box<dyn ChatSource> = match &config.youtube {
        Some(youtube) => Box::new(YoutubeChat::new(youtube, sink.clone())?),
        None => {
            tracing::warn!("YouTube not configured - votes disabled, every turn falls back to analysis");
            Box::new(SilentChat)
        }
    };

    let engine = TurnEngine::from_config(&config.crowd);
    let session = Session::new(engine, (sink, inbox), authority, Box::new(analysis), chat);

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(session.subscribe()).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting status server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {e}");
        }
    });

    let engine = session
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    tracing::info!(
        matches = engine.lifecycle().matches_played(),
        participants = engine.ledger().len(),
        "Session stopped"
    );
    server.abort();
    Ok(())
}
