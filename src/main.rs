use std::sync::Arc;

use tipcast::config::Config;
use tipcast::dispatch::{
    DispatchConfig, NotificationDispatcher, ServiceAccountKey, ServiceAccountTokenSource,
    TokenSource,
};
use tipcast::http::{app_router, AppState};
use tipcast::store::{LibSqlBackend, Store};
use tipcast::tips::model::NewTip;
use tipcast::turns::TurnHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TIPCAST_SERVICE_ACCOUNT=./service-account.json");
        std::process::exit(1);
    });

    eprintln!("📣 Tipcast v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Fulfillment: http://0.0.0.0:{}/fulfillment", config.port);
    eprintln!("   Tip events:  http://0.0.0.0:{}/events/tip-created", config.port);
    eprintln!("   Database:    {}", config.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn Store> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );

    // ── Seed tips on first run ──────────────────────────────────────────
    if let Some(ref seed_path) = config.seed_path {
        if store.count_tips().await? == 0 {
            let raw = std::fs::read_to_string(seed_path)?;
            let tips: Vec<NewTip> = serde_json::from_str(&raw)?;
            let mut seeded = 0;
            for tip in &tips {
                store.insert_tip(tip).await?;
                seeded += 1;
            }
            eprintln!("   Seeded {} tips from {}", seeded, seed_path.display());
        }
    }

    // ── Dispatcher ──────────────────────────────────────────────────────
    let key = ServiceAccountKey::from_file(&config.service_account_path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let client = reqwest::Client::new();
    let tokens: Arc<dyn TokenSource> =
        Arc::new(ServiceAccountTokenSource::new(key, client.clone()));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store),
        tokens,
        client,
        DispatchConfig {
            push_endpoint: config.push_endpoint.clone(),
            sandbox: config.sandbox,
            ..Default::default()
        },
    ));

    // ── HTTP server ─────────────────────────────────────────────────────
    let state = AppState {
        turns: Arc::new(TurnHandler::new(store)),
        dispatcher,
    };
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Tipcast listening");
    axum::serve(listener, app).await?;

    Ok(())
}
