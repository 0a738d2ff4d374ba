use edu_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState, SupabaseRepository},
    session::{MemorySessionStore, SessionState, SignedCookieStore},
    storage::{S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Builds every service from the configuration, wires them into `AppState`
/// and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "edu_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Table backend
    let repo: RepositoryState = match config.env {
        Env::Local => {
            let db_url = config
                .db_url
                .as_deref()
                .expect("FATAL: DATABASE_URL required in local");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            // The hosted database owns its schema; only the Docker one is migrated here.
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run local migrations.");

            Arc::new(PostgresRepository::new(pool))
        }
        Env::Production => {
            let url = config.supabase_url.as_deref().expect("FATAL: SUPABASE_URL missing");
            let key = config.supabase_key.as_deref().expect("FATAL: SUPABASE_KEY missing");
            tracing::info!("Using Supabase REST tables at {}", url);
            Arc::new(SupabaseRepository::new(url, key))
        }
    };

    // 4. Storage (S3/MinIO/Supabase Storage)
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // LOCAL-ONLY: create the MinIO bucket on first start.
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }
    tracing::info!("Storage bucket: {}", s3_client.bucket_name());

    let storage = Arc::new(s3_client) as StorageState;

    // 5. Session store
    let sessions: SessionState = match config.env {
        Env::Local => Arc::new(MemorySessionStore::new(config.session_ttl)),
        Env::Production => Arc::new(SignedCookieStore::new(
            &config.session_secret,
            config.session_ttl,
        )),
    };

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        repo,
        storage,
        sessions,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {}: {}", addr, e));

    tracing::info!("Listening on {}", addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
