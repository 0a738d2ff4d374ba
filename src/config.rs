use std::{env, time::Duration};

const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const LOCAL_SESSION_SECRET: &str = "local-session-secret-change-me";

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup and
/// shared read-only through `AppState`.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Selects the table backend, storage endpoint and session store.
    pub env: Env,
    // Port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    // Postgres connection string (local backend only).
    pub db_url: Option<String>,
    // Supabase project URL and API key (production table backend).
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    // S3-compatible storage endpoint URL (MinIO in local, Supabase in prod).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    // The single bucket receiving every resource file.
    pub s3_bucket: String,
    // Key signing the session cookies in production.
    pub session_secret: String,
    pub session_ttl: Duration,
    // Request body cap on the upload route.
    pub max_upload_bytes: usize,
}

/// Env
///
/// `Local` runs against Docker Postgres + MinIO with in-memory sessions.
/// `Production` runs against Supabase (REST tables, S3 storage gateway) with
/// signed-cookie sessions.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration used to scaffold test state without touching
    /// the process environment.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 5000,
            db_url: None,
            supabase_url: None,
            supabase_key: None,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "resources-test".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {} has an invalid value: '{}'", name, raw)),
        Err(_) => default,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics if a variable required by the selected environment is missing, or
    /// if a numeric variable does not parse. The server never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let port = parsed_var("PORT", 5000u16);
        let session_ttl = Duration::from_secs(parsed_var("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS));
        let max_upload_bytes = parsed_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);

        match env {
            Env::Local => Self {
                env: Env::Local,
                port,
                // The Docker database must still be reachable in local mode.
                db_url: Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in local")),
                supabase_url: None,
                supabase_key: None,
                s3_endpoint: "http://localhost:9000".to_string(),
                s3_region: "us-east-1".to_string(),
                s3_key: "admin".to_string(),
                s3_secret: "password".to_string(),
                s3_bucket: env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "resources".to_string()),
                session_secret: env::var("SESSION_SECRET")
                    .unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                session_ttl,
                max_upload_bytes,
            },
            Env::Production => {
                let project_url =
                    env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod");
                let s3_endpoint = format!("{}/storage/v1/s3", project_url.trim_end_matches('/'));

                Self {
                    env: Env::Production,
                    port,
                    db_url: None,
                    supabase_key: Some(
                        env::var("SUPABASE_KEY").expect("FATAL: SUPABASE_KEY required in prod"),
                    ),
                    supabase_url: Some(project_url),
                    s3_endpoint,
                    // The region is a stub when proxying through Supabase.
                    s3_region: "stub".to_string(),
                    s3_key: env::var("S3_ACCESS_KEY")
                        .expect("FATAL: S3_ACCESS_KEY required in prod"),
                    s3_secret: env::var("S3_SECRET_KEY")
                        .expect("FATAL: S3_SECRET_KEY required in prod"),
                    s3_bucket: env::var("S3_BUCKET_NAME")
                        .unwrap_or_else(|_| "resources".to_string()),
                    session_secret: env::var("SESSION_SECRET")
                        .expect("FATAL: SESSION_SECRET required in prod"),
                    session_ttl,
                    max_upload_bytes,
                }
            }
        }
    }
}
