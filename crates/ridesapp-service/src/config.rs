//! Service configuration.

/// Default JWT lifetime in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;

/// Default Postgres pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Postgres connection string. Without one the service keeps its data
    /// in memory.
    pub database_url: Option<String>,

    /// Maximum Postgres pool connections.
    pub db_max_connections: u32,

    /// HMAC secret for signing session tokens.
    pub jwt_secret: String,

    /// Session token lifetime in hours.
    pub jwt_expiration_hours: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS")
                .unwrap_or(defaults.db_max_connections),
            jwt_secret,
            jwt_expiration_hours: env_parse("JWT_EXPIRATION_HOURS")
                .unwrap_or(defaults.jwt_expiration_hours),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            jwt_secret: "ridesapp-dev-secret".into(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
        }
    }
}
