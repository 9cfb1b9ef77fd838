//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

/// Development-only signing secret used when `JWT_SECRET` is unset
const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage backend
    pub storage: StorageBackend,

    /// Database connection URL (required for Postgres)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,

    /// Bearer token lifetime in hours
    pub token_ttl_hours: i64,

    /// Deadline applied to every request
    pub request_timeout: Duration,

    /// Offset (minutes east of UTC) that defines the business day
    pub business_utc_offset_minutes: i32,

    /// Argon2 memory cost in KiB
    pub password_hash_memory_kib: u32,

    /// Argon2 iteration count
    pub password_hash_iterations: u32,

    /// Interval for scheduled daily generation (disabled when `None`)
    pub daily_generation_interval: Option<Duration>,

    /// User recorded as creator of scheduled transactions
    pub job_actor_user_id: Option<Uuid>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = match env::var("STORAGE") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == "production" => return Err(ConfigError::MissingEnv("JWT_SECRET")),
            _ => DEV_JWT_SECRET.to_string(),
        };

        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", 24)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue("TOKEN_TTL_HOURS"));
        }

        let request_timeout = Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)?);

        let business_utc_offset_minutes = parse_or("BUSINESS_UTC_OFFSET_MINUTES", 0)?;
        if !(-14 * 60..=14 * 60).contains(&business_utc_offset_minutes) {
            return Err(ConfigError::InvalidValue("BUSINESS_UTC_OFFSET_MINUTES"));
        }

        let password_hash_memory_kib = parse_or("PASSWORD_HASH_MEMORY_KIB", 19 * 1024)?;
        let password_hash_iterations = parse_or("PASSWORD_HASH_ITERATIONS", 2)?;

        let daily_generation_interval = parse_optional::<u64>("DAILY_GENERATION_INTERVAL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let job_actor_user_id = parse_optional("JOB_ACTOR_USER_ID")?;

        Ok(Self {
            storage,
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            jwt_secret,
            token_ttl_hours,
            request_timeout,
            business_utc_offset_minutes,
            password_hash_memory_kib,
            password_hash_iterations,
            daily_generation_interval,
            job_actor_user_id,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key)),
        _ => Ok(None),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
