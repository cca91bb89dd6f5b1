//! Configuration for Lectern
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

use crate::auth::jwt::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};

/// Default request body limit: 1 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Lectern - content-management REST backend
#[derive(Parser, Debug, Clone)]
#[command(name = "lectern")]
#[command(about = "Content-management REST backend with token and API-key authentication")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (allows the dev signing secret and the memory store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "lectern")]
    pub mongodb_db: String,

    /// Use the in-process store instead of MongoDB (dev mode only)
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "JWT_TTL_SECONDS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub jwt_ttl_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Public base URL used in the sitemap and robots.txt
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl Args {
    /// Public URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.memory_store && !self.dev_mode {
            return Err("MEMORY_STORE is only allowed with DEV_MODE".to_string());
        }

        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.jwt_ttl_seconds) {
            return Err(format!(
                "JWT_TTL_SECONDS must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            ));
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            return Err("PUBLIC_URL must start with http:// or https://".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("lectern").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.mongodb_db, "lectern");
        assert_eq!(args.jwt_ttl_seconds, 7 * 24 * 60 * 60);
        assert_eq!(args.max_body_bytes, 1024 * 1024);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = parse(&[]);
        assert!(args.validate().is_err());

        let args = parse(&["--jwt-secret", "a-production-secret-of-at-least-32-chars"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_memory_store_needs_dev_mode() {
        let args = parse(&[
            "--memory-store",
            "--jwt-secret",
            "a-production-secret-of-at-least-32-chars",
        ]);
        assert!(args.validate().is_err());
        assert!(parse(&["--memory-store", "--dev-mode"]).validate().is_ok());
    }

    #[test]
    fn test_token_ttl_bounds() {
        assert!(parse(&["--dev-mode", "--jwt-ttl-seconds", "0"]).validate().is_err());
        assert!(parse(&["--dev-mode", "--jwt-ttl-seconds", "18446744073709551615"])
            .validate()
            .is_err());

        let max = MAX_TOKEN_TTL_SECS.to_string();
        assert!(parse(&["--dev-mode", "--jwt-ttl-seconds", &max]).validate().is_ok());

        let over = (MAX_TOKEN_TTL_SECS + 1).to_string();
        assert!(parse(&["--dev-mode", "--jwt-ttl-seconds", &over]).validate().is_err());
    }

    #[test]
    fn test_base_url_trims_slash() {
        let args = parse(&["--dev-mode", "--public-url", "https://example.com/"]);
        assert_eq!(args.base_url(), "https://example.com");
    }
}
