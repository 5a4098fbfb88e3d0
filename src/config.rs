use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Port assumed when none is configured. Absolute URLs synthesized for
/// responses suppress their port segment when the service runs on this
/// port (or on plain HTTP port 80).
pub const DEFAULT_PORT: u16 = 8080;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Raw bearer-token registry, `token=scope|scope,token2=...`.
    pub api_tokens: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Product catalog API with chunked media storage")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bearer-token registry (overrides CATALOG_API_TOKENS)
    #[arg(long)]
    pub api_tokens: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_PORT,
            Err(err) => return Err(err).context("reading CATALOG_PORT"),
        };
        let env_db =
            env::var("CATALOG_DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/catalog.db".into());
        let env_tokens = env::var("CATALOG_API_TOKENS").unwrap_or_default();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            api_tokens: args.api_tokens.unwrap_or(env_tokens),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
