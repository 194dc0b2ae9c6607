use crate::query::PageSettings;
use recipebook_utils::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "staging")]
    Staging,
    #[serde(rename = "prod")]
    Prod,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => RuntimeEnv::Local,
            Env::Test => RuntimeEnv::Test,
            Env::Staging => RuntimeEnv::Staging,
            Env::Prod => RuntimeEnv::Prod,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Test => write!(f, "test"),
            Env::Staging => write!(f, "staging"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

/// Where log events go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable lines on stdout.
    Pretty,
    /// Stackdriver JSON correlated with Cloud Trace in `project_id`.
    Stackdriver { project_id: String },
}

const DEFAULT_PAGE_SIZE: u64 = 6;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // JWT secret used to validate session tokens
    jwt_secret: String,
    page_settings: PageSettings,
    run_migrations: bool,
    log_output: LogOutput,
    // Overrides RUST_LOG when set
    log_filter: Option<String>,
}

// An intermediate struct for deserializing environment variables
// where most fields are optional.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    jwt_secret: Option<String>,
    default_page_size: Option<u64>,
    max_page_size: Option<u64>,
    run_migrations: Option<bool>,
    google_cloud_project: Option<String>,
    log_filter: Option<String>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// This function is available for both unit tests and integration tests.
    /// It should not be used in production code.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/test".to_string(),
            server_addr: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_string(),
            page_settings: PageSettings {
                default_size: DEFAULT_PAGE_SIZE,
                max_size: DEFAULT_MAX_PAGE_SIZE,
            },
            run_migrations: false,
            log_output: LogOutput::Pretty,
            log_filter: None,
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn page_settings(&self) -> PageSettings {
        self.page_settings
    }

    /// Whether pending migrations are applied at startup.
    pub fn run_migrations(&self) -> bool {
        self.run_migrations
    }

    pub fn log_output(&self) -> &LogOutput {
        &self.log_output
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref()
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            default_page_size,
            max_page_size,
            run_migrations,
            google_cloud_project,
            log_filter,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_string()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // JWT secret is required outside local/test
        let jwt_secret = match jwt_secret {
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                "default-jwt-secret-for-local-development-only".to_string()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        let log_output = match (env, google_cloud_project) {
            (Env::Local, _) => LogOutput::Pretty,
            (_, Some(project_id)) => LogOutput::Stackdriver { project_id },
            (_, None) => anyhow::bail!("GOOGLE_CLOUD_PROJECT must be set for {} environment", env),
        };

        let default_size = default_page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let max_size = max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        if default_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be at least 1");
        }
        if max_size < default_size {
            anyhow::bail!(
                "MAX_PAGE_SIZE ({}) must not be smaller than DEFAULT_PAGE_SIZE ({})",
                max_size,
                default_size
            );
        }

        Ok(Config {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            page_settings: PageSettings {
                default_size,
                max_size,
            },
            run_migrations: run_migrations.unwrap_or(true),
            log_output,
            log_filter,
        })
    }
}
