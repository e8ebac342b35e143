//! Layered application configuration.
//!
//! Priority, lowest first: built-in defaults, config file, `CHAT_` prefixed
//! environment variables (`CHAT_SERVER__PORT=8080`), CLI flags and their
//! env fallbacks.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default base URL of the generate endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:5043";

const DEFAULT_TITLE: &str = "Chat";
const DEFAULT_HTMX_SRC: &str = "https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js";
const DEFAULT_HTMX_SSE_SRC: &str = "https://unpkg.com/htmx-ext-sse@2.2.3/dist/sse.js";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the generate endpoint
    #[arg(long, env = "CHAT_ENDPOINT_URL")]
    pub endpoint: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub endpoint: EndpointConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`.
    pub static_dir: String,
    /// Maximum request body size, which bounds a batch of attachments.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    /// `POST {base_url}/generate` receives every message.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are dropped.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub title: String,
    pub htmx_src: String,
    pub htmx_sse_src: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            htmx_src: DEFAULT_HTMX_SRC.to_string(),
            htmx_sse_src: DEFAULT_HTMX_SSE_SRC.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.static_dir", "static")?
            .set_default("server.max_upload_bytes", 25 * 1024 * 1024)?
            .set_default("endpoint.base_url", DEFAULT_ENDPOINT_URL)?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("ui.title", DEFAULT_TITLE)?
            .set_default("ui.htmx_src", DEFAULT_HTMX_SRC)?
            .set_default("ui.htmx_sse_src", DEFAULT_HTMX_SSE_SRC)?
            .set_default("log.json", false)?;

        // 2. Config file: explicit path must exist, ./config.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment, e.g. CHAT_ENDPOINT__BASE_URL
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (clap has already folded in their env fallbacks)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(endpoint) = cli.endpoint {
            builder = builder.set_override("endpoint.base_url", endpoint)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("log.json", json)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "endpoint.base_url cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
