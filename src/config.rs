use std::env;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::widget::UnsupportedSpeechPolicy;

/// Prefix for layered environment overrides, e.g. `UNIVERSE_SERVER__PORT`.
const ENV_PREFIX: &str = "UNIVERSE";

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub gallery: GalleryConfig,
    pub widget: WidgetConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

/// Remote conversational backend.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    /// Sent as `X-API-KEY` on every call.
    pub api_key: String,
    pub request_timeout_secs: u64,
}

/// Third-party photo search used by the gallery.
#[derive(Debug, Deserialize, Clone)]
pub struct GalleryConfig {
    pub base_url: String,
    pub access_key: String,
    pub query: String,
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub session_timeout_secs: u64,
    pub banner_secs: u64,
    pub mobile_breakpoint: u32,
    pub unsupported_speech: UnsupportedSpeechPolicy,
    pub assistant_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
}

impl WidgetConfig {
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    #[must_use]
    pub fn banner_window(&self) -> Duration {
        Duration::from_secs(self.banner_secs)
    }
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

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("chat.base_url", "https://apis.contenaissance.com")?
            .set_default("chat.api_key", "")?
            .set_default("chat.request_timeout_secs", 30)?
            .set_default("gallery.base_url", "https://api.unsplash.com")?
            .set_default("gallery.access_key", "")?
            .set_default("gallery.query", "universe galaxy space")?
            .set_default("gallery.per_page", 9)?
            .set_default("widget.session_timeout_secs", 15 * 60)?
            .set_default("widget.banner_secs", 3)?
            .set_default("widget.mobile_breakpoint", 786)?
            .set_default("widget.unsupported_speech", "silent")?
            .set_default("widget.assistant_name", "RitzBOT")?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 30)?;

        // 2. Config file: explicit path is required, ./config.yaml is optional
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        } else if Path::new(CWD_CONFIG_FILE).exists() {
            builder = builder.add_source(File::new(CWD_CONFIG_FILE, FileFormat::Yaml));
        }

        // 3. Prefixed environment, e.g. UNIVERSE_WIDGET__SESSION_TIMEOUT_SECS=60
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Direct env names for secrets and endpoints
        if let Ok(val) = env::var("CHAT_API_KEY") {
            builder = builder.set_override("chat.api_key", val)?;
        }
        if let Ok(val) = env::var("CHAT_BASE_URL") {
            builder = builder.set_override("chat.base_url", val)?;
        }
        if let Ok(val) = env::var("UNSPLASH_ACCESS_KEY") {
            builder = builder.set_override("gallery.access_key", val)?;
        }

        // 5. CLI flags (and their clap env fallbacks) win over everything
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
