use secrecy::Secret;
use serde::Deserialize;
use service_core::observability::logging::LogFormat;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub view_cache: ViewCacheSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Set the `Secure` flag on the session cookie. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_session_inactivity_hours")]
    pub session_inactivity_hours: i64,
}

fn default_session_inactivity_hours() -> i64 {
    24
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Postgres connection URL. Usually supplied through `POSTGRES_URL`.
    pub url: Secret<String>,
    #[serde(default = "default_require_ssl")]
    pub require_ssl: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_require_ssl() -> bool {
    true
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub log_level: String,
    /// OTLP gRPC endpoint, e.g. `http://tempo:4317`. Spans are not exported when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Deserialize, Clone, Default)]
pub struct ViewCacheSettings {
    /// Maximum age of a cached page. Entries live until revalidated when unset.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;

    let configuration_directory = if base_path.ends_with("invoice-dashboard") {
        base_path.join("config")
    } else {
        base_path.join("invoice-dashboard").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("database.url", std::env::var("POSTGRES_URL").ok())?
        .build()?;

    settings.try_deserialize::<Settings>()
}
