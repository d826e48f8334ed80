//! Platform configuration, merged from layered `figment` providers.
//!
//! Sources, from lowest to highest precedence:
//!
//! 1. built-in defaults (`#[serde(default)]`),
//! 2. `<config_dir>/application.toml`,
//! 3. `<config_dir>/application-<profile>.toml`,
//! 4. environment variables prefixed with `PLATFORM_`,
//! 5. programmatic overrides (the test harness registry).
//!
//! Environment variables traverse nested keys with `__`; single underscores
//! map to dashes. `PLATFORM_DATASOURCE__MAX_CONNECTIONS` sets
//! `datasource.max-connections`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use figment::Figment;
use figment::Provider;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer};
use serde_aux::field_attributes::{deserialize_bool_from_anything, deserialize_number_from_string};
use sqlx::postgres::PgConnectOptions;

pub const PROFILE_ENV: &str = "PLATFORM_PROFILE";
pub const CONFIG_DIR_ENV: &str = "PLATFORM_CONFIG_DIR";
pub const ENV_PREFIX: &str = "PLATFORM_";

/// Configuration failures. All of them abort bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Optional subsystems that `autoconfigure.exclude` can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subsystem {
    /// PostgreSQL connection pool.
    DataSource,
    /// Schema validation of migrated tables.
    Orm,
    /// Embedded SQL migrations.
    Migration,
}

impl FromStr for Subsystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datasource" => Ok(Self::DataSource),
            "orm" => Ok(Self::Orm),
            "migration" => Ok(Self::Migration),
            other => Err(format!("unknown subsystem '{other}'")),
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DataSource => "datasource",
            Self::Orm => "orm",
            Self::Migration => "migration",
        })
    }
}

/// Authorization policy enforced by the security gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityPolicy {
    /// Admit every request.
    #[default]
    #[serde(alias = "permit_all")]
    PermitAll,
    /// Anonymous access to the liveness and actuator endpoints only; HTTP
    /// Basic everywhere else.
    Strict,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(
        default = "default_port",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataSourceConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(
        default = "default_max_connections",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub max_connections: u32,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            max_connections: default_max_connections(),
        }
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DataSourceConfig {
    /// The configured URL, unless it is blank.
    pub fn configured_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Connection options for sqlx. Accepts `jdbc:postgresql://` as well as
    /// native `postgres://` URLs; explicit credentials override the URL's.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let url = self.configured_url().ok_or_else(|| ConfigError::Invalid {
            key: "datasource.url".into(),
            reason: "not set".into(),
        })?;
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        let mut options =
            PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                key: "datasource.url".into(),
                reason: e.to_string(),
            })?;
        if let Some(username) = &self.username {
            options = options.username(username);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "name")]
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsrfConfig {
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub policy: SecurityPolicy,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub user: Option<Credentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoconfigureConfig {
    #[serde(default, deserialize_with = "deserialize_exclusions")]
    pub exclude: BTreeSet<Subsystem>,
}

/// Fully resolved platform configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    /// Set by the loader, never read from a source.
    #[serde(skip)]
    pub profile: Option<String>,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub datasource: DataSourceConfig,
    #[serde(default)]
    pub autoconfigure: AutoconfigureConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_app_name() -> String {
    "pokedex-platform".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// `autoconfigure.exclude` is either a list or a comma-separated string.
fn deserialize_exclusions<'de, D>(deserializer: D) -> Result<BTreeSet<Subsystem>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Exclusions {
        List(Vec<String>),
        Csv(String),
    }

    let names = match Exclusions::deserialize(deserializer)? {
        Exclusions::List(names) => names,
        Exclusions::Csv(raw) => raw.split(',').map(str::to_string).collect(),
    };
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse().map_err(serde::de::Error::custom))
        .collect()
}

impl PlatformConfig {
    /// Extract and validate the configuration merged into `figment`.
    pub fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.policy == SecurityPolicy::Strict && self.security.user.is_none() {
            return Err(ConfigError::Invalid {
                key: "security.policy".into(),
                reason: "strict policy requires security.user.name and security.user.password"
                    .into(),
            });
        }
        Ok(())
    }

    /// Whether a subsystem survives `autoconfigure.exclude`. Excluding the
    /// datasource disables everything that depends on it.
    pub fn is_enabled(&self, subsystem: Subsystem) -> bool {
        let excluded = &self.autoconfigure.exclude;
        if excluded.contains(&subsystem) {
            return false;
        }
        match subsystem {
            Subsystem::DataSource => true,
            Subsystem::Orm | Subsystem::Migration => !excluded.contains(&Subsystem::DataSource),
        }
    }
}

/// Locates and layers the configuration sources for one profile.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    profile: Option<String>,
    config_dir: PathBuf,
    read_env: bool,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile: None,
            config_dir: config_dir.into(),
            read_env: true,
        }
    }

    /// Loader driven by `PLATFORM_PROFILE` and `PLATFORM_CONFIG_DIR`.
    pub fn from_env() -> Self {
        let config_dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
        let mut loader = Self::new(config_dir);
        loader.profile = std::env::var(PROFILE_ENV).ok().filter(|p| !p.is_empty());
        loader
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Toggle the environment-variable layer.
    pub fn with_env(mut self, read_env: bool) -> Self {
        self.read_env = read_env;
        self
    }

    /// Every source except the overrides, merged in precedence order.
    /// Missing files contribute nothing.
    pub fn figment(&self) -> Figment {
        let base = self.config_dir.join("application.toml");
        let mut figment = Figment::new().merge(Toml::file(base));
        if let Some(profile) = &self.profile {
            let path = self.config_dir.join(format!("application-{profile}.toml"));
            figment = figment.merge(Toml::file(path));
        }
        if self.read_env {
            figment = figment.merge(environment());
        }
        figment
    }

    /// Resolve the configuration with `overrides` on top of every other
    /// source. A failing override provider fails the load.
    pub fn load(&self, overrides: impl Provider) -> Result<PlatformConfig, ConfigError> {
        tracing::debug!(
            config_dir = %self.config_dir.display(),
            profile = ?self.profile,
            read_env = self.read_env,
            "loading configuration"
        );
        let figment = self.figment().merge(overrides);
        let mut config = PlatformConfig::extract(&figment)?;
        config.profile = self.profile.clone();
        Ok(config)
    }
}

/// `PLATFORM_*` variables, minus the ones that select the loader itself.
fn environment() -> Env {
    Env::prefixed(ENV_PREFIX)
        .ignore(&["profile", "config_dir"])
        .split("__")
        .map(|key| key.as_str().to_ascii_lowercase().replace('_', "-").into())
}
