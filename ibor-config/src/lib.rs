//! Layered, typed configuration for the book of record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use ibor_core::{Isin, PortfolioId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");
const ENV_PREFIX: &str = "IBOR";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IborConfig {
    pub database: DatabaseConfig,
    pub cash: CashConfig,
    pub nav: NavConfig,
    #[serde(default)]
    pub positions: PositionConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub prices: Vec<PriceConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CashConfig {
    pub currency: String,
    pub default_portfolio: String,
    /// Amount used by `cash reset` when the operator does not give one.
    pub reset_amount: Decimal,
}

impl CashConfig {
    pub fn default_portfolio(&self) -> PortfolioId {
        PortfolioId::from(self.default_portfolio.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NavConfig {
    /// Annual fee rate, e.g. `0.005` for 50 bps.
    pub fee_rate: Decimal,
    pub shares_outstanding: u64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PositionConfig {
    #[serde(default)]
    pub allow_short: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PriceConfig {
    pub isin: String,
    pub price: Decimal,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_event_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".into()
}

impl IborConfig {
    /// Check invariants the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.nav.shares_outstanding == 0 {
            bail!("nav.shares_outstanding must be positive");
        }
        if self.nav.fee_rate.is_sign_negative() {
            bail!("nav.fee_rate must not be negative");
        }
        if self.cash.currency.trim().is_empty() {
            bail!("cash.currency must not be empty");
        }
        if self.cash.default_portfolio.trim().is_empty() {
            bail!("cash.default_portfolio must not be empty");
        }
        self.price_table().map(|_| ())
    }

    /// Parsed `[[prices]]` table.
    pub fn price_table(&self) -> Result<Vec<(Isin, Decimal)>> {
        self.prices
            .iter()
            .map(|entry| {
                let isin = Isin::parse(entry.isin.as_str())
                    .map_err(|err| anyhow!("prices: {}: {err}", entry.isin))?;
                if entry.price <= Decimal::ZERO {
                    bail!("prices: {} must have a positive price", entry.isin);
                }
                Ok((isin, entry.price))
            })
            .collect()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration as TOML")
    }
}

/// Where to look for configuration layers.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    /// Directory holding `default.toml` and `<env>.toml`.
    pub config_dir: Option<PathBuf>,
    pub env: Option<String>,
    pub file: Option<PathBuf>,
    /// Read `IBOR__*` environment variables.
    pub use_environment: bool,
}

impl ConfigSources {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: Some(config_dir.into()),
            env: None,
            file: None,
            use_environment: true,
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }
}

/// Load configuration from the embedded defaults plus the requested layers.
pub fn load_config(sources: &ConfigSources) -> Result<IborConfig> {
    let mut builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
    if let Some(dir) = &sources.config_dir {
        builder = builder.add_source(optional_file(&dir.join("default.toml")));
        if let Some(env) = &sources.env {
            builder = builder.add_source(optional_file(&dir.join(format!("{env}.toml"))));
        }
    }
    if let Some(file) = &sources.file {
        if !file.exists() {
            bail!("config file {} does not exist", file.display());
        }
        builder = builder.add_source(File::from(file.as_path()).format(FileFormat::Toml));
    }
    if sources.use_environment {
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
    }
    let config: IborConfig = builder
        .build()
        .context("failed to assemble configuration")?
        .try_deserialize()
        .context("failed to deserialize configuration")?;
    config.validate()?;
    Ok(config)
}

/// The compiled-in defaults, without touching the filesystem or environment.
pub fn default_config() -> Result<IborConfig> {
    load_config(&ConfigSources::default())
}

fn optional_file(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml).required(false)
}
