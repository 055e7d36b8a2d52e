use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::fingerprint::canonical;
use crate::fingerprint::generator::{DEFAULT_SENTINEL, DEFAULT_SHA256_LEN, DEFAULT_TIMEOUT};
use crate::fingerprint::GeneratorConfig;
use crate::probe::host::DEFAULT_PROBE_NAMES;
use crate::types::DigestAlgorithm;

const ENV_PREFIX: &str = "ENVPRINT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Placeholder written for every failed probe slot
    pub sentinel: String,
    /// Bound for probes that do not declare their own timeout
    pub default_timeout_ms: u64,
    pub digest: DigestAlgorithm,
    /// Hex chars kept from the SHA-256 digest
    pub sha256_len: usize,
    /// Built-in probes, in registration order
    pub probes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            digest: DigestAlgorithm::default(),
            sha256_len: DEFAULT_SHA256_LEN,
            probes: DEFAULT_PROBE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".envprint")
            .join("config.toml")
    }

    /// Defaults, then `~/.envprint/config.toml`, then `ENVPRINT_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Same layering as [`Config::load`] with an explicit file path.
    /// A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Config::default();

        debug!("Loading configuration from {:?}", path);

        let settings = config::Config::builder()
            .set_default("sentinel", defaults.sentinel.clone())?
            .set_default("default_timeout_ms", defaults.default_timeout_ms)?
            .set_default("digest", "sha256")?
            .set_default("sha256_len", defaults.sha256_len as u64)?
            .set_default("probes", defaults.probes.clone())?
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("probes"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        fs::write(path, config_str)
            .context("Failed to write config file")?;

        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        canonical::validate_sentinel(&self.sentinel)?;
        if self.default_timeout_ms == 0 {
            anyhow::bail!("default_timeout_ms must be greater than zero");
        }
        if self.probes.is_empty() {
            anyhow::bail!("at least one probe must be enabled");
        }
        Ok(())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            sentinel: self.sentinel.clone(),
            default_timeout: Duration::from_millis(self.default_timeout_ms),
            algorithm: self.digest,
            sha256_len: self.sha256_len,
        }
    }
}
