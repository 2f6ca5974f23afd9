use anyhow::{bail, Context, Result};
use passbook_classify::{CategorySource, ClassifierOptions, PaymentStyle};
use passbook_import::StatementProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `config.toml`. Every key is optional; CLI flags win over it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Rule file replacing the bundled tables.
    pub rules: Option<PathBuf>,
    pub category_source: CategorySource,
    pub payment_style: PaymentStyle,
    /// Worker threads for classification; unset means one per CPU.
    pub workers: Option<usize>,
    pub statement: StatementProfile,
}

impl AppConfig {
    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            category_source: self.category_source,
            payment_style: self.payment_style,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

/// `~/.config/passbook/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("passbook").join("config.toml"))
}

/// An explicit path must exist; the default location is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(p) if !p.exists() => bail!("config not found: {}", p.display()),
        Some(p) => p.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(AppConfig::default()),
        },
    };
    let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
