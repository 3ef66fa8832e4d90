//! Manifest files describing accounts, instances and policies.
//!
//! The binary builds its [`Registry`] from a manifest. Format follows the
//! file extension: `.json`, `.yaml`/`.yml` or `.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Account, Instance};
use crate::error::{Error, Result};
use crate::policy::PolicyTemplates;
use crate::registry::Registry;
use crate::toolkit::Toolkit;

pub const CONFIG_ENV_VAR: &str = "CDK_MANAGER_CONFIG";

pub const DEFAULT_FILE_NAMES: &[&str] = &[
    "cdk-manager.json",
    "cdk-manager.yaml",
    "cdk-manager.yml",
    "cdk-manager.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub instances: Vec<Instance<Value>>,
    #[serde(default)]
    pub policies: PolicyTemplates,
    #[serde(default)]
    pub toolkit: Toolkit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(Error::config_invalid_file(
                path.to_string_lossy(),
                "unsupported extension (expected .json, .yaml, .yml or .toml)",
            )),
        }
    }
}

impl Manifest {
    pub fn parse(content: &str, format: ManifestFormat, origin: &str) -> Result<Self> {
        let parsed = match format {
            ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_yml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| Error::config_invalid_file(origin, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let format = ManifestFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        })?;
        Self::parse(&content, format, &path.to_string_lossy())
    }

    /// Insert everything through the registry so duplicates are rejected.
    pub fn into_registry(self) -> Result<Registry<Value>> {
        let mut registry =
            Registry::new(self.policies.into_policies()).with_toolkit(self.toolkit);
        for account in self.accounts {
            registry.add_account(account)?;
        }
        for instance in self.instances {
            registry.add_instance(instance)?;
        }
        Ok(registry)
    }
}

/// Locate the manifest: explicit path, then `CDK_MANAGER_CONFIG`, then the
/// default file names in `cwd`.
pub fn resolve_path(explicit: Option<&str>, cwd: &Path) -> Result<PathBuf> {
    let from_env = std::env::var(CONFIG_ENV_VAR).ok().filter(|v| !v.is_empty());

    if let Some(raw) = explicit.map(str::to_string).or(from_env) {
        let expanded = shellexpand::full(&raw)
            .map_err(|e| Error::validation_invalid_argument("config", e.to_string()))?;
        let path = PathBuf::from(expanded.as_ref());
        let path = if path.is_absolute() { path } else { cwd.join(path) };
        if !path.is_file() {
            return Err(Error::config_not_found(vec![path.to_string_lossy().to_string()]));
        }
        return Ok(path);
    }

    DEFAULT_FILE_NAMES
        .iter()
        .map(|name| cwd.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            Error::config_not_found(
                DEFAULT_FILE_NAMES
                    .iter()
                    .map(|name| cwd.join(name).to_string_lossy().to_string())
                    .collect(),
            )
        })
}

pub fn load_registry(explicit: Option<&str>, cwd: &Path) -> Result<Registry<Value>> {
    let path = resolve_path(explicit, cwd)?;
    crate::log_status!("config", "Loading {}", path.display());
    Manifest::load(&path)?.into_registry()
}
