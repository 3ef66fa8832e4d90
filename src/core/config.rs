use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A cloud account identity and its bootstrap policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub account_number: String,
    #[serde(default, alias = "cdkBootstrap", skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapPolicy>,
}

impl Account {
    pub fn new(name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_number: account_number.into(),
            bootstrap: None,
        }
    }

    pub fn with_bootstrap(mut self, policy: BootstrapPolicy) -> Self {
        self.bootstrap = Some(policy);
        self
    }
}

/// Whether and how an account gets bootstrapped.
///
/// Serialized as `{"enabled": false}` or
/// `{"enabled": true, "regions": [...], "minimumVersion": N, "trustedAccountNames": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBootstrapPolicy", into = "RawBootstrapPolicy")]
pub enum BootstrapPolicy {
    Disabled,
    Enabled {
        regions: Vec<String>,
        minimum_version: u32,
        trusted_account_names: Vec<String>,
    },
}

impl BootstrapPolicy {
    /// Enabled policy with duplicate regions collapsed, first occurrence wins.
    pub fn enabled<I, S>(regions: I, minimum_version: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enabled {
            regions: dedup_ordered(regions.into_iter().map(Into::into)),
            minimum_version,
            trusted_account_names: Vec::new(),
        }
    }

    pub fn trusting<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::Enabled {
                regions,
                minimum_version,
                mut trusted_account_names,
            } => {
                trusted_account_names.extend(names.into_iter().map(Into::into));
                Self::Enabled {
                    regions,
                    minimum_version,
                    trusted_account_names,
                }
            }
            Self::Disabled => Self::Disabled,
        }
    }
}

fn dedup_ordered(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBootstrapPolicy {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trusted_account_names: Option<Vec<String>>,
}

impl TryFrom<RawBootstrapPolicy> for BootstrapPolicy {
    type Error = Error;

    fn try_from(raw: RawBootstrapPolicy) -> Result<Self, Self::Error> {
        if !raw.enabled {
            return Ok(Self::Disabled);
        }

        let regions = raw.regions.unwrap_or_default();
        if regions.is_empty() {
            return Err(Error::config_invalid_value(
                "bootstrap.regions",
                None,
                "enabled bootstrap policy needs at least one region",
            ));
        }
        let minimum_version = raw.minimum_version.ok_or_else(|| {
            Error::config_invalid_value(
                "bootstrap.minimumVersion",
                None,
                "enabled bootstrap policy needs a minimumVersion",
            )
        })?;

        Ok(Self::enabled(regions, minimum_version)
            .trusting(raw.trusted_account_names.unwrap_or_default()))
    }
}

impl From<BootstrapPolicy> for RawBootstrapPolicy {
    fn from(policy: BootstrapPolicy) -> Self {
        match policy {
            BootstrapPolicy::Disabled => Self {
                enabled: false,
                regions: None,
                minimum_version: None,
                trusted_account_names: None,
            },
            BootstrapPolicy::Enabled {
                regions,
                minimum_version,
                trusted_account_names,
            } => Self {
                enabled: true,
                regions: Some(regions),
                minimum_version: Some(minimum_version),
                trusted_account_names: if trusted_account_names.is_empty() {
                    None
                } else {
                    Some(trusted_account_names)
                },
            },
        }
    }
}

/// A pipeline stage deployed ahead of the owning instance's own stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubInstance<A> {
    pub account_name: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default)]
    pub application_config: A,
}

/// A deployment target: an account, the branch it deploys from, and an
/// optional suffix distinguishing parallel environments in one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance<A> {
    pub account_name: String,
    pub branch_name: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default)]
    pub application_config: A,
    #[serde(
        default = "Vec::new",
        alias = "sequencedInstances",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub nested_instances: Vec<SubInstance<A>>,
}

impl<A> Instance<A> {
    pub fn new(
        account_name: impl Into<String>,
        branch_name: impl Into<String>,
        application_config: A,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            branch_name: branch_name.into(),
            requires_approval: false,
            suffix: None,
            application_config,
            nested_instances: Vec::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn with_nested(mut self, nested: SubInstance<A>) -> Self {
        self.nested_instances.push(nested);
        self
    }

    /// An empty suffix counts as no suffix.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref().filter(|s| !s.is_empty())
    }
}
