//! Application-supplied resolution policies.
//!
//! Profiles, regions and stack names depend on how an application lays out
//! its accounts, so the generators ask these injected functions instead of
//! hardcoding a convention. A policy that is needed but was never supplied
//! fails with `config.missing_policy` when first used.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::command::EnvironmentVariables;
use crate::config::{Account, Instance};
use crate::error::{Error, Result};
use crate::utils::template;

pub type AccountPolicy = Box<dyn Fn(&Account) -> Result<String>>;
pub type InstancePolicy<A> = Box<dyn Fn(&Account, &Instance<A>) -> Result<String>>;
pub type OptionalInstancePolicy<A> = Box<dyn Fn(&Account, Option<&Instance<A>>) -> Result<String>>;
pub type ExtraVariablesPolicy<A> =
    Box<dyn Fn(&EnvironmentVariables, &Account, Option<&Instance<A>>) -> Result<EnvironmentVariables>>;

pub struct Policies<A> {
    pipeline_stack_name: Option<InstancePolicy<A>>,
    bootstrap_profile: Option<AccountPolicy>,
    pipeline_profile: Option<OptionalInstancePolicy<A>>,
    instance_profile: Option<InstancePolicy<A>>,
    pipeline_region: Option<OptionalInstancePolicy<A>>,
    instance_region: Option<InstancePolicy<A>>,
    default_account: Option<String>,
    extra_activation_variables: Option<ExtraVariablesPolicy<A>>,
}

impl<A> Default for Policies<A> {
    fn default() -> Self {
        Self {
            pipeline_stack_name: None,
            bootstrap_profile: None,
            pipeline_profile: None,
            instance_profile: None,
            pipeline_region: None,
            instance_region: None,
            default_account: None,
            extra_activation_variables: None,
        }
    }
}

impl<A> std::fmt::Debug for Policies<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policies")
            .field("pipeline_stack_name", &self.pipeline_stack_name.is_some())
            .field("bootstrap_profile", &self.bootstrap_profile.is_some())
            .field("pipeline_profile", &self.pipeline_profile.is_some())
            .field("instance_profile", &self.instance_profile.is_some())
            .field("pipeline_region", &self.pipeline_region.is_some())
            .field("instance_region", &self.instance_region.is_some())
            .field("default_account", &self.default_account)
            .field(
                "extra_activation_variables",
                &self.extra_activation_variables.is_some(),
            )
            .finish()
    }
}

impl<A> Policies<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline_stack_name(
        mut self,
        f: impl Fn(&Account, &Instance<A>) -> Result<String> + 'static,
    ) -> Self {
        self.pipeline_stack_name = Some(Box::new(f));
        self
    }

    pub fn with_bootstrap_profile(mut self, f: impl Fn(&Account) -> Result<String> + 'static) -> Self {
        self.bootstrap_profile = Some(Box::new(f));
        self
    }

    pub fn with_pipeline_profile(
        mut self,
        f: impl Fn(&Account, Option<&Instance<A>>) -> Result<String> + 'static,
    ) -> Self {
        self.pipeline_profile = Some(Box::new(f));
        self
    }

    pub fn with_instance_profile(
        mut self,
        f: impl Fn(&Account, &Instance<A>) -> Result<String> + 'static,
    ) -> Self {
        self.instance_profile = Some(Box::new(f));
        self
    }

    pub fn with_pipeline_region(
        mut self,
        f: impl Fn(&Account, Option<&Instance<A>>) -> Result<String> + 'static,
    ) -> Self {
        self.pipeline_region = Some(Box::new(f));
        self
    }

    pub fn with_instance_region(
        mut self,
        f: impl Fn(&Account, &Instance<A>) -> Result<String> + 'static,
    ) -> Self {
        self.instance_region = Some(Box::new(f));
        self
    }

    pub fn with_default_account(mut self, name: impl Into<String>) -> Self {
        self.default_account = Some(name.into());
        self
    }

    pub fn with_extra_activation_variables(
        mut self,
        f: impl Fn(&EnvironmentVariables, &Account, Option<&Instance<A>>) -> Result<EnvironmentVariables>
            + 'static,
    ) -> Self {
        self.extra_activation_variables = Some(Box::new(f));
        self
    }

    pub fn pipeline_stack_name(&self, account: &Account, instance: &Instance<A>) -> Result<String> {
        let f = required(&self.pipeline_stack_name, "pipelineStackName")?;
        f(account, instance)
    }

    pub fn bootstrap_profile(&self, account: &Account) -> Result<String> {
        let f = required(&self.bootstrap_profile, "bootstrapProfile")?;
        f(account)
    }

    pub fn pipeline_profile(&self, account: &Account, instance: Option<&Instance<A>>) -> Result<String> {
        let f = required(&self.pipeline_profile, "pipelineProfile")?;
        f(account, instance)
    }

    pub fn instance_profile(&self, account: &Account, instance: &Instance<A>) -> Result<String> {
        let f = required(&self.instance_profile, "instanceProfile")?;
        f(account, instance)
    }

    pub fn pipeline_region(&self, account: &Account, instance: Option<&Instance<A>>) -> Result<String> {
        let f = required(&self.pipeline_region, "pipelineRegion")?;
        f(account, instance)
    }

    pub fn instance_region(&self, account: &Account, instance: &Instance<A>) -> Result<String> {
        let f = required(&self.instance_region, "instanceRegion")?;
        f(account, instance)
    }

    pub fn default_account(&self) -> Result<&str> {
        self.default_account
            .as_deref()
            .ok_or_else(|| Error::config_missing_policy("defaultAccount"))
    }

    /// Extra activation variables are optional; no policy means none.
    pub fn extra_activation_variables(
        &self,
        current: &EnvironmentVariables,
        account: &Account,
        instance: Option<&Instance<A>>,
    ) -> Result<EnvironmentVariables> {
        match &self.extra_activation_variables {
            Some(f) => f(current, account, instance),
            None => Ok(EnvironmentVariables::new()),
        }
    }
}

fn required<'a, T>(policy: &'a Option<T>, name: &str) -> Result<&'a T> {
    policy
        .as_ref()
        .ok_or_else(|| Error::config_missing_policy(name))
}

// ============================================================================
// Template-backed policies (manifest driven)
// ============================================================================

/// Policy templates as written in a manifest.
///
/// Placeholders: `{{account}}`, `{{accountNumber}}`, `{{suffix}}`,
/// `{{suffixDash}}` and `{{branch}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_stack_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
    #[serde(default, skip_serializing_if = "ActivationTemplates::is_empty")]
    pub activation_variables: ActivationTemplates,
}

/// Extra activation variable templates, kept in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationTemplates(Vec<(String, String)>);

impl ActivationTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated name keeps its first position and takes the new template.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        let name = name.into();
        let template = template.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = template,
            None => self.0.push((name, template)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

impl Serialize for ActivationTemplates {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, template) in &self.0 {
            map.serialize_entry(name, template)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ActivationTemplates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TemplatesVisitor;

        impl<'de> Visitor<'de> for TemplatesVisitor {
            type Value = ActivationTemplates;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of variable names to templates")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Self::Value, M::Error> {
                let mut templates = ActivationTemplates::new();
                while let Some((name, template)) = access.next_entry::<String, String>()? {
                    templates.insert(name, template);
                }
                Ok(templates)
            }
        }

        deserializer.deserialize_map(TemplatesVisitor)
    }
}

pub struct TemplateVars;

impl TemplateVars {
    pub const ACCOUNT: &'static str = "account";
    pub const ACCOUNT_NUMBER: &'static str = "accountNumber";
    pub const SUFFIX: &'static str = "suffix";
    pub const SUFFIX_DASH: &'static str = "suffixDash";
    pub const BRANCH: &'static str = "branch";
}

fn template_vars<A>(account: &Account, instance: Option<&Instance<A>>) -> Vec<(&'static str, String)> {
    let suffix = instance.and_then(|i| i.suffix()).unwrap_or_default();
    let suffix_dash = if suffix.is_empty() {
        String::new()
    } else {
        format!("-{}", suffix)
    };

    vec![
        (TemplateVars::ACCOUNT, account.name.clone()),
        (TemplateVars::ACCOUNT_NUMBER, account.account_number.clone()),
        (TemplateVars::SUFFIX, suffix.to_string()),
        (TemplateVars::SUFFIX_DASH, suffix_dash),
        (
            TemplateVars::BRANCH,
            instance.map(|i| i.branch_name.clone()).unwrap_or_default(),
        ),
    ]
}

/// Render a policy template, rejecting output that still has placeholders.
pub fn render_policy<A>(
    key: &str,
    tpl: &str,
    account: &Account,
    instance: Option<&Instance<A>>,
) -> Result<String> {
    let vars = template_vars(account, instance);
    let pairs: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let rendered = template::render(tpl, &pairs);

    let unresolved = unresolved_placeholders(&rendered)?;
    if !unresolved.is_empty() {
        return Err(Error::config_invalid_value(
            format!("policies.{}", key),
            Some(tpl.to_string()),
            format!("unknown placeholder(s): {}", unresolved.join(", ")),
        ));
    }

    Ok(rendered)
}

static PLACEHOLDER_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}"));

fn unresolved_placeholders(rendered: &str) -> Result<Vec<String>> {
    let re = PLACEHOLDER_PATTERN.as_ref().map_err(|e| {
        Error::internal_unexpected(format!("placeholder pattern failed to compile: {}", e))
    })?;
    Ok(re
        .captures_iter(rendered)
        .map(|caps| caps[1].to_string())
        .collect())
}

impl PolicyTemplates {
    /// Build closures rendering each configured template.
    pub fn into_policies<A: 'static>(self) -> Policies<A> {
        let mut policies = Policies::new();

        if let Some(tpl) = self.pipeline_stack_name {
            policies = policies.with_pipeline_stack_name(move |account, instance| {
                render_policy("pipelineStackName", &tpl, account, Some(instance))
            });
        }
        if let Some(tpl) = self.bootstrap_profile {
            policies = policies.with_bootstrap_profile(move |account| {
                render_policy::<A>("bootstrapProfile", &tpl, account, None)
            });
        }
        if let Some(tpl) = self.pipeline_profile {
            policies = policies.with_pipeline_profile(move |account, instance| {
                render_policy("pipelineProfile", &tpl, account, instance)
            });
        }
        if let Some(tpl) = self.instance_profile {
            policies = policies.with_instance_profile(move |account, instance| {
                render_policy("instanceProfile", &tpl, account, Some(instance))
            });
        }
        if let Some(tpl) = self.pipeline_region {
            policies = policies.with_pipeline_region(move |account, instance| {
                render_policy("pipelineRegion", &tpl, account, instance)
            });
        }
        if let Some(tpl) = self.instance_region {
            policies = policies.with_instance_region(move |account, instance| {
                render_policy("instanceRegion", &tpl, account, Some(instance))
            });
        }
        if let Some(name) = self.default_account {
            policies = policies.with_default_account(name);
        }
        if !self.activation_variables.is_empty() {
            let templates = self.activation_variables;
            policies = policies.with_extra_activation_variables(move |_, account, instance| {
                let mut env = EnvironmentVariables::new();
                for (name, tpl) in templates.iter() {
                    let key = format!("activationVariables.{}", name);
                    env.set(name, render_policy(&key, tpl, account, instance)?);
                }
                Ok(env)
            });
        }

        policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn account() -> Account {
        Account::new("account1", "1234")
    }

    #[test]
    fn missing_policy_fails_on_use() {
        let policies: Policies<()> = Policies::new();
        let err = policies.bootstrap_profile(&account()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingPolicy);
        assert!(err.message.contains("bootstrapProfile"));
    }

    #[test]
    fn injected_closure_is_invoked() {
        let policies: Policies<()> =
            Policies::new().with_bootstrap_profile(|account| Ok(format!("{}-Admin", account.name)));
        assert_eq!(policies.bootstrap_profile(&account()).unwrap(), "account1-Admin");
    }

    #[test]
    fn extra_variables_default_to_empty() {
        let policies: Policies<()> = Policies::new();
        let env = policies
            .extra_activation_variables(&EnvironmentVariables::new(), &account(), None)
            .unwrap();
        assert!(env.is_empty());
    }

    #[test]
    fn stack_name_template_uses_suffix_dash() {
        let policies: Policies<()> = PolicyTemplates {
            pipeline_stack_name: Some("{{account}}-mystack-pipeline{{suffixDash}}".to_string()),
            ..Default::default()
        }
        .into_policies();

        let plain = Instance::new("account1", "main", ());
        let blue = Instance::new("account1", "blue-branch", ()).with_suffix("blue");

        assert_eq!(
            policies.pipeline_stack_name(&account(), &plain).unwrap(),
            "account1-mystack-pipeline"
        );
        assert_eq!(
            policies.pipeline_stack_name(&account(), &blue).unwrap(),
            "account1-mystack-pipeline-blue"
        );
    }

    #[test]
    fn unknown_placeholder_is_a_config_error() {
        let err = render_policy::<()>("bootstrapProfile", "{{acount}}-Admin", &account(), None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "policies.bootstrapProfile");
        assert!(err.message.contains("acount"));
    }

    #[test]
    fn activation_variable_templates_render_per_instance() {
        let mut activation_variables = ActivationTemplates::new();
        activation_variables.insert("DEPLOY_BRANCH", "{{branch}}");
        let policies: Policies<()> = PolicyTemplates {
            activation_variables,
            ..Default::default()
        }
        .into_policies();

        let instance = Instance::new("account1", "main", ());
        let env = policies
            .extra_activation_variables(&EnvironmentVariables::new(), &account(), Some(&instance))
            .unwrap();
        assert_eq!(env.get("DEPLOY_BRANCH"), Some("main"));
    }

    #[test]
    fn activation_variables_keep_manifest_order() {
        let templates: PolicyTemplates = serde_json::from_str(
            r#"{ "activationVariables": { "ZONE": "{{account}}", "APP": "{{branch}}", "ZONE": "{{suffix}}" } }"#,
        )
        .unwrap();
        let policies: Policies<()> = templates.into_policies();

        let instance = Instance::new("account1", "main", ()).with_suffix("blue");
        let env = policies
            .extra_activation_variables(&EnvironmentVariables::new(), &account(), Some(&instance))
            .unwrap();
        assert_eq!(
            env.render_exports(),
            vec!["export ZONE=\"blue\"", "export APP=\"main\""]
        );
    }

    #[test]
    fn placeholder_scan_finds_every_unresolved_key() {
        assert_eq!(
            unresolved_placeholders("{{a}}-{{ b.c }}-done").unwrap(),
            vec!["a", "b.c"]
        );
        assert!(unresolved_placeholders("plain").unwrap().is_empty());
    }
}
