//! Environment variables selecting a deployment context in the calling shell.

use crate::command::EnvironmentVariables;
use crate::error::{Error, Result};
use crate::pipeline::{TARGET_ACCOUNT, TARGET_ENVIRONMENT_SUFFIX};
use crate::registry::Registry;

#[derive(Debug, Clone, Default)]
pub struct ActivateOptions {
    /// Falls back to the default-account policy.
    pub account: Option<String>,
    pub suffix: Option<String>,
    pub region: Option<String>,
    pub pipeline_account: bool,
    pub no_default_profiles: bool,
}

pub fn activation_variables<A>(
    registry: &Registry<A>,
    options: &ActivateOptions,
) -> Result<EnvironmentVariables> {
    let policies = registry.policies();
    let account_name = match options.account.as_deref() {
        Some(name) => name,
        None => policies.default_account()?,
    };
    let account = registry.get_account(account_name)?;
    let suffix = options.suffix.as_deref().filter(|s| !s.is_empty());
    let instance = registry.instance_for_account_if_exists(account_name, suffix);

    if !options.pipeline_account && instance.is_none() {
        return Err(Error::no_instance_selected(account_name, suffix));
    }

    let mut env = EnvironmentVariables::new();

    if !options.no_default_profiles {
        if options.pipeline_account {
            env.set("AWS_PROFILE", policies.pipeline_profile(account, instance)?);
        } else if let Some(instance) = instance {
            env.set("AWS_PROFILE", policies.instance_profile(account, instance)?);
        }
    }

    if let Some(instance) = instance {
        env.set(TARGET_ACCOUNT, instance.account_name.as_str());
        if let Some(suffix) = instance.suffix() {
            env.set(TARGET_ENVIRONMENT_SUFFIX, suffix);
        }
    }

    if let Some(region) = options.region.as_deref() {
        env.set("AWS_REGION", region);
    } else if options.pipeline_account {
        env.set("AWS_REGION", policies.pipeline_region(account, instance)?);
    } else if let Some(instance) = instance {
        env.set("AWS_REGION", policies.instance_region(account, instance)?);
    }

    env.set("AWS_SDK_LOAD_CONFIG", "1");

    let extra = policies.extra_activation_variables(&env, account, instance)?;
    env.extend(extra);

    Ok(env)
}

/// `export KEY="VALUE"` lines for `eval`.
pub fn activation_exports<A>(registry: &Registry<A>, options: &ActivateOptions) -> Result<Vec<String>> {
    Ok(activation_variables(registry, options)?.render_exports())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Account, Instance};
    use crate::error::ErrorCode;
    use crate::policy::Policies;

    #[derive(Debug)]
    struct AppConfig {
        foo: bool,
    }

    fn registry() -> Registry<AppConfig> {
        let policies = Policies::<AppConfig>::new()
            .with_default_account("acct1")
            .with_instance_profile(|account, _| Ok(format!("{}-Admin", account.name)))
            .with_pipeline_profile(|_, _| Ok("pipelines-admin".to_string()))
            .with_instance_region(|_, _| Ok("eu-west-2".to_string()))
            .with_pipeline_region(|_, _| Ok("eu-west-1".to_string()))
            .with_extra_activation_variables(|_, _, instance| {
                let mut env = EnvironmentVariables::new();
                if instance.is_some_and(|i| i.application_config.foo) {
                    env.set("FOO_IS_ENABLED", "yes");
                }
                Ok(env)
            });

        let mut registry = Registry::new(policies);
        registry.add_account(Account::new("acct1", "1234")).unwrap();
        registry.add_account(Account::new("pipelines", "3456")).unwrap();
        registry
            .add_instance(Instance::new("acct1", "main", AppConfig { foo: true }))
            .unwrap();
        registry
            .add_instance(Instance::new("acct1", "blue", AppConfig { foo: false }).with_suffix("blue"))
            .unwrap();
        registry
    }

    #[test]
    fn instance_activation_uses_instance_policies() {
        let registry = registry();
        let env = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("acct1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let keys: Vec<&str> = env.keys().collect();
        assert_eq!(
            keys,
            vec![
                "AWS_PROFILE",
                "TARGET_ACCOUNT",
                "AWS_REGION",
                "AWS_SDK_LOAD_CONFIG",
                "FOO_IS_ENABLED"
            ]
        );
        assert_eq!(env.get("AWS_PROFILE"), Some("acct1-Admin"));
        assert_eq!(env.get("TARGET_ACCOUNT"), Some("acct1"));
        assert_eq!(env.get("AWS_REGION"), Some("eu-west-2"));
        assert_eq!(env.get("AWS_SDK_LOAD_CONFIG"), Some("1"));
    }

    #[test]
    fn default_account_policy_applies_without_account() {
        let registry = registry();
        let env = activation_variables(&registry, &ActivateOptions::default()).unwrap();
        assert_eq!(env.get("TARGET_ACCOUNT"), Some("acct1"));
    }

    #[test]
    fn suffix_and_explicit_region() {
        let registry = registry();
        let exports = activation_exports(
            &registry,
            &ActivateOptions {
                account: Some("acct1".to_string()),
                suffix: Some("blue".to_string()),
                region: Some("us-east-1".to_string()),
                no_default_profiles: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            exports,
            vec![
                "export TARGET_ACCOUNT=\"acct1\"",
                "export TARGET_ENVIRONMENT_SUFFIX=\"blue\"",
                "export AWS_REGION=\"us-east-1\"",
                "export AWS_SDK_LOAD_CONFIG=\"1\"",
            ]
        );
    }

    #[test]
    fn missing_instance_without_pipeline_flag_fails() {
        let registry = registry();
        let err = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("pipelines".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NoInstanceSelected);
    }

    #[test]
    fn pipeline_account_without_instance() {
        let registry = registry();
        let env = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("pipelines".to_string()),
                pipeline_account: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(env.get("AWS_PROFILE"), Some("pipelines-admin"));
        assert_eq!(env.get("AWS_REGION"), Some("eu-west-1"));
        assert_eq!(env.get("TARGET_ACCOUNT"), None);
    }

    #[test]
    fn extra_variables_can_override() {
        let mut registry: Registry<()> = Registry::new(
            Policies::new().with_extra_activation_variables(|current, _, _| {
                let mut env = EnvironmentVariables::new();
                env.set("AWS_SDK_LOAD_CONFIG", "0");
                env.set("SEEN_KEYS", current.len().to_string());
                Ok(env)
            }),
        );
        registry.add_account(Account::new("acct1", "1234")).unwrap();
        registry.add_instance(Instance::new("acct1", "main", ())).unwrap();

        let env = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("acct1".to_string()),
                region: Some("eu-west-2".to_string()),
                no_default_profiles: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            env.render_exports(),
            vec![
                "export TARGET_ACCOUNT=\"acct1\"",
                "export AWS_REGION=\"eu-west-2\"",
                "export AWS_SDK_LOAD_CONFIG=\"0\"",
                "export SEEN_KEYS=\"3\"",
            ]
        );
    }

    #[test]
    fn unknown_account_fails_before_instance_lookup() {
        let registry = registry();
        let err = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("nope".to_string()),
                pipeline_account: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotFound);
    }

    #[test]
    fn empty_suffix_activates_default_instance() {
        let registry = registry();
        let env = activation_variables(
            &registry,
            &ActivateOptions {
                account: Some("acct1".to_string()),
                suffix: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(env.get("FOO_IS_ENABLED"), Some("yes"));
        assert_eq!(env.get("TARGET_ENVIRONMENT_SUFFIX"), None);
    }
}
