//! Bootstrap command generation and template version detection.

use serde::Serialize;

use crate::command::{Command, CommandSet, EnvironmentVariables};
use crate::config::BootstrapPolicy;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::utils::process::run_shell_captured;

#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Restrict to one account; all accounts otherwise.
    pub account: Option<String>,
    /// Restrict to one region; every policy region otherwise.
    pub region: Option<String>,
    pub no_default_profiles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    #[serde(rename_all = "camelCase")]
    RegionNotEnabled { region: String },
    #[serde(rename_all = "camelCase")]
    VersionTooLow { required: u32, available: u32 },
}

/// An account left out of bootstrapping. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSkip {
    pub account: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl std::fmt::Display for BootstrapSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            SkipReason::RegionNotEnabled { region } => write!(
                f,
                "Skipping account {} for selected region {}, as not enabled",
                self.account, region
            ),
            SkipReason::VersionTooLow {
                required,
                available,
            } => write!(
                f,
                "Skipping account {} as it requires CDK bootstrap version {}, but version {} is available",
                self.account, required, available
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapCommands {
    pub command_sets: Vec<CommandSet>,
    pub skipped: Vec<BootstrapSkip>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountBootstrap {
    Commands(Vec<CommandSet>),
    Skipped(SkipReason),
}

/// Command sets bringing one account up to its bootstrap baseline.
pub fn account_bootstrap_commands<A>(
    registry: &Registry<A>,
    account_name: &str,
    region: Option<&str>,
    no_default_profiles: bool,
    current_version: u32,
) -> Result<AccountBootstrap> {
    let account = registry.get_account(account_name)?;

    let (regions, minimum_version, trusted_account_names) = match &account.bootstrap {
        None | Some(BootstrapPolicy::Disabled) => {
            return Ok(AccountBootstrap::Commands(Vec::new()))
        }
        Some(BootstrapPolicy::Enabled {
            regions,
            minimum_version,
            trusted_account_names,
        }) => (regions, *minimum_version, trusted_account_names),
    };

    if let Some(region) = region {
        if !regions.iter().any(|r| r == region) {
            return Ok(AccountBootstrap::Skipped(SkipReason::RegionNotEnabled {
                region: region.to_string(),
            }));
        }
    }

    if current_version < minimum_version {
        return Ok(AccountBootstrap::Skipped(SkipReason::VersionTooLow {
            required: minimum_version,
            available: current_version,
        }));
    }

    let selected_regions: Vec<&str> = match region {
        Some(region) => vec![region],
        None => regions.iter().map(String::as_str).collect(),
    };

    let trusted_account_numbers = trusted_account_names
        .iter()
        .map(|name| {
            registry
                .get_account(name)
                .map(|a| a.account_number.as_str())
        })
        .collect::<Result<Vec<_>>>()?;

    let mut env = EnvironmentVariables::new();
    env.set("NO_SYNTH", "yes");
    if !no_default_profiles {
        env.set("AWS_PROFILE", registry.policies().bootstrap_profile(account)?);
    }

    let command_sets = selected_regions
        .into_iter()
        .map(|selected_region| {
            let line = registry.toolkit().bootstrap(
                &account.account_number,
                selected_region,
                &trusted_account_numbers,
            );
            CommandSet::single(Command::with_env(line, env.clone()))
        })
        .collect();

    Ok(AccountBootstrap::Commands(command_sets))
}

/// Command sets for every selected account, in registry order.
pub fn bootstrap_commands<A>(
    registry: &Registry<A>,
    options: &BootstrapOptions,
    current_version: u32,
) -> Result<BootstrapCommands> {
    let account_names: Vec<&str> = match options.account.as_deref() {
        Some(name) => vec![name],
        None => registry.account_names(),
    };

    let mut out = BootstrapCommands::default();
    for account_name in account_names {
        match account_bootstrap_commands(
            registry,
            account_name,
            options.region.as_deref(),
            options.no_default_profiles,
            current_version,
        )? {
            AccountBootstrap::Commands(sets) => out.command_sets.extend(sets),
            AccountBootstrap::Skipped(reason) => out.skipped.push(BootstrapSkip {
                account: account_name.to_string(),
                reason,
            }),
        }
    }

    Ok(out)
}

/// Ask the toolkit which bootstrap template version it would deploy.
pub fn detect_bootstrap_version<A>(registry: &Registry<A>) -> Result<u32> {
    let command_line = registry.toolkit().show_bootstrap_template();
    crate::log_status!("bootstrap", "Reading bootstrap template version");
    let template = run_shell_captured(&command_line, &[("NO_SYNTH", "yes")])
        .map_err(|e| {
            Error::version_detection(format!("{}: {}", e.message, e.details))
                .with_hint("Check that the toolkit is installed (e.g. run 'npm ci')")
        })?;
    parse_bootstrap_version(&template)
}

/// Extract `Resources.CdkBootstrapVersion.Properties.Value` from a template.
pub fn parse_bootstrap_version(template: &str) -> Result<u32> {
    let doc: serde_yml::Value = serde_yml::from_str(template)
        .map_err(|e| Error::version_detection(format!("template is not valid YAML: {}", e)))?;

    let value = doc
        .get("Resources")
        .and_then(|v| v.get("CdkBootstrapVersion"))
        .and_then(|v| v.get("Properties"))
        .and_then(|v| v.get("Value"))
        .ok_or_else(|| {
            Error::version_detection("Resources.CdkBootstrapVersion.Properties.Value is missing")
        })?;

    let version = match value {
        serde_yml::Value::Number(n) => n.as_u64(),
        serde_yml::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    version
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::version_detection(format!("not an integer version: {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Account;
    use crate::error::ErrorCode;
    use crate::policy::Policies;

    fn registry() -> Registry<()> {
        let policies =
            Policies::new().with_bootstrap_profile(|account| Ok(format!("{}-Admin", account.name)));
        let mut registry = Registry::new(policies);
        registry
            .add_account(Account::new("disabled", "1111").with_bootstrap(BootstrapPolicy::Disabled))
            .unwrap();
        registry.add_account(Account::new("unset", "2222")).unwrap();
        registry
            .add_account(
                Account::new("workload", "3333")
                    .with_bootstrap(BootstrapPolicy::enabled(["a", "b"], 5)),
            )
            .unwrap();
        registry
            .add_account(
                Account::new("pipelines", "4444")
                    .with_bootstrap(BootstrapPolicy::enabled(["a"], 5)),
            )
            .unwrap();
        registry
    }

    fn commands(outcome: AccountBootstrap) -> Vec<CommandSet> {
        match outcome {
            AccountBootstrap::Commands(sets) => sets,
            AccountBootstrap::Skipped(reason) => panic!("unexpected skip: {:?}", reason),
        }
    }

    #[test]
    fn disabled_or_unset_policy_yields_nothing() {
        let registry = registry();
        for name in ["disabled", "unset"] {
            let outcome = account_bootstrap_commands(&registry, name, None, false, 99).unwrap();
            assert_eq!(outcome, AccountBootstrap::Commands(vec![]));
        }
    }

    #[test]
    fn old_toolkit_version_skips_account() {
        let registry = registry();
        let outcome = account_bootstrap_commands(&registry, "workload", None, false, 4).unwrap();
        assert_eq!(
            outcome,
            AccountBootstrap::Skipped(SkipReason::VersionTooLow {
                required: 5,
                available: 4
            })
        );
    }

    #[test]
    fn region_outside_policy_skips_account() {
        let registry = registry();
        let outcome =
            account_bootstrap_commands(&registry, "pipelines", Some("b"), false, 5).unwrap();
        assert_eq!(
            outcome,
            AccountBootstrap::Skipped(SkipReason::RegionNotEnabled {
                region: "b".to_string()
            })
        );
    }

    #[test]
    fn region_filter_selects_one_command() {
        let registry = registry();
        let sets = commands(
            account_bootstrap_commands(&registry, "workload", Some("a"), false, 5).unwrap(),
        );
        assert_eq!(sets.len(), 1);
        assert_eq!(
            sets[0].render(),
            "NO_SYNTH=\"yes\" AWS_PROFILE=\"workload-Admin\" npm run -- cdk bootstrap aws://3333/a \
             --cloudformation-execution-policies arn:aws:iam::aws:policy/AdministratorAccess"
        );
    }

    #[test]
    fn unfiltered_covers_every_region_in_order() {
        let registry = registry();
        let sets = commands(
            account_bootstrap_commands(&registry, "workload", None, true, 7).unwrap(),
        );
        let lines: Vec<String> = sets.iter().map(CommandSet::render).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("aws://3333/a"));
        assert!(lines[1].contains("aws://3333/b"));
        assert!(lines.iter().all(|l| !l.contains("AWS_PROFILE")));
    }

    #[test]
    fn trusted_accounts_resolve_to_numbers() {
        let mut registry = registry();
        registry
            .add_account(
                Account::new("trusting", "5555")
                    .with_bootstrap(BootstrapPolicy::enabled(["a"], 1).trusting(["pipelines"])),
            )
            .unwrap();

        let sets = commands(
            account_bootstrap_commands(&registry, "trusting", None, true, 1).unwrap(),
        );
        assert!(sets[0]
            .render()
            .contains("--trust 4444 --trust-for-lookup 4444"));
    }

    #[test]
    fn unresolvable_trusted_account_fails() {
        let mut registry = registry();
        registry
            .add_account(
                Account::new("trusting", "5555")
                    .with_bootstrap(BootstrapPolicy::enabled(["a"], 1).trusting(["x"])),
            )
            .unwrap();

        let err = account_bootstrap_commands(&registry, "trusting", None, true, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotFound);
    }

    #[test]
    fn missing_profile_policy_surfaces_on_use() {
        let mut registry: Registry<()> = Registry::default();
        registry
            .add_account(
                Account::new("workload", "3333").with_bootstrap(BootstrapPolicy::enabled(["a"], 1)),
            )
            .unwrap();

        let err = account_bootstrap_commands(&registry, "workload", None, false, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingPolicy);
        assert!(account_bootstrap_commands(&registry, "workload", None, true, 1).is_ok());
    }

    #[test]
    fn all_accounts_collects_skips_and_continues() {
        let registry = registry();
        let options = BootstrapOptions {
            region: Some("b".to_string()),
            no_default_profiles: true,
            ..Default::default()
        };
        let out = bootstrap_commands(&registry, &options, 5).unwrap();

        assert_eq!(out.command_sets.len(), 1);
        assert!(out.command_sets[0].render().contains("aws://3333/b"));
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(
            out.skipped[0].to_string(),
            "Skipping account pipelines for selected region b, as not enabled"
        );
    }

    #[test]
    fn generation_is_repeatable() {
        let registry = registry();
        let options = BootstrapOptions::default();
        let first = bootstrap_commands(&registry, &options, 6).unwrap();
        let second = bootstrap_commands(&registry, &options, 6).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parses_string_version_from_template() {
        let template = r#"
Description: This stack includes resources needed to deploy AWS CDK apps into this environment
Conditions:
  HasTrustedAccounts:
    Fn::Not:
      - Fn::Equals:
          - ""
          - Fn::Join:
              - ""
              - Ref: TrustedAccounts
Resources:
  CdkBootstrapVersion:
    Type: AWS::SSM::Parameter
    Properties:
      Type: String
      Name: !Sub '/cdk-bootstrap/${Qualifier}/version'
      Value: '21'
"#;
        assert_eq!(parse_bootstrap_version(template).unwrap(), 21);
    }

    #[test]
    fn parses_numeric_version() {
        let template = "Resources:\n  CdkBootstrapVersion:\n    Properties:\n      Value: 14\n";
        assert_eq!(parse_bootstrap_version(template).unwrap(), 14);
    }

    #[test]
    fn missing_version_is_fatal() {
        let err = parse_bootstrap_version("Resources: {}\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::VersionDetection);
    }
}
