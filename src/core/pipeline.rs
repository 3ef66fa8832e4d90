//! Pipeline deploy command generation and pipeline target selection.

use serde::Serialize;

use crate::command::{Command, CommandSet, EnvironmentVariables};
use crate::config::{Account, Instance};
use crate::error::{Error, Result};
use crate::git;
use crate::registry::Registry;

pub const TARGET_ACCOUNT: &str = "TARGET_ACCOUNT";
pub const TARGET_ENVIRONMENT_SUFFIX: &str = "TARGET_ENVIRONMENT_SUFFIX";

#[derive(Debug, Clone, Default)]
pub struct PipelineApplyOptions {
    pub account: Option<String>,
    pub suffix: Option<String>,
    pub no_default_profiles: bool,
}

/// Deploy one instance's pipeline stack from its branch.
///
/// Steps: checkout the instance branch, deploy, checkout the previous
/// branch. The steps are `&&`-chained, so a failed deploy leaves the
/// instance branch checked out.
pub fn pipeline_deploy_command_set<A>(
    registry: &Registry<A>,
    account: &Account,
    instance: &Instance<A>,
    no_default_profiles: bool,
) -> Result<CommandSet> {
    let stack_name = registry.policies().pipeline_stack_name(account, instance)?;

    let mut env = EnvironmentVariables::new();
    env.set(TARGET_ACCOUNT, account.name.as_str());
    if !no_default_profiles {
        env.set(
            "AWS_PROFILE",
            registry.policies().pipeline_profile(account, Some(instance))?,
        );
    }
    if let Some(suffix) = instance.suffix() {
        env.set(TARGET_ENVIRONMENT_SUFFIX, suffix);
    }

    Ok(CommandSet::new(vec![
        Command::new(git::checkout_command(&instance.branch_name)),
        Command::with_env(registry.toolkit().deploy(&stack_name), env),
        Command::new(git::checkout_previous_command()),
    ]))
}

/// Command sets for one account's instances, optionally narrowed to a suffix.
///
/// An empty suffix filter selects every instance.
pub fn account_pipeline_commands<A>(
    registry: &Registry<A>,
    account_name: &str,
    suffix: Option<&str>,
    no_default_profiles: bool,
) -> Result<Vec<CommandSet>> {
    let account = registry.get_account(account_name)?;
    let suffix = suffix.filter(|s| !s.is_empty());

    registry
        .instances_for_account(&account.name)?
        .into_iter()
        .filter(|instance| suffix.is_none() || instance.suffix() == suffix)
        .map(|instance| pipeline_deploy_command_set(registry, account, instance, no_default_profiles))
        .collect()
}

pub fn pipeline_apply_commands<A>(
    registry: &Registry<A>,
    options: &PipelineApplyOptions,
) -> Result<Vec<CommandSet>> {
    let account_names: Vec<&str> = match options.account.as_deref() {
        Some(name) => vec![name],
        None => registry.account_names(),
    };

    let mut command_sets = Vec::new();
    for account_name in account_names {
        command_sets.extend(account_pipeline_commands(
            registry,
            account_name,
            options.suffix.as_deref(),
            options.no_default_profiles,
        )?);
    }
    Ok(command_sets)
}

// ============================================================================
// Target selection
// ============================================================================

/// Resolve the account and instance named by `TARGET_ACCOUNT` and
/// `TARGET_ENVIRONMENT_SUFFIX`.
pub fn select_target_from_env<A>(registry: &Registry<A>) -> Result<(&Account, &Instance<A>)> {
    let account_name = std::env::var(TARGET_ACCOUNT)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation_missing_argument(vec![TARGET_ACCOUNT.to_string()]))?;
    let suffix = std::env::var(TARGET_ENVIRONMENT_SUFFIX)
        .ok()
        .filter(|v| !v.is_empty());

    crate::log_status!("plan", "Using account {}", account_name);
    crate::log_status!("plan", "Using target suffix {}", suffix.as_deref().unwrap_or("(none)"));

    select_target(registry, &account_name, suffix.as_deref())
}

pub fn select_target<'r, A>(
    registry: &'r Registry<A>,
    account_name: &str,
    suffix: Option<&str>,
) -> Result<(&'r Account, &'r Instance<A>)> {
    let account = registry.get_account(account_name)?;
    let instance =
        registry.instance_for_account(account_name, suffix.filter(|s| !s.is_empty()))?;
    Ok((account, instance))
}

// ============================================================================
// Pipeline plan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub name: String,
    pub account_name: String,
    pub account_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub requires_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePlan {
    pub stack_name: String,
    pub branch_name: String,
    pub stages: Vec<PipelineStage>,
}

/// `<account>` or `<account>-<suffix>`.
pub fn stage_name(account_name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}-{}", account_name, suffix),
        None => account_name.to_string(),
    }
}

fn stage(account: &Account, suffix: Option<&str>, requires_approval: bool) -> PipelineStage {
    PipelineStage {
        name: stage_name(&account.name, suffix),
        account_name: account.name.clone(),
        account_number: account.account_number.clone(),
        suffix: suffix.map(str::to_string),
        requires_approval,
    }
}

/// Stages in deployment order: nested instances first, the instance itself last.
pub fn pipeline_plan<A>(
    registry: &Registry<A>,
    account: &Account,
    instance: &Instance<A>,
) -> Result<PipelinePlan> {
    let mut stages = Vec::with_capacity(instance.nested_instances.len() + 1);
    for nested in &instance.nested_instances {
        let nested_account = registry.get_account(&nested.account_name)?;
        stages.push(stage(
            nested_account,
            nested.suffix.as_deref().filter(|s| !s.is_empty()),
            nested.requires_approval,
        ));
    }
    stages.push(stage(account, instance.suffix(), instance.requires_approval));

    Ok(PipelinePlan {
        stack_name: registry.policies().pipeline_stack_name(account, instance)?,
        branch_name: instance.branch_name.clone(),
        stages,
    })
}
