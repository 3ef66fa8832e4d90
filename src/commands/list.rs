use serde::Serialize;

use cdk_manager::Account;

use super::{CmdResult, GlobalArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub account_name: String,
    pub branch_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub requires_approval: bool,
    pub nested_instances: usize,
}

#[derive(Serialize)]
pub struct ListOutput {
    pub command: &'static str,
    pub accounts: Vec<Account>,
    pub instances: Vec<InstanceSummary>,
}

pub fn run(_args: (), global: &GlobalArgs) -> CmdResult<ListOutput> {
    let registry = global.load_registry()?;

    let instances = registry
        .instances()
        .iter()
        .map(|instance| InstanceSummary {
            account_name: instance.account_name.clone(),
            branch_name: instance.branch_name.clone(),
            suffix: instance.suffix().map(str::to_string),
            requires_approval: instance.requires_approval,
            nested_instances: instance.nested_instances.len(),
        })
        .collect();

    Ok((
        ListOutput {
            command: "list",
            accounts: registry.accounts().to_vec(),
            instances,
        },
        0,
    ))
}
