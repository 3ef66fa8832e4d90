use clap::Args;
use serde::Serialize;

use cdk_manager::pipeline::{self, PipelinePlan};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct PlanArgs {
    /// Account of the instance (defaults to TARGET_ACCOUNT)
    #[arg(long)]
    pub account: Option<String>,

    /// Instance suffix (defaults to TARGET_ENVIRONMENT_SUFFIX)
    #[arg(long, requires = "account")]
    pub suffix: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    pub command: &'static str,
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub plan: PipelinePlan,
}

pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let registry = global.load_registry()?;

    let (account, instance) = match args.account.as_deref() {
        Some(name) => pipeline::select_target(&registry, name, args.suffix.as_deref())?,
        None => pipeline::select_target_from_env(&registry)?,
    };
    let plan = pipeline::pipeline_plan(&registry, account, instance)?;

    Ok((
        PlanOutput {
            command: "plan",
            account_name: account.name.clone(),
            suffix: instance.suffix().map(str::to_string),
            plan,
        },
        0,
    ))
}
