use clap::Args;

use cdk_manager::pipeline::{self, PipelineApplyOptions};
use cdk_manager::{command, git};

use super::GlobalArgs;

#[derive(Args)]
pub struct PipelineApplyArgs {
    /// Only deploy pipelines for this account
    #[arg(long)]
    pub account: Option<String>,

    /// Do not set AWS_PROFILE from the pipeline profile policy
    #[arg(long)]
    pub no_default_profiles: bool,

    /// Only deploy instances with this suffix
    #[arg(long)]
    pub deployment_suffix: Option<String>,

    /// Run the commands instead of printing them
    #[arg(long)]
    pub apply: bool,
}

pub fn run(args: PipelineApplyArgs, global: &GlobalArgs) -> cdk_manager::Result<i32> {
    // Each deploy switches branches, so local edits would be carried along or block it.
    git::ensure_clean_working_copy(&global.cwd()?)?;

    let registry = global.load_registry()?;
    let options = PipelineApplyOptions {
        account: args.account,
        suffix: args.deployment_suffix,
        no_default_profiles: args.no_default_profiles,
    };
    let command_sets = pipeline::pipeline_apply_commands(&registry, &options)?;

    if !args.apply {
        super::print_would_run(&command_sets);
        return Ok(0);
    }

    eprintln!("Applying pipelines:");
    command::execute_all(&command_sets).map_err(|e| {
        e.with_hint("A failed deploy leaves the instance branch checked out; run 'git checkout -' to return")
    })?;
    Ok(0)
}
