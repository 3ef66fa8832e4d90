use clap::Args;

use cdk_manager::activate::{self, ActivateOptions};

use super::GlobalArgs;

#[derive(Args)]
pub struct ActivateArgs {
    /// Account to activate (defaults to the defaultAccount policy)
    #[arg(long)]
    pub account: Option<String>,

    /// Instance suffix within the account
    #[arg(long)]
    pub suffix: Option<String>,

    /// Activate the pipeline profile and region instead of the instance ones
    #[arg(long)]
    pub pipeline_account: bool,

    /// Override AWS_REGION
    #[arg(long)]
    pub region: Option<String>,

    /// Do not set AWS_PROFILE
    #[arg(long)]
    pub no_default_profiles: bool,
}

/// Prints `export` lines; use as `eval "$(cdk-manager activate ...)"`.
pub fn run(args: ActivateArgs, global: &GlobalArgs) -> cdk_manager::Result<i32> {
    let registry = global.load_registry()?;
    let options = ActivateOptions {
        account: args.account,
        suffix: args.suffix,
        region: args.region,
        pipeline_account: args.pipeline_account,
        no_default_profiles: args.no_default_profiles,
    };

    for line in activate::activation_exports(&registry, &options)? {
        println!("{}", line);
    }
    Ok(0)
}
