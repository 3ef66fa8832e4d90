use clap::Args;

use cdk_manager::bootstrap::{self, BootstrapOptions};
use cdk_manager::command;

use super::GlobalArgs;

#[derive(Args)]
pub struct BootstrapApplyArgs {
    /// Only bootstrap this account
    #[arg(long)]
    pub account: Option<String>,

    /// Only bootstrap this region
    #[arg(long)]
    pub region: Option<String>,

    /// Do not set AWS_PROFILE from the bootstrap profile policy
    #[arg(long)]
    pub no_default_profiles: bool,

    /// Run the commands instead of printing them
    #[arg(long)]
    pub apply: bool,
}

pub fn run(args: BootstrapApplyArgs, global: &GlobalArgs) -> cdk_manager::Result<i32> {
    let registry = global.load_registry()?;
    let current_version = bootstrap::detect_bootstrap_version(&registry)?;
    cdk_manager::log_status!("bootstrap", "Toolkit bootstrap version is {}", current_version);

    let options = BootstrapOptions {
        account: args.account,
        region: args.region,
        no_default_profiles: args.no_default_profiles,
    };
    let generated = bootstrap::bootstrap_commands(&registry, &options, current_version)?;

    for skip in &generated.skipped {
        eprintln!("{}", skip);
    }

    if !args.apply {
        super::print_would_run(&generated.command_sets);
        return Ok(0);
    }

    eprintln!("Bootstrapping:");
    command::execute_all(&generated.command_sets)?;
    Ok(0)
}
