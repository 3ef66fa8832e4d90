use std::path::PathBuf;

use cdk_manager::{manifest, Error, Registry};
use serde_json::Value;

pub type CmdResult<T> = cdk_manager::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Manifest path from `--config`.
    pub config: Option<String>,
}

impl GlobalArgs {
    pub fn cwd(&self) -> cdk_manager::Result<PathBuf> {
        std::env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("read current dir".to_string())))
    }

    pub fn load_registry(&self) -> cdk_manager::Result<Registry<Value>> {
        manifest::load_registry(self.config.as_deref(), &self.cwd()?)
    }
}

pub mod activate;
pub mod bootstrap_apply;
pub mod list;
pub mod pipeline_apply;
pub mod plan;

/// Print rendered command sets, or note that there is nothing to run.
pub(crate) fn print_would_run(command_sets: &[cdk_manager::CommandSet]) {
    eprintln!("Not doing anything without --apply flag. Would run the following:");
    if command_sets.is_empty() {
        eprintln!("(no commands to run)");
        return;
    }
    for command_set in command_sets {
        println!("{}", command_set.render());
    }
}

/// Run a raw-output command: its result is only an exit code.
pub(crate) fn run_raw(command: crate::Commands, global: &GlobalArgs) -> i32 {
    let result = match command {
        crate::Commands::BootstrapApply(args) => bootstrap_apply::run(args, global),
        crate::Commands::PipelineApply(args) => pipeline_apply::run(args, global),
        crate::Commands::Activate(args) => activate::run(args, global),
        _ => Err(Error::validation_invalid_argument(
            "output_mode",
            "Command does not support raw output",
        )),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => crate::output::print_raw_error(&err),
    }
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (cdk_manager::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::List => dispatch!((), global, list),
        _ => {
            let err = Error::validation_invalid_argument(
                "output_mode",
                "Command uses raw output mode",
            );
            crate::output::map_cmd_result_to_json::<serde_json::Value>(Err(err))
        }
    }
}
