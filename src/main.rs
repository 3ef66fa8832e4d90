use clap::{Parser, Subcommand};

use commands::GlobalArgs;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    Raw,
}

mod commands;
mod output;

use commands::{activate, bootstrap_apply, pipeline_apply, plan};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "cdk-manager")]
#[command(version = VERSION)]
#[command(about = "Generate and run CDK bootstrap, pipeline and activation commands")]
struct Cli {
    /// Manifest file (defaults to $CDK_MANAGER_CONFIG, then ./cdk-manager.{json,yaml,yml,toml})
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap accounts and regions with the CDK toolkit stack
    BootstrapApply(bootstrap_apply::BootstrapApplyArgs),
    /// Deploy pipeline stacks from each instance's branch
    PipelineApply(pipeline_apply::PipelineApplyArgs),
    /// Print export lines selecting an account and instance
    Activate(activate::ActivateArgs),
    /// Show the pipeline stages for an instance
    Plan(plan::PlanArgs),
    /// List configured accounts and instances
    List,
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::BootstrapApply(_) | Commands::PipelineApply(_) | Commands::Activate(_) => {
            ResponseMode::Raw
        }
        Commands::Plan(_) | Commands::List => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { config: cli.config };

    let exit_code = match response_mode(&cli.command) {
        ResponseMode::Raw => commands::run_raw(cli.command, &global),
        ResponseMode::Json => {
            let (json_result, exit_code) = commands::run_json(cli.command, &global);
            match output::print_json_result(json_result) {
                Ok(()) => exit_code,
                Err(err) => output::print_raw_error(&err),
            }
        }
    };

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cdk-manager",
            "pipeline-apply",
            "--deployment-suffix",
            "blue",
            "--config",
            "infra.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("infra.yaml"));
        match cli.command {
            Commands::PipelineApply(args) => {
                assert_eq!(args.deployment_suffix.as_deref(), Some("blue"));
                assert!(!args.apply);
            }
            _ => panic!("expected pipeline-apply"),
        }
    }

    #[test]
    fn generator_commands_use_raw_output() {
        let cli = Cli::try_parse_from(["cdk-manager", "activate", "--pipeline-account"]).unwrap();
        assert!(matches!(response_mode(&cli.command), ResponseMode::Raw));
        let cli = Cli::try_parse_from(["cdk-manager", "list"]).unwrap();
        assert!(matches!(response_mode(&cli.command), ResponseMode::Json));
    }

    #[test]
    fn plan_suffix_requires_account() {
        assert!(Cli::try_parse_from(["cdk-manager", "plan", "--suffix", "blue"]).is_err());
    }

    #[test]
    fn exit_codes_are_clamped() {
        assert_eq!(exit_code_to_u8(-1), 0);
        assert_eq!(exit_code_to_u8(20), 20);
        assert_eq!(exit_code_to_u8(300), 255);
    }
}
