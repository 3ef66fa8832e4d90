//! Command lines for the CDK toolkit.

use serde::{Deserialize, Serialize};

pub const ADMIN_EXECUTION_POLICY: &str = "arn:aws:iam::aws:policy/AdministratorAccess";

/// How the toolkit CLI is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toolkit {
    #[serde(default = "default_command")]
    pub command: String,
    /// Variant whose stdout carries only the toolkit's own output.
    #[serde(default = "default_quiet_command")]
    pub quiet_command: String,
}

impl Default for Toolkit {
    fn default() -> Self {
        Self {
            command: default_command(),
            quiet_command: default_quiet_command(),
        }
    }
}

fn default_command() -> String {
    "npm run -- cdk".to_string()
}

fn default_quiet_command() -> String {
    "npm run --silent -- cdk".to_string()
}

impl Toolkit {
    pub fn bootstrap(&self, account_number: &str, region: &str, trusted_account_numbers: &[&str]) -> String {
        let target = format!("aws://{}/{}", account_number, region);
        let mut parts = vec![self.command.as_str(), "bootstrap", target.as_str()];
        for &number in trusted_account_numbers {
            parts.extend(["--trust", number, "--trust-for-lookup", number]);
        }
        parts.extend(["--cloudformation-execution-policies", ADMIN_EXECUTION_POLICY]);
        parts.join(" ")
    }

    pub fn deploy(&self, stack_name: &str) -> String {
        format!(
            "{} deploy --require-approval never -e {}",
            self.command, stack_name
        )
    }

    pub fn show_bootstrap_template(&self) -> String {
        format!("{} bootstrap --show-template", self.quiet_command)
    }
}
