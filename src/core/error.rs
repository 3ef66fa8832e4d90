use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigInvalidFile,
    ConfigInvalidValue,
    ConfigMissingPolicy,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    DuplicateAccount,
    DuplicateInstance,
    AccountNotFound,
    InstanceNotFound,
    NoInstanceSelected,

    VersionDetection,
    DirtyWorkingCopy,
    GitCommandFailed,
    ExternalCommand,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => "config.not_found",
            ErrorCode::ConfigInvalidFile => "config.invalid_file",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigMissingPolicy => "config.missing_policy",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::DuplicateAccount => "registry.duplicate_account",
            ErrorCode::DuplicateInstance => "registry.duplicate_instance",
            ErrorCode::AccountNotFound => "account.not_found",
            ErrorCode::InstanceNotFound => "instance.not_found",
            ErrorCode::NoInstanceSelected => "activate.no_instance_selected",

            ErrorCode::VersionDetection => "bootstrap.version_detection_failed",
            ErrorCode::DirtyWorkingCopy => "git.dirty_working_copy",
            ErrorCode::GitCommandFailed => "git.command_failed",
            ErrorCode::ExternalCommand => "command.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Process exit code for a failure carrying this code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ConfigNotFound
            | ErrorCode::ConfigInvalidFile
            | ErrorCode::ConfigInvalidValue
            | ErrorCode::ConfigMissingPolicy
            | ErrorCode::ValidationMissingArgument
            | ErrorCode::ValidationInvalidArgument
            | ErrorCode::DuplicateAccount
            | ErrorCode::DuplicateInstance => 2,

            ErrorCode::DirtyWorkingCopy | ErrorCode::GitCommandFailed => 3,

            ErrorCode::AccountNotFound
            | ErrorCode::InstanceNotFound
            | ErrorCode::NoInstanceSelected => 4,

            ErrorCode::VersionDetection | ErrorCode::ExternalCommand => 20,

            ErrorCode::InternalIoError
            | ErrorCode::InternalJsonError
            | ErrorCode::InternalUnexpected => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateAccountDetails {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceKeyDetails {
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidFileDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCommandDetails {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn duplicate_account(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::DuplicateAccount,
            format!("Account name already exists: {}", name),
            to_details(DuplicateAccountDetails { name }),
        )
    }

    pub fn duplicate_instance(account_name: impl Into<String>, suffix: Option<&str>) -> Self {
        let account_name = account_name.into();
        Self::new(
            ErrorCode::DuplicateInstance,
            format!(
                "Suffix {} already exists in account {}",
                display_suffix(suffix),
                account_name
            ),
            to_details(InstanceKeyDetails {
                account_name,
                suffix: suffix.map(str::to_string),
            }),
        )
    }

    pub fn account_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::AccountNotFound,
            format!("No account with name: {}", name),
            to_details(NotFoundDetails { id: name }),
        )
        .with_hint("Run 'cdk-manager list' to see configured accounts")
    }

    pub fn instance_not_found(account_name: impl Into<String>, suffix: Option<&str>) -> Self {
        let account_name = account_name.into();
        Self::new(
            ErrorCode::InstanceNotFound,
            format!(
                "No instance with suffix: {} found for account: {}",
                display_suffix(suffix),
                account_name
            ),
            to_details(InstanceKeyDetails {
                account_name,
                suffix: suffix.map(str::to_string),
            }),
        )
    }

    pub fn no_instance_selected(account_name: impl Into<String>, suffix: Option<&str>) -> Self {
        let account_name = account_name.into();
        Self::new(
            ErrorCode::NoInstanceSelected,
            "No instance found, so must select the pipeline account",
            to_details(InstanceKeyDetails {
                account_name,
                suffix: suffix.map(str::to_string),
            }),
        )
        .with_hint("Pass --pipeline-account to activate the pipeline account instead")
    }

    pub fn version_detection(problem: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::VersionDetection,
            "Unable to find a version number from bootstrap template",
            serde_json::json!({ "problem": problem.into() }),
        )
    }

    pub fn dirty_working_copy(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DirtyWorkingCopy,
            "Working directory not clean, aborting. Commit code, then try again.",
            serde_json::json!({ "path": path.into() }),
        )
    }

    pub fn git_command_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitCommandFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn external_command(details: ExternalCommandDetails) -> Self {
        let message = match details.exit_code {
            Some(code) => format!("Command failed with exit code {}", code),
            None => "Command failed to run".to_string(),
        };
        Self::new(ErrorCode::ExternalCommand, message, to_details(details))
    }

    pub fn config_not_found(searched: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            "No manifest found",
            serde_json::json!({ "searched": searched }),
        )
        .with_hint("Pass --config <PATH> or set CDK_MANAGER_CONFIG")
    }

    pub fn config_invalid_file(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidFile,
            "Invalid manifest file",
            to_details(ConfigInvalidFileDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value: {}", problem),
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem,
            }),
        )
    }

    pub fn config_missing_policy(policy: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingPolicy,
            format!("No {} policy configured", policy),
            serde_json::json!({ "policy": policy }),
        )
        .with_hint(format!(
            "Set policies.{} in the manifest, or pass --no-default-profiles",
            policy
        ))
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        let message = format!("Missing required argument: {}", args.join(", "));
        Self::new(
            ErrorCode::ValidationMissingArgument,
            message,
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

fn display_suffix(suffix: Option<&str>) -> &str {
    suffix.unwrap_or("(none)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_dotted_names() {
        assert_eq!(ErrorCode::DuplicateAccount.as_str(), "registry.duplicate_account");
        assert_eq!(ErrorCode::NoInstanceSelected.as_str(), "activate.no_instance_selected");
    }

    #[test]
    fn instance_not_found_omits_absent_suffix() {
        let err = Error::instance_not_found("acct1", None);
        assert_eq!(err.details["accountName"], "acct1");
        assert!(err.details.get("suffix").is_none());
        assert!(err.message.contains("(none)"));
    }

    #[test]
    fn missing_policy_carries_hint() {
        let err = Error::config_missing_policy("bootstrapProfile");
        assert_eq!(err.code, ErrorCode::ConfigMissingPolicy);
        assert_eq!(err.hints.len(), 1);
        assert!(err.hints[0].message.contains("policies.bootstrapProfile"));
    }

    #[test]
    fn exit_codes_group_by_category() {
        assert_eq!(ErrorCode::DuplicateInstance.exit_code(), 2);
        assert_eq!(ErrorCode::DirtyWorkingCopy.exit_code(), 3);
        assert_eq!(ErrorCode::AccountNotFound.exit_code(), 4);
        assert_eq!(ErrorCode::ExternalCommand.exit_code(), 20);
    }

    #[test]
    fn duplicate_account_details_name_the_account() {
        let err = Error::duplicate_account("acct1");
        assert_eq!(err.details["name"], "acct1");
        assert!(err.details.get("id").is_none());
    }

    #[test]
    fn unexpected_errors_map_to_internal_exit_code() {
        let err = Error::internal_unexpected("pattern failed");
        assert_eq!(err.code.as_str(), "internal.unexpected");
        assert_eq!(err.code.exit_code(), 1);
    }
}
