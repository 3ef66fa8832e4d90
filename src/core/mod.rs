pub mod activate;
pub mod bootstrap;
pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod toolkit;

// Re-export common types for convenience
pub use command::{Command, CommandSet, EnvironmentVariables};
pub use config::{Account, BootstrapPolicy, Instance, SubInstance};
pub use error::{Error, ErrorCode, Result};
pub use policy::Policies;
pub use registry::Registry;
