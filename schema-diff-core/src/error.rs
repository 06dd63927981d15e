use schema_diff_container::ContainerError;
use schema_diff_extract::ExtractError;
use schema_diff_provisioner::ProvisionError;
use thiserror::Error;

/// The error kinds a comparison run can fail with. Each maps to one of the
/// exit codes the CLI shell is responsible for choosing (2-5); this crate
/// only classifies, it never decides a process exit code itself.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("container startup failed: {0}")]
    ContainerStartup(String),
}

impl From<ContainerError> for CoreError {
    fn from(err: ContainerError) -> Self {
        CoreError::ContainerStartup(err.to_string())
    }
}

impl From<ProvisionError> for CoreError {
    fn from(err: ProvisionError) -> Self {
        CoreError::Provisioning(err.to_string())
    }
}

impl From<ExtractError> for CoreError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Configuration(message) => CoreError::Configuration(message),
            other => CoreError::Database(other.to_string()),
        }
    }
}
