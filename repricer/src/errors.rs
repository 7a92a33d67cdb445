use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// The addressed node no longer exists in the host's live tree.
    #[error("Element is detached from the tree: {0}")]
    ElementDetached(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Automation service has stopped")]
    ServiceStopped,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
