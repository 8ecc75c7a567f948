//! # Errors
//!
//! Error taxonomy for the resource client and the import pipeline.
//!
//! - [`ClientError`] is what a [`crate::client::ResourceClient`] reports.
//! - [`ImportError`] is the classified failure of one operation.
//! - [`ImportFailure`] is what [`crate::import::Importer::run`] returns: the
//!   failing [`Stage`] plus the last resource state that was observed.

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a resource client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Create found a resource with the same name
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Update carried a stale resource version
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Body was rejected by schema validation
    #[error("invalid resource: {0}")]
    Invalid(String),
    /// Network or API server failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Transport failures are the only ones worth retrying while polling
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Classified failure of a single import operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    /// Malformed input, rejected before any API call
    #[error("validation failed: {0}")]
    Validation(String),
    /// Name collision on create; re-submitting collides on the same name
    #[error("conflict: {0} already exists")]
    AlreadyExists(String),
    /// Stale resource version on update; re-fetch and retry
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid resource: {0}")]
    Invalid(String),
    /// Access-token binding reached a failed phase
    #[error("access token binding entered phase {phase}: {message}")]
    Provisioning { phase: String, message: String },
    /// Detection query completed unsuccessfully
    #[error("component detection failed: {message}")]
    Detection { message: String },
    #[error("timed out after {waited:?}")]
    Timeout { waited: Duration },
    #[error("transport error: {0}")]
    Transport(String),
    /// The run was abandoned by its caller
    #[error("import cancelled")]
    Cancelled,
}

impl ImportError {
    /// Whether repeating the failed operation may succeed
    ///
    /// A name collision is not retryable: generated names are deterministic,
    /// so a repeat collides again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ImportError::Conflict(_) | ImportError::Timeout { .. } | ImportError::Transport(_)
        )
    }
}

impl From<ClientError> for ImportError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::AlreadyExists(m) => ImportError::AlreadyExists(m),
            ClientError::Conflict(m) => ImportError::Conflict(m),
            ClientError::NotFound(m) => ImportError::NotFound(m),
            ClientError::Invalid(m) => ImportError::Invalid(m),
            ClientError::Transport(m) => ImportError::Transport(m),
        }
    }
}

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validation,
    Binding,
    Detection,
    Application,
    Component,
    IntegrationTest,
}

impl Stage {
    /// Stages that run once the Application exists
    #[must_use]
    pub fn follows_application(&self) -> bool {
        matches!(self, Stage::Component | Stage::IntegrationTest)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Binding => "binding",
            Stage::Detection => "detection",
            Stage::Application => "application",
            Stage::Component => "component",
            Stage::IntegrationTest => "integration-test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An [`ImportError`] together with the last resource state observed for it
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct OperationError {
    pub error: ImportError,
    pub last_status: Option<Value>,
}

impl OperationError {
    #[must_use]
    pub fn new(error: ImportError) -> Self {
        Self {
            error,
            last_status: None,
        }
    }

    #[must_use]
    pub fn with_status(error: ImportError, last_status: Option<Value>) -> Self {
        Self { error, last_status }
    }
}

impl From<ImportError> for OperationError {
    fn from(error: ImportError) -> Self {
        Self::new(error)
    }
}

impl From<ClientError> for OperationError {
    fn from(err: ClientError) -> Self {
        Self::new(err.into())
    }
}

/// Failure of one component in the fan-out stage
#[derive(Debug, Clone)]
pub struct ComponentFailure {
    /// Resource name the component would have been created under
    pub component: String,
    pub error: OperationError,
}

/// Terminal failure of an import run
#[derive(Debug, Clone, Error)]
pub enum ImportFailure {
    /// A sequential stage failed; later stages were not attempted
    #[error("{stage} stage failed: {}", .error.error)]
    Stage { stage: Stage, error: OperationError },
    /// One or more components failed; siblings that succeeded are listed
    #[error("{} of {} components failed", .failures.len(), .failures.len() + .created.len())]
    Components {
        application: String,
        created: Vec<String>,
        failures: Vec<ComponentFailure>,
    },
}

impl ImportFailure {
    pub(crate) fn at(stage: Stage, error: impl Into<OperationError>) -> Self {
        ImportFailure::Stage {
            stage,
            error: error.into(),
        }
    }

    /// Stage the failure is attributed to
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            ImportFailure::Stage { stage, .. } => *stage,
            ImportFailure::Components { .. } => Stage::Component,
        }
    }

    /// Whether re-submitting the same request may succeed
    ///
    /// Once the Application has been created, a re-submission collides with
    /// it; the remaining components must be imported in-context instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ImportFailure::Stage { stage, error } => {
                error.error.is_retryable() && !stage.follows_application()
            }
            ImportFailure::Components { .. } => false,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ImportFailure::Stage {
                error: OperationError {
                    error: ImportError::Cancelled,
                    ..
                },
                ..
            }
        )
    }
}
