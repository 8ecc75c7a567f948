//! # Constants
//!
//! Shared constants used throughout the importer.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config::ImportConfig`]).

/// Name prefix for access-token bindings created by an import
pub const BINDING_NAME_PREFIX: &str = "appstudio-import";

/// Secret type requested for injected git credentials
pub const BASIC_AUTH_SECRET_TYPE: &str = "kubernetes.io/basic-auth";

/// Permission area requested on the repository
pub const REPOSITORY_PERMISSION_AREA: &str = "repository";

/// Condition type that marks a ComponentDetectionQuery as finished
pub const CONDITION_COMPLETED: &str = "Completed";

/// The "True" status value for conditions
pub const STATUS_TRUE: &str = "True";

/// The "False" status value for conditions
pub const STATUS_FALSE: &str = "False";

/// Label marking an IntegrationTestScenario as non-blocking
pub const OPTIONAL_TEST_LABEL: &str = "test.appstudio.openshift.io/optional";

/// Default field manager sent with create/update requests
pub const DEFAULT_FIELD_MANAGER: &str = "appstudio-import";

/// Default interval between access-token binding polls (milliseconds)
pub const DEFAULT_BINDING_POLL_INTERVAL_MS: u64 = 1000;

/// Default time to wait for binding injection (seconds)
pub const DEFAULT_BINDING_TIMEOUT_SECS: u64 = 60;

/// Default interval between detection query polls (milliseconds)
pub const DEFAULT_DETECTION_POLL_INTERVAL_MS: u64 = 1000;

/// Default time to wait for component detection (seconds)
/// Detection clones the repository, so it is given more headroom than binding
pub const DEFAULT_DETECTION_TIMEOUT_SECS: u64 = 120;

/// Default poll jitter as a percentage of the poll interval
pub const DEFAULT_POLL_JITTER_PERCENT: u8 = 20;

/// Maximum length of a Kubernetes label-style resource name
pub const MAX_RESOURCE_NAME_LEN: usize = 63;

/// Length of the random suffix appended to generated names
pub const NAME_SUFFIX_LEN: usize = 6;
