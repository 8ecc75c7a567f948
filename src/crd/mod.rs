//! # Custom Resource Definitions
//!
//! Typed AppStudio resources the importer creates and watches.
//!
//! ## Module Structure
//!
//! - `application.rs` - Application
//! - `component.rs` - Component and its git source
//! - `detection.rs` - ComponentDetectionQuery and detected components
//! - `binding.rs` - SPIAccessTokenBinding
//! - `integration.rs` - IntegrationTestScenario
//! - `status.rs` - Shared condition type

mod application;
mod binding;
mod component;
mod detection;
mod integration;
mod status;

use kube::core::ApiResource;
use kube::Resource;

// Re-export all public types
pub use application::{Application, ApplicationSpec, ApplicationStatus};
pub use binding::{
    BindingPhase, Permission, PermissionType, Permissions, SPIAccessTokenBinding,
    SPIAccessTokenBindingSpec, SPIAccessTokenBindingStatus, SecretTemplate, SyncedObjectRef,
};
pub use component::{
    Component, ComponentResources, ComponentSourceSpec, ComponentSpec, ComponentStatus, EnvVar,
    GitSourceSpec,
};
pub use detection::{
    ComponentDetectionQuery, ComponentDetectionQuerySpec, ComponentDetectionQueryStatus,
    ComponentStub, DetectedComponent,
};
pub use integration::{
    IntegrationTestScenario, IntegrationTestScenarioSpec, TestContext,
};
pub use status::{find_condition, Condition};

/// Model descriptor (group/version/kind/plural) for a typed resource
///
/// ```
/// use appstudio_import::crd::{model, Application};
///
/// let ar = model::<Application>();
/// assert_eq!(ar.api_version, "appstudio.redhat.com/v1alpha1");
/// assert_eq!(ar.kind, "Application");
/// ```
#[must_use]
pub fn model<K>() -> ApiResource
where
    K: Resource<DynamicType = ()>,
{
    ApiResource::erase::<K>(&())
}
