//! # Application
//!
//! An Application groups the Components imported from one or more repositories.

use crate::crd::status::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Application Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: appstudio.redhat.com/v1alpha1
/// kind: Application
/// metadata:
///   name: test-application
///   namespace: test-ns
/// spec:
///   displayName: Test Application
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Human-readable name as entered by the user
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devfile: Option<String>,
}
