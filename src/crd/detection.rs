//! # Component Detection Query
//!
//! Asks the platform to inspect a repository and enumerate buildable components.
//! The query is finished once its `Completed` condition leaves `Unknown`.

use crate::constants::{CONDITION_COMPLETED, STATUS_FALSE, STATUS_TRUE};
use crate::crd::component::{ComponentSourceSpec, GitSourceSpec};
use crate::crd::status::{find_condition, Condition};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "ComponentDetectionQuery",
    namespaced,
    status = "ComponentDetectionQueryStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQuerySpec {
    pub git: GitSourceSpec,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQueryStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Whether any component was found
    #[serde(default)]
    pub component_detected: bool,
    /// Detected components keyed by an opaque ID
    #[serde(default)]
    pub detected_components: BTreeMap<String, DetectedComponent>,
}

impl ComponentDetectionQueryStatus {
    fn completed(&self) -> Option<&Condition> {
        find_condition(&self.conditions, CONDITION_COMPLETED)
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.completed().is_some_and(|c| c.status == STATUS_TRUE)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.completed().is_some_and(|c| c.status == STATUS_FALSE)
    }

    /// Message of the `Completed` condition, if any
    #[must_use]
    pub fn completion_message(&self) -> Option<&str> {
        self.completed().and_then(|c| c.message.as_deref().or(c.reason.as_deref()))
    }
}

/// One buildable unit found in the repository
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedComponent {
    pub component_stub: ComponentStub,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default)]
    pub devfile_found: bool,
}

/// Partial Component spec suggested by detection
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStub {
    pub component_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default)]
    pub source: ComponentSourceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<i32>,
}
