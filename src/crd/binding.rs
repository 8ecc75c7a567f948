//! # SPI Access Token Binding
//!
//! Requests git credentials for a repository. The service provider integration
//! injects a secret once a token is available and reports it through `phase`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1beta1",
    kind = "SPIAccessTokenBinding",
    namespaced,
    status = "SPIAccessTokenBindingStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SPIAccessTokenBindingSpec {
    pub repo_url: String,
    pub permissions: Permissions,
    pub secret: SecretTemplate,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Permissions {
    #[serde(default)]
    pub required: Vec<Permission>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Permission {
    pub r#type: PermissionType,
    pub area: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PermissionType {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

/// Secret the binding should be injected into
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SecretTemplate {
    pub name: String,
    pub r#type: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BindingPhase {
    #[default]
    Pending,
    Injected,
    Failed,
    Error,
    /// Any phase this client does not know about; treated as non-terminal
    #[serde(other)]
    Unknown,
}

impl BindingPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingPhase::Pending => "Pending",
            BindingPhase::Injected => "Injected",
            BindingPhase::Failed => "Failed",
            BindingPhase::Error => "Error",
            BindingPhase::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, BindingPhase::Failed | BindingPhase::Error)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SPIAccessTokenBindingStatus {
    #[serde(default)]
    pub phase: BindingPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_access_token_name: Option<String>,
    /// Secret actually created for this binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_object_ref: Option<SyncedObjectRef>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncedObjectRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}
