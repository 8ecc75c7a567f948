//! # Integration Test Scenario
//!
//! Optional test pipeline attached to an Application during import.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "IntegrationTestScenario",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationTestScenarioSpec {
    pub application: String,
    /// Tekton bundle image holding the pipeline
    pub bundle: String,
    /// Pipeline name inside the bundle
    pub pipeline: String,
    #[serde(default)]
    pub contexts: Vec<TestContext>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct TestContext {
    pub name: String,
    pub description: String,
}
