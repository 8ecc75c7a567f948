//! Common test utilities for import pipeline tests
//!
//! Builds importers over the in-memory client with deterministic names and
//! canned resource statuses.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use appstudio_import::client::InMemoryClient;
use appstudio_import::import::{ApplicationTarget, ComponentSource, ImportRequest};
use appstudio_import::naming::SequentialSuffix;
use appstudio_import::{ImportConfig, Importer};
use serde_json::{json, Value};

pub const NAMESPACE: &str = "test-ns";
pub const REPO: &str = "https://github.com/test/repository";

/// Defaults without jitter, so paused-clock tests are exact
pub fn config() -> ImportConfig {
    ImportConfig {
        poll_jitter_percent: 0,
        ..ImportConfig::default()
    }
}

pub fn importer(client: InMemoryClient) -> Importer<InMemoryClient> {
    Importer::new(client, config()).with_suffixes(SequentialSuffix::new())
}

/// New application with one git component and no secret
pub fn request() -> ImportRequest {
    ImportRequest {
        application: ApplicationTarget::New {
            display_name: "My Application".into(),
        },
        components: vec![ComponentSource::git("Test Component", REPO)],
        namespace: NAMESPACE.into(),
        secret: None,
        auto_detect: false,
        integration_test: None,
        dry_run: false,
    }
}

pub fn binding_pending() -> Value {
    json!({"phase": "Pending"})
}

pub fn binding_injected(secret: &str) -> Value {
    json!({
        "phase": "Injected",
        "linkedAccessTokenName": "token-1",
        "syncedObjectRef": {"name": secret, "kind": "Secret", "apiVersion": "v1"}
    })
}

pub fn binding_error(message: &str) -> Value {
    json!({"phase": "Error", "errorMessage": message})
}

pub fn detection_running() -> Value {
    json!({"conditions": [{"type": "Processing", "status": "True"}]})
}

/// Completed detection reporting `components` (ID to component JSON)
pub fn detection_completed(components: Value) -> Value {
    let detected = components.as_object().is_some_and(|m| !m.is_empty());
    json!({
        "conditions": [{"type": "Completed", "status": "True", "reason": "OK"}],
        "componentDetected": detected,
        "detectedComponents": components
    })
}

pub fn detection_failed(message: &str) -> Value {
    json!({
        "conditions": [{
            "type": "Completed",
            "status": "False",
            "reason": "Error",
            "message": message
        }]
    })
}

/// Detected component JSON as reported in a detection query status
pub fn detected_component(name: &str, url: &str, devfile: &str) -> Value {
    json!({
        "componentStub": {
            "componentName": name,
            "source": {"git": {"url": url, "devfileUrl": devfile}},
            "targetPort": 8080
        },
        "language": "nodejs",
        "projectType": "nodejs",
        "devfileFound": true
    })
}
