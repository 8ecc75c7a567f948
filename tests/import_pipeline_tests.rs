//! # Import Pipeline Tests
//!
//! End-to-end runs of the importer over the in-memory client.
//!
//! These tests verify:
//! - Binding provisioning and secret propagation to Components
//! - Component detection, including fan-out of several detected components
//! - Application creation versus in-context fetching
//! - Per-component failure collection
//! - Cancellation, timeouts and dry runs

mod common;

use appstudio_import::client::{InMemoryClient, Verb};
use appstudio_import::crd::{model, Application};
use appstudio_import::error::{ClientError, ImportError, ImportFailure, Stage};
use appstudio_import::import::{
    ApplicationTarget, ComponentSource, GitSource, IntegrationTestDescriptor, SourceKind,
};
use common::*;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn stage_error(failure: &ImportFailure) -> &ImportError {
    match failure {
        ImportFailure::Stage { error, .. } => &error.error,
        other => panic!("expected a stage failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_binding_secret_flows_into_component() {
    let client = InMemoryClient::new();
    client.script_statuses(
        "SPIAccessTokenBinding",
        vec![binding_pending(), binding_pending(), binding_injected("git-creds")],
    );
    let importer = importer(client);

    let outcome = importer
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.application, "my-application");
    assert_eq!(outcome.components, vec!["test-component"]);
    assert_eq!(outcome.bindings, vec!["appstudio-import-000001"]);
    assert!(!outcome.in_context);

    let client = importer.client();
    let component = client
        .object("Component", NAMESPACE, "test-component")
        .unwrap();
    assert_eq!(component["spec"]["secret"], "git-creds");
    assert_eq!(component["spec"]["application"], "my-application");

    // Binding first, then the Application, then its Components
    let order: Vec<_> = client
        .calls()
        .into_iter()
        .filter(|c| c.verb == Verb::Create)
        .map(|c| c.kind)
        .collect();
    assert_eq!(order, vec!["SPIAccessTokenBinding", "Application", "Component"]);
    assert_eq!(client.calls_for(Verb::Get, "SPIAccessTokenBinding").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_one_binding_per_repository() {
    let client = InMemoryClient::new();
    client.script_statuses("SPIAccessTokenBinding", vec![binding_injected("git-creds")]);
    let importer = importer(client);
    let mut request = request();
    request.components = vec![
        ComponentSource::git("frontend", REPO),
        ComponentSource::git("backend", REPO),
        ComponentSource::git("docs", "https://github.com/test/docs"),
    ];

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(
        outcome.bindings,
        vec!["appstudio-import-000001", "appstudio-import-000002"]
    );
    let bound_repos: Vec<_> = importer
        .client()
        .calls_for(Verb::Create, "SPIAccessTokenBinding")
        .into_iter()
        .map(|c| c.body.unwrap()["spec"]["repoUrl"].clone())
        .collect();
    assert_eq!(bound_repos, vec![json!(REPO), json!("https://github.com/test/docs")]);
}

#[tokio::test(start_paused = true)]
async fn test_supplied_secret_skips_binding() {
    let importer = importer(InMemoryClient::new());
    let mut request = request();
    request.secret = Some("my-git-secret".into());

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert!(outcome.bindings.is_empty());
    let client = importer.client();
    assert!(client.calls_for(Verb::Create, "SPIAccessTokenBinding").is_empty());
    let component = client.object("Component", NAMESPACE, "test-component").unwrap();
    assert_eq!(component["spec"]["secret"], "my-git-secret");
}

#[tokio::test(start_paused = true)]
async fn test_binding_error_phase_fails_binding_stage() {
    let client = InMemoryClient::new();
    client.script_statuses(
        "SPIAccessTokenBinding",
        vec![binding_pending(), binding_error("no token for repository")],
    );
    let importer = importer(client);

    let failure = importer
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Binding);
    match failure {
        ImportFailure::Stage { error, .. } => {
            assert_eq!(
                error.error,
                ImportError::Provisioning {
                    phase: "Error".into(),
                    message: "no token for repository".into()
                }
            );
            assert_eq!(error.last_status.unwrap()["status"]["phase"], "Error");
        }
        other => panic!("unexpected failure {other:?}"),
    }
    assert!(importer.client().names("Application").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_binding_timeout_is_retryable() {
    let client = InMemoryClient::new();
    client.script_statuses("SPIAccessTokenBinding", vec![binding_pending()]);
    let importer = importer(client);

    let failure = importer
        .run(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Binding);
    let error = stage_error(&failure);
    assert!(matches!(
        error,
        ImportError::Timeout { waited } if *waited >= Duration::from_secs(60)
    ));
    assert!(error.is_retryable());
    assert!(failure.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_detection_fans_out_components() {
    let client = InMemoryClient::new();
    client.script_statuses(
        "ComponentDetectionQuery",
        vec![
            detection_running(),
            detection_completed(json!({
                "api": detected_component("api", REPO, "https://example.com/api/devfile.yaml"),
                "web": detected_component("web", REPO, "https://example.com/web/devfile.yaml"),
            })),
        ],
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.auto_detect = true;
    request.components = vec![ComponentSource::git("Mono", REPO)];

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.components, vec!["mono-api", "mono-web"]);
    let client = importer.client();
    assert_eq!(client.names("ComponentDetectionQuery"), vec!["my-application-000001"]);
    let web = client.object("Component", NAMESPACE, "mono-web").unwrap();
    assert_eq!(
        web["spec"]["source"]["git"]["devfileUrl"],
        "https://example.com/web/devfile.yaml"
    );
    assert_eq!(web["spec"]["targetPort"], 8080);
    assert_eq!(web["spec"]["secret"], "git-creds");
}

#[tokio::test(start_paused = true)]
async fn test_detection_keeps_user_hints_it_does_not_replace() {
    let client = InMemoryClient::new();
    client.script_statuses(
        "ComponentDetectionQuery",
        vec![detection_completed(json!({
            "node": detected_component("node", REPO, "https://example.com/devfile.yaml"),
        }))],
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.auto_detect = true;
    request.components = vec![ComponentSource {
        source: SourceKind::Git(GitSource {
            url: REPO.into(),
            revision: Some("release-1".into()),
            context: Some("services/node".into()),
        }),
        ..ComponentSource::git("Node Service", REPO)
    }];

    importer.run(&request, &CancellationToken::new()).await.unwrap();

    let query = importer
        .client()
        .calls_for(Verb::Create, "ComponentDetectionQuery")[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(query["spec"]["git"]["context"], "services/node");

    let component = importer
        .client()
        .object("Component", NAMESPACE, "node-service")
        .unwrap();
    assert_eq!(
        component["spec"]["source"]["git"],
        json!({
            "url": REPO,
            "revision": "release-1",
            "context": "services/node",
            "devfileUrl": "https://example.com/devfile.yaml"
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_nothing_detected_creates_component_as_submitted() {
    let client = InMemoryClient::new();
    client.script_statuses("ComponentDetectionQuery", vec![detection_completed(json!({}))]);
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.auto_detect = true;

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.components, vec!["test-component"]);
}

#[tokio::test(start_paused = true)]
async fn test_detection_failure_stops_before_application() {
    let client = InMemoryClient::new();
    client.script_statuses(
        "ComponentDetectionQuery",
        vec![detection_running(), detection_failed("repository is not accessible")],
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.auto_detect = true;

    let failure = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Detection);
    assert_eq!(
        stage_error(&failure),
        &ImportError::Detection {
            message: "repository is not accessible".into()
        }
    );
    assert!(importer.client().calls_for(Verb::Create, "Application").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_in_context_import_reuses_application() {
    let client = InMemoryClient::new();
    client.seed(
        &model::<Application>(),
        json!({
            "apiVersion": "appstudio.redhat.com/v1alpha1",
            "kind": "Application",
            "metadata": {"name": "existing-app", "namespace": NAMESPACE},
            "spec": {"displayName": "Existing App"}
        }),
    );
    let importer = importer(client);
    let mut request = request();
    request.application = ApplicationTarget::Existing {
        name: "existing-app".into(),
    };
    request.secret = Some("git-creds".into());

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert!(outcome.in_context);
    assert_eq!(outcome.application, "existing-app");
    let client = importer.client();
    assert!(client.calls_for(Verb::Create, "Application").is_empty());
    assert_eq!(client.calls_for(Verb::Get, "Application").len(), 1);
    let component = client.object("Component", NAMESPACE, "test-component").unwrap();
    assert_eq!(component["spec"]["application"], "existing-app");
}

#[tokio::test(start_paused = true)]
async fn test_in_context_import_of_missing_application() {
    let importer = importer(InMemoryClient::new());
    let mut request = request();
    request.application = ApplicationTarget::Existing {
        name: "missing-app".into(),
    };
    request.secret = Some("git-creds".into());

    let failure = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Application);
    assert!(matches!(stage_error(&failure), ImportError::NotFound(_)));
    assert!(importer.client().names("Component").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_application_name_collision_is_conflict() {
    let client = InMemoryClient::new();
    client.seed(
        &model::<Application>(),
        json!({
            "metadata": {"name": "my-application", "namespace": NAMESPACE},
            "spec": {"displayName": "Someone Else's App"}
        }),
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());

    let failure = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Application);
    assert!(matches!(stage_error(&failure), ImportError::AlreadyExists(_)));
    assert!(!stage_error(&failure).is_retryable());
    assert!(!failure.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_resubmission_after_component_failure() {
    let client = InMemoryClient::new();
    client.fail_next(
        Verb::Create,
        "Component",
        ClientError::Transport("connection reset".into()),
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());

    let first = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(first.stage(), Stage::Component);
    // The Application now exists, so the same request cannot succeed again
    assert!(!first.is_retryable());

    let again = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(again.stage(), Stage::Application);
    assert!(matches!(stage_error(&again), ImportError::AlreadyExists(_)));
    assert!(!again.is_retryable());

    // Importing the remaining component in-context completes the import
    let application = match &first {
        ImportFailure::Components { application, .. } => application.clone(),
        other => panic!("unexpected failure {other:?}"),
    };
    request.application = ApplicationTarget::Existing { name: application };
    let outcome = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.components, vec!["test-component"]);
    assert!(outcome.in_context);
}

#[tokio::test(start_paused = true)]
async fn test_all_component_failures_are_reported() {
    let client = InMemoryClient::new();
    client.fail_next(
        Verb::Create,
        "Component",
        ClientError::Invalid("spec.source.git.url: Invalid value".into()),
    );
    client.fail_next(
        Verb::Create,
        "Component",
        ClientError::Transport("connection reset".into()),
    );
    let importer = importer(client);
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.components = vec![
        ComponentSource::git("one", REPO),
        ComponentSource::git("two", REPO),
        ComponentSource::git("three", REPO),
    ];

    let failure = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Component);
    match failure {
        ImportFailure::Components {
            application,
            created,
            failures,
        } => {
            assert_eq!(application, "my-application");
            assert_eq!(created.len(), 1);
            assert_eq!(failures.len(), 2);
            let mut named: Vec<_> = failures.iter().map(|f| f.component.as_str()).collect();
            named.extend(created.iter().map(String::as_str));
            named.sort_unstable();
            assert_eq!(named, vec!["one", "three", "two"]);
        }
        other => panic!("unexpected failure {other:?}"),
    }
    // Every component was attempted
    assert_eq!(importer.client().calls_for(Verb::Create, "Component").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_binding_wait() {
    let client = InMemoryClient::new();
    client.script_statuses("SPIAccessTokenBinding", vec![binding_pending()]);
    let importer = importer(client);
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
    });

    let failure = importer.run(&request(), &cancel).await.unwrap_err();

    assert!(failure.is_cancelled());
    assert_eq!(failure.stage(), Stage::Binding);
    let client = importer.client();
    assert!(client.calls_for(Verb::Create, "Application").is_empty());
    // The binding stays in place for inspection
    assert_eq!(client.names("SPIAccessTokenBinding"), vec!["appstudio-import-000001"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_makes_no_calls() {
    let importer = importer(InMemoryClient::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = importer.run(&request(), &cancel).await.unwrap_err();

    assert!(failure.is_cancelled());
    assert!(importer.client().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_component_name_fails_validation() {
    let importer = importer(InMemoryClient::new());
    let mut request = request();
    request.components = vec![ComponentSource::git("!  @  #", REPO)];

    let failure = importer
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage(), Stage::Validation);
    assert!(matches!(stage_error(&failure), ImportError::Validation(m) if m.contains("!--@--#")));
    assert!(!stage_error(&failure).is_retryable());
    assert!(importer.client().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_optional_integration_test_is_created_last() {
    let importer = importer(InMemoryClient::new());
    let mut request = request();
    request.secret = Some("git-creds".into());
    request.integration_test = Some(IntegrationTestDescriptor {
        name: "Smoke Tests".into(),
        bundle: "quay.io/example/tests:latest".into(),
        pipeline: "smoke".into(),
        optional: true,
    });

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.integration_test.as_deref(), Some("smoke-tests"));
    let client = importer.client();
    let scenario = client
        .object("IntegrationTestScenario", NAMESPACE, "smoke-tests")
        .unwrap();
    assert_eq!(
        scenario["metadata"]["labels"]["test.appstudio.openshift.io/optional"],
        "true"
    );
    assert_eq!(scenario["spec"]["application"], "my-application");
    assert_eq!(client.calls().last().unwrap().kind, "IntegrationTestScenario");
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_persists_nothing() {
    let importer = importer(InMemoryClient::new());
    let mut request = request();
    request.dry_run = true;
    request.auto_detect = true;

    let outcome = importer.run(&request, &CancellationToken::new()).await.unwrap();

    assert!(outcome.dry_run);
    let client = importer.client();
    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.verb == Verb::Create && c.dry_run));
    assert!(client.names("Application").is_empty());
    assert!(client.names("Component").is_empty());
}
