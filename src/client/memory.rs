//! # In-Memory Client
//!
//! A [`ResourceClient`] that keeps objects in memory, records every call, and
//! can play back a scripted sequence of statuses for a kind. Useful for
//! exercising the import pipeline without a cluster.
//!
//! Status scripts: the first scripted status is attached to the object when it
//! is created, and every later `get` advances to the next one. Once the script
//! is exhausted the last status sticks.

use crate::client::{QueryOptions, ResourceClient};
use crate::error::ClientError;
use async_trait::async_trait;
use kube::core::ApiResource;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Client operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Get,
    Update,
}

/// One call observed by the [`InMemoryClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub dry_run: bool,
    /// Body sent with create/update
    pub body: Option<Value>,
}

type ObjectKey = (String, String, String);

#[derive(Debug, Default)]
struct Store {
    objects: BTreeMap<ObjectKey, Value>,
    calls: Vec<RecordedCall>,
    status_scripts: HashMap<String, Vec<Value>>,
    active_scripts: HashMap<ObjectKey, VecDeque<Value>>,
    failures: VecDeque<(Verb, String, ClientError)>,
    next_version: u64,
}

impl Store {
    fn take_failure(&mut self, verb: Verb, kind: &str) -> Option<ClientError> {
        let idx = self
            .failures
            .iter()
            .position(|(v, k, _)| *v == verb && k == kind)?;
        self.failures.remove(idx).map(|(_, _, err)| err)
    }

    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// In-memory [`ResourceClient`]
#[derive(Debug, Default)]
pub struct InMemoryClient {
    store: Mutex<Store>,
}

impl InMemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Play back `statuses` on every object of `kind` created from now on
    pub fn script_statuses(&self, kind: &str, statuses: Vec<Value>) {
        self.lock().status_scripts.insert(kind.to_string(), statuses);
    }

    /// Fail the next `verb` on `kind` with `err`
    pub fn fail_next(&self, verb: Verb, kind: &str, err: ClientError) {
        self.lock()
            .failures
            .push_back((verb, kind.to_string(), err));
    }

    /// Store an object as if it already existed in the cluster
    pub fn seed(&self, model: &ApiResource, mut object: Value) {
        let mut store = self.lock();
        let version = store.bump_version();
        object["metadata"]["resourceVersion"] = json!(version);
        let key = (
            model.kind.clone(),
            object["metadata"]["namespace"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            object["metadata"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        );
        store.objects.insert(key, object);
    }

    /// Every call seen so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls of one verb against one kind
    #[must_use]
    pub fn calls_for(&self, verb: Verb, kind: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb == verb && c.kind == kind)
            .cloned()
            .collect()
    }

    /// Current stored state of an object
    #[must_use]
    pub fn object(&self, kind: &str, namespace: &str, name: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(&(kind.to_string(), namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of stored objects of `kind`
    #[must_use]
    pub fn names(&self, kind: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(k, _, _)| k == kind)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    fn record(
        store: &mut Store,
        verb: Verb,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Option<&Value>,
    ) {
        store.calls.push(RecordedCall {
            verb,
            kind: model.kind.clone(),
            name: opts.name.clone(),
            namespace: opts.namespace.clone(),
            dry_run: opts.dry_run,
            body: body.cloned(),
        });
    }
}

fn key_for(model: &ApiResource, opts: &QueryOptions) -> ObjectKey {
    (model.kind.clone(), opts.namespace.clone(), opts.name.clone())
}

#[async_trait]
impl ResourceClient for InMemoryClient {
    async fn create(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError> {
        let mut store = self.lock();
        Self::record(&mut store, Verb::Create, model, opts, Some(&body));
        if let Some(err) = store.take_failure(Verb::Create, &model.kind) {
            return Err(err);
        }

        let key = key_for(model, opts);
        if store.objects.contains_key(&key) {
            return Err(ClientError::AlreadyExists(format!(
                "{} \"{}\" already exists",
                model.kind, opts.name
            )));
        }
        if !body.get("spec").is_some_and(Value::is_object) {
            return Err(ClientError::Invalid(format!("{} spec is required", model.kind)));
        }

        let mut object = body;
        let uid = format!("uid-{}-{}", model.kind.to_lowercase(), opts.name);
        object["metadata"]["uid"] = json!(uid);
        if opts.dry_run {
            return Ok(object);
        }

        object["metadata"]["resourceVersion"] = json!(store.bump_version());
        if let Some(script) = store.status_scripts.get(&model.kind).cloned() {
            let mut script: VecDeque<Value> = script.into();
            if let Some(first) = script.pop_front() {
                object["status"] = first;
            }
            store.active_scripts.insert(key.clone(), script);
        }
        store.objects.insert(key, object.clone());
        Ok(object)
    }

    async fn get(&self, model: &ApiResource, opts: &QueryOptions) -> Result<Value, ClientError> {
        let mut store = self.lock();
        Self::record(&mut store, Verb::Get, model, opts, None);
        if let Some(err) = store.take_failure(Verb::Get, &model.kind) {
            return Err(err);
        }

        let key = key_for(model, opts);
        let next_status = store
            .active_scripts
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let object = store.objects.get_mut(&key).ok_or_else(|| {
            ClientError::NotFound(format!("{} \"{}\" not found", model.kind, opts.name))
        })?;
        if let Some(status) = next_status {
            object["status"] = status;
        }
        Ok(object.clone())
    }

    async fn update(
        &self,
        model: &ApiResource,
        opts: &QueryOptions,
        body: Value,
    ) -> Result<Value, ClientError> {
        let mut store = self.lock();
        Self::record(&mut store, Verb::Update, model, opts, Some(&body));
        if let Some(err) = store.take_failure(Verb::Update, &model.kind) {
            return Err(err);
        }

        let key = key_for(model, opts);
        let current = store.objects.get(&key).cloned().ok_or_else(|| {
            ClientError::NotFound(format!("{} \"{}\" not found", model.kind, opts.name))
        })?;
        let sent_version = body["metadata"]["resourceVersion"].as_str();
        let stored_version = current["metadata"]["resourceVersion"].as_str();
        if sent_version.is_none() || sent_version != stored_version {
            return Err(ClientError::Conflict(format!(
                "the object has been modified; please apply your changes to the latest version \
                 of {} \"{}\"",
                model.kind, opts.name
            )));
        }

        let mut object = body;
        if let Some(status) = current.get("status") {
            object["status"] = status.clone();
        }
        if opts.dry_run {
            return Ok(object);
        }
        object["metadata"]["resourceVersion"] = json!(store.bump_version());
        store.objects.insert(key, object.clone());
        Ok(object)
    }
}
