//! Fake cluster capabilities and a primitive apiserver mock for tests
use controller_core::{Error, Result};
use crate::discovery::{Discovery, ObjectReader};

use http::{Request, Response};
use hyper::Body;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{client::Client, error::ErrorResponse};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn api_error(code: u16) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake discovery failure {}", code),
        reason: "InternalError".to_string(),
        code,
    })
}

/// In-memory discovery whose served groups can change between calls.
#[derive(Default)]
pub struct FakeDiscovery {
    groups: Mutex<BTreeMap<String, Vec<String>>>,
    minor: Mutex<Option<String>>,
    failure: Option<u16>,
    resource_calls: AtomicUsize,
    version_calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn with_group(self, group_version: &str, names: &[&str]) -> Self {
        self.set_group(group_version, names);
        self
    }

    pub fn with_minor(self, minor: &str) -> Self {
        self.set_minor(minor);
        self
    }

    pub fn failing_with(mut self, code: u16) -> Self {
        self.failure = Some(code);
        self
    }

    pub fn set_group(&self, group_version: &str, names: &[&str]) {
        let names = names.iter().map(|name| name.to_string()).collect();
        self.groups.lock().unwrap().insert(group_version.to_string(), names);
    }

    pub fn remove_group(&self, group_version: &str) {
        self.groups.lock().unwrap().remove(group_version);
    }

    pub fn set_minor(&self, minor: &str) {
        *self.minor.lock().unwrap() = Some(minor.to_string());
    }

    pub fn resource_calls(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }
}

impl Discovery for FakeDiscovery {
    async fn resources_for(&self, group_version: &str) -> Result<Vec<APIResource>> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.failure {
            return Err(Error::DiscoveryFailure(api_error(code)));
        }
        let groups = self.groups.lock().unwrap();
        let names = groups
            .get(group_version)
            .ok_or_else(|| Error::GroupVersionNotFound(group_version.to_string()))?;
        Ok(names
            .iter()
            .map(|name| APIResource {
                name: name.clone(),
                ..APIResource::default()
            })
            .collect())
    }

    async fn server_version(&self) -> Result<Info> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.failure {
            return Err(Error::DiscoveryFailure(api_error(code)));
        }
        let minor = self.minor.lock().unwrap().clone().unwrap_or_else(|| "26".to_string());
        Ok(Info {
            major: "1".to_string(),
            minor,
            ..Info::default()
        })
    }
}

/// In-memory namespaces and pods, keyed by name.
#[derive(Default)]
pub struct FakeReader {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
    pods: BTreeMap<(String, String), BTreeMap<String, String>>,
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

impl FakeReader {
    pub fn with_namespace(mut self, name: &str, pairs: &[(&str, &str)]) -> Self {
        self.namespaces.insert(name.to_string(), labels(pairs));
        self
    }

    pub fn with_pod(mut self, namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Self {
        self.pods
            .insert((namespace.to_string(), name.to_string()), labels(pairs));
        self
    }
}

impl ObjectReader for FakeReader {
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound {
                kind: "Namespace",
                name: name.to_string(),
            })
    }

    async fn pod_labels(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        self.pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound {
                kind: "Pod",
                name: format!("{}/{}", namespace, name),
            })
    }
}

/// JSON body of an `APIResourceList` for `group_version`.
pub fn api_resources(group_version: &str, names: &[&str]) -> Value {
    let list = APIResourceList {
        group_version: group_version.to_string(),
        resources: names
            .iter()
            .map(|name| APIResource {
                name: name.to_string(),
                singular_name: String::new(),
                namespaced: true,
                kind: "Fake".to_string(),
                verbs: vec!["get".to_string(), "list".to_string()],
                ..APIResource::default()
            })
            .collect(),
    };
    serde_json::to_value(list).unwrap()
}

/// JSON body of a `Status` failure as served by the apiserver.
pub fn error_response(code: u16, reason: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("the server could not serve the request ({})", reason),
        "reason": reason,
        "code": code,
    })
}

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

/// Answers exactly one GET request on a `kube::Client` built over a mock service.
pub struct MockApiServer(ApiServerHandle);

impl MockApiServer {
    pub fn new() -> (Client, Self) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let client = Client::new(mock_service, "default");
        (client, Self(handle))
    }

    pub fn respond_ok(self, path: &str, body: Value) -> tokio::task::JoinHandle<()> {
        self.respond_status(path, 200, body)
    }

    pub fn respond_status(
        mut self,
        path: &str,
        status: u16,
        body: Value,
    ) -> tokio::task::JoinHandle<()> {
        let path = path.to_string();
        tokio::spawn(async move {
            let (request, send) = self.0.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().path(), path);
            let response = Response::builder()
                .status(status)
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap();
            send.send_response(response);
        })
    }
}

pub async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}
