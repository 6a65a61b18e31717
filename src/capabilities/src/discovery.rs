use controller_core::{Error, Result};

use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{api::Api, client::Client};
use std::collections::BTreeMap;
use std::fmt;

pub const SECURITY_CONTEXT_CONSTRAINTS_GROUP_VERSION: &str = "security.openshift.io/v1";
pub const SECURITY_CONTEXT_CONSTRAINTS_RESOURCE: &str = "securitycontextconstraints";
pub const POD_MONITOR_GROUP_VERSION: &str = "monitoring.coreos.com/v1";
pub const POD_MONITOR_RESOURCE: &str = "podmonitors";
pub const ISTIO_GROUP_VERSION: &str = "networking.istio.io/v1beta1";
pub const ISTIO_SIDECAR_RESOURCE: &str = "sidecar";

/// Query which resource types the cluster serves.
///
/// `resources_for` must report a missing group/version as
/// [`Error::GroupVersionNotFound`] so optional APIs can be told apart from
/// real failures.
#[allow(async_fn_in_trait)]
pub trait Discovery {
    async fn resources_for(&self, group_version: &str) -> Result<Vec<APIResource>>;

    async fn server_version(&self) -> Result<Info>;
}

/// Read single cluster objects by name.
#[allow(async_fn_in_trait)]
pub trait ObjectReader {
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>>;

    async fn pod_labels(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>>;
}

/// Group/version plus the plural resource name served under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    pub group_version: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(group_version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_version: group_version.into(),
            name: name.into(),
        }
    }

    pub fn security_context_constraints() -> Self {
        Self::new(
            SECURITY_CONTEXT_CONSTRAINTS_GROUP_VERSION,
            SECURITY_CONTEXT_CONSTRAINTS_RESOURCE,
        )
    }

    pub fn pod_monitor() -> Self {
        Self::new(POD_MONITOR_GROUP_VERSION, POD_MONITOR_RESOURCE)
    }

    pub fn istio_sidecar() -> Self {
        Self::new(ISTIO_GROUP_VERSION, ISTIO_SIDECAR_RESOURCE)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_version, self.name)
    }
}

/// Check whether `kind` is served under `group_version`.
///
/// A group/version the cluster does not know about yields `Ok(false)`,
/// every other discovery error is returned as is.
pub async fn resource_exists<D>(discovery: &D, group_version: &str, kind: &str) -> Result<bool>
where
    D: Discovery,
{
    let resources = match discovery.resources_for(group_version).await {
        Ok(resources) => resources,
        Err(Error::GroupVersionNotFound(_)) => return Ok(false),
        Err(err) => return Err(err),
    };
    Ok(resources.iter().any(|resource| resource.name == kind))
}

impl Discovery for Client {
    async fn resources_for(&self, group_version: &str) -> Result<Vec<APIResource>> {
        // core resources live under /api, everything else under /apis
        #[allow(deprecated)]
        let list = if group_version.contains('/') {
            self.list_api_group_resources(group_version).await
        } else {
            self.list_core_api_resources(group_version).await
        };
        match list {
            Ok(list) => Ok(list.resources),
            Err(err) if Error::is_not_found(&err) => {
                Err(Error::GroupVersionNotFound(group_version.to_string()))
            }
            Err(err) => Err(Error::DiscoveryFailure(err)),
        }
    }

    async fn server_version(&self) -> Result<Info> {
        self.apiserver_version().await.map_err(Error::DiscoveryFailure)
    }
}

fn read_error(err: kube::Error, kind: &'static str, name: String) -> Error {
    if Error::is_not_found(&err) {
        Error::ObjectNotFound { kind, name }
    } else {
        Error::KubeError(err)
    }
}

impl ObjectReader for Client {
    async fn namespace_labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let namespaces: Api<Namespace> = Api::all(self.clone());
        let namespace = namespaces
            .get(name)
            .await
            .map_err(|err| read_error(err, "Namespace", name.to_string()))?;
        Ok(namespace.metadata.labels.unwrap_or_default())
    }

    async fn pod_labels(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        let pods: Api<Pod> = Api::namespaced(self.clone(), namespace);
        let pod = pods
            .get(name)
            .await
            .map_err(|err| read_error(err, "Pod", format!("{}/{}", namespace, name)))?;
        Ok(pod.metadata.labels.unwrap_or_default())
    }
}
