use crate::discovery::ObjectReader;

use controller_core::Result;

pub static NAMESPACE_LABEL_ENV_VAR: &str = "MESH_NAMESPACE_LABEL";
pub static NAMESPACE_ENABLED_VALUE_ENV_VAR: &str = "MESH_NAMESPACE_ENABLED_VALUE";
pub static POD_LABEL_ENV_VAR: &str = "MESH_POD_LABEL";
pub static POD_DISABLED_VALUE_ENV_VAR: &str = "MESH_POD_DISABLED_VALUE";

pub static DEFAULT_NAMESPACE_LABEL: &str = "istio-injection";
pub static DEFAULT_NAMESPACE_ENABLED_VALUE: &str = "enabled";
pub static DEFAULT_POD_LABEL: &str = "sidecar.istio.io/inject";
pub static DEFAULT_POD_DISABLED_VALUE: &str = "false";

/// Label convention used to switch sidecar injection on and off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshLabels {
    pub namespace_label: String,
    pub namespace_enabled_value: String,
    pub pod_label: String,
    pub pod_disabled_value: String,
}

impl Default for MeshLabels {
    fn default() -> Self {
        Self {
            namespace_label: DEFAULT_NAMESPACE_LABEL.to_string(),
            namespace_enabled_value: DEFAULT_NAMESPACE_ENABLED_VALUE.to_string(),
            pod_label: DEFAULT_POD_LABEL.to_string(),
            pod_disabled_value: DEFAULT_POD_DISABLED_VALUE.to_string(),
        }
    }
}

impl MeshLabels {
    /// Defaults, overridden by any `MESH_*` variable that is set.
    ///
    /// Deployments still labelling pods with the truncated
    /// `sidecar.istio.io/injec` key can keep it through `MESH_POD_LABEL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            namespace_label: lookup(NAMESPACE_LABEL_ENV_VAR).unwrap_or(defaults.namespace_label),
            namespace_enabled_value: lookup(NAMESPACE_ENABLED_VALUE_ENV_VAR)
                .unwrap_or(defaults.namespace_enabled_value),
            pod_label: lookup(POD_LABEL_ENV_VAR).unwrap_or(defaults.pod_label),
            pod_disabled_value: lookup(POD_DISABLED_VALUE_ENV_VAR).unwrap_or(defaults.pod_disabled_value),
        }
    }
}

/// True when `namespace` is labelled for sidecar injection.
pub async fn namespace_opted_in<R: ObjectReader>(
    reader: &R,
    labels: &MeshLabels,
    namespace: &str,
) -> Result<bool> {
    let namespace_labels = reader.namespace_labels(namespace).await?;
    Ok(namespace_labels.get(&labels.namespace_label) == Some(&labels.namespace_enabled_value))
}

/// True when the pod asks the mesh to leave it alone.
pub async fn pod_opted_out<R: ObjectReader>(
    reader: &R,
    labels: &MeshLabels,
    namespace: &str,
    pod: &str,
) -> Result<bool> {
    let pod_labels = reader.pod_labels(namespace, pod).await?;
    Ok(pod_labels.get(&labels.pod_label) == Some(&labels.pod_disabled_value))
}

/// Whether a workload runs without a sidecar even though the mesh is installed.
pub async fn workload_unmanaged<R: ObjectReader>(
    reader: &R,
    labels: &MeshLabels,
    namespace: &str,
    pod: &str,
) -> Result<bool> {
    if !namespace_opted_in(reader, labels, namespace).await? {
        return Ok(true);
    }
    pod_opted_out(reader, labels, namespace, pod).await
}
