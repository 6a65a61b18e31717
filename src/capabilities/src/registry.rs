use crate::discovery::{resource_exists, Discovery, ResourceRef};
use crate::version;

use controller_core::{Error, Result};

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::info;

/// Minor version at which seccomp profiles went GA.
pub const SECCOMP_MIN_MINOR_VERSION: u64 = 24;

/// Outcome of a capability detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Detection {
    #[default]
    Unknown,
    Absent,
    Present,
}

impl Detection {
    pub fn is_present(self) -> bool {
        self == Detection::Present
    }

    fn from_bool(present: bool) -> Self {
        if present {
            Detection::Present
        } else {
            Detection::Absent
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Detection::Absent,
            2 => Detection::Present,
            _ => Detection::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Detection::Unknown => 0,
            Detection::Absent => 1,
            Detection::Present => 2,
        }
    }
}

#[derive(Default)]
struct Flag(AtomicU8);

impl Flag {
    fn get(&self) -> Detection {
        Detection::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, detection: Detection) {
        self.0.store(detection.as_u8(), Ordering::Release);
    }

    /// Store a detector outcome; a failed detection reads as never detected.
    fn record(&self, outcome: Result<bool>) -> Result<bool> {
        match outcome {
            Ok(present) => {
                self.set(Detection::from_bool(present));
                Ok(present)
            }
            Err(err) => Err(self.forget(err)),
        }
    }

    fn forget(&self, err: Error) -> Error {
        self.set(Detection::Unknown);
        err
    }
}

#[derive(Default)]
struct Flags {
    security_context_constraints: Flag,
    seccomp: Flag,
    istio: Flag,
}

/// Point-in-time copy of every capability flag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesSnapshot {
    pub security_context_constraints: Detection,
    pub seccomp: Detection,
    pub istio: Detection,
}

/// Capabilities of the cluster the operator runs against.
///
/// Build one during bootstrap, run the detectors, then hand clones to
/// whatever needs to gate on them. Clones share the same flags, and flags
/// can be read while a detector is re-running.
#[derive(Clone)]
pub struct Capabilities {
    flags: Arc<Flags>,
    security_resource: ResourceRef,
    mesh_resource: ResourceRef,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities {
    pub fn new() -> Self {
        Self {
            flags: Arc::new(Flags::default()),
            security_resource: ResourceRef::security_context_constraints(),
            mesh_resource: ResourceRef::istio_sidecar(),
        }
    }

    /// Detect security policy enforcement through `resource` instead of SCCs.
    pub fn with_security_resource(mut self, resource: ResourceRef) -> Self {
        self.security_resource = resource;
        self
    }

    /// Detect the service mesh through `resource` instead of the Istio sidecar.
    pub fn with_mesh_resource(mut self, resource: ResourceRef) -> Self {
        self.mesh_resource = resource;
        self
    }

    /// Find out whether the cluster enforces OpenShift Security Context Constraints.
    ///
    /// On error the flag goes back to [`Detection::Unknown`].
    pub async fn detect_security_context_constraints<D: Discovery>(&self, discovery: &D) -> Result<()> {
        let resource = &self.security_resource;
        let present = self
            .flags
            .security_context_constraints
            .record(resource_exists(discovery, &resource.group_version, &resource.name).await)?;
        info!("Detected security context constraints: {} ({})", present, resource);
        Ok(())
    }

    /// Decide from the server version whether pods should get a seccomp profile.
    pub async fn detect_seccomp_support<D: Discovery>(&self, discovery: &D) -> Result<()> {
        let info = match discovery.server_version().await {
            Ok(info) => info,
            Err(err) => return Err(self.flags.seccomp.forget(err)),
        };
        let supported = self
            .flags
            .seccomp
            .record(version::minor_version(&info).map(|minor| minor >= SECCOMP_MIN_MINOR_VERSION))?;
        info!(
            "Detected seccomp support: {} (server version {}.{})",
            supported, info.major, info.minor,
        );
        Ok(())
    }

    /// Find out whether the Istio API group and its Sidecar resource are served.
    ///
    /// On error the flag goes back to [`Detection::Unknown`].
    pub async fn detect_istio_support<D: Discovery>(&self, discovery: &D) -> Result<()> {
        let resource = &self.mesh_resource;
        let present = self
            .flags
            .istio
            .record(resource_exists(discovery, &resource.group_version, &resource.name).await)?;
        info!("Detected service mesh: {} ({})", present, resource);
        Ok(())
    }

    /// Run every detector in turn, stopping at the first failure.
    pub async fn detect_all<D: Discovery>(&self, discovery: &D) -> Result<()> {
        self.detect_security_context_constraints(discovery).await?;
        self.detect_seccomp_support(discovery).await?;
        self.detect_istio_support(discovery).await?;
        Ok(())
    }

    /// False until `detect_security_context_constraints` has succeeded.
    pub fn have_security_context_constraints(&self) -> bool {
        self.security_context_constraints_detection().is_present()
    }

    pub fn have_seccomp_support(&self) -> bool {
        self.seccomp_detection().is_present()
    }

    /// Istio being installed does not mean it injects anything; see [`crate::mesh`]
    /// for the per-namespace and per-pod decision.
    pub fn have_istio(&self) -> bool {
        self.istio_detection().is_present()
    }

    pub fn security_context_constraints_detection(&self) -> Detection {
        self.flags.security_context_constraints.get()
    }

    pub fn seccomp_detection(&self) -> Detection {
        self.flags.seccomp.get()
    }

    pub fn istio_detection(&self) -> Detection {
        self.flags.istio.get()
    }

    pub fn snapshot(&self) -> CapabilitiesSnapshot {
        CapabilitiesSnapshot {
            security_context_constraints: self.security_context_constraints_detection(),
            seccomp: self.seccomp_detection(),
            istio: self.istio_detection(),
        }
    }
}

/// Whether the Prometheus operator's PodMonitor resource is served.
///
/// Not cached: it is only asked when a PodMonitor is about to be created.
pub async fn pod_monitor_exists<D: Discovery>(discovery: &D) -> Result<bool> {
    let resource = ResourceRef::pod_monitor();
    resource_exists(discovery, &resource.group_version, &resource.name).await
}
