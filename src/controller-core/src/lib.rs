use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MalformedVersion: {0:?}")]
    MalformedVersion(String),

    #[error("GroupVersionNotFound: {0}")]
    GroupVersionNotFound(String),

    #[error("DiscoveryFailure: {0}")]
    DiscoveryFailure(#[source] kube::Error),

    #[error("ObjectNotFound: {kind} {name}")]
    ObjectNotFound { kind: &'static str, name: String },

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("TelemetryError: {0}")]
    TelemetryError(String),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> String {
        let label = match self {
            Error::MalformedVersion(_) => "malformedversion",
            Error::GroupVersionNotFound(_) => "groupversionnotfound",
            Error::DiscoveryFailure(_) => "discoveryfailure",
            Error::ObjectNotFound { .. } => "objectnotfound",
            Error::KubeError(_) => "kubeerror",
            Error::TelemetryError(_) => "telemetryerror",
        };
        label.to_string()
    }

    /// True when the API server answered with 404 Not Found.
    pub fn is_not_found(err: &kube::Error) -> bool {
        matches!(err, kube::Error::Api(response) if response.code == 404)
    }
}

/// Log integrations
pub mod telemetry;
