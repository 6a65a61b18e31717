use controller_core::{Error, Result};

use k8s_openapi::apimachinery::pkg::version::Info;
use once_cell::sync::Lazy;
use regex::Regex;

// Some providers (EKS for one) append a "+" to the minor version when
// maintenance patches were back-ported past the upstream end-of-life.
static MINOR_VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\+?$").expect("minor version pattern is valid"));

/// Parse a Kubernetes minor version such as `"26"` or `"26+"`.
pub fn parse_minor_version(minor: &str) -> Result<u64> {
    let captures = MINOR_VERSION_PATTERN
        .captures(minor)
        .ok_or_else(|| Error::MalformedVersion(minor.to_string()))?;
    captures[1]
        .parse::<u64>()
        .map_err(|_| Error::MalformedVersion(minor.to_string()))
}

/// Minor version of the API server reported in `info`.
pub fn minor_version(info: &Info) -> Result<u64> {
    parse_minor_version(&info.minor)
}
