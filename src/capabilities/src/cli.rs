use capabilities::{mesh, registry::pod_monitor_exists, Capabilities};
use controller_core::telemetry;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init().await.context("Failed to initialize telemetry")?;

    let mut args = std::env::args();
    args.next();

    let command = args.next().context("No command provided")?;
    let client = kube::Client::try_default()
        .await
        .context("Failed to create kube client")?;

    if command == "detect" {
        let capabilities = Capabilities::new();
        capabilities.detect_all(&client).await?;
        let pod_monitor = pod_monitor_exists(&client).await?;

        let report = json!({
            "capabilities": capabilities.snapshot(),
            "podMonitor": pod_monitor,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if command == "mesh" {
        let namespace = args.next().context("No namespace provided")?;
        let pod = args.next().context("No pod name provided")?;
        let labels = mesh::MeshLabels::from_env();
        info!("Using mesh labels {:?}", labels);

        let unmanaged = mesh::workload_unmanaged(&client, &labels, &namespace, &pod).await?;
        let report = json!({
            "namespace": namespace,
            "pod": pod,
            "unmanaged": unmanaged,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        bail!("Unknown command: {}", command);
    }
    Ok(())
}
