//! Container lifecycle guard.
//!
//! Every Sandbox Driver invocation runs inside a uniquely named container.
//! [`ContainerGuard`] owns that container's teardown: stop, then
//! force-remove, attempted on every exit path including panics, mirroring
//! the RAII stop-on-[`Drop`] shape this workspace uses for other external
//! process groups, retargeted from a systemd transient scope at a Docker
//! container.

use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};
use ulid::Ulid;

/// Builds a unique container name for one invocation. Names must never
/// repeat across invocations.
pub fn unique_container_name(prefix: &str) -> String {
    format!("judge_{prefix}_{}", Ulid::new().to_string().to_ascii_lowercase())
}

/// RAII guard that stops and force-removes a container on [`Drop`]. Does
/// not own the spawned child handle — only the container's lifecycle in
/// the runtime.
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attempts graceful stop, then force removal. Best-effort: failures
    /// are logged, never propagated, since teardown must not mask the
    /// primary job outcome.
    pub async fn teardown(&self) {
        teardown_container(&self.name).await;
    }
}

async fn teardown_container(name: &str) {
    debug!(container = %name, "stopping container");
    let stop = TokioCommand::new("docker")
        .args(["stop", "--time", "2", name])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;
    if let Err(e) = stop {
        warn!(container = %name, error = %e, "docker stop failed to execute");
    }

    debug!(container = %name, "removing container");
    let rm = TokioCommand::new("docker")
        .args(["rm", "-f", name])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;
    match rm {
        Ok(status) if status.success() => {
            debug!(container = %name, "container removed");
        }
        Ok(status) => {
            debug!(container = %name, code = status.code(), "docker rm returned non-zero");
        }
        Err(e) => {
            warn!(container = %name, error = %e, "docker rm failed to execute");
        }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let name = self.name.clone();
        // Dropped guards may run outside any task (e.g. during panic
        // unwind); best-effort spawn onto the current runtime if one is
        // reachable, otherwise teardown was already performed explicitly
        // by the driver before the guard went out of scope.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { teardown_container(&name).await });
        }
    }
}
