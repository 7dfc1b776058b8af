//! Container runtime liveness probe.
//!
//! Unlike a host capability probe that is safe to cache for the process
//! lifetime, the Docker daemon can come and go independently of this
//! process, so this check is re-run on every Sandbox Driver invocation
//! rather than cached in a `OnceLock`.

use tokio::process::Command;

/// Fast liveness probe: `docker version` succeeds iff the CLI can reach
/// a running daemon.
pub async fn docker_available() -> bool {
    Command::new("docker")
        .arg("version")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}
