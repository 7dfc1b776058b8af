//! Drives one submission through a container runtime: materializes the
//! source file, runs an optional compile phase, runs the program with
//! `stdin` piped, enforces a wall-clock ceiling, samples memory, and
//! guarantees container teardown on every exit path.
//!
//! Generalized from this workspace's subprocess-supervision idiom
//! (piped stdio, concurrent stdout/stderr capture, `kill_on_drop` as a
//! safety net) to drive `docker run`/`docker build` instead of a bare
//! tool subprocess. The `SandboxDriver` trait is the same seam the
//! teacher's `Transport` trait gives its own backends: production code is
//! generic over it, and tests substitute a fake that never shells out.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use judge_catalog::LanguageSpec;
use judge_core::{JobStatus, JudgeError, Language};
use judge_resource::{ContainerGuard, MemoryMonitor, docker_available, unique_container_name};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

pub mod fake;
pub use fake::FakeSandboxDriver;

/// The result of one Sandbox Driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: JobStatus,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u64,
    pub memory_usage_kb: u64,
    pub error_message: Option<String>,
}

/// Drives one submission through to a terminal [`RunOutcome`]. Implemented
/// by [`DockerSandboxDriver`] in production; `judge-dispatcher` and
/// `judge-api` tests inject a fake implementation instead, so no test
/// depends on a reachable Docker daemon.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Runs `source_code` in `language`, feeding `stdin` to the program if
    /// present. Never panics; genuine infrastructure failures (no daemon,
    /// workspace I/O, driver plumbing) surface as `Err(JudgeError)`, while
    /// every job-level terminal state (including compile failure, timeout,
    /// and nonzero exit) is a successfully returned [`RunOutcome`].
    async fn run(
        &self,
        source_code: &str,
        language: Language,
        stdin: Option<&str>,
        spec: &LanguageSpec,
    ) -> Result<RunOutcome, JudgeError>;
}

/// Drives submissions through the container runtime. Stateless beyond its
/// two policy knobs; safe to share behind an `Arc` across workers.
#[derive(Clone, Debug)]
pub struct DockerSandboxDriver {
    enable_network: bool,
    compile_timeout: Duration,
}

impl DockerSandboxDriver {
    pub fn new(enable_network: bool, compile_timeout_ms: u64) -> Self {
        Self { enable_network, compile_timeout: Duration::from_millis(compile_timeout_ms) }
    }

    /// Returns `Ok(None)` when the compile step succeeded and the run phase
    /// should proceed, `Ok(Some(outcome))` for a terminal COMPILATION_ERROR,
    /// and `Err` for an infrastructure failure unrelated to the submission.
    async fn compile(
        &self,
        workspace: &Path,
        spec: &LanguageSpec,
        compile_cmd: &[String],
    ) -> Result<Option<RunOutcome>, JudgeError> {
        let container_name = unique_container_name("compile");
        let guard = ContainerGuard::new(container_name.clone());

        let attempt = tokio::time::timeout(
            self.compile_timeout,
            run_container(
                &container_name,
                workspace,
                &spec.image,
                compile_cmd,
                spec.memory_limit_mb,
                false,
                None,
            ),
        )
        .await;

        guard.teardown().await;

        match attempt {
            Ok(Ok((_stdout, _stderr, status))) if status.success() => Ok(None),
            Ok(Ok((stdout, stderr, status))) => Ok(Some(RunOutcome {
                status: JobStatus::CompilationError,
                stdout: String::new(),
                stderr: String::new(),
                compile_output: Some(resolve_compile_output(
                    &String::from_utf8_lossy(&stdout),
                    &String::from_utf8_lossy(&stderr),
                )),
                exit_code: status.code(),
                execution_time_ms: 0,
                memory_usage_kb: 0,
                error_message: None,
            })),
            Ok(Err(e)) => Err(JudgeError::Internal(format!("compile phase I/O error: {e}"))),
            Err(_elapsed) => Ok(Some(RunOutcome {
                status: JobStatus::CompilationError,
                stdout: String::new(),
                stderr: String::new(),
                compile_output: Some("Compilation timeout".to_string()),
                exit_code: None,
                execution_time_ms: 0,
                memory_usage_kb: 0,
                error_message: None,
            })),
        }
    }

    async fn execute(
        &self,
        workspace: &Path,
        spec: &LanguageSpec,
        stdin: Option<&str>,
    ) -> Result<RunOutcome, JudgeError> {
        let container_name = unique_container_name("run");
        let guard = ContainerGuard::new(container_name.clone());
        let monitor = MemoryMonitor::start(container_name.clone());
        let run_timeout = Duration::from_millis(spec.run_timeout_ms);
        let stdin_bytes = stdin.map(|s| s.as_bytes().to_vec());

        let started = Instant::now();
        let attempt = tokio::time::timeout(
            run_timeout,
            run_container(
                &container_name,
                workspace,
                &spec.image,
                &spec.run_cmd,
                spec.memory_limit_mb,
                self.enable_network,
                stdin_bytes.as_deref(),
            ),
        )
        .await;
        let elapsed = started.elapsed();

        guard.teardown().await;
        let memory_usage_kb = monitor.stop().await;

        match attempt {
            Ok(Ok((stdout, stderr, status))) => Ok(RunOutcome {
                status: classify_run_exit(status.success()),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                compile_output: None,
                exit_code: status.code(),
                execution_time_ms: elapsed.as_millis() as u64,
                memory_usage_kb,
                error_message: None,
            }),
            Ok(Err(e)) => Err(JudgeError::Internal(format!("run phase I/O error: {e}"))),
            Err(_elapsed) => Ok(RunOutcome {
                status: JobStatus::Timeout,
                stdout: String::new(),
                stderr: "Time limit exceeded".to_string(),
                compile_output: None,
                exit_code: Some(124),
                execution_time_ms: run_timeout.as_millis() as u64,
                memory_usage_kb,
                error_message: None,
            }),
        }
    }
}

#[async_trait]
impl SandboxDriver for DockerSandboxDriver {
    async fn run(
        &self,
        source_code: &str,
        language: Language,
        stdin: Option<&str>,
        spec: &LanguageSpec,
    ) -> Result<RunOutcome, JudgeError> {
        let _ = language;

        if !docker_available().await {
            return Err(JudgeError::RuntimeUnavailable("docker daemon unreachable".into()));
        }

        let workspace = TempDir::new()
            .map_err(|e| JudgeError::Internal(format!("failed to create workspace: {e}")))?;

        let source_path = workspace.path().join(spec.source_filename);
        tokio::fs::write(&source_path, source_code)
            .await
            .map_err(|e| JudgeError::Internal(format!("failed to write source file: {e}")))?;

        if let Some(compile_cmd) = &spec.compile_cmd {
            if let Some(outcome) = self.compile(workspace.path(), spec, compile_cmd).await? {
                return Ok(outcome);
            }
        }

        self.execute(workspace.path(), spec, stdin).await
    }
}

/// When a compile step fails without writing to stderr, some toolchains
/// (notably ones that print diagnostics to stdout) still leave a useful
/// trail there.
fn resolve_compile_output(stdout: &str, stderr: &str) -> String {
    if stderr.trim().is_empty() { stdout.to_string() } else { stderr.to_string() }
}

fn classify_run_exit(success: bool) -> JobStatus {
    if success { JobStatus::Completed } else { JobStatus::RuntimeError }
}

/// Launches `docker run` for `container_name`, pipes `stdin_bytes` (or
/// closes stdin immediately if absent), and captures stdout/stderr to
/// completion concurrently. `kill_on_drop` backstops timeout cancellation:
/// dropping the in-flight future kills the `docker` CLI process, but the
/// container itself is reclaimed separately by [`ContainerGuard::teardown`].
async fn run_container(
    container_name: &str,
    workspace: &Path,
    image: &str,
    command: &[String],
    memory_limit_mb: u64,
    enable_network: bool,
    stdin_bytes: Option<&[u8]>,
) -> std::io::Result<(Vec<u8>, Vec<u8>, ExitStatus)> {
    debug!(container = %container_name, image, "launching container");

    let mut cmd = TokioCommand::new("docker");
    cmd.arg("run")
        .arg("--name")
        .arg(container_name)
        .arg("--interactive")
        .arg("--volume")
        .arg(format!("{}:/tmp", workspace.display()))
        .arg("--workdir")
        .arg("/tmp")
        .arg("--memory")
        .arg(format!("{memory_limit_mb}m"))
        .arg("--cpus")
        .arg("1")
        .arg("--network")
        .arg(if enable_network { "bridge" } else { "none" })
        .arg("--user")
        .arg("nobody")
        .arg(image)
        .args(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    match stdin_bytes {
        Some(data) => {
            let data = data.to_vec();
            if let Some(mut stdin) = child.stdin.take() {
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(&data).await {
                        warn!(error = %e, "failed writing stdin to container");
                    }
                    let _ = stdin.shutdown().await;
                });
            }
        }
        None => drop(child.stdin.take()),
    }

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let (out_res, err_res) =
        tokio::join!(stdout.read_to_end(&mut out_buf), stderr.read_to_end(&mut err_buf));
    out_res?;
    err_res?;

    let status = child.wait().await?;
    Ok((out_buf, err_buf, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_output_prefers_stderr() {
        assert_eq!(resolve_compile_output("stdout text", "stderr text"), "stderr text");
    }

    #[test]
    fn compile_output_falls_back_to_stdout_when_stderr_empty() {
        assert_eq!(resolve_compile_output("error: expected ';'", "   "), "error: expected ';'");
    }

    #[test]
    fn run_exit_classification() {
        assert_eq!(classify_run_exit(true), JobStatus::Completed);
        assert_eq!(classify_run_exit(false), JobStatus::RuntimeError);
    }

    fn python_spec() -> LanguageSpec {
        judge_catalog::Catalog::default().lookup(Language::Python3).clone()
    }

    #[tokio::test]
    async fn run_reports_runtime_unavailable_when_no_daemon_is_reachable() {
        // This environment may or may not have a reachable Docker daemon;
        // only assert the unavailable path when we can first confirm it
        // independently, mirroring the liveness probe's own test posture.
        if docker_available().await {
            return;
        }
        let driver = DockerSandboxDriver::new(false, 30_000);
        let err = driver.run("print(1)", Language::Python3, None, &python_spec()).await.unwrap_err();
        assert!(matches!(err, JudgeError::RuntimeUnavailable(_)));
    }
}
