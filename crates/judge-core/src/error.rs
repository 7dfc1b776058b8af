/// The error taxonomy shared across every crate in the workspace. Each
/// variant corresponds to one of the kinds enumerated for the gateway,
/// the sandbox driver, and the job store; propagation into an HTTP status
/// or a terminal job status happens at the call site, not here.
#[derive(thiserror::Error, Debug)]
pub enum JudgeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("compilation failed")]
    CompileError { compile_output: String },

    #[error("run phase exceeded {limit_ms} ms wall-clock ceiling")]
    RunTimeout { limit_ms: u64 },

    #[error("run phase exited with code {exit_code}")]
    RunNonZero { exit_code: i32 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl JudgeError {
    /// The `error_message` stored on a FAILED job record, when applicable.
    pub fn as_job_message(&self) -> Option<String> {
        match self {
            Self::RuntimeUnavailable(msg) => Some(format!("runtime unavailable: {msg}")),
            Self::Internal(msg) => Some(msg.clone()),
            Self::Storage(msg) => Some(format!("storage error: {msg}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation() {
        let err = JudgeError::Validation("language must be one of the enumerated set".into());
        assert_eq!(
            err.to_string(),
            "validation failed: language must be one of the enumerated set"
        );
    }

    #[test]
    fn display_not_found() {
        let err = JudgeError::NotFound("01J8Z".into());
        assert_eq!(err.to_string(), "job '01J8Z' not found");
    }

    #[test]
    fn display_runtime_unavailable() {
        let err = JudgeError::RuntimeUnavailable("docker daemon unreachable".into());
        assert_eq!(
            err.to_string(),
            "container runtime unavailable: docker daemon unreachable"
        );
    }

    #[test]
    fn display_compile_error() {
        let err = JudgeError::CompileError {
            compile_output: "expected ';'".into(),
        };
        assert_eq!(err.to_string(), "compilation failed");
    }

    #[test]
    fn display_run_timeout() {
        let err = JudgeError::RunTimeout { limit_ms: 2000 };
        assert_eq!(
            err.to_string(),
            "run phase exceeded 2000 ms wall-clock ceiling"
        );
    }

    #[test]
    fn display_run_nonzero() {
        let err = JudgeError::RunNonZero { exit_code: 3 };
        assert_eq!(err.to_string(), "run phase exited with code 3");
    }

    #[test]
    fn as_job_message_variants() {
        assert_eq!(
            JudgeError::RuntimeUnavailable("x".into()).as_job_message(),
            Some("runtime unavailable: x".into())
        );
        assert_eq!(
            JudgeError::Internal("boom".into()).as_job_message(),
            Some("boom".into())
        );
        assert_eq!(JudgeError::NotFound("id".into()).as_job_message(), None);
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JudgeError>();
    }
}
