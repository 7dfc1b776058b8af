//! A [`SandboxDriver`] that never shells out to Docker. `judge-dispatcher`
//! and `judge-api` use it to drive deterministic worker-pool and gateway
//! scenarios without a reachable daemon.

use async_trait::async_trait;
use judge_catalog::LanguageSpec;
use judge_core::{JudgeError, Language};

use crate::{RunOutcome, SandboxDriver};

type Responder =
    dyn Fn(&str, Language, Option<&str>, &LanguageSpec) -> Result<RunOutcome, JudgeError> + Send + Sync;

pub struct FakeSandboxDriver {
    respond: Box<Responder>,
}

impl FakeSandboxDriver {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, Language, Option<&str>, &LanguageSpec) -> Result<RunOutcome, JudgeError>
            + Send
            + Sync
            + 'static,
    {
        Self { respond: Box::new(respond) }
    }

    /// Returns the same outcome for every invocation, regardless of input.
    pub fn outcome(outcome: RunOutcome) -> Self {
        Self::new(move |_, _, _, _| Ok(outcome.clone()))
    }
}

#[async_trait]
impl SandboxDriver for FakeSandboxDriver {
    async fn run(
        &self,
        source_code: &str,
        language: Language,
        stdin: Option<&str>,
        spec: &LanguageSpec,
    ) -> Result<RunOutcome, JudgeError> {
        (self.respond)(source_code, language, stdin, spec)
    }
}
