use serde::{Deserialize, Serialize};

/// One of the languages the execution engine accepts. Closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python3,
    Python2,
    Java,
    Cpp,
    C,
    Javascript,
    Typescript,
    Rust,
    Go,
    Ruby,
    Php,
    Csharp,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::Python3,
        Language::Python2,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::Javascript,
        Language::Typescript,
        Language::Rust,
        Language::Go,
        Language::Ruby,
        Language::Php,
        Language::Csharp,
    ];

    /// The wire identifier used in requests, responses, and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python3 => "python3",
            Self::Python2 => "python2",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Csharp => "csharp",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python3" => Ok(Self::Python3),
            "python2" => Ok(Self::Python2),
            "java" => Ok(Self::Java),
            "cpp" => Ok(Self::Cpp),
            "c" => Ok(Self::C),
            "javascript" => Ok(Self::Javascript),
            "typescript" => Ok(Self::Typescript),
            "rust" => Ok(Self::Rust),
            "go" => Ok(Self::Go),
            "ruby" => Ok(Self::Ruby),
            "php" => Ok(Self::Php),
            "csharp" => Ok(Self::Csharp),
            other => Err(format!("unknown language '{other}'")),
        }
    }
}

/// Terminal and non-terminal states of a submission. Wire strings are
/// normalized uppercase (see design notes on the lowercase/uppercase drift
/// in the system this engine replaces); lowercase is never accepted at the
/// input boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Timeout,
    CompilationError,
    RuntimeError,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::CompilationError => "COMPILATION_ERROR",
            Self::RuntimeError => "RUNTIME_ERROR",
        }
    }

    /// True for any status from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    /// Only the uppercase wire form is accepted. Lowercase and mixed case
    /// are rejected at this boundary rather than silently normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "TIMEOUT" => Ok(Self::Timeout),
            "COMPILATION_ERROR" => Ok(Self::CompilationError),
            "RUNTIME_ERROR" => Ok(Self::RuntimeError),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}
