//! Environment-driven configuration. Loaded once at process startup into
//! an owned, immutable value passed by reference into every constructed
//! component — never re-read from a process-global afterward.

use std::collections::HashMap;

use judge_core::Language;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

/// Image reference overrides keyed by language, sourced from
/// `JUDGE_IMAGE_<LANGUAGE>` environment variables (e.g. `JUDGE_IMAGE_PYTHON3`).
fn env_image_overrides() -> HashMap<Language, String> {
    let mut overrides = HashMap::new();
    for &lang in Language::ALL {
        let key = format!("JUDGE_IMAGE_{}", lang.as_str().to_ascii_uppercase());
        if let Ok(image) = std::env::var(&key) {
            overrides.insert(lang, image);
        }
    }
    overrides
}

#[derive(Clone, Debug)]
pub struct JudgeConfig {
    /// SQLite connection string or bare file path for the job store.
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    /// Worker pool size.
    pub max_workers: usize,
    pub max_memory_mb: u64,
    pub max_cpu_time_ms: u64,
    pub max_wall_time_ms: u64,
    pub enable_network: bool,
    pub compilation_timeout_ms: u64,
    pub log_level: String,
    pub image_overrides: HashMap<Language, String>,
}

impl JudgeConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            crate::paths::default_database_path()
                .to_string_lossy()
                .into_owned()
        });

        Self {
            database_url,
            api_host: env_string("API_HOST", "0.0.0.0"),
            api_port: env_parsed("API_PORT", 8000u16),
            max_workers: env_parsed("MAX_WORKERS", 4usize),
            max_memory_mb: env_parsed("MAX_MEMORY_MB", 128u64),
            max_cpu_time_ms: env_parsed("MAX_CPU_TIME_MS", 5000u64),
            max_wall_time_ms: env_parsed("MAX_WALL_TIME_MS", 5000u64),
            enable_network: env_bool("ENABLE_NETWORK", false),
            compilation_timeout_ms: env_parsed("COMPILATION_TIMEOUT_MS", 30_000u64),
            log_level: env_string("LOG_LEVEL", "info"),
            image_overrides: env_image_overrides(),
        }
    }

    /// Resolves a SQLite file path out of `database_url`, stripping a
    /// `sqlite://` scheme if present; any other value is treated as a bare
    /// filesystem path, since this system carries no network-database
    /// driver.
    pub fn database_path(&self) -> std::path::PathBuf {
        let stripped = self
            .database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&self.database_url);
        std::path::PathBuf::from(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_when_unset() {
        for key in [
            "DATABASE_URL",
            "API_HOST",
            "API_PORT",
            "MAX_WORKERS",
            "MAX_MEMORY_MB",
            "ENABLE_NETWORK",
        ] {
            unsafe { std::env::remove_var(key) };
        }
        let cfg = JudgeConfig::from_env();
        assert_eq!(cfg.api_host, "0.0.0.0");
        assert_eq!(cfg.api_port, 8000);
        assert_eq!(cfg.max_workers, 4);
        assert!(!cfg.enable_network);
    }

    #[test]
    #[serial]
    fn reads_overrides_from_env() {
        unsafe {
            std::env::set_var("API_PORT", "9090");
            std::env::set_var("MAX_WORKERS", "8");
            std::env::set_var("ENABLE_NETWORK", "true");
            std::env::set_var("JUDGE_IMAGE_PYTHON3", "myregistry/python3:1.2");
        }
        let cfg = JudgeConfig::from_env();
        assert_eq!(cfg.api_port, 9090);
        assert_eq!(cfg.max_workers, 8);
        assert!(cfg.enable_network);
        assert_eq!(
            cfg.image_overrides.get(&Language::Python3).map(String::as_str),
            Some("myregistry/python3:1.2")
        );
        unsafe {
            std::env::remove_var("API_PORT");
            std::env::remove_var("MAX_WORKERS");
            std::env::remove_var("ENABLE_NETWORK");
            std::env::remove_var("JUDGE_IMAGE_PYTHON3");
        }
    }

    #[test]
    fn database_path_strips_sqlite_scheme() {
        let mut cfg = JudgeConfig::from_env();
        cfg.database_url = "sqlite:///var/lib/judge/jobs.db".to_string();
        assert_eq!(cfg.database_path(), std::path::PathBuf::from("/var/lib/judge/jobs.db"));
    }
}
