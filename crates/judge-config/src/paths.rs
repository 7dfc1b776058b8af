use std::path::PathBuf;

const APP_NAME: &str = "judge-server";

/// Default location for the job store's SQLite file when `database_url`
/// is not set: the platform's standard per-app state directory.
pub fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| {
            let state = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
            state.join("jobs.db")
        })
        .unwrap_or_else(|| std::env::temp_dir().join(format!("{APP_NAME}-jobs.db")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database_path_ends_with_jobs_db() {
        let path = default_database_path();
        assert_eq!(path.file_name().unwrap(), "jobs.db");
    }
}
