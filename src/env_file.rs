//! `.env` loading shared by both binaries.
//!
//! An explicit `--env-file` must exist; otherwise `./.env` is used when
//! present. Variables already set in the process environment are kept.

use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    pub explicit: bool,
}

pub fn load(explicit: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(path)?;
        return Ok(Some(LoadedEnvFile {
            path: path.to_path_buf(),
            explicit: true,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        load_env_file(&default_path)?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn load_env_file(path: &Path) -> Result<(), String> {
    dotenv::from_path(path).map_err(|e| format!("failed to load {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load(Some(Path::new("tests/data/does-not-exist.env"))).unwrap_err();
        assert!(err.contains("env file not found"), "{}", err);
    }

    #[test]
    fn explicit_file_is_loaded_without_overriding() {
        // SAFETY: test-only variables not read by any other test
        unsafe {
            std::env::set_var("WINDFARM_TEST_PRESET", "from-process");
        }
        let loaded = load(Some(Path::new("tests/data/sample.env"))).unwrap().unwrap();
        assert!(loaded.explicit);
        assert_eq!(std::env::var("WINDFARM_TEST_ONLY").as_deref(), Ok("from-file"));
        assert_eq!(std::env::var("WINDFARM_TEST_PRESET").as_deref(), Ok("from-process"));
    }
}
