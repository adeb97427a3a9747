//! YAML session-state I/O
//!
//! Generic load/save helpers; loading falls back to defaults on a missing
//! or unparseable file so a damaged state file never blocks startup.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load a value from a YAML file, falling back to `T::default()` when the
/// file is missing or invalid
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("no state file at {:?}, using defaults", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(value) => {
                log::info!("loaded state from {:?}", path);
                value
            }
            Err(e) => {
                log::warn!("could not parse {:?}: {}, using defaults", path, e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!("could not read {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save a value to a YAML file, creating parent directories as needed
pub fn save_config<T>(value: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create state directory {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(value).context("failed to serialize state")?;
    std::fs::write(path, yaml).with_context(|| format!("failed to write state file {:?}", path))?;

    log::info!("saved state to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestState {
        value: i32,
        name: String,
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let state: TestState = load_config(Path::new("/nonexistent/path/state.yaml"));
        assert_eq!(state, TestState::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");

        let state = TestState {
            value: 42,
            name: "hello".to_string(),
        };
        save_config(&state, &path).unwrap();

        let loaded: TestState = load_config(&path);
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_invalid_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        std::fs::write(&path, "{{{ not yaml").unwrap();

        let state: TestState = load_config(&path);
        assert_eq!(state, TestState::default());
    }
}
