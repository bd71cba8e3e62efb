//! Locating and reading the config file.

use crate::error::ConfigError;
use crate::format::ConfigFormat;
use crate::options::LoadPolicy;
use crate::value::Table;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds and parses the config file for a policy.
pub trait FileSource: Send + Sync {
    /// Resolve the file to load. Must return [`ConfigError::NotFound`] when
    /// nothing matches, and only then.
    fn locate(&self, policy: &LoadPolicy) -> Result<PathBuf, ConfigError>;

    /// Read and parse one file.
    fn read(&self, path: &Path, format: ConfigFormat) -> Result<Table, ConfigError>;
}

/// Filesystem-backed [`FileSource`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl FileSource for FsSource {
    fn locate(&self, policy: &LoadPolicy) -> Result<PathBuf, ConfigError> {
        if let Some(ref explicit) = policy.config_file {
            // An explicit file that is missing is an I/O problem, not a
            // search miss.
            return match std::fs::metadata(explicit) {
                Ok(_) => Ok(explicit.clone()),
                Err(e) => Err(ConfigError::io(explicit, e)),
            };
        }

        for dir in &policy.search_paths {
            if let Some(found) = search_dir(dir, &policy.config_name, policy.config_type) {
                debug!("Found config file: {}", found.display());
                return Ok(found);
            }
        }

        Err(ConfigError::NotFound {
            name: policy.config_name.clone(),
            searched: policy.search_paths.clone(),
        })
    }

    fn read(&self, path: &Path, format: ConfigFormat) -> Result<Table, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        format.parse(path, &content)
    }
}

/// Candidate order: `<name>.<hint ext>`, every other known extension, then
/// the bare `<name>`.
fn search_dir(dir: &Path, name: &str, hint: ConfigFormat) -> Option<PathBuf> {
    let hinted = hint.extensions().iter();
    let others = ConfigFormat::ALL
        .iter()
        .filter(|f| **f != hint)
        .flat_map(|f| f.extensions().iter());

    hinted
        .chain(others)
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .chain(std::iter::once(dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Format for a located file: its extension if recognised, else the hint.
pub fn format_for(path: &Path, hint: ConfigFormat) -> ConfigFormat {
    ConfigFormat::from_path(path).unwrap_or(hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{self, LoadPolicy};
    use tempfile::TempDir;

    fn policy_for(dirs: &[&Path], name: &str, format: &str) -> LoadPolicy {
        LoadPolicy::from_options([
            options::with_config_paths(dirs.iter().copied()),
            options::with_config_name(name),
            options::with_config_type(format),
        ])
    }

    #[test]
    fn test_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = FsSource
            .locate(&policy_for(&[temp.path()], "config", "yaml"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_first_search_path_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("app.yaml"), "a: 1").unwrap();
        std::fs::write(second.path().join("app.yaml"), "a: 2").unwrap();

        let found = FsSource
            .locate(&policy_for(&[first.path(), second.path()], "app", "yaml"))
            .unwrap();
        assert_eq!(found, first.path().join("app.yaml"));
    }

    #[test]
    fn test_hinted_extension_preferred() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.json"), "{}").unwrap();
        std::fs::write(temp.path().join("app.toml"), "").unwrap();

        let found = FsSource
            .locate(&policy_for(&[temp.path()], "app", "toml"))
            .unwrap();
        assert_eq!(found, temp.path().join("app.toml"));
    }

    #[test]
    fn test_other_extension_found() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.json"), "{}").unwrap();

        let found = FsSource
            .locate(&policy_for(&[temp.path()], "app", "yaml"))
            .unwrap();
        assert_eq!(found, temp.path().join("app.json"));
        assert_eq!(format_for(&found, ConfigFormat::Yaml), ConfigFormat::Json);
    }

    #[test]
    fn test_bare_name_uses_hint() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app"), "a = 1").unwrap();

        let found = FsSource
            .locate(&policy_for(&[temp.path()], "app", "toml"))
            .unwrap();
        assert_eq!(format_for(&found, ConfigFormat::Toml), ConfigFormat::Toml);
    }

    #[test]
    fn test_explicit_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let policy =
            LoadPolicy::from_options([options::with_config_file(temp.path().join("nope.yaml"))]);
        let err = FsSource.locate(&policy).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_read_parses_by_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");
        std::fs::write(&path, "name: demo\n").unwrap();
        let table = FsSource.read(&path, ConfigFormat::Yaml).unwrap();
        assert_eq!(table["name"], crate::value::Value::from("demo"));
    }
}
