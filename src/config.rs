use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::io::DEFAULT_DELIMITER;

/// Engine-wide settings that apply when a command leaves them unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delimiter used by `outputtofile` when none is given.
    pub default_delimiter: String,
    /// Relative paths in `inputfromfile`/`outputtofile` are resolved against this
    /// directory. `None` means the process working directory.
    pub base_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_delimiter: DEFAULT_DELIMITER.to_string(),
            base_dir: None,
        }
    }
}

impl EngineConfig {
    /// Sets the export delimiter. An empty delimiter would write files that
    /// cannot be split back into fields, so it is rejected.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::Argument("the delimiter must not be empty".into()));
        }
        self.default_delimiter = delimiter;
        Ok(self)
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_delimiter, "|");
        assert_eq!(config.resolve("in.txt"), PathBuf::from("in.txt"));
    }

    #[test]
    fn test_delimiter() {
        let config = EngineConfig::default().with_delimiter(";").unwrap();
        assert_eq!(config.default_delimiter, ";");

        let err = EngineConfig::default().with_delimiter("").unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_base_dir_only_applies_to_relative_paths() {
        let config = EngineConfig::default().with_base_dir("/data");
        assert_eq!(config.resolve("in.txt"), PathBuf::from("/data/in.txt"));
        assert_eq!(config.resolve("/tmp/in.txt"), PathBuf::from("/tmp/in.txt"));
    }
}
