//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, StorageBackend};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "queue.batch_size must be > 0".into(),
            ));
        }
        if self.queue.max_receive_count == 0 {
            return Err(ConfigError::ValidationError(
                "queue.max_receive_count must be > 0".into(),
            ));
        }
        if self.queue.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "queue.buffer_size must be > 0".into(),
            ));
        }
        if self.filter.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "filter.allowed_extensions must not be empty".into(),
            ));
        }
        if let Some(ext) = self
            .filter
            .allowed_extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(ConfigError::ValidationError(format!(
                "filter.allowed_extensions entries must be bare extensions, got {ext:?}"
            )));
        }
        if !self.filter.source_prefix.is_empty() && !self.filter.source_prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "filter.source_prefix must end with '/'".into(),
            ));
        }
        if self.artifacts.prefix.is_empty() || !self.artifacts.prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "artifacts.prefix must be non-empty and end with '/'".into(),
            ));
        }
        // Artifacts landing under the source prefix would be fed back into the pipeline.
        if !self.filter.source_prefix.is_empty()
            && self.artifacts.prefix.starts_with(&self.filter.source_prefix)
        {
            return Err(ConfigError::ValidationError(
                "artifacts.prefix must not be inside filter.source_prefix".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Local
            && self.storage.root.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "storage.root is required for the local backend".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.queue.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let mut config = Config::default();
        config.filter.allowed_extensions = vec![".png".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("allowed_extensions"));
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let mut config = Config::default();
        config.filter.allowed_extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_prefix_without_slash() {
        let mut config = Config::default();
        config.filter.source_prefix = "incoming".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("source_prefix"));
    }

    #[test]
    fn test_validate_rejects_artifacts_inside_source_prefix() {
        let mut config = Config::default();
        config.artifacts.prefix = "incoming/metadata/".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("artifacts.prefix"));
    }

    #[test]
    fn test_validate_rejects_empty_local_root() {
        let mut config = Config::default();
        config.storage.root = std::path::PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.root"));
    }
}
