use serde_json::Value;

use super::{Storage, StorageFactory};
use crate::drivers::local::{LocalConfig, LocalDriver};
use crate::error::{Result, StorageError};

pub struct LocalDriverFactory;

impl StorageFactory for LocalDriverFactory {
    fn backend_type(&self) -> &'static str {
        "local"
    }

    fn create(&self, config: Value) -> Result<Box<dyn Storage>> {
        let config: LocalConfig = serde_json::from_value(config)
            .map_err(|e| StorageError::InvalidConfig(format!("local: {}", e)))?;

        if config.root.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig("local: root is required".to_string()));
        }

        if !config.root.exists() {
            std::fs::create_dir_all(&config.root)?;
        }
        let canonical_root = config.root.canonicalize()?;

        tracing::info!("Local driver initialized, root: {:?}", canonical_root);

        Ok(Box::new(LocalDriver::new(canonical_root)))
    }
}
