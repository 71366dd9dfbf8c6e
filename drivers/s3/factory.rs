//! S3驱动工厂

use serde_json::Value;

use super::config::S3Config;
use super::driver::S3Driver;
use crate::error::{Result, StorageError};
use crate::storage::{Storage, StorageFactory};

/// S3驱动工厂
pub struct S3DriverFactory;

impl StorageFactory for S3DriverFactory {
    fn backend_type(&self) -> &'static str {
        "s3"
    }

    fn create(&self, config: Value) -> Result<Box<dyn Storage>> {
        let config: S3Config = serde_json::from_value(config)
            .map_err(|e| StorageError::InvalidConfig(format!("s3: {}", e)))?;
        Ok(Box::new(S3Driver::from_config(&config)?))
    }
}
