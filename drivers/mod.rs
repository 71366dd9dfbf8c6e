// Driver package / 驱动包
pub mod local;
pub mod s3;

use crate::storage::StorageManager;

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) {
    // Register local driver (using LocalDriverFactory from storage module) / 注册本地驱动
    manager.register_factory(Box::new(crate::storage::local_factory::LocalDriverFactory)).await;
    // Register S3 driver / 注册S3对象存储驱动
    manager.register_factory(Box::new(s3::S3DriverFactory)).await;
}
