use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::Storage;
use crate::error::{Result, StorageError};

pub type StorageBox = Arc<dyn Storage>;

/// Backend factory trait / 后端工厂 trait
pub trait StorageFactory: Send + Sync {
    /// Backend type name used in config / 后端类型名称
    fn backend_type(&self) -> &'static str;

    /// Create backend instance from JSON config / 根据配置创建后端实例
    fn create(&self, config: Value) -> Result<Box<dyn Storage>>;
}

/// Storage manager (manages backend factories and named instances) / 存储管理器
#[derive(Clone, Default)]
pub struct StorageManager {
    backends: Arc<RwLock<HashMap<String, StorageBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<dyn StorageFactory>>>>,
    /// Backend error status (id -> error message) / 后端错误状态
    backend_errors: Arc<RwLock<HashMap<String, String>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the local and S3 factories registered / 注册了内置后端的管理器
    pub async fn with_builtin() -> Self {
        let manager = Self::new();
        crate::drivers::register_all(&manager).await;
        manager
    }

    /// Register backend factory / 注册后端工厂
    pub async fn register_factory(&self, factory: Box<dyn StorageFactory>) {
        let backend_type = factory.backend_type().to_string();

        let mut factories = self.factories.write().await;
        factories.insert(backend_type.clone(), Arc::from(factory));

        tracing::info!("Storage factory registered: {}", backend_type);
    }

    /// Create backend instance and store it under `id` / 创建后端实例
    pub async fn create_backend(&self, id: &str, backend_type: &str, config: Value) -> Result<StorageBox> {
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(backend_type)
                .cloned()
                .ok_or_else(|| StorageError::UnknownBackend(backend_type.to_string()))?
        };

        match factory.create(config) {
            Ok(backend) => {
                let backend: StorageBox = Arc::from(backend);
                self.backends.write().await.insert(id.to_string(), backend.clone());
                self.backend_errors.write().await.remove(id);
                tracing::info!("Storage backend created: {} ({})", id, backend_type);
                Ok(backend)
            }
            Err(e) => {
                self.backend_errors.write().await.insert(id.to_string(), e.to_string());
                tracing::error!("Storage backend creation failed: {} ({}) - {}", id, backend_type, e);
                Err(e)
            }
        }
    }

    /// Verify a backend by walking its root, recording the outcome / 验证后端可用性
    pub async fn check_backend(&self, id: &str) -> Result<()> {
        let backend = self
            .get_backend(id)
            .await
            .ok_or_else(|| StorageError::UnknownBackend(id.to_string()))?;

        match backend.walk("", &mut |_, _| {}).await {
            Ok(()) => {
                self.backend_errors.write().await.remove(id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Storage backend verification failed: {} - {}", id, e);
                self.backend_errors.write().await.insert(id.to_string(), e.to_string());
                Err(e)
            }
        }
    }

    /// Get backend error status / 获取后端错误状态
    pub async fn get_backend_error(&self, id: &str) -> Option<String> {
        self.backend_errors.read().await.get(id).cloned()
    }

    /// Get backend instance / 获取后端实例
    pub async fn get_backend(&self, id: &str) -> Option<StorageBox> {
        self.backends.read().await.get(id).cloned()
    }

    /// Remove backend instance / 移除后端实例
    pub async fn remove_backend(&self, id: &str) -> Result<()> {
        self.backends
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StorageError::UnknownBackend(id.to_string()))?;
        self.backend_errors.write().await.remove(id);

        tracing::info!("Storage backend removed: {}", id);
        Ok(())
    }

    /// List backend ids / 列出所有后端
    pub async fn list_backends(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List registered backend types / 列出所有可用的后端类型
    pub async fn list_backend_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}
