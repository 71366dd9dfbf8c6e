use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, StorageError};

/// Readable object stream / 对象读取流
pub type ObjectReader = Box<dyn AsyncRead + Unpin + Send>;

/// Object writer; data is committed when the writer is shut down / 对象写入器，shutdown 时提交
pub type ObjectWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Walk callback: object key plus an optional per-entry error / 遍历回调
pub type WalkFn<'a> = dyn FnMut(&str, Option<StorageError>) + Send + 'a;

/// One object in a listing / 列表条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Storage capability interface (save / fetch / walk) / 存储能力接口
///
/// Both the local filesystem and the S3 backend implement this identically from the
/// caller's point of view.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend name / 后端名称
    fn name(&self) -> &str;

    /// Open a writer for `path`. Nothing is stored until the writer is shut down.
    /// 打开写入器
    async fn save(&self, path: &str) -> Result<ObjectWriter>;

    /// Open a reader for `path`. The caller owns the stream and should drop it
    /// when done to release the underlying file or connection.
    /// 打开读取器
    async fn fetch(&self, path: &str) -> Result<ObjectReader>;

    /// Enumerate object keys under `prefix`, invoking `visit` once per entry.
    /// 遍历前缀下的对象
    async fn walk(&self, prefix: &str, visit: &mut WalkFn<'_>) -> Result<()>;
}

pub mod manager;
pub mod local_factory;

pub use manager::{StorageFactory, StorageManager};
