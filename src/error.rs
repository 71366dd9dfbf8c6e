//! Storage error taxonomy / 存储错误类型
//!
//! Every backend operation returns [`StorageError`]; nothing is retried or swallowed
//! inside this crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Required credentials or settings are missing / 缺少凭证或必要配置
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Method, path or URL cannot form a valid request / 无法构造请求
    #[error("invalid request: {0}")]
    RequestConstruction(String),

    /// Network level failure, passed through from reqwest / 网络错误
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// PUT did not return 200 / 上传失败
    #[error("expected 200 OK, got: ({status})\n{body}")]
    RemoteWrite { status: u16, body: String },

    /// GET did not return 200; the body is not read since it may be huge / 下载失败
    #[error("unexpected status code: {status}")]
    RemoteRead { status: u16 },

    /// Listing did not return 200 / 列举失败
    #[error("unexpected status code: {status}\n{body}")]
    RemoteList { status: u16, body: String },

    /// Listing body is not valid XML / 列表解析失败
    #[error("malformed listing: {0}")]
    Parse(String),

    /// Local filesystem failure / 本地文件错误
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("backend type not found: {0}")]
    UnknownBackend(String),

    #[error("invalid backend config: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    /// Recover the typed error carried by an `io::Error` produced by a writer's shutdown
    /// 从 io::Error 中取回 StorageError
    pub fn from_io(err: &std::io::Error) -> Option<&StorageError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<StorageError>())
    }

    /// HTTP status reported by the remote store, if any / 远端返回的状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::RemoteWrite { status, .. }
            | StorageError::RemoteRead { status }
            | StorageError::RemoteList { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<StorageError> for std::io::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

impl From<quick_xml::DeError> for StorageError {
    fn from(err: quick_xml::DeError) -> Self {
        StorageError::Parse(err.to_string())
    }
}
