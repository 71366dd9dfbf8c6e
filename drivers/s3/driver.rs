//! S3驱动核心实现
//!
//! 设计原则：
//! - 只提供原语（save, fetch, walk）
//! - 写入全部缓存在内存，关闭时单次 PUT
//! - 读取直接返回响应体流，不缓存
//! - 列举只请求一页（最多1000条），不跟随续页

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use tokio_util::io::StreamReader;

use super::config::S3Config;
use super::credentials::{CredentialSource, Credentials, EnvCredentials, StaticCredentials};
use super::listing::{normalize_prefix, parse_listing};
use super::signer::{check_path, Signer};
use super::writer::S3Writer;
use crate::error::{Result, StorageError};
use crate::storage::{ListEntry, ObjectReader, ObjectWriter, Storage, WalkFn};

/// S3驱动
pub struct S3Driver {
    /// 存储桶完整地址，例如 https://mongotool.s3.amazonaws.com
    bucket: String,
    client: Client,
    signer: Arc<Signer>,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(bucket: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Self::with_signer(bucket, Signer::new(credentials))
    }

    pub fn with_signer(bucket: impl Into<String>, signer: Signer) -> Result<Self> {
        // 复用连接时S3会把后续GET的内容弄乱，所以禁用连接池
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self {
            bucket: bucket.into(),
            client,
            signer: Arc::new(signer),
        })
    }

    /// 根据配置创建
    pub fn from_config(config: &S3Config) -> Result<Self> {
        if config.bucket_url.trim().is_empty() {
            return Err(StorageError::InvalidConfig("bucket_url is required".to_string()));
        }

        let credentials: Arc<dyn CredentialSource> = match config.credentials.as_str() {
            "env" => Arc::new(EnvCredentials::new()),
            "static" => Arc::new(StaticCredentials::new(
                Credentials::new(config.access_key_id.clone(), config.secret_access_key.clone())
                    .with_session_token(config.session_token.clone()),
            )),
            other => {
                return Err(StorageError::InvalidConfig(format!("unknown credentials source: {}", other)));
            }
        };

        let signer = Signer::new(credentials).with_region(config.region.clone());
        Self::with_signer(config.bucket_url.clone(), signer)
    }

    /// 存储桶地址
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 列出前缀下的对象（单次请求，最多返回服务端一页）
    pub async fn list(&self, prefix: &str) -> Result<Vec<ListEntry>> {
        self.signer.check_credentials()?;

        let prefix = normalize_prefix(prefix);
        let request = self
            .signer
            .sign_with_query("GET", &self.bucket, "", &[("prefix", prefix.as_str())], Bytes::new())?;

        tracing::debug!("S3列举: bucket={}, prefix={}", self.bucket, prefix);

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(StorageError::RemoteList {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let listing = parse_listing(&body)?;
        if listing.is_truncated {
            tracing::warn!(
                "S3列举结果被截断: prefix={}, 只返回了{}条（不跟随续页）",
                prefix,
                listing.entries.len()
            );
        }

        Ok(listing.entries)
    }
}

#[async_trait]
impl Storage for S3Driver {
    fn name(&self) -> &str {
        "S3"
    }

    async fn save(&self, path: &str) -> Result<ObjectWriter> {
        // 凭证缺失或路径非法时立即失败，而不是等到关闭时
        self.signer.check_credentials()?;
        check_path(path)?;

        Ok(Box::new(S3Writer::new(
            self.client.clone(),
            self.signer.clone(),
            self.bucket.clone(),
            path.to_string(),
        )))
    }

    async fn fetch(&self, path: &str) -> Result<ObjectReader> {
        self.signer.check_credentials()?;

        let request = self.signer.sign("GET", &self.bucket, path, Bytes::new())?;

        tracing::debug!("S3下载: path={}", path);

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!("S3下载请求失败: path={}, error={}", path, e);
            StorageError::Transport(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            // 不读取响应体，可能非常大
            return Err(StorageError::RemoteRead { status: status.as_u16() });
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }

    async fn walk(&self, prefix: &str, visit: &mut WalkFn<'_>) -> Result<()> {
        for entry in self.list(prefix).await? {
            visit(&entry.key, None);
        }
        Ok(())
    }
}
