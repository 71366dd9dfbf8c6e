//! S3写入器
//!
//! 所有写入的数据都缓存在内存中，直到关闭（shutdown）时才用一次签名 PUT 整体上传。
//! 远端协议需要已知的 Content-Length，这里不做分片或流式上传，对象越大占用内存越多。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWrite;

use super::signer::Signer;
use crate::error::{Result, StorageError};

type CommitFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

enum WriterState {
    /// 接收数据
    Open,
    /// PUT 进行中
    Committing(CommitFuture),
    /// 已关闭，再次关闭直接返回成功
    Closed,
}

/// S3缓冲写入器
pub struct S3Writer {
    client: Client,
    signer: Arc<Signer>,
    bucket: String,
    path: String,
    buffer: BytesMut,
    state: WriterState,
}

impl S3Writer {
    pub(crate) fn new(client: Client, signer: Arc<Signer>, bucket: String, path: String) -> Self {
        Self {
            client,
            signer,
            bucket,
            path,
            buffer: BytesMut::new(),
            state: WriterState::Open,
        }
    }

    /// 目标对象路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 当前缓存的字节数
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, WriterState::Closed)
    }

    /// 关闭并上传，返回具体的 [`StorageError`]；与 `shutdown` 等价
    pub async fn commit(&mut self) -> Result<()> {
        std::future::poll_fn(|cx| self.poll_commit(cx)).await
    }

    fn poll_commit(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        loop {
            match &mut self.state {
                WriterState::Open => {
                    // 取走缓冲区：无论成功失败都不会重发
                    let payload = self.buffer.split().freeze();
                    let upload = put_object(
                        self.client.clone(),
                        self.signer.clone(),
                        self.bucket.clone(),
                        self.path.clone(),
                        payload,
                    );
                    self.state = WriterState::Committing(Box::pin(upload));
                }
                WriterState::Committing(upload) => {
                    let result = ready!(upload.as_mut().poll(cx));
                    self.state = WriterState::Closed;
                    return Poll::Ready(result);
                }
                WriterState::Closed => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// 单次 PUT 上传完整对象
async fn put_object(client: Client, signer: Arc<Signer>, bucket: String, path: String, payload: Bytes) -> Result<()> {
    let size = payload.len();
    let request = signer.sign("PUT", &bucket, &path, payload)?;

    tracing::debug!("S3上传: path={}, size={}", path, size);

    let response = client.execute(request).await?;
    let status = response.status();
    if status != StatusCode::OK {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("<body unreadable: {}>", e),
        };
        tracing::debug!("S3上传失败: path={}, status={}", path, status);
        return Err(StorageError::RemoteWrite {
            status: status.as_u16(),
            body,
        });
    }

    tracing::debug!("S3上传完成: path={}", path);
    Ok(())
}

impl AsyncWrite for S3Writer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        if !matches!(this.state, WriterState::Open) {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "S3写入器已关闭",
            )));
        }
        this.buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.get_mut().poll_commit(cx).map_err(std::io::Error::from)
    }
}
