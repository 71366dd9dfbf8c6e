//! S3请求签名（AWS Signature Version 4）
//!
//! 每个操作都生成一个新的已签名请求，不缓存不复用。
//! 签名计算在一个私有互斥锁内完成，锁只覆盖签名本身，不覆盖网络往返。

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Request};
use sha2::{Digest, Sha256};
use url::Url;

use super::credentials::{CredentialSource, Credentials};
use crate::error::{Result, StorageError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const DEFAULT_REGION: &str = "us-east-1";

/// 请求签名器
pub struct Signer {
    credentials: Arc<dyn CredentialSource>,
    region: Option<String>,
    sign_lock: Mutex<()>,
}

impl Signer {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            credentials,
            region: None,
            sign_lock: Mutex::new(()),
        }
    }

    /// 固定签名区域（否则根据主机名推断）
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region.filter(|r| !r.is_empty());
        self
    }

    /// 检查凭证是否存在，在任何网络请求之前调用
    pub fn check_credentials(&self) -> Result<()> {
        self.credentials.credentials().map(|_| ())
    }

    /// 构造并签名对象请求
    pub fn sign(&self, method: &str, bucket: &str, path: &str, body: Bytes) -> Result<Request> {
        self.sign_with_query(method, bucket, path, &[], body)
    }

    /// 构造并签名带查询参数的请求
    pub fn sign_with_query(
        &self,
        method: &str,
        bucket: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Request> {
        self.sign_at(method, bucket, path, query, body, Utc::now())
    }

    fn sign_at(
        &self,
        method: &str,
        bucket: &str,
        path: &str,
        query: &[(&str, &str)],
        body: Bytes,
        now: DateTime<Utc>,
    ) -> Result<Request> {
        let credentials = self.credentials.credentials()?;

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| StorageError::RequestConstruction(format!("invalid method {:?}: {}", method, e)))?;

        check_path(path)?;
        let raw_url = full_path(bucket, &encode_path(path));
        let mut url = Url::parse(&raw_url)
            .map_err(|e| StorageError::RequestConstruction(format!("invalid url {:?}: {}", raw_url, e)))?;
        let host = host_header(&url)
            .ok_or_else(|| StorageError::RequestConstruction(format!("url has no host: {}", raw_url)))?;

        let canonical_query = canonical_query(query);
        url.set_query(if canonical_query.is_empty() { None } else { Some(canonical_query.as_str()) });

        let region = match &self.region {
            Some(region) => region.clone(),
            None => infer_region(url.host_str().unwrap_or_default()),
        };

        let payload_hash = hex::encode(Sha256::digest(&body));
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        // 按名称排序
        let mut headers: Vec<(&'static str, String)> = vec![
            ("host", host),
            ("x-amz-content-sha256", payload_hash.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }

        let canonical = CanonicalRequest {
            method: method.as_str(),
            uri: url.path(),
            query: &canonical_query,
            headers: &headers,
            payload_hash: &payload_hash,
        };

        let authorization = {
            let _guard = self.sign_lock.lock();
            authorization(&credentials, &canonical, &amz_date, &date, &region)
        };
        headers.push(("authorization", authorization));

        tracing::debug!("S3签名: {} {} region={}", method, url, region);

        let mut request = Request::new(method, url);
        {
            let request_headers = request.headers_mut();
            for (name, value) in headers {
                let value = HeaderValue::from_str(&value)
                    .map_err(|e| StorageError::RequestConstruction(format!("invalid header {}: {}", name, e)))?;
                request_headers.insert(HeaderName::from_static(name), value);
            }
        }
        *request.body_mut() = Some(body.into());

        Ok(request)
    }
}

struct CanonicalRequest<'a> {
    method: &'a str,
    uri: &'a str,
    query: &'a str,
    headers: &'a [(&'static str, String)],
    payload_hash: &'a str,
}

impl CanonicalRequest<'_> {
    fn signed_headers(&self) -> String {
        self.headers.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(";")
    }

    fn render(&self) -> String {
        let canonical_headers: String = self
            .headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.uri,
            self.query,
            canonical_headers,
            self.signed_headers(),
            self.payload_hash
        )
    }
}

fn authorization(
    credentials: &Credentials,
    canonical: &CanonicalRequest<'_>,
    amz_date: &str,
    date: &str,
    region: &str,
) -> String {
    let scope = format!("{}/{}/{}/aws4_request", date, region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical.render().as_bytes()))
    );

    let secret = format!("AWS4{}", credentials.secret_access_key);
    let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        credentials.access_key_id,
        scope,
        canonical.signed_headers(),
        signature
    )
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// 拼接存储桶地址与对象路径，只有两边都没有斜杠时才插入一个
pub fn full_path(bucket: &str, path: &str) -> String {
    if !path.is_empty() && !path.starts_with('/') && !bucket.ends_with('/') {
        format!("{}/{}", bucket, path)
    } else {
        format!("{}{}", bucket, path)
    }
}

/// 拒绝 `.` 与 `..` 路径段（URL 解析会折叠它们）
pub fn check_path(path: &str) -> Result<()> {
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StorageError::RequestConstruction(format!(
            "object path {:?} contains a dot segment",
            path
        )));
    }
    Ok(())
}

/// 按段编码对象路径，保留 `/`
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(query: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// 根据主机名推断区域
/// s3.eu-west-1.amazonaws.com / bucket.s3.eu-west-1.amazonaws.com / s3-eu-west-1.amazonaws.com
fn infer_region(host: &str) -> String {
    let Some(name) = host.strip_suffix(".amazonaws.com") else {
        return DEFAULT_REGION.to_string();
    };
    let labels: Vec<&str> = name.split('.').collect();
    let Some(pos) = labels.iter().rposition(|l| *l == "s3" || l.starts_with("s3-")) else {
        return DEFAULT_REGION.to_string();
    };

    let region = match labels[pos].strip_prefix("s3-") {
        Some(region) => Some(region),
        None => labels[pos + 1..].iter().copied().find(|l| *l != "dualstack"),
    };
    match region {
        Some(region) if !region.is_empty() && region != "external-1" => region.to_string(),
        _ => DEFAULT_REGION.to_string(),
    }
}
