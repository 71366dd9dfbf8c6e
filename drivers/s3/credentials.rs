//! S3凭证来源

use std::fmt;

use crate::error::{Result, StorageError};

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// 访问凭证
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.session_token = if token.is_empty() { None } else { Some(token) };
        self
    }
}

// 不输出密钥
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// 凭证来源，每次签名时调用
pub trait CredentialSource: Send + Sync {
    fn credentials(&self) -> Result<Credentials>;
}

/// 从环境变量读取凭证（每次调用都重新读取，不缓存）
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    access_key_var: String,
    secret_key_var: String,
    session_token_var: String,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::with_names(ACCESS_KEY_ENV, SECRET_KEY_ENV, SESSION_TOKEN_ENV)
    }

    /// 自定义环境变量名
    pub fn with_names(access_key_var: &str, secret_key_var: &str, session_token_var: &str) -> Self {
        Self {
            access_key_var: access_key_var.to_string(),
            secret_key_var: secret_key_var.to_string(),
            session_token_var: session_token_var.to_string(),
        }
    }

    fn required(name: &str) -> Result<String> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(StorageError::Configuration(format!("Missing {} environment variable", name))),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let access_key_id = Self::required(&self.access_key_var)?;
        let secret_access_key = Self::required(&self.secret_key_var)?;
        let token = std::env::var(&self.session_token_var).unwrap_or_default();
        Ok(Credentials::new(access_key_id, secret_access_key).with_session_token(token))
    }
}

/// 固定凭证
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        if self.0.access_key_id.is_empty() {
            return Err(StorageError::Configuration("Missing access key id".to_string()));
        }
        if self.0.secret_access_key.is_empty() {
            return Err(StorageError::Configuration("Missing secret access key".to_string()));
        }
        Ok(self.0.clone())
    }
}
