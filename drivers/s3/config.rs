//! S3驱动配置

use serde::{Deserialize, Serialize};

/// S3配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// 存储桶完整地址（scheme + host + 可选的桶路径）
    /// 虚拟主机风格: https://mongotool.s3.amazonaws.com
    /// 路径风格: http://localhost:9000/mongotool
    pub bucket_url: String,
    /// 签名区域，为空时根据主机名推断
    #[serde(default)]
    pub region: Option<String>,
    /// 凭证来源："env" 读取环境变量，"static" 使用下面的密钥
    #[serde(default = "default_credentials")]
    pub credentials: String,
    /// Access Key ID（仅 static）
    #[serde(default)]
    pub access_key_id: String,
    /// Secret Access Key（仅 static）
    #[serde(default)]
    pub secret_access_key: String,
    /// Session Token（用于临时凭证）
    #[serde(default)]
    pub session_token: String,
}

fn default_credentials() -> String {
    "env".to_string()
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket_url: String::new(),
            region: None,
            credentials: default_credentials(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
        }
    }
}
