//! S3对象存储驱动
//!
//! 请求签名 -> 缓冲写入 -> 关闭时提交 -> 列表解析

pub mod config;
pub mod credentials;
pub mod driver;
pub mod factory;
pub mod listing;
pub mod signer;
pub mod writer;

pub use config::S3Config;
pub use credentials::{CredentialSource, Credentials, EnvCredentials, StaticCredentials};
pub use driver::S3Driver;
pub use factory::S3DriverFactory;
pub use signer::Signer;
pub use writer::S3Writer;
