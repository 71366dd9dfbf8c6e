//! Local filesystem driver / 本地文件系统驱动

mod driver;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use driver::LocalDriver;

/// Local driver configuration / 本地驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Root directory; object paths are relative to it / 根目录
    pub root: PathBuf,
}
