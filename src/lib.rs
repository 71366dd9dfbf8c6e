//! Storage abstraction for the backup/restore tools: save, fetch and walk named
//! objects on the local filesystem or an S3-compatible object store.

pub mod error;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use error::{Result, StorageError};
pub use storage::{ListEntry, ObjectReader, ObjectWriter, Storage, StorageManager, WalkFn};
