use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::storage::{ObjectReader, ObjectWriter, Storage, WalkFn};

pub struct LocalDriver {
    root: PathBuf,
}

impl LocalDriver {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Normalize path to prevent directory traversal attacks / 规范化路径
    fn normalize_path(&self, path: &str) -> Result<PathBuf> {
        let path = path.trim_start_matches('/').replace('\\', "/");

        let normalized: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
        if normalized.iter().any(|component| *component == "..") {
            return Err(StorageError::RequestConstruction(
                "Access path exceeds root directory scope".to_string(),
            ));
        }

        Ok(self.root.join(normalized.join("/")))
    }

    /// Open every file under `path` (recursive, sorted), or the single file `path` names
    /// 打开路径下的所有文件
    pub async fn fetch_all(&self, path: &str) -> Result<Vec<ObjectReader>> {
        let full_path = self.normalize_path(path)?;

        let files = tokio::task::spawn_blocking(move || {
            if full_path.is_dir() {
                let mut files = Vec::new();
                collect_files(&full_path, &mut files)?;
                Ok::<Vec<PathBuf>, std::io::Error>(files)
            } else {
                Ok(vec![full_path])
            }
        })
        .await
        .map_err(join_error)??;

        let mut readers: Vec<ObjectReader> = Vec::with_capacity(files.len());
        for file in files {
            readers.push(Box::new(tokio::fs::File::open(file).await?));
        }
        Ok(readers)
    }
}

#[async_trait]
impl Storage for LocalDriver {
    fn name(&self) -> &str {
        "local"
    }

    async fn save(&self, path: &str) -> Result<ObjectWriter> {
        let full_path = self.normalize_path(path)?;

        let file = tokio::task::spawn_blocking(move || {
            // Ensure parent directory exists / 确保父目录存在
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(&full_path)
        })
        .await
        .map_err(join_error)??;

        Ok(Box::new(tokio::fs::File::from_std(file)))
    }

    async fn fetch(&self, path: &str) -> Result<ObjectReader> {
        let full_path = self.normalize_path(path)?;
        let file = tokio::fs::File::open(full_path).await?;
        Ok(Box::new(file))
    }

    async fn walk(&self, prefix: &str, visit: &mut WalkFn<'_>) -> Result<()> {
        let start = self.normalize_path(prefix)?;
        let root = self.root.clone();

        let entries = tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            if start.is_file() {
                entries.push((relative_key(&root, &start), None));
            } else {
                collect_entries(&root, &start, &mut entries);
            }
            entries
        })
        .await
        .map_err(join_error)?;

        for (key, err) in entries {
            visit(&key, err.map(StorageError::Io));
        }
        Ok(())
    }
}

fn join_error(e: tokio::task::JoinError) -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Object key of `path` relative to root, `/` separated / 相对根目录的键
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn sorted_children(dir: &Path) -> std::io::Result<Vec<(PathBuf, std::io::Result<std::fs::FileType>)>> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        children.push((entry.path(), entry.file_type()));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

/// Recursive walk that keeps going on errors, reporting them per entry / 递归遍历
fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<(String, Option<std::io::Error>)>) {
    let children = match sorted_children(dir) {
        Ok(children) => children,
        Err(e) => {
            out.push((relative_key(root, dir), Some(e)));
            return;
        }
    };

    for (path, file_type) in children {
        match file_type {
            Ok(t) if t.is_dir() => collect_entries(root, &path, out),
            Ok(_) => out.push((relative_key(root, &path), None)),
            Err(e) => out.push((relative_key(root, &path), Some(e))),
        }
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for (path, file_type) in sorted_children(dir)? {
        if file_type?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let driver = LocalDriver::new(PathBuf::from("/data"));
        assert_eq!(driver.normalize_path("/a/b").unwrap(), PathBuf::from("/data/a/b"));
        assert_eq!(driver.normalize_path("a\\b").unwrap(), PathBuf::from("/data/a/b"));
        assert_eq!(driver.normalize_path("./a//b/").unwrap(), PathBuf::from("/data/a/b"));
        assert!(matches!(
            driver.normalize_path("a/../../etc"),
            Err(StorageError::RequestConstruction(_))
        ));
    }

    #[test]
    fn test_relative_key() {
        let root = Path::new("/data");
        assert_eq!(relative_key(root, Path::new("/data/a/b.bson")), "a/b.bson");
        assert_eq!(relative_key(root, Path::new("/data")), "");
    }
}
