use crate::app::gateways::ObjectStoreGateway;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Uploads Glue job scripts from a local folder, keyed by the folder name.
#[derive(Clone)]
pub struct ScriptDeployer {
    store: ObjectStoreGateway,
}

impl ScriptDeployer {
    pub fn new(store: ObjectStoreGateway) -> Self {
        Self { store }
    }

    /// Uploads every `*.py` file in `folder` (not recursive) except package
    /// constructors, to `<folder>/<file>`. Returns the keys in sorted order.
    pub async fn deploy(&self, folder: &str, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for (file_name, path) in python_files(folder).await? {
            if file_name.starts_with("__init__") {
                continue;
            }
            let key = script_key(folder, &file_name);
            keys.push(self.store.try_upload_file(&path, bucket, Some(&key)).await?);
        }

        info!("The files in {} have been uploaded to the bucket: {}", folder, bucket);
        Ok(keys)
    }

    /// Deletes `<folder>/<file>` for every local `*.py` file, `__init__` included.
    pub async fn remove(&self, folder: &str, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for (file_name, _) in python_files(folder).await? {
            let key = script_key(folder, &file_name);
            self.store.delete_object(bucket, &key).await?;
            keys.push(key);
        }

        info!("The files in {} have been removed from the bucket: {}", folder, bucket);
        Ok(keys)
    }
}

/// 相對路徑照原樣作為前綴；絕對路徑只取最後一層目錄，
/// 讓 `/srv/etl/glue_job_scripts` 與 `glue_job_scripts` 對應到同一個 key。
fn script_key(folder: &str, file_name: &str) -> String {
    let trimmed = folder.trim_end_matches('/');
    let prefix = if Path::new(trimmed).is_absolute() {
        Path::new(trimmed)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    } else {
        trimmed.trim_start_matches("./")
    };

    if prefix.is_empty() || prefix == "." {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// (file name, path) of the `.py` files directly inside `folder`, sorted by name.
async fn python_files(folder: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(Path::new(folder)).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.ends_with(".py") {
            files.push((name, entry.path()));
        }
    }
    files.sort();
    Ok(files)
}
