use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::error::SystemError;
use crate::ENV;

use super::model::{StoredObject, UploadConfig};

/// Persists uploaded bytes and hands back a URL the client can fetch later.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn store(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, SystemError>;
}

pub struct DiskStorage {
    config: UploadConfig,
}

impl DiskStorage {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(UploadConfig {
            upload_dir: ENV.upload_dir.clone(),
            base_url: ENV.upload_base_url.clone(),
            ..UploadConfig::default()
        })
    }

    fn validate(&self, mime_type: &str, size: usize) -> Result<(), SystemError> {
        if size == 0 {
            return Err(SystemError::BadRequest("Uploaded file is empty".into()));
        }

        if size > self.config.max_size_bytes {
            return Err(SystemError::BadRequest(
                format!(
                    "File exceeds the maximum allowed size of {} bytes",
                    self.config.max_size_bytes
                )
                .into(),
            ));
        }

        if !self
            .config
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed == mime_type)
        {
            return Err(SystemError::BadRequest(
                format!("File type {} is not allowed", mime_type).into(),
            ));
        }

        Ok(())
    }

    fn object_name(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_lowercase());

        match extension {
            Some(ext) => format!("{}.{}", Uuid::now_v7(), ext),
            None => Uuid::now_v7().to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for DiskStorage {
    async fn store(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, SystemError> {
        self.validate(mime_type, bytes.len())?;

        let file_name = Self::object_name(original_name);
        let path = Path::new(&self.config.upload_dir).join(&file_name);

        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredObject {
            url: format!("{}/{}", self.config.base_url, file_name),
            file_name,
            size_bytes: bytes.len() as i64,
        })
    }
}
