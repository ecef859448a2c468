use serde::Serialize;

/// Result of persisting one uploaded object.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub file_name: String,
    pub url: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_size_bytes: usize,
    pub allowed_mime_types: Vec<String>,
    pub upload_dir: String,
    pub base_url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "video/mp4".to_string(),
                "audio/mpeg".to_string(),
                "application/pdf".to_string(),
                "text/plain".to_string(),
            ],
            upload_dir: "./uploads".to_string(),
            base_url: "/uploads".to_string(),
        }
    }
}
