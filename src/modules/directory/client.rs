use std::time::Duration;

use async_trait::async_trait;

use crate::api::error::SystemError;
use crate::ENV;

use super::model::DirectoryEntry;

/// Lookup against the external user directory. Calls are bounded by a short
/// timeout so a slow directory never stalls message reads.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Vec<DirectoryEntry>, SystemError>;
}

pub struct HttpDirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDirectoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SystemError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_env() -> Result<Self, SystemError> {
        Self::new(
            ENV.directory_url.clone(),
            Duration::from_millis(ENV.directory_timeout_ms),
        )
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn resolve(&self, query: &str) -> Result<Vec<DirectoryEntry>, SystemError> {
        let url = format!("{}/resolve", self.base_url);

        let entries = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<DirectoryEntry>>()
            .await?;

        Ok(entries)
    }
}
