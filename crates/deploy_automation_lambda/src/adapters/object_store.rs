use async_trait::async_trait;
use deploy_automation_core::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSideEncryption {
    BucketDefault,
    Aes256,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        encryption: ServerSideEncryption,
    ) -> Result<(), ProviderError>;

    /// Server-side copy of `copy_source` (`bucket/key`) to `bucket`/`key`.
    async fn copy_object(&self, bucket: &str, key: &str, copy_source: &str)
        -> Result<(), ProviderError>;
}
