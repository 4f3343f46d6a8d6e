use async_trait::async_trait;
use deploy_automation_core::error::ProviderError;

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Reads a decrypted parameter value. A missing parameter is
    /// `ProviderError::NotFound`.
    async fn get_parameter(&self, name: &str) -> Result<String, ProviderError>;

    /// Writes `value` as a `SecureString`, overwriting any previous value.
    async fn put_secure_parameter(&self, name: &str, value: &str) -> Result<(), ProviderError>;
}
