use crate::error::Result;
use async_trait::async_trait;

/// Where the authoritative pin list comes from.
/// Implemented for HTTP and local files; tests plug in canned payloads.
#[async_trait]
pub trait PinSource: Send + Sync {
    /// Fetch the raw pin resource
    async fn fetch(&self) -> Result<String>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}
