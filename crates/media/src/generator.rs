use {async_trait::async_trait, url::Url};

use crate::error::Result;

/// An image ready to be delivered by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: Url,
    pub prompt: String,
}

/// Turns a text prompt into an image the transport can send.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;
}
