//! Pollinations text-to-image endpoint.
//!
//! Pollinations renders on GET, so "generating" means building the URL; the
//! chat platform fetches the picture when the URL is sent as a photo.

use {async_trait::async_trait, rand::Rng, tracing::debug, url::Url};

use crate::{
    error::{Error, Result},
    generator::{GeneratedImage, ImageGenerator},
};

pub const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai";

/// Upper bound (exclusive) of the random seed.
const SEED_RANGE: u32 = 1_000_000;

#[derive(Debug, Clone)]
pub struct PollinationsGenerator {
    base_url: String,
    model: String,
    width: u32,
    height: u32,
    style_prefix: String,
}

impl Default for PollinationsGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PollinationsGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: "flux".into(),
            width: 1024,
            height: 1024,
            style_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Text prepended to every prompt, e.g. an art style.
    #[must_use]
    pub fn with_style_prefix(mut self, style_prefix: impl Into<String>) -> Self {
        self.style_prefix = style_prefix.into();
        self
    }

    /// Build the image URL for `prompt` with a fixed `seed`.
    pub fn url_for(&self, prompt: &str, seed: u32) -> Result<Url> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::invalid_input("image prompt is empty"));
        }
        let full_prompt = match self.style_prefix.trim() {
            "" => prompt.to_string(),
            prefix => format!("{prefix}, {prompt}"),
        };

        let mut url = Url::parse(&format!(
            "{}/prompt/{}",
            self.base_url,
            urlencoding::encode(&full_prompt)
        ))?;
        url.query_pairs_mut()
            .append_pair("width", &self.width.to_string())
            .append_pair("height", &self.height.to_string())
            .append_pair("seed", &seed.to_string())
            .append_pair("model", &self.model)
            .append_pair("nologo", "true");
        Ok(url)
    }
}

#[async_trait]
impl ImageGenerator for PollinationsGenerator {
    fn name(&self) -> &str {
        "pollinations"
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let seed = rand::rng().random_range(0..SEED_RANGE);
        let url = self.url_for(prompt, seed)?;
        debug!(seed, %url, "pollinations image url");
        Ok(GeneratedImage {
            url,
            prompt: prompt.trim().to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_has_encoded_prompt_and_parameters() {
        let generator = PollinationsGenerator::default()
            .with_size(512, 768)
            .with_style_prefix("dark fantasy art");
        let url = generator.url_for("cat in rain", 42).unwrap();

        assert_eq!(
            url.as_str(),
            "https://image.pollinations.ai/prompt/dark%20fantasy%20art%2C%20cat%20in%20rain\
             ?width=512&height=768&seed=42&model=flux&nologo=true"
        );
    }

    #[test]
    fn no_style_prefix_uses_prompt_alone() {
        let url = PollinationsGenerator::new("http://localhost:9000/")
            .url_for("  a fox ", 1)
            .unwrap();
        assert!(url.as_str().starts_with("http://localhost:9000/prompt/a%20fox?"));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert!(matches!(
            PollinationsGenerator::default().url_for("   ", 0),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn generate_picks_seed_in_range() {
        let image = PollinationsGenerator::default()
            .generate("lighthouse")
            .await
            .unwrap();
        let seed: u32 = image
            .url
            .query_pairs()
            .find(|(k, _)| k == "seed")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        assert!(seed < SEED_RANGE);
        assert_eq!(image.prompt, "lighthouse");
    }
}
